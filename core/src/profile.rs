//! Targeting profiles, scoped to an advertiser and a member.

use serde_json::Value;

use crate::envelope::parse_entity;
use crate::error::Result;
use crate::http::HttpRequest;
use crate::session::Session;

#[derive(Debug, Clone, Copy)]
pub struct ProfileApi<'a> {
    session: &'a Session,
    member_id: u64,
}

impl<'a> ProfileApi<'a> {
    /// Uses the session's configured member id.
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            member_id: session.member_id(),
        }
    }

    pub fn with_member_id(mut self, member_id: u64) -> Self {
        self.member_id = member_id;
        self
    }

    pub fn member_id(&self) -> u64 {
        self.member_id
    }

    pub fn build_get_item(&self, advertiser_id: u64, profile_id: u64) -> Result<HttpRequest> {
        Ok(HttpRequest::get(self.session.url(
            "profile",
            &[
                ("id", profile_id.to_string()),
                ("advertiser_id", advertiser_id.to_string()),
                ("member_id", self.member_id.to_string()),
            ],
        )?))
    }

    /// The `response.profile` object.
    pub fn get_item(&self, advertiser_id: u64, profile_id: u64) -> Result<Value> {
        let response = self.session.execute(self.build_get_item(advertiser_id, profile_id)?)?;
        parse_entity(&response, "profile")
    }

    pub fn build_create_item(&self, advertiser_id: u64, payload: &Value) -> Result<HttpRequest> {
        let url = self.session.url(
            "profile",
            &[
                ("advertiser_id", advertiser_id.to_string()),
                ("member_id", self.member_id.to_string()),
            ],
        )?;
        HttpRequest::post_json(url, payload)
    }

    /// Create a profile; `payload` is the full `{"profile": {...}}` document.
    /// Returns the created `response.profile` object.
    pub fn create_item(&self, advertiser_id: u64, payload: &Value) -> Result<Value> {
        let response = self
            .session
            .execute(self.build_create_item(advertiser_id, payload)?)?;
        parse_entity(&response, "profile")
    }
}
