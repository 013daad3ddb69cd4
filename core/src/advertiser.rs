//! Advertiser lookups.

use serde_json::Value;

use crate::envelope::{parse_entity, str_field};
use crate::error::Result;
use crate::http::HttpRequest;
use crate::session::Session;

#[derive(Debug, Clone, Copy)]
pub struct AdvertiserApi<'a> {
    session: &'a Session,
}

impl<'a> AdvertiserApi<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub fn build_get(&self, advertiser_id: u64) -> Result<HttpRequest> {
        Ok(HttpRequest::get(
            self.session.url("advertiser", &[("id", advertiser_id.to_string())])?,
        ))
    }

    /// The `response.advertiser` object.
    pub fn get(&self, advertiser_id: u64) -> Result<Value> {
        let response = self.session.execute(self.build_get(advertiser_id)?)?;
        parse_entity(&response, "advertiser")
    }

    pub fn get_name(&self, advertiser_id: u64) -> Result<String> {
        let advertiser = self.get(advertiser_id)?;
        Ok(str_field(&advertiser, "name", "response.advertiser.name")?.to_string())
    }
}
