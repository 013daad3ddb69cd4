//! Segment listing.

use serde_json::Value;

use crate::envelope::parse_envelope;
use crate::error::Result;
use crate::http::HttpRequest;
use crate::session::Session;

#[derive(Debug, Clone, Copy)]
pub struct SegmentApi<'a> {
    session: &'a Session,
}

impl<'a> SegmentApi<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub fn build_list(&self, start_element: u64) -> Result<HttpRequest> {
        Ok(HttpRequest::get(self.session.url(
            "segment",
            &[("start_element", start_element.to_string())],
        )?))
    }

    /// One page of segments beginning at `start_element`. The returned
    /// `response` object holds `segments`, `count` and `num_elements`.
    pub fn list(&self, start_element: u64) -> Result<Value> {
        let response = self.session.execute(self.build_list(start_element)?)?;
        parse_envelope(&response)
    }

    pub fn list_first_page(&self) -> Result<Value> {
        self.list(0)
    }
}
