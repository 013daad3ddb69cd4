//! Insertion orders.

use serde_json::{json, Value};
use tracing::info;

use crate::envelope::{parse_entity, u64_field};
use crate::error::{ApiError, Result};
use crate::http::HttpRequest;
use crate::session::Session;

const ENTITY: &str = "insertion-order";

#[derive(Debug, Clone, Copy)]
pub struct InsertionOrderApi<'a> {
    session: &'a Session,
}

impl<'a> InsertionOrderApi<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub fn build_get(&self, insertion_order_id: u64) -> Result<HttpRequest> {
        Ok(HttpRequest::get(
            self.session.url(ENTITY, &[("id", insertion_order_id.to_string())])?,
        ))
    }

    /// The `response.insertion-order` object.
    pub fn get(&self, insertion_order_id: u64) -> Result<Value> {
        let response = self.session.execute(self.build_get(insertion_order_id)?)?;
        parse_entity(&response, ENTITY)
    }

    pub fn get_profile_id(&self, insertion_order_id: u64) -> Result<u64> {
        let insertion_order = self.get(insertion_order_id)?;
        u64_field(&insertion_order, "profile_id", "response.insertion-order.profile_id")
    }

    /// Write `name` and `advertiser_id` into `template` and build the POST.
    pub fn build_create(&self, advertiser_id: u64, name: &str, template: &mut Value) -> Result<HttpRequest> {
        let entity = template
            .get_mut(ENTITY)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| ApiError::missing(ENTITY))?;
        entity.insert("name".to_string(), json!(name));
        entity.insert("advertiser_id".to_string(), json!(advertiser_id));

        let url = self
            .session
            .url(ENTITY, &[("advertiser_id", advertiser_id.to_string())])?;
        HttpRequest::post_json(url, template)
    }

    /// Create an insertion order from `template`, which is updated in place
    /// with `name` and `advertiser_id` before it is sent. Returns the created
    /// `response.insertion-order` object.
    pub fn create(&self, advertiser_id: u64, name: &str, template: &mut Value) -> Result<Value> {
        let request = self.build_create(advertiser_id, name, template)?;
        let response = self.session.execute(request)?;
        let created = parse_entity(&response, ENTITY)?;
        info!(advertiser_id, name, id = ?created.get("id"), "Insertion order created");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{json_response, session, RecordingTransport};
    use pretty_assertions::assert_eq;

    #[test]
    fn get_returns_nested_object() {
        let transport = RecordingTransport::new();
        transport.push(json_response(
            200,
            r#"{"response":{"status":"OK","insertion-order":{"id":9,"profile_id":42}}}"#,
        ));
        let session = session(&transport);

        let io = session.insertion_orders().get(9).unwrap();
        assert_eq!(io, json!({"id": 9, "profile_id": 42}));
        assert_eq!(transport.requests()[0].url, "http://xandr.test/insertion-order?id=9");
    }

    #[test]
    fn get_profile_id_reads_decoded_object() {
        let transport = RecordingTransport::new();
        transport.push(json_response(
            200,
            r#"{"response":{"status":"OK","insertion-order":{"id":9,"profile_id":42}}}"#,
        ));
        let session = session(&transport);

        assert_eq!(session.insertion_orders().get_profile_id(9).unwrap(), 42);
    }

    #[test]
    fn get_profile_id_when_unset() {
        let transport = RecordingTransport::new();
        transport.push(json_response(
            200,
            r#"{"response":{"status":"OK","insertion-order":{"id":9,"profile_id":null}}}"#,
        ));
        let session = session(&transport);

        let err = session.insertion_orders().get_profile_id(9).unwrap_err();
        assert!(matches!(err, ApiError::MissingField { .. }));
    }

    #[test]
    fn create_mutates_template_once() {
        let transport = RecordingTransport::new();
        transport.push(json_response(
            200,
            r#"{"response":{"status":"OK","insertion-order":{"id":300,"name":"Q1 Push","advertiser_id":51}}}"#,
        ));
        let session = session(&transport);
        let mut template = json!({"insertion-order": {"name": "TEMPLATE", "state": "inactive"}});

        let created = session
            .insertion_orders()
            .create(51, "Q1 Push", &mut template)
            .unwrap();
        assert_eq!(created["id"], 300);

        let expected = json!({"insertion-order": {"name": "Q1 Push", "state": "inactive", "advertiser_id": 51}});
        assert_eq!(template, expected);
        assert_eq!(transport.json_body(0), expected);
        assert_eq!(
            transport.requests()[0].url,
            "http://xandr.test/insertion-order?advertiser_id=51"
        );
    }

    #[test]
    fn create_rejects_template_without_entity() {
        let transport = RecordingTransport::new();
        let session = session(&transport);
        let mut template = json!({"name": "flat"});

        let err = session
            .insertion_orders()
            .create(51, "Q1", &mut template)
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingField { ref path } if path == "insertion-order"));
        assert!(transport.requests().is_empty());
    }
}
