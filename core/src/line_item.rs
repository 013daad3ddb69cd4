//! Line items.
//!
//! Creating a line item stitches together three other entities: the
//! profile it targets, the insertion order it belongs to, and a caller
//! template holding everything else. [`assemble_line_item`] performs that
//! stitching without I/O so it can be inspected before anything is sent.

use serde_json::{json, Map, Value};
use tracing::info;

use crate::envelope::{field, parse_entity, u64_field};
use crate::error::{ApiError, Result};
use crate::http::HttpRequest;
use crate::session::Session;

const ENTITY: &str = "line-item";

#[derive(Debug, Clone, Copy)]
pub struct LineItemApi<'a> {
    session: &'a Session,
}

impl<'a> LineItemApi<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub fn build_get(&self, line_item_id: u64) -> Result<HttpRequest> {
        Ok(HttpRequest::get(
            self.session.url(ENTITY, &[("id", line_item_id.to_string())])?,
        ))
    }

    /// The `response.line-item` object.
    pub fn get(&self, line_item_id: u64) -> Result<Value> {
        let response = self.session.execute(self.build_get(line_item_id)?)?;
        parse_entity(&response, ENTITY)
    }

    pub fn get_profile_id(&self, line_item_id: u64) -> Result<u64> {
        let line_item = self.get(line_item_id)?;
        u64_field(&line_item, "profile_id", "response.line-item.profile_id")
    }

    /// Assemble `template` (see [`assemble_line_item`]) and build the POST.
    pub fn build_create(
        &self,
        advertiser_name: &str,
        template: &mut Value,
        insertion_order: &Value,
        profile_item: &Value,
    ) -> Result<HttpRequest> {
        let advertiser_id = assemble_line_item(template, advertiser_name, insertion_order, profile_item)?;
        let url = self
            .session
            .url(ENTITY, &[("advertiser_id", query_value(&advertiser_id))])?;
        HttpRequest::post_json(url, template)
    }

    /// Create a line item under `insertion_order`, targeting `profile_item`.
    /// Both are the decoded objects returned by the matching `get` calls.
    /// Returns the created `response.line-item` object.
    pub fn create(
        &self,
        advertiser_name: &str,
        template: &mut Value,
        insertion_order: &Value,
        profile_item: &Value,
    ) -> Result<Value> {
        let request = self.build_create(advertiser_name, template, insertion_order, profile_item)?;
        let response = self.session.execute(request)?;
        let created = parse_entity(&response, ENTITY)?;
        info!(advertiser_name, id = ?created.get("id"), "Line item created");
        Ok(created)
    }
}

/// Fill a `{"line-item": {...}}` template in place from an insertion order
/// and a profile. Returns the advertiser id taken from the insertion order.
///
/// Sets `advertiser_id`, `profile_id`, `advertiser.id`, `advertiser.name`
/// and the dates of `budget_intervals[0]`, then overwrites every key of
/// `insertion_orders[0]` that the insertion order also has.
pub fn assemble_line_item(
    template: &mut Value,
    advertiser_name: &str,
    insertion_order: &Value,
    profile_item: &Value,
) -> Result<Value> {
    let profile_id = field(profile_item, "id", "profile.id")?.clone();
    let advertiser_id = field(insertion_order, "advertiser_id", "insertion-order.advertiser_id")?.clone();
    let interval = insertion_order
        .get("budget_intervals")
        .and_then(|intervals| intervals.get(0))
        .ok_or_else(|| ApiError::missing("insertion-order.budget_intervals[0]"))?;
    let start_date = present(interval, "start_date", "insertion-order.budget_intervals[0].start_date")?;
    let end_date = present(interval, "end_date", "insertion-order.budget_intervals[0].end_date")?;

    let line_item = object_mut(template.get_mut(ENTITY), ENTITY)?;
    line_item.insert("advertiser_id".to_string(), advertiser_id.clone());
    line_item.insert("profile_id".to_string(), profile_id);

    let advertiser = line_item
        .entry("advertiser")
        .or_insert_with(|| Value::Object(Map::new()));
    let advertiser = object_mut(Some(advertiser), "line-item.advertiser")?;
    advertiser.insert("id".to_string(), advertiser_id.clone());
    advertiser.insert("name".to_string(), json!(advertiser_name));

    let budget = object_mut(
        line_item
            .get_mut("budget_intervals")
            .and_then(|intervals| intervals.get_mut(0)),
        "line-item.budget_intervals[0]",
    )?;
    budget.insert("start_date".to_string(), start_date);
    budget.insert("end_date".to_string(), end_date);

    let linked = object_mut(
        line_item
            .get_mut("insertion_orders")
            .and_then(|orders| orders.get_mut(0)),
        "line-item.insertion_orders[0]",
    )?;
    for (key, slot) in linked.iter_mut() {
        if let Some(value) = insertion_order.get(key) {
            *slot = value.clone();
        }
    }

    Ok(advertiser_id)
}

/// `value[key]`, allowing an explicit null (open-ended budget intervals).
fn present(value: &Value, key: &str, path: &str) -> Result<Value> {
    value.get(key).cloned().ok_or_else(|| ApiError::missing(path))
}

fn object_mut<'v>(value: Option<&'v mut Value>, path: &str) -> Result<&'v mut Map<String, Value>> {
    value
        .and_then(Value::as_object_mut)
        .ok_or_else(|| ApiError::missing(path))
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
