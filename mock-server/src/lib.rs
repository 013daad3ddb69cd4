//! In-memory stand-in for the Xandr console API.
//!
//! Serves the endpoints the client consumes with the same `response`
//! envelope, token check and query-string scoping as the real service.
//! Created entities are echoed back with an assigned `id`. Report jobs
//! report `pending` for a configurable number of status checks before
//! turning `ready`.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Largest segment page the server hands out.
pub const SEGMENT_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub username: String,
    pub password: String,
    /// Status checks answered with `pending` before a report turns `ready`.
    pub checks_until_ready: u32,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            username: "api-user".to_string(),
            password: "api-pass".to_string(),
            checks_until_ready: 1,
        }
    }
}

#[derive(Debug, Clone)]
struct ReportJob {
    advertiser_id: u64,
    report_type: String,
    checks: u32,
    ready: bool,
}

#[derive(Debug, Default)]
struct Store {
    tokens: Vec<String>,
    next_id: u64,
    entities: HashMap<(&'static str, u64), Value>,
    segments: Vec<Value>,
    reports: HashMap<String, ReportJob>,
}

#[derive(Clone)]
pub struct MockState {
    config: Arc<MockConfig>,
    store: Arc<RwLock<Store>>,
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        let store = Store {
            next_id: 1000,
            ..Store::default()
        };
        Self {
            config: Arc::new(config),
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// State preloaded with advertiser 51, insertion order 300, profile 42
    /// and 120 segments.
    pub fn seeded(config: MockConfig) -> Self {
        let mut store = Store {
            next_id: 1000,
            ..Store::default()
        };
        store.entities.insert(
            ("advertiser", 51),
            json!({"id": 51, "name": "Acme Shoes", "state": "active"}),
        );
        store.entities.insert(
            ("profile", 42),
            json!({"id": 42, "advertiser_id": 51, "country_action": "include"}),
        );
        store.entities.insert(
            ("insertion-order", 300),
            json!({
                "id": 300,
                "name": "Q1 Push",
                "advertiser_id": 51,
                "profile_id": 42,
                "state": "active",
                "budget_intervals": [{"start_date": "2024-01-01", "end_date": "2024-02-01"}]
            }),
        );
        store.segments = (1..=120)
            .map(|id| json!({"id": id, "short_name": format!("segment-{id}"), "member_id": 668}))
            .collect();
        Self {
            config: Arc::new(config),
            store: Arc::new(RwLock::new(store)),
        }
    }
}

pub fn app() -> Router {
    app_with_state(MockState::seeded(MockConfig::default()))
}

pub fn app_with_state(state: MockState) -> Router {
    Router::new()
        .route("/report", get(report_status).post(submit_report))
        .route("/report-download", get(download_report))
        .route("/segment", get(list_segments))
        .route("/advertiser", get(get_advertiser))
        .route("/profile", get(get_profile).post(create_profile))
        .route("/insertion-order", get(get_insertion_order).post(create_insertion_order))
        .route("/line-item", get(get_line_item).post(create_line_item))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
        .route("/auth", post(auth))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, MockState::seeded(MockConfig::default())).await
}

pub async fn run_with_state(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Mock Xandr API listening");
    }
    axum::serve(listener, app_with_state(state)).await
}

type Reply = (StatusCode, Json<Value>);

fn ok(mut inner: Value) -> Json<Value> {
    if let Some(map) = inner.as_object_mut() {
        map.insert("status".to_string(), json!("OK"));
    }
    Json(json!({ "response": inner }))
}

fn error(status: StatusCode, error_id: &str, message: &str) -> Reply {
    (
        status,
        Json(json!({"response": {"status": "error", "error_id": error_id, "error": message}})),
    )
}

fn not_found(entity: &str) -> Reply {
    error(StatusCode::NOT_FOUND, "NOTFOUND", &format!("{entity} not found"))
}

fn required(name: &str) -> Reply {
    error(StatusCode::BAD_REQUEST, "SYNTAX", &format!("{name} is required"))
}

async fn require_token(
    State(state): State<MockState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let known = state.store.read().await.tokens.iter().any(|t| t == token);
    if !known {
        return error(StatusCode::UNAUTHORIZED, "NOAUTH", "You are not logged in.").into_response();
    }
    next.run(request).await
}

async fn auth(State(state): State<MockState>, Json(body): Json<Value>) -> Result<Json<Value>, Reply> {
    let username = body.pointer("/auth/username").and_then(Value::as_str);
    let password = body.pointer("/auth/password").and_then(Value::as_str);
    if username != Some(state.config.username.as_str()) || password != Some(state.config.password.as_str()) {
        return Err(error(
            StatusCode::UNAUTHORIZED,
            "NOAUTH",
            "No match found for user/pass",
        ));
    }

    let token = format!("hbapi:{}", Uuid::new_v4().simple());
    state.store.write().await.tokens.push(token.clone());
    debug!(username, "Issued token");
    Ok(ok(json!({ "token": token })))
}

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    pub id: Option<u64>,
    pub advertiser_id: Option<u64>,
    pub member_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub id: Option<String>,
    pub advertiser_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SegmentQuery {
    #[serde(default)]
    pub start_element: u64,
}

// --- reports ---

async fn submit_report(
    State(state): State<MockState>,
    Query(query): Query<ReportQuery>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, Reply> {
    let advertiser_id = query.advertiser_id.ok_or_else(|| required("advertiser_id"))?;
    let report_type = body
        .pointer("/report/report_type")
        .and_then(Value::as_str)
        .ok_or_else(|| required("report.report_type"))?
        .to_string();

    let report_id = Uuid::new_v4().simple().to_string();
    state.store.write().await.reports.insert(
        report_id.clone(),
        ReportJob {
            advertiser_id,
            report_type,
            checks: 0,
            ready: false,
        },
    );
    Ok(ok(json!({ "report_id": report_id })))
}

async fn report_status(
    State(state): State<MockState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>, Reply> {
    let id = query.id.ok_or_else(|| required("id"))?;
    let mut store = state.store.write().await;
    let job = store.reports.get_mut(&id).ok_or_else(|| not_found("report"))?;

    if job.checks >= state.config.checks_until_ready {
        job.ready = true;
    }
    job.checks += 1;

    let execution_status = if job.ready { "ready" } else { "pending" };
    Ok(ok(json!({
        "execution_status": execution_status,
        "report": {
            "id": id,
            "report_type": job.report_type,
            "advertiser_id": job.advertiser_id,
        }
    })))
}

async fn download_report(
    State(state): State<MockState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Reply> {
    let id = query.id.ok_or_else(|| required("id"))?;
    let store = state.store.read().await;
    let job = store.reports.get(&id).ok_or_else(|| not_found("report"))?;
    if !job.ready {
        return Err(error(StatusCode::BAD_REQUEST, "SYNTAX", "report is not ready"));
    }

    let csv = format!("day,advertiser_id,imps\n2024-01-01,{},1200\n", job.advertiser_id);
    Ok(([(header::CONTENT_TYPE, "text/csv")], csv).into_response())
}

// --- segments ---

async fn list_segments(State(state): State<MockState>, Query(query): Query<SegmentQuery>) -> Json<Value> {
    let store = state.store.read().await;
    let page: Vec<Value> = store
        .segments
        .iter()
        .skip(query.start_element as usize)
        .take(SEGMENT_PAGE_SIZE as usize)
        .cloned()
        .collect();
    ok(json!({
        "count": store.segments.len(),
        "start_element": query.start_element,
        "num_elements": page.len(),
        "segments": page,
    }))
}

// --- generic entities ---

async fn fetch(state: &MockState, entity: &'static str, query: &ScopeQuery) -> Result<Json<Value>, Reply> {
    let id = query.id.ok_or_else(|| required("id"))?;
    let store = state.store.read().await;
    let found = store
        .entities
        .get(&(entity, id))
        .filter(|value| match query.advertiser_id {
            Some(advertiser_id) => value
                .get("advertiser_id")
                .and_then(Value::as_u64)
                .map_or(true, |owner| owner == advertiser_id),
            None => true,
        })
        .cloned()
        .ok_or_else(|| not_found(entity))?;
    Ok(ok(json!({ entity: found })))
}

async fn create(
    state: &MockState,
    entity: &'static str,
    query: &ScopeQuery,
    body: &Value,
) -> Result<Json<Value>, Reply> {
    let advertiser_id = query.advertiser_id.ok_or_else(|| required("advertiser_id"))?;
    let mut created = body
        .get(entity)
        .filter(|v| v.is_object())
        .cloned()
        .ok_or_else(|| required(entity))?;

    let mut store = state.store.write().await;
    store.next_id += 1;
    let id = store.next_id;
    if let Some(map) = created.as_object_mut() {
        map.insert("id".to_string(), json!(id));
        map.entry("advertiser_id").or_insert(json!(advertiser_id));
        if let Some(member_id) = query.member_id {
            map.insert("member_id".to_string(), json!(member_id));
        }
    }
    store.entities.insert((entity, id), created.clone());
    debug!(entity, id, "Created entity");
    Ok(ok(json!({ "id": id, entity: created })))
}

async fn get_advertiser(State(state): State<MockState>, Query(query): Query<ScopeQuery>) -> Result<Json<Value>, Reply> {
    fetch(&state, "advertiser", &query).await
}

async fn get_profile(State(state): State<MockState>, Query(query): Query<ScopeQuery>) -> Result<Json<Value>, Reply> {
    if query.member_id.is_none() {
        return Err(required("member_id"));
    }
    fetch(&state, "profile", &query).await
}

async fn create_profile(
    State(state): State<MockState>,
    Query(query): Query<ScopeQuery>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, Reply> {
    if query.member_id.is_none() {
        return Err(required("member_id"));
    }
    create(&state, "profile", &query, &body).await
}

async fn get_insertion_order(
    State(state): State<MockState>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Value>, Reply> {
    fetch(&state, "insertion-order", &query).await
}

async fn create_insertion_order(
    State(state): State<MockState>,
    Query(query): Query<ScopeQuery>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, Reply> {
    create(&state, "insertion-order", &query, &body).await
}

async fn get_line_item(State(state): State<MockState>, Query(query): Query<ScopeQuery>) -> Result<Json<Value>, Reply> {
    fetch(&state, "line-item", &query).await
}

async fn create_line_item(
    State(state): State<MockState>,
    Query(query): Query<ScopeQuery>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, Reply> {
    create(&state, "line-item", &query, &body).await
}
