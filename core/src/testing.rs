//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::SessionConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::session::Session;

/// Replays queued replies in order and records every request it sees.
/// Clones share the same queue and log.
#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    replies: Arc<Mutex<VecDeque<Result<HttpResponse, ApiError>>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: HttpResponse) {
        self.replies.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_error(&self, error: ApiError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Body of the `index`th request decoded as JSON.
    pub fn json_body(&self, index: usize) -> serde_json::Value {
        let requests = self.requests.lock().unwrap();
        serde_json::from_str(requests[index].body.as_deref().unwrap()).unwrap()
    }
}

impl Transport for RecordingTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no reply queued for {}", request.url))
    }
}

pub(crate) fn json_response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: body.as_bytes().to_vec(),
    }
}

/// A logged-in session against `http://xandr.test` backed by `transport`.
pub(crate) fn session(transport: &RecordingTransport) -> Session {
    Session::with_transport(
        SessionConfig::new("api-user", "api-pass").with_base_url("http://xandr.test"),
        transport.clone(),
    )
    .unwrap()
    .with_token("test-token")
}
