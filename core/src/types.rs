//! Request payloads and typed results.
//!
//! Resource documents (advertisers, profiles, line items, ...) stay as
//! `serde_json::Value`; the API owns their schema and the client only reads
//! or writes the handful of fields it needs.

use serde::Serialize;

/// Body of `POST /auth`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest<'a> {
    pub auth: Credentials<'a>,
}

#[derive(Clone, Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

// Same redaction as `SessionConfig`.
impl std::fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outcome of a report download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportDownload {
    /// The report finished and this is the downloaded body.
    Ready(Vec<u8>),
    /// The report is still queued or running.
    NotReady { execution_status: String },
    /// The API reports that execution failed.
    Failed { reason: String },
}

impl ReportDownload {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReportDownload::Ready(_))
    }
}
