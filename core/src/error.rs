//! Error types for the Xandr API client.
//!
//! # Design
//! Transport failures, non-2xx statuses and missing JSON fields are separate
//! variants so callers can tell "could not reach the API" from "the API said
//! no" from "the API answered with something unexpected". A 2xx reply whose
//! envelope reports `"status": "error"` is surfaced as `Rejected`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No reply was received: DNS, connect, TLS or timeout failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server replied with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The reply parsed as JSON but lacks a field the client needs.
    #[error("field not found: {path}")]
    MissingField { path: String },

    /// The envelope carried `"status": "error"`.
    #[error("request rejected ({error_id}): {message}")]
    Rejected { error_id: String, message: String },

    /// A facade was used before `login` stored a token.
    #[error("session is not authenticated")]
    NotAuthenticated,

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub(crate) fn missing(path: impl Into<String>) -> Self {
        ApiError::MissingField { path: path.into() }
    }

    /// True for 401/403 replies.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Http { status: 401 | 403, .. })
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
