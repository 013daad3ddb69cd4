//! Session configuration.
//!
//! Loaded from a TOML file, from environment variables, or both (environment
//! wins). Every field except the credentials has a default.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ApiError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.appnexus.com";

/// Member account used to scope profile requests when none is configured.
pub const DEFAULT_MEMBER_ID: u64 = 668;

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_member_id() -> u64 {
    DEFAULT_MEMBER_ID
}

fn default_timeout_ms() -> u64 {
    30_000
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_member_id")]
    pub member_id: u64,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

// Hand-written so the password never reaches a log line.
impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("member_id", &self.member_id)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: String::new(),
            password: String::new(),
            member_id: default_member_id(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SessionConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_member_id(mut self, member_id: u64) -> Self {
        self.member_id = member_id;
        self
    }

    /// Sub-millisecond precision is dropped; anything shorter than 1 ms
    /// becomes 1 ms.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| ApiError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading session configuration");
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Defaults overridden by `XANDR_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().merge_with_env()
    }

    /// Override fields from `XANDR_BASE_URL`, `XANDR_USERNAME`,
    /// `XANDR_PASSWORD`, `XANDR_MEMBER_ID` and `XANDR_TIMEOUT_MS`.
    pub fn merge_with_env(self) -> Result<Self> {
        self.merge_with(|key| std::env::var(key).ok())
    }

    fn merge_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(base_url) = lookup("XANDR_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(username) = lookup("XANDR_USERNAME") {
            self.username = username;
        }
        if let Some(password) = lookup("XANDR_PASSWORD") {
            self.password = password;
        }
        if let Some(member_id) = lookup("XANDR_MEMBER_ID") {
            self.member_id = member_id
                .parse()
                .map_err(|_| ApiError::Config(format!("XANDR_MEMBER_ID is not a number: {member_id}")))?;
        }
        if let Some(timeout) = lookup("XANDR_TIMEOUT_MS") {
            self.timeout_ms = timeout
                .parse()
                .map_err(|_| ApiError::Config(format!("XANDR_TIMEOUT_MS is not a number: {timeout}")))?;
        }
        Ok(self)
    }

    /// Check the base URL and timeout, and strip any trailing slash.
    pub fn validate(mut self) -> Result<Self> {
        let parsed = Url::parse(&self.base_url).map_err(|e| ApiError::Config(format!("base_url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "base_url must use http or https, got {}",
                parsed.scheme()
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ApiError::Config("timeout_ms must be at least 1".to_string()));
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        Ok(self)
    }
}
