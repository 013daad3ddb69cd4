//! Authenticated session shared by all resource facades.
//!
//! # Design
//! `Session` owns the configuration, the transport and the bearer token.
//! Facades borrow it and never hold transport state of their own. The token
//! sits behind a `RwLock`, so a session can be shared by reference across
//! threads; requests themselves stay blocking and one-at-a-time per call.
//!
//! Log output goes through the session's `tracing` span, which callers can
//! replace with [`Session::with_span`] to tag everything a session does.

use std::sync::{PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, info, info_span, warn, Span};
use url::Url;

use crate::advertiser::AdvertiserApi;
use crate::config::SessionConfig;
use crate::envelope::{parse_body, parse_envelope, str_field};
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::insertion_order::InsertionOrderApi;
use crate::line_item::LineItemApi;
use crate::profile::ProfileApi;
use crate::report::ReportApi;
use crate::segment::SegmentApi;
use crate::types::{AuthRequest, Credentials};

pub struct Session {
    config: SessionConfig,
    transport: Box<dyn Transport>,
    token: RwLock<Option<String>>,
    span: Span,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Validate `config` and build a session over a blocking HTTP agent
    /// using the configured timeout.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let transport = UreqTransport::new(config.timeout());
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: SessionConfig, transport: impl Transport + 'static) -> Result<Self> {
        let config = config.validate()?;
        let span = info_span!("xandr_session", base_url = %config.base_url);
        Ok(Self {
            config,
            transport: Box::new(transport),
            token: RwLock::new(None),
            span,
        })
    }

    /// Replace the span all of this session's log events are recorded in.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Resume with a token obtained elsewhere instead of calling `login`.
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn member_id(&self) -> u64 {
        self.config.member_id
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Forget the stored token. Later facade calls fail with
    /// `NotAuthenticated` until `login` runs again.
    pub fn logout(&self) {
        self.set_token(None);
        let _guard = self.span.enter();
        info!("Cleared session token");
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Absolute URL for `path` beneath the base URL with `query` appended.
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let raw = format!("{}/{}", self.config.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|e| ApiError::Config(format!("{raw}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.into())
    }

    pub fn build_login(&self) -> Result<HttpRequest> {
        let payload = AuthRequest {
            auth: Credentials {
                username: &self.config.username,
                password: &self.config.password,
            },
        };
        HttpRequest::post_json(self.url("auth", &[])?, &payload)
    }

    /// Authenticate with the configured credentials and store the returned
    /// token for every later request.
    ///
    /// On any failure the previous token state is left untouched.
    pub fn login(&self) -> Result<()> {
        let _guard = self.span.enter();
        debug!(username = %self.config.username, "Authenticating");

        let request = self.build_login()?;
        let response = self.transport.execute(&request).inspect_err(|e| {
            warn!(error = %e, "Failed to connect to Xandr API");
        })?;

        let token = parse_login(&response).inspect_err(|e| match e {
            ApiError::MissingField { .. } | ApiError::Deserialization(_) => {
                warn!(error = %e, "Unexpected response format from authentication service")
            }
            _ => warn!(error = %e, status = response.status, "Authentication rejected"),
        })?;

        self.set_token(Some(token));
        info!(username = %self.config.username, "Authenticated");
        Ok(())
    }

    /// Run `request` through the transport with the session token attached.
    ///
    /// Non-2xx replies are returned as data; callers decide how to read them.
    pub fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        let _guard = self.span.enter();
        let token = self.token().ok_or(ApiError::NotAuthenticated)?;
        request
            .headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
        request.headers.push(("authorization".to_string(), token));

        debug!(method = ?request.method, url = %request.url, "Sending request");
        let response = self.transport.execute(&request).inspect_err(|e| {
            warn!(url = %request.url, error = %e, "Request failed");
        })?;
        if !response.is_success() {
            warn!(url = %request.url, status = response.status, "Non-success status");
        }
        Ok(response)
    }

    /// Authenticated GET of `path` (which may carry its own query string)
    /// returning the decoded JSON body.
    pub fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.config.base_url, path.trim_start_matches('/'));
        let response = self.execute(HttpRequest::get(url))?;
        parse_body(&response)
    }

    pub fn reports(&self) -> ReportApi<'_> {
        ReportApi::new(self)
    }

    pub fn segments(&self) -> SegmentApi<'_> {
        SegmentApi::new(self)
    }

    pub fn advertisers(&self) -> AdvertiserApi<'_> {
        AdvertiserApi::new(self)
    }

    pub fn profiles(&self) -> ProfileApi<'_> {
        ProfileApi::new(self)
    }

    pub fn insertion_orders(&self) -> InsertionOrderApi<'_> {
        InsertionOrderApi::new(self)
    }

    pub fn line_items(&self) -> LineItemApi<'_> {
        LineItemApi::new(self)
    }
}

fn parse_login(response: &HttpResponse) -> Result<String> {
    let inner = parse_envelope(response)?;
    Ok(str_field(&inner, "token", "response.token")?.to_string())
}
