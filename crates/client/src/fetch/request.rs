//! Per-endpoint request policy.
//!
//! The two upstream endpoints differ in freshness window and in headers: the
//! contents API asks for its structured JSON media type, the raw host gets no
//! `Accept` override.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use repoproxy_core::AppConfig;

/// Media type requested from the contents API.
pub const CONTENTS_ACCEPT: &str = "application/vnd.github+json";

/// Logical upstream endpoint invoked by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Contents,
    Raw,
}

impl Endpoint {
    /// TTL selected for lookups made through this endpoint.
    pub fn ttl(self, config: &AppConfig) -> Duration {
        match self {
            Endpoint::Contents => config.api_ttl(),
            Endpoint::Raw => config.raw_ttl(),
        }
    }

    /// Headers sent upstream for this endpoint.
    pub fn headers(self, config: &AppConfig) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(value) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, value);
        }

        if let Some(token) = config.token()
            && let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {token}"))
        {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        if self == Endpoint::Contents {
            headers.insert(ACCEPT, HeaderValue::from_static(CONTENTS_ACCEPT));
        }

        headers
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Contents => "contents",
            Endpoint::Raw => "raw",
        }
    }
}

/// A single upstream GET.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub timeout: Duration,
}

impl UpstreamRequest {
    /// Describe a request to `url` through `endpoint`.
    pub fn new(endpoint: Endpoint, url: String, config: &AppConfig) -> Self {
        Self { url, headers: endpoint.headers(config), timeout: config.timeout() }
    }
}
