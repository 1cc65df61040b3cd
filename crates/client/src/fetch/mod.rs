//! Upstream fetch pipeline.
//!
//! ### URL Construction
//! - Split logical paths on `/`, drop empty and dot segments, percent-encode each one
//! - Contents API: `{api_base}/repos/{owner}/{repo}/contents/{path}`
//! - Raw host: `{raw_base}/{owner}/{repo}/{branch}/{path}`
//!
//! ### Fetch Semantics
//! - Exactly one GET per call, bounded by the request timeout
//! - Upstream status, content type and body are returned verbatim, 4xx/5xx included
//! - Only transport failures (connect, timeout, truncated body) become errors
//! - No retry, backoff or circuit breaking

pub mod request;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use request::{CONTENTS_ACCEPT, Endpoint, UpstreamRequest};
pub use url::{UrlBuilder, encode_path, normalize_path};

use repoproxy_core::{AppConfig, Error};

/// Content type reported when the upstream sends none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "repo-proxy/0.1")
    pub user_agent: String,

    /// Default request timeout (default: 10s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "repo-proxy/0.1".to_string(), timeout: Duration::from_secs(10), max_redirects: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// Upstream response, mirrored as received.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,
}

/// Source of upstream responses.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Perform a single GET described by `request`.
    ///
    /// Any HTTP status is a successful result. Errors are reserved for
    /// transport failures.
    async fn fetch(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, Error>;
}

/// reqwest-backed upstream client.
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::UpstreamUnreachable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Upstream for FetchClient {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .get(&request.url)
            .headers(request.headers.clone())
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| transport_error(&request.url, &e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let body = response.bytes().await.map_err(|e| transport_error(&request.url, &e))?;

        tracing::debug!(
            url = %request.url,
            status,
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "upstream fetch complete"
        );

        Ok(UpstreamResponse { status, content_type, body })
    }
}

fn transport_error(url: &str, err: &reqwest::Error) -> Error {
    tracing::warn!(url, error = %err, "upstream transport failure");
    if err.is_timeout() {
        Error::UpstreamTimeout(format!("{url}: {err}"))
    } else {
        Error::UpstreamUnreachable(format!("{url}: {err}"))
    }
}
