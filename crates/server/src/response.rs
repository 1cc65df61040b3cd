//! Response envelope and HTTP shaping.
//!
//! Every non-preflight response goes through [`ResponseEnvelope`], which sets
//! `Content-Type`, `Content-Length`, `Access-Control-Allow-Origin: *` and the
//! `X-Cache` signal.

use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use repoproxy_client::DEFAULT_CONTENT_TYPE;

/// Cache signal header.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Content type of locally generated responses.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// A fully buffered response plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,
    pub from_cache: bool,
}

impl ResponseEnvelope {
    /// Plain-text response generated by the proxy itself.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            content_type: TEXT_PLAIN.to_string(),
            body: Bytes::from(body.into()),
            from_cache: false,
        }
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        let content_type = HeaderValue::from_str(&self.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        let content_length = HeaderValue::from(self.body.len());
        let cache = HeaderValue::from_static(if self.from_cache { "HIT" } else { "MISS" });

        let mut response = (status, self.body).into_response();
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, content_type);
        headers.insert(CONTENT_LENGTH, content_length);
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(X_CACHE, cache);
        response
    }
}
