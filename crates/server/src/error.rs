//! HTTP mapping for proxy errors.
//!
//! Locally detected client errors keep their exact message as the body.
//! Transport failures get a synthesized body prefixed with `upstream ` and a
//! gateway status, so they cannot be mistaken for a relayed upstream 4xx/5xx.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use repoproxy_core::Error;

use crate::response::ResponseEnvelope;

/// Error returned by request handlers.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] Error);

impl ApiError {
    /// The resolved path was empty.
    pub fn path_required() -> Self {
        ApiError(Error::InvalidInput("path required".into()))
    }

    pub fn not_found(path: &str) -> Self {
        ApiError(Error::RouteNotFound(path.into()))
    }

    fn envelope(&self) -> ResponseEnvelope {
        match &self.0 {
            Error::InvalidInput(msg) => ResponseEnvelope::text(StatusCode::BAD_REQUEST, msg.clone()),
            Error::RouteNotFound(_) => ResponseEnvelope::text(StatusCode::NOT_FOUND, "Not Found"),
            Error::UpstreamTimeout(msg) => {
                ResponseEnvelope::text(StatusCode::GATEWAY_TIMEOUT, format!("upstream timeout: {msg}"))
            }
            Error::UpstreamUnreachable(msg) => {
                ResponseEnvelope::text(StatusCode::BAD_GATEWAY, format!("upstream unreachable: {msg}"))
            }
            Error::CacheIo(_) | Error::CacheCorrupt(_) => {
                ResponseEnvelope::text(StatusCode::INTERNAL_SERVER_ERROR, "cache error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.envelope().into_response()
    }
}
