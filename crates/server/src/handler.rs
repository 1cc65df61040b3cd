//! Request handlers.
//!
//! Proxy routes are matched by plain prefix: `/api/contents...` and
//! `/raw...`, so `/rawfoo` asks for raw path `foo`.
//!
//! Path resolution: a segment embedded after the route prefix
//! (percent-decoded) wins over a `path` query parameter. The contents route
//! falls back to the configured base path; the raw route has no fallback.
//! The result is normalized (empty, `.` and `..` segments dropped) and an
//! empty path is a 400.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use repoproxy_client::normalize_path;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::response::ResponseEnvelope;
use crate::state::AppState;

pub const CONTENTS_PREFIX: &str = "/api/contents";
pub const RAW_PREFIX: &str = "/raw";

/// Resolve the logical path named by a request.
///
/// Returns an empty string when neither an embedded segment nor a non-blank
/// `path` query parameter is present.
pub fn resolve_path(request_path: &str, prefix: &str, query: Option<&str>) -> String {
    let remainder = request_path.strip_prefix(prefix).unwrap_or_default().trim_start_matches('/');
    if !remainder.is_empty() {
        return String::from_utf8_lossy(&urlencoding::decode_binary(remainder.as_bytes())).into_owned();
    }

    query
        .and_then(|q| {
            form_urlencoded::parse(q.as_bytes())
                .find(|(key, value)| key == "path" && !value.is_empty())
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_default()
}

/// `GET /health`
pub async fn health() -> ResponseEnvelope {
    ResponseEnvelope::text(StatusCode::OK, "ok")
}

/// Prefix dispatch for everything other than `/health`.
pub async fn dispatch(state: State<Arc<AppState>>, method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return not_found(uri).await.into_response();
    }

    let path = uri.path();
    if path.starts_with(CONTENTS_PREFIX) {
        contents(state, uri).await.into_response()
    } else if path.starts_with(RAW_PREFIX) {
        raw(state, uri).await.into_response()
    } else {
        not_found(uri).await.into_response()
    }
}

/// `GET /api/contents[...]`
pub async fn contents(State(state): State<Arc<AppState>>, uri: Uri) -> Result<ResponseEnvelope, ApiError> {
    let mut path = resolve_path(uri.path(), CONTENTS_PREFIX, uri.query());
    if path.is_empty() {
        path.clone_from(&state.config.base_path);
    }

    let path = normalize_path(&path);
    if path.is_empty() {
        return Err(ApiError::path_required());
    }

    Ok(state.proxy.contents(&path).await?)
}

/// `GET /raw[...]`
pub async fn raw(State(state): State<Arc<AppState>>, uri: Uri) -> Result<ResponseEnvelope, ApiError> {
    let path = normalize_path(&resolve_path(uri.path(), RAW_PREFIX, uri.query()));
    if path.is_empty() {
        return Err(ApiError::path_required());
    }

    Ok(state.proxy.raw(&path).await?)
}

/// Anything unmapped, including unsupported methods on mapped paths.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(uri.path())
}
