//! Route definitions and CORS preflight handling.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Create the proxy router.
///
/// `/health` is an exact route. The proxy routes are prefix matches, which
/// the router's segment-based matching cannot express, so they are
/// dispatched from the fallback.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handler::health))
        .fallback(handler::dispatch)
        .method_not_allowed_fallback(handler::not_found)
        .layer(middleware::from_fn(preflight))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Answer `OPTIONS` on any path with a bodiless 204 and CORS headers.
///
/// Handled here instead of `tower_http::cors::CorsLayer`, which answers
/// preflight with 200 and only when `Origin` and
/// `Access-Control-Request-Method` are present.
pub async fn preflight(request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    (
        StatusCode::NO_CONTENT,
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"),
            (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Authorization"),
        ],
    )
        .into_response()
}
