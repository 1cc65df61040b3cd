//! Application state shared across handlers.

use std::sync::Arc;

use repoproxy_core::AppConfig;

use crate::proxy::CachingProxy;

/// Immutable configuration plus the caching proxy. No other in-memory state
/// is shared between requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub proxy: CachingProxy,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, proxy: CachingProxy) -> Self {
        Self { config, proxy }
    }
}
