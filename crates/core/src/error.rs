//! Unified error types for repo-proxy.
//!
//! Variants follow the proxy's failure taxonomy. Cache defects exist only
//! inside the cache layer; they are downgraded to a miss or an ignored save
//! before reaching a caller.

use std::io;

/// Unified error types for the repo-proxy server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request could not be resolved to a repository path.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No route is mapped to the request path.
    #[error("ROUTE_NOT_FOUND: {0}")]
    RouteNotFound(String),

    /// The upstream call exceeded its timeout.
    #[error("UPSTREAM_TIMEOUT: {0}")]
    UpstreamTimeout(String),

    /// The upstream could not be reached or its response could not be read.
    #[error("UPSTREAM_UNREACHABLE: {0}")]
    UpstreamUnreachable(String),

    /// Filesystem failure while reading or writing a cache artifact.
    #[error("CACHE_ERROR: {0}")]
    CacheIo(#[from] io::Error),

    /// A cache metadata record failed validation.
    #[error("CACHE_ERROR: corrupt metadata: {0}")]
    CacheCorrupt(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CacheCorrupt(err.to_string())
    }
}
