//! Upstream client code for repo-proxy.
//!
//! This crate provides path encoding, upstream URL construction, per-endpoint
//! request policy and the single-attempt HTTP fetcher used by the server.

pub mod fetch;

pub use fetch::{
    CONTENTS_ACCEPT, DEFAULT_CONTENT_TYPE, Endpoint, FetchClient, FetchConfig, Upstream, UpstreamRequest,
    UpstreamResponse, UrlBuilder, encode_path, normalize_path,
};
