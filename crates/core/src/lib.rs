//! Core types and shared functionality for repo-proxy.
//!
//! This crate provides:
//! - Disk-backed response cache keyed by upstream URL digest
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheEntry, CacheStore, SaveOutcome};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
