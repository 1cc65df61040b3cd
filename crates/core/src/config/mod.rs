//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (REPO_PROXY_*)
//! 2. TOML config file (if REPO_PROXY_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded value is immutable; the server wraps it in an `Arc` and hands
//! it to every component that needs it.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (REPO_PROXY_*)
/// 2. TOML config file (if REPO_PROXY_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Repository owner (user or organization).
    ///
    /// Set via REPO_PROXY_OWNER environment variable. Required.
    #[serde(default)]
    pub owner: String,

    /// Repository name.
    ///
    /// Set via REPO_PROXY_REPO environment variable. Required.
    #[serde(default)]
    pub repo: String,

    /// Branch served by the raw endpoint.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Path used by `/api/contents` when the request names none.
    #[serde(default)]
    pub base_path: String,

    /// Directory holding cached bodies and metadata records.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Freshness window for contents-API responses, in seconds.
    #[serde(default = "default_api_ttl_secs")]
    pub api_ttl_secs: u64,

    /// Freshness window for raw file responses, in seconds.
    #[serde(default = "default_raw_ttl_secs")]
    pub raw_ttl_secs: u64,

    /// Upstream request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional bearer token forwarded to the upstream.
    ///
    /// Set via REPO_PROXY_TOKEN environment variable.
    #[serde(default)]
    pub token: Option<String>,

    /// User-Agent string for upstream requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Listen address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the contents API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Base URL of the raw file host.
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
}

fn default_branch() -> String {
    "main".into()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_api_ttl_secs() -> u64 {
    300
}

fn default_raw_ttl_secs() -> u64 {
    86_400 // 24h
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "repo-proxy/0.1".into()
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    16974
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}

fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: default_branch(),
            base_path: String::new(),
            cache_dir: default_cache_dir(),
            api_ttl_secs: default_api_ttl_secs(),
            raw_ttl_secs: default_raw_ttl_secs(),
            timeout_secs: default_timeout_secs(),
            token: None,
            user_agent: default_user_agent(),
            host: default_host(),
            port: default_port(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
        }
    }
}

impl AppConfig {
    /// TTL applied to `/api/contents` lookups.
    pub fn api_ttl(&self) -> Duration {
        Duration::from_secs(self.api_ttl_secs)
    }

    /// TTL applied to `/raw` lookups.
    pub fn raw_ttl(&self) -> Duration {
        Duration::from_secs(self.raw_ttl_secs)
    }

    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Bearer token, if one is configured and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    /// `host:port` string suitable for binding a listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `REPO_PROXY_`
    /// 2. TOML file from `REPO_PROXY_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("REPO_PROXY_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("REPO_PROXY_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(&figment)
    }

    /// Extract and validate a configuration from an assembled figment.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
