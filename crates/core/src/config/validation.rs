//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `owner` or `repo` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `owner`, `repo` or `branch` is empty or contains `/`
    /// - `timeout_secs` is 0 or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `api_base` or `raw_base` is not an http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.is_empty() {
            return Err(ConfigError::Missing {
                field: "owner".into(),
                hint: "Set REPO_PROXY_OWNER environment variable".into(),
            });
        }
        if self.repo.is_empty() {
            return Err(ConfigError::Missing {
                field: "repo".into(),
                hint: "Set REPO_PROXY_REPO environment variable".into(),
            });
        }

        for (field, value) in [("owner", &self.owner), ("repo", &self.repo), ("branch", &self.branch)] {
            if value.is_empty() {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() });
            }
            if value.contains('/') {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not contain '/'".into() });
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid { field: "timeout_secs".into(), reason: "must be at least 1s".into() });
        }
        if self.timeout_secs > 300 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs".into(),
                reason: "must not exceed 5 minutes (300s)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        for (field, value) in [("api_base", &self.api_base), ("raw_base", &self.raw_base)] {
            let parsed =
                url::Url::parse(value).map_err(|e| ConfigError::Invalid { field: field.into(), reason: e.to_string() })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: format!("unsupported scheme: {}", parsed.scheme()),
                });
            }
        }

        if self.api_ttl_secs == 0 || self.raw_ttl_secs == 0 {
            tracing::warn!(
                api_ttl_secs = self.api_ttl_secs,
                raw_ttl_secs = self.raw_ttl_secs,
                "A TTL of 0 only serves entries written within the same second"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        AppConfig { owner: "acme".into(), repo: "docs".into(), ..Default::default() }
    }

    #[test]
    fn test_validate_minimal_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_repo() {
        let config = AppConfig { repo: String::new(), ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "repo"));
    }

    #[test]
    fn test_validate_owner_with_slash() {
        let config = AppConfig { owner: "acme/evil".into(), ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "owner"));
    }

    #[test]
    fn test_validate_empty_branch() {
        let config = AppConfig { branch: String::new(), ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "branch"));
    }

    #[test]
    fn test_validate_timeout_zero() {
        let config = AppConfig { timeout_secs: 0, ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_secs"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_secs: 301, ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_secs"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_bad_api_base() {
        let config = AppConfig { api_base: "not a url".into(), ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_base"));
    }

    #[test]
    fn test_validate_non_http_raw_base() {
        let config = AppConfig { raw_base: "ftp://files.example.com".into(), ..valid() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "raw_base"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { timeout_secs: 1, ..valid() };
        assert!(config.validate().is_ok());

        let config = AppConfig { timeout_secs: 300, api_base: "http://127.0.0.1:9000".into(), ..valid() };
        assert!(config.validate().is_ok());
    }
}
