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
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `cache_prefix` or `version` is empty
    /// - `dynamic_cache_limit` is 0
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if the static manifest is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(origin) => {
                return Err(ConfigError::Invalid {
                    field: "origin".into(),
                    reason: format!("unsupported scheme: {}", origin.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "origin".into(), reason: e.to_string() }),
        }

        if self.cache_prefix.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_prefix".into(), reason: "must not be empty".into() });
        }
        if self.version.is_empty() {
            return Err(ConfigError::Invalid { field: "version".into(), reason: "must not be empty".into() });
        }

        if self.static_assets.is_empty() {
            return Err(ConfigError::Missing {
                field: "static_assets".into(),
                hint: "list at least the root document".into(),
            });
        }

        if self.dynamic_cache_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "dynamic_cache_limit".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        let orphaned = self
            .critical_assets
            .iter()
            .filter(|asset| !self.static_assets.contains(asset))
            .count();
        if orphaned > 0 {
            tracing::warn!(
                orphaned,
                "critical_assets lists entries missing from static_assets; \
                 refresh will add them to the static cache anyway"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_relative_origin() {
        let config = AppConfig { origin: "/app/".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_non_http_origin() {
        let config = AppConfig { origin: "file:///srv/app/".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { version: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "version"));
    }

    #[test]
    fn test_validate_empty_manifest() {
        let config = AppConfig { static_assets: Vec::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "static_assets"));
    }

    #[test]
    fn test_validate_zero_cache_limit() {
        let config = AppConfig { dynamic_cache_limit: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "dynamic_cache_limit"));
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() }; // 5min 1sec
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, dynamic_cache_limit: 1, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
