//! Engine configuration.
//!
//! TOML-backed with serde defaults, so a partial file (or none at all)
//! yields the fixed production values.

use crate::{PolicyError, PolicyErrorKind, PolicyResult, RateLimitConfig};
use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::PolicyEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Service targeted when a request names none ("restart the bot")
    #[serde(default = "default_service")]
    pub default_service: String,

    /// Timeout handed to the external executor, milliseconds
    #[serde(default = "default_execution_timeout_ms")]
    pub execution_timeout_ms: u64,

    /// Approval decision timeout, milliseconds
    #[serde(default = "default_approval_timeout_ms")]
    pub approval_timeout_ms: u64,

    /// Per-user rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_service() -> String {
    "bot".to_string()
}

fn default_execution_timeout_ms() -> u64 {
    30_000
}

fn default_approval_timeout_ms() -> u64 {
    60_000
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            default_service: default_service(),
            execution_timeout_ms: default_execution_timeout_ms(),
            approval_timeout_ms: default_approval_timeout_ms(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl PolicyConfig {
    /// Parse a TOML document, filling omitted fields with defaults.
    pub fn from_toml(input: &str) -> PolicyResult<Self> {
        toml::from_str(input).map_err(|e| {
            PolicyError::new(PolicyErrorKind::Configuration(format!(
                "invalid policy config: {}",
                e
            )))
        })
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> PolicyResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            PolicyError::new(PolicyErrorKind::Configuration(format!(
                "failed to serialize policy config: {}",
                e
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PolicyConfig::default();
        assert_eq!(config.default_service, "bot");
        assert_eq!(config.approval_timeout_ms, 60_000);
        assert_eq!(config.rate_limit.max_commands, 10);
        assert_eq!(config.rate_limit.window_ms, 3_600_000);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = PolicyConfig::from_toml("default_service = \"nginx\"").unwrap();
        assert_eq!(config.default_service, "nginx");
        assert_eq!(config.approval_timeout_ms, 60_000);
        assert_eq!(config.rate_limit.max_commands, 10);
    }

    #[test]
    fn test_nested_override() {
        let config = PolicyConfig::from_toml(
            "[rate_limit]\nmax_commands = 3\nwindow_ms = 1000\n",
        )
        .unwrap();
        assert_eq!(config.rate_limit.max_commands, 3);
        assert_eq!(config.rate_limit.window_ms, 1000);
    }

    #[test]
    fn test_roundtrip() {
        let config = PolicyConfig::default();
        let toml = config.to_toml().unwrap();
        assert_eq!(PolicyConfig::from_toml(&toml).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let err = PolicyConfig::from_toml("default_service = [").unwrap_err();
        assert!(matches!(err.kind, PolicyErrorKind::Configuration(_)));
    }
}
