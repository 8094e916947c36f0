//! Client configuration with eager validation.
//!
//! Configuration comes from the embedding application at construction time.
//! Validation happens before a client is handed out: an invalid configuration
//! never produces a connectable client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Configuration validation failed: {message}")]
    ValidationError { message: String },
}

/// Main configuration for a telemetry client instance.
///
/// Immutable after construction. `project_id`, `secret`, `host`, and `port`
/// are required; the rest carry defaults matching the collector's expectations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RumConfig {
    /// Project identifier assigned by the collector (must be positive)
    pub project_id: u32,
    /// Project signing secret (must be non-empty)
    pub secret: String,
    /// Collector host
    pub host: String,
    /// Collector port (must be positive)
    pub port: u16,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Automatically reconnect after an unexpected disconnect
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,
    /// Log recorded transport errors at an elevated level
    #[serde(default)]
    pub debug: bool,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

const fn default_auto_reconnect() -> bool {
    true
}

impl RumConfig {
    /// Create a configuration from the required fields, with defaults for the rest.
    pub fn new(
        project_id: u32,
        secret: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            project_id,
            secret: secret.into(),
            host: host.into(),
            port,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            auto_reconnect: true,
            debug: false,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::ValidationError`] naming the first field that
    /// fails validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_id == 0 {
            return Err(ConfigError::ValidationError {
                message: "project_id must be positive".to_owned(),
            });
        }
        if self.secret.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "secret must not be empty".to_owned(),
            });
        }
        if self.host.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "host must not be empty".to_owned(),
            });
        }
        if self.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "port must be positive".to_owned(),
            });
        }
        Ok(())
    }
}
