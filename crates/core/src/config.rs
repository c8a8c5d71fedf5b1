//! Configuration for trace-context injection
//!
//! The surface is deliberately small: a master switch, the context key the
//! bindings write, and the filter directive used when a binding installs
//! its own subscriber.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::is_log_safe;

/// Context key used when none is configured
pub const DEFAULT_CONTEXT_KEY: &str = "trace_id";

/// Errors produced by [`InjectionConfig::validate`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid context key {0:?}: must be non-empty without whitespace or control characters")]
    InvalidKey(String),
}

/// Injection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionConfig {
    /// Master switch for the lifecycle hook
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Context key the bindings write (e.g. "trace_id")
    #[serde(default = "default_key")]
    pub key: String,
    /// Log level filter used when a binding installs a subscriber
    /// (e.g. "info", "debug", "tracelink=trace")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_enabled() -> bool {
    true
}

fn default_key() -> String {
    DEFAULT_CONTEXT_KEY.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            key: default_key(),
            log_level: default_log_level(),
        }
    }
}

impl InjectionConfig {
    /// Create configuration from environment variables
    ///
    /// Supports the following environment variables:
    /// - `TRACELINK_ENABLED`: "0"/"false" disables the hook
    /// - `TRACELINK_KEY`: context key to write
    /// - `RUST_LOG`: log level filter
    pub fn from_env() -> Self {
        let enabled = std::env::var("TRACELINK_ENABLED")
            .map(|v| !matches!(v.as_str(), "0" | "false" | "FALSE" | "off"))
            .unwrap_or(true);

        let key = std::env::var("TRACELINK_KEY").unwrap_or_else(|_| default_key());

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| default_log_level());

        Self {
            enabled,
            key,
            log_level,
        }
    }

    /// Check that the configured key can sit inside a `key=value` log field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key.is_empty() || !is_log_safe(&self.key) {
            return Err(ConfigError::InvalidKey(self.key.clone()));
        }
        Ok(())
    }
}
