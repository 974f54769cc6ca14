// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks applied after deserialization.
//!
//! Covers constraints serde attributes cannot express, such as a well-formed
//! gateway URL and non-zero worker counts.

use thiserror::Error;

use crate::model::WaddleConfig;

/// A configuration error surfaced by semantic validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A validation error for a config value.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    Other(String),
}

/// Check a deserialized configuration against the semantic constraints.
///
/// Collects every violation rather than failing on the first, so the
/// operator sees the whole list at once.
pub fn validate_config(config: &WaddleConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let api_root = config.gateway.api_root.trim();
    if api_root.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.api_root must not be empty".to_string(),
        });
    } else if !api_root.starts_with("http://") && !api_root.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("gateway.api_root `{api_root}` must be an http(s) URL"),
        });
    }

    if config.gateway.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.request_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.monitor.probe_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "monitor.probe_interval_secs must be at least 1".to_string(),
        });
    }

    if config.monitor.backoff_interval_secs < config.monitor.probe_interval_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "monitor.backoff_interval_secs ({}) must not be shorter than monitor.probe_interval_secs ({})",
                config.monitor.backoff_interval_secs, config.monitor.probe_interval_secs
            ),
        });
    }

    if config.monitor.alert_threshold == 0 {
        errors.push(ConfigError::Validation {
            message: "monitor.alert_threshold must be at least 1".to_string(),
        });
    }

    if config.delivery.queue_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.queue_capacity must be at least 1".to_string(),
        });
    }

    if config.delivery.workers == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.workers must be at least 1".to_string(),
        });
    }

    if config.cache.member_ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "cache.member_ttl_secs must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
