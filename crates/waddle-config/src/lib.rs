// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Waddle channel adapter.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides.
//!
//! # Usage
//!
//! ```no_run
//! use waddle_config::load_and_validate;
//!
//! let config = load_and_validate().expect("invalid configuration");
//! println!("Gateway: {}", config.gateway.api_root);
//! ```

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    CacheConfig, DeliveryConfig, GatewayConfig, MonitorConfig, WaddleConfig,
};
pub use validation::ConfigError;

/// Load configuration from the XDG hierarchy, then validate it.
///
/// The high-level entry point: merges TOML files plus env vars via Figment,
/// then runs the semantic checks. Returns either a valid `WaddleConfig` or
/// every collected error.
pub fn load_and_validate() -> Result<WaddleConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError::Other(err.to_string())]),
    }
}

/// Load configuration from an inline TOML string and validate it.
///
/// Useful for testing and embedding with an explicit configuration source.
pub fn load_and_validate_str(toml_content: &str) -> Result<WaddleConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError::Other(err.to_string())]),
    }
}
