// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-backed loader that merges config layers into one `WaddleConfig`.
//!
//! Supports the XDG hierarchy: `./waddle.toml` > `~/.config/waddle/waddle.toml`
//! > `/etc/waddle/waddle.toml`, with environment variable overrides via the
//! `WADDLE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external, boxing would need a wrapper type

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WaddleConfig;

/// Load configuration from the XDG file hierarchy plus env var overrides.
///
/// Layers, later winning over earlier:
/// 1. Compiled-in defaults
/// 2. `/etc/waddle/waddle.toml` (system-wide)
/// 3. `~/.config/waddle/waddle.toml` (user XDG config)
/// 4. `./waddle.toml` (local directory)
/// 5. `WADDLE_*` environment variables
pub fn load_config() -> Result<WaddleConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaddleConfig::default()))
        .merge(Toml::file("/etc/waddle/waddle.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("waddle/waddle.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("waddle.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from an inline TOML string only (no XDG lookup).
///
/// Used for testing and embedding scenarios with an explicit config source.
pub fn load_config_from_str(toml_content: &str) -> Result<WaddleConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaddleConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file path plus env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WaddleConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaddleConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `WADDLE_GATEWAY_ACCESS_TOKEN` must map to
/// `gateway.access_token`, not `gateway.access.token`.
fn env_provider() -> Env {
    Env::prefixed("WADDLE_").map(|key| {
        // `key` is the lowercased env var name with the prefix stripped,
        // e.g. WADDLE_GATEWAY_API_ROOT -> "gateway_api_root".
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("gateway_", "gateway.", 1)
            .replacen("monitor_", "monitor.", 1)
            .replacen("delivery_", "delivery.", 1)
            .replacen("cache_", "cache.", 1);
        mapped.into()
    })
}
