// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Waddle channel adapter.
//!
//! Every struct carries `#[serde(deny_unknown_fields)]` so a misspelled key
//! fails at startup instead of being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level Waddle configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to values that
/// work against a gateway on localhost.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WaddleConfig {
    /// Gateway endpoint and authentication settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Health-probe and contact-refresh loop settings.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Framework delivery queue settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Identity cache staleness settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Gateway endpoint and authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Base URL of the gateway's HTTP API.
    #[serde(default = "default_api_root")]
    pub api_root: String,

    /// Bearer access token, if the gateway requires one.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_root: default_api_root(),
            access_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_api_root() -> String {
    "http://127.0.0.1:5700".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Health-probe and contact-refresh loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Liveness probe interval in seconds while healthy.
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,

    /// Probe interval in seconds after any failure class.
    #[serde(default = "default_backoff_interval_secs")]
    pub backoff_interval_secs: u64,

    /// Friend/group contact refresh interval in seconds.
    #[serde(default = "default_contact_refresh_interval_secs")]
    pub contact_refresh_interval_secs: u64,

    /// Consecutive alerts sent per failure category before going silent.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: default_probe_interval_secs(),
            backoff_interval_secs: default_backoff_interval_secs(),
            contact_refresh_interval_secs: default_contact_refresh_interval_secs(),
            alert_threshold: default_alert_threshold(),
        }
    }
}

fn default_probe_interval_secs() -> u64 {
    300
}

fn default_backoff_interval_secs() -> u64 {
    3600
}

fn default_contact_refresh_interval_secs() -> u64 {
    1800
}

fn default_alert_threshold() -> u32 {
    3
}

/// Framework delivery queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Bounded capacity of the delivery work queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Number of delivery workers draining the queue.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            workers: default_workers(),
        }
    }
}

fn default_queue_capacity() -> usize {
    512
}

fn default_workers() -> usize {
    4
}

/// Identity cache staleness configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Group member roster time-to-live in seconds.
    #[serde(default = "default_member_ttl_secs")]
    pub member_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            member_ttl_secs: default_member_ttl_secs(),
        }
    }
}

fn default_member_ttl_secs() -> u64 {
    3600
}
