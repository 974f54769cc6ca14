// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared across the Waddle workspace.

use thiserror::Error;

/// The primary error type used across gateway calls and the event pipeline.
#[derive(Debug, Error)]
pub enum WaddleError {
    /// The gateway endpoint could not be reached at the transport level.
    #[error("gateway unreachable: {message}")]
    TransportUnreachable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The gateway answered but reported an API-level failure.
    ///
    /// `status` is the HTTP status code; `retcode` the gateway's own return
    /// code from the response body. Both are kept so callers can tell e.g.
    /// an expired-cookie failure (200/104) from a hard rejection.
    #[error("gateway API failure (status {status}, retcode {retcode}): {message}")]
    ApiFailure {
        message: String,
        status: u16,
        retcode: i64,
    },

    /// The gateway is reachable but the QQ account behind it is not usable.
    #[error("gateway client is offline or not logged in")]
    GatewayOffline,

    /// The requested operation cannot be performed through the gateway.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The caller is not allowed to perform this operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A chat uid did not parse to a known chat kind and numeric id.
    #[error("no chat found for uid `{uid}`")]
    IdentityNotFound { uid: String },

    /// Configuration errors (invalid values, malformed files).
    #[error("configuration error: {0}")]
    Config(String),

    /// Invariant violations that indicate a bug rather than a runtime fault.
    #[error("internal error: {0}")]
    Internal(String),
}
