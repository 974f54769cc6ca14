// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway connection state as observed by the health monitor.

use serde::{Deserialize, Serialize};

/// Connection health of the gateway and the QQ account behind it.
///
/// Transitions are driven solely by the health monitor; everything else only
/// reads the current value to decide whether gateway calls are worth
/// attempting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No probe has completed yet.
    #[default]
    Unknown,
    /// Gateway reachable and the account is logged in.
    ConnectedLoggedIn,
    /// Gateway reachable but the account is not usable.
    ConnectedNotLoggedIn,
    /// Gateway unreachable at the transport level.
    Disconnected,
}

impl ConnectionState {
    /// Whether outbound gateway calls are expected to succeed.
    pub fn is_online(self) -> bool {
        matches!(self, ConnectionState::ConnectedLoggedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_logged_in_counts_as_online() {
        assert!(ConnectionState::ConnectedLoggedIn.is_online());
        assert!(!ConnectionState::ConnectedNotLoggedIn.is_online());
        assert!(!ConnectionState::Disconnected.is_online());
        assert!(!ConnectionState::Unknown.is_online());
    }

    #[test]
    fn default_is_unknown() {
        assert_eq!(ConnectionState::default(), ConnectionState::Unknown);
    }
}
