// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background loops: gateway health probing and periodic contact refresh.
//!
//! The health monitor owns the [`ConnectionState`] watch channel; it is the
//! only writer. A healthy probe requires the gateway to report both `good`
//! and `online`. Any failure class stretches the probe interval to the
//! backoff interval until the gateway recovers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use waddle_config::MonitorConfig;
use waddle_core::error::WaddleError;
use waddle_core::state::ConnectionState;
use waddle_gateway::Gateway;

use crate::cache::CacheStore;
use crate::delivery::{Alerter, AlertThrottle};

/// Probes gateway health on a fixed cadence and publishes the resulting
/// [`ConnectionState`].
pub struct HealthMonitor {
    gateway: Arc<dyn Gateway>,
    state: watch::Sender<ConnectionState>,
    alerter: Alerter,
    /// Shared with the offline gate so probe failures and gated sends count
    /// against the same alert budget.
    throttle: Arc<AlertThrottle>,
    probe_interval: Duration,
    backoff_interval: Duration,
}

impl HealthMonitor {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        state: watch::Sender<ConnectionState>,
        alerter: Alerter,
        throttle: Arc<AlertThrottle>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            gateway,
            state,
            alerter,
            throttle,
            probe_interval: Duration::from_secs(config.probe_interval_secs),
            backoff_interval: Duration::from_secs(config.backoff_interval_secs),
        }
    }

    /// One probe cycle. Returns how long to wait before the next one.
    pub async fn probe_once(&self) -> Duration {
        match self.gateway.get_status().await {
            Ok(status) if status.good && status.online => {
                self.set_state(ConnectionState::ConnectedLoggedIn);
                self.throttle.reset();
                debug!("gateway healthy");
                self.probe_interval
            }
            Ok(status) => {
                self.set_state(ConnectionState::ConnectedNotLoggedIn);
                warn!(
                    online = status.online,
                    good = status.good,
                    "gateway reachable but account unusable"
                );
                if self.throttle.fire() {
                    self.alerter
                        .alert(
                            "The QQ account is not logged in.\n\
                             Please log in through the gateway client.",
                        )
                        .await;
                }
                self.backoff_interval
            }
            Err(err @ WaddleError::TransportUnreachable { .. }) => {
                self.set_state(ConnectionState::Disconnected);
                warn!(error = %err, "gateway unreachable");
                if self.throttle.fire() {
                    self.alerter
                        .alert(&format!(
                            "We're unable to communicate with the gateway client.\n\
                             Please check the connection and credentials provided.\n{err}"
                        ))
                        .await;
                }
                self.backoff_interval
            }
            Err(err) => {
                self.set_state(ConnectionState::ConnectedNotLoggedIn);
                warn!(error = %err, "status probe failed");
                if self.throttle.fire() {
                    self.alerter
                        .alert(&format!(
                            "The gateway API responded with an error during the status probe.\n\
                             Please check the gateway client logs.\n{err}"
                        ))
                        .await;
                }
                self.backoff_interval
            }
        }
    }

    pub async fn run(self, token: CancellationToken) {
        loop {
            let next = self.probe_once().await;
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(next) => {}
            }
        }
        debug!("health monitor stopped");
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = *self.state.borrow();
        if prev != next {
            info!(?prev, ?next, "gateway connection state changed");
            metrics::counter!("waddle_connection_transitions_total").increment(1);
            self.state.send_replace(next);
        }
    }
}

/// Refreshes the friend and group tables on a fixed cadence while the
/// gateway is online. Carries its own alert budget, separate from the health
/// monitor's.
pub struct ContactRefresher {
    gateway: Arc<dyn Gateway>,
    cache: Arc<CacheStore>,
    state: watch::Receiver<ConnectionState>,
    alerter: Alerter,
    throttle: AlertThrottle,
    interval: Duration,
}

impl ContactRefresher {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        cache: Arc<CacheStore>,
        state: watch::Receiver<ConnectionState>,
        alerter: Alerter,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            gateway,
            cache,
            state,
            alerter,
            throttle: AlertThrottle::new(config.alert_threshold),
            interval: Duration::from_secs(config.contact_refresh_interval_secs),
        }
    }

    /// One refresh cycle; a no-op while the gateway is not fully online.
    pub async fn refresh_once(&self) {
        if !self.state.borrow().is_online() {
            debug!("skipping contact refresh while offline");
            return;
        }
        let gateway = self.gateway.as_ref();
        let result = match self.cache.refresh_friends(gateway).await {
            Ok(()) => self.cache.refresh_groups(gateway).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => {
                debug!("contact tables refreshed");
                self.throttle.reset();
            }
            Err(err) => {
                // Retcode 104 is the gateway's expired-session code and gets
                // its own actionable alert on top of the generic one.
                if matches!(
                    err,
                    WaddleError::ApiFailure {
                        status: 200,
                        retcode: 104,
                        ..
                    }
                ) && self.throttle.is_open()
                {
                    self.alerter
                        .alert(
                            "The gateway session has expired.\n\
                             Please log in to the QQ client again to refresh it.",
                        )
                        .await;
                }
                warn!(error = %err, "contact refresh failed");
                if self.throttle.fire() {
                    self.alerter
                        .alert(&format!("Errors occurred while refreshing contacts: {err}"))
                        .await;
                }
            }
        }
    }

    pub async fn run(self, token: CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
            self.refresh_once().await;
        }
        debug!("contact refresher stopped");
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use waddle_core::sink::ForwardSink;
    use waddle_gateway::types::FriendEntry;
    use waddle_test_utils::{CaptureSink, MockGateway, ScriptedStatus};

    use crate::delivery::DeliveryPool;

    use super::*;

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            probe_interval_secs: 300,
            backoff_interval_secs: 3600,
            contact_refresh_interval_secs: 1800,
            alert_threshold: 3,
        }
    }

    fn monitor(
        gateway: Arc<MockGateway>,
        sink: &Arc<CaptureSink>,
    ) -> (HealthMonitor, watch::Receiver<ConnectionState>) {
        let (tx, rx) = watch::channel(ConnectionState::Unknown);
        let pool = DeliveryPool::start(
            Arc::clone(sink) as Arc<dyn ForwardSink>,
            &waddle_config::DeliveryConfig::default(),
            CancellationToken::new(),
        );
        let monitor = HealthMonitor::new(
            gateway as Arc<dyn Gateway>,
            tx,
            Alerter::new(pool),
            Arc::new(AlertThrottle::new(3)),
            &test_config(),
        );
        (monitor, rx)
    }

    #[tokio::test]
    async fn healthy_probe_sets_logged_in_at_probe_interval() {
        let gateway = Arc::new(MockGateway::new());
        let sink = Arc::new(CaptureSink::new());
        let (monitor, state) = monitor(Arc::clone(&gateway), &sink);

        let next = monitor.probe_once().await;

        assert_eq!(*state.borrow(), ConnectionState::ConnectedLoggedIn);
        assert_eq!(next, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn reachable_but_offline_account_is_not_logged_in() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_status(ScriptedStatus::Flagged {
            online: true,
            good: false,
        });
        let sink = Arc::new(CaptureSink::new());
        let (monitor, state) = monitor(Arc::clone(&gateway), &sink);

        let next = monitor.probe_once().await;

        assert_eq!(*state.borrow(), ConnectionState::ConnectedNotLoggedIn);
        assert_eq!(next, Duration::from_secs(3600));
        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(1))
            .await
            .unwrap();
        assert!(sink.messages()[0].text.contains("not logged in"));
    }

    #[tokio::test]
    async fn transport_failure_disconnects_and_alerts() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_status(ScriptedStatus::Unreachable);
        let sink = Arc::new(CaptureSink::new());
        let (monitor, state) = monitor(Arc::clone(&gateway), &sink);

        monitor.probe_once().await;

        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(1))
            .await
            .unwrap();
        assert!(
            sink.messages()[0]
                .text
                .starts_with("We're unable to communicate with the gateway client.")
        );
    }

    #[tokio::test]
    async fn alerts_stop_after_three_consecutive_failures() {
        let gateway = Arc::new(MockGateway::new());
        for _ in 0..5 {
            gateway.queue_status(ScriptedStatus::Unreachable);
        }
        let sink = Arc::new(CaptureSink::new());
        let (monitor, _state) = monitor(Arc::clone(&gateway), &sink);

        for _ in 0..5 {
            monitor.probe_once().await;
        }

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(3))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.messages().len(), 3);
    }

    #[tokio::test]
    async fn healthy_probe_reopens_the_alert_budget() {
        let gateway = Arc::new(MockGateway::new());
        for _ in 0..3 {
            gateway.queue_status(ScriptedStatus::Unreachable);
        }
        gateway.queue_status(ScriptedStatus::Healthy);
        gateway.queue_status(ScriptedStatus::Unreachable);
        let sink = Arc::new(CaptureSink::new());
        let (monitor, _state) = monitor(Arc::clone(&gateway), &sink);

        for _ in 0..5 {
            monitor.probe_once().await;
        }

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(4))
            .await
            .unwrap();
        assert_eq!(sink.messages().len(), 4);
    }

    fn refresher(
        gateway: Arc<MockGateway>,
        sink: &Arc<CaptureSink>,
        state: ConnectionState,
    ) -> (ContactRefresher, Arc<CacheStore>) {
        let (_tx, rx) = watch::channel(state);
        let cache = Arc::new(CacheStore::new(Duration::from_secs(3600)));
        // Single worker keeps alert ordering deterministic.
        let pool = DeliveryPool::start(
            Arc::clone(sink) as Arc<dyn ForwardSink>,
            &waddle_config::DeliveryConfig {
                queue_capacity: 16,
                workers: 1,
            },
            CancellationToken::new(),
        );
        let refresher = ContactRefresher::new(
            gateway as Arc<dyn Gateway>,
            Arc::clone(&cache),
            rx,
            Alerter::new(pool),
            &test_config(),
        );
        (refresher, cache)
    }

    #[tokio::test]
    async fn refresh_skipped_while_offline() {
        let gateway = Arc::new(MockGateway::new());
        let sink = Arc::new(CaptureSink::new());
        let (refresher, _cache) =
            refresher(Arc::clone(&gateway), &sink, ConnectionState::Disconnected);

        refresher.refresh_once().await;

        assert_eq!(gateway.calls.friend_list(), 0);
        assert_eq!(gateway.calls.group_list(), 0);
    }

    #[tokio::test]
    async fn refresh_populates_tables_when_online() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_friends(vec![FriendEntry {
            user_id: 1,
            nickname: "a".into(),
            remark: String::new(),
        }]);
        let sink = Arc::new(CaptureSink::new());
        let (refresher, cache) = refresher(
            Arc::clone(&gateway),
            &sink,
            ConnectionState::ConnectedLoggedIn,
        );

        refresher.refresh_once().await;

        assert_eq!(cache.friends_snapshot().len(), 1);
        assert_eq!(gateway.calls.friend_list(), 1);
        assert_eq!(gateway.calls.group_list(), 1);
    }

    #[tokio::test]
    async fn expired_session_code_raises_both_alerts() {
        let gateway = Arc::new(MockGateway::new());
        gateway.fail_friend_list_code(200, 104);
        let sink = Arc::new(CaptureSink::new());
        let (refresher, _cache) = refresher(
            Arc::clone(&gateway),
            &sink,
            ConnectionState::ConnectedLoggedIn,
        );

        refresher.refresh_once().await;

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(2))
            .await
            .unwrap();
        let messages = sink.messages();
        assert!(messages[0].text.contains("session has expired"));
        assert!(messages[1].text.contains("refreshing contacts"));
    }

    #[tokio::test]
    async fn generic_refresh_failure_raises_one_alert_per_cycle() {
        let gateway = Arc::new(MockGateway::new());
        gateway.fail_friend_list();
        let sink = Arc::new(CaptureSink::new());
        let (refresher, _cache) = refresher(
            Arc::clone(&gateway),
            &sink,
            ConnectionState::ConnectedLoggedIn,
        );

        for _ in 0..5 {
            refresher.refresh_once().await;
        }

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(3))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.messages().len(), 3);
    }
}
