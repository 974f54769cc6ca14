// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! QQ channel adapter: the pipeline between a CoolQ-compatible gateway and
//! the message-forwarding framework.
//!
//! [`QqChannel`] owns the whole assembly. Inbound gateway events are
//! resolved against the identity cache, flattened into framework messages,
//! and pushed through a bounded delivery pool. Outbound framework messages
//! are rendered to gateway calls. A health monitor drives a connection-state
//! watch channel that gates all gateway traffic while the account is
//! offline.

pub mod cache;
pub mod delivery;
pub mod emoji;
pub mod events;
pub mod flatten;
pub mod gate;
pub mod monitor;
pub mod outbound;
pub mod resolver;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use waddle_config::WaddleConfig;
use waddle_core::error::WaddleError;
use waddle_core::identity::{ChatIdentity, ChatKind, ChatUid, MessageUid};
use waddle_core::message::{
    GroupRequestKind, OutgoingMessage, RecallRequest, RequestDecision,
};
use waddle_core::sink::ForwardSink;
use waddle_core::state::ConnectionState;
use waddle_gateway::event::{MessageEvent, NoticeEvent, RequestEvent};
use waddle_gateway::Gateway;

use crate::cache::CacheStore;
use crate::delivery::{Alerter, AlertThrottle, DeliveryPool};
use crate::events::InboundHandler;
use crate::flatten::SegmentFlattener;
use crate::gate::GatedGateway;
use crate::monitor::{ContactRefresher, HealthMonitor};
use crate::outbound::OutboundDispatcher;
use crate::resolver::{ChatResolver, ResolveContext};

/// The assembled channel: background loops, caches, and the event pipeline.
///
/// Dropping the channel does not stop its background tasks; call
/// [`QqChannel::shutdown`] to cancel them.
pub struct QqChannel {
    cache: Arc<CacheStore>,
    gateway: Arc<dyn Gateway>,
    resolver: ChatResolver,
    inbound: InboundHandler,
    outbound: OutboundDispatcher,
    alerter: Alerter,
    state: watch::Receiver<ConnectionState>,
    token: CancellationToken,
}

impl QqChannel {
    /// Wires the pipeline and spawns the delivery pool, health monitor, and
    /// contact refresher. Must be called inside a tokio runtime.
    pub fn start(
        config: &WaddleConfig,
        gateway: Arc<dyn Gateway>,
        sink: Arc<dyn ForwardSink>,
    ) -> Self {
        let token = CancellationToken::new();
        let pool = DeliveryPool::start(sink, &config.delivery, token.child_token());
        let alerter = Alerter::new(pool.clone());
        let throttle = Arc::new(AlertThrottle::new(config.monitor.alert_threshold));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Unknown);
        let cache = Arc::new(CacheStore::new(Duration::from_secs(
            config.cache.member_ttl_secs,
        )));

        // The monitor and refresher probe the raw gateway; everything else
        // goes through the offline gate.
        let monitor = HealthMonitor::new(
            Arc::clone(&gateway),
            state_tx,
            alerter.clone(),
            Arc::clone(&throttle),
            &config.monitor,
        );
        tokio::spawn(monitor.run(token.child_token()));
        let refresher = ContactRefresher::new(
            Arc::clone(&gateway),
            Arc::clone(&cache),
            state_rx.clone(),
            alerter.clone(),
            &config.monitor,
        );
        tokio::spawn(refresher.run(token.child_token()));

        let gated: Arc<dyn Gateway> = Arc::new(GatedGateway::new(
            gateway,
            state_rx.clone(),
            alerter.clone(),
            throttle,
        ));
        let resolver = ChatResolver::new(Arc::clone(&cache), Arc::clone(&gated), alerter.clone());
        let flattener =
            SegmentFlattener::new(Arc::clone(&cache), Arc::clone(&gated), alerter.clone());
        let inbound = InboundHandler::new(
            Arc::clone(&cache),
            Arc::clone(&gated),
            resolver.clone(),
            flattener,
            pool,
            alerter.clone(),
        );
        let outbound = OutboundDispatcher::new(Arc::clone(&gated));

        info!("channel pipeline started");
        Self {
            cache,
            gateway: gated,
            resolver,
            inbound,
            outbound,
            alerter,
            state: state_rx,
            token,
        }
    }

    /// Feeds one inbound message event through the pipeline.
    pub async fn handle_message_event(&self, event: MessageEvent) -> Result<(), WaddleError> {
        self.inbound.handle_message(event).await
    }

    /// Feeds one inbound notice event through the pipeline.
    pub async fn handle_notice_event(&self, event: NoticeEvent) -> Result<(), WaddleError> {
        self.inbound.handle_notice(event).await
    }

    /// Feeds one inbound approval-request event through the pipeline.
    pub async fn handle_request_event(&self, event: RequestEvent) -> Result<(), WaddleError> {
        self.inbound.handle_request(event).await
    }

    /// Sends a framework message to the gateway. Returns the uid the
    /// framework should track, or `None` when the body was a local command.
    pub async fn send_message(
        &self,
        message: &OutgoingMessage,
    ) -> Result<Option<MessageUid>, WaddleError> {
        self.outbound.send(message).await
    }

    /// Recalls a previously delivered message.
    pub async fn recall_message(&self, request: &RecallRequest) -> Result<(), WaddleError> {
        self.outbound.recall(request).await
    }

    /// Answers a pending friend request. Returns operator-facing feedback.
    pub async fn process_friend_request(&self, decision: RequestDecision, token: &str) -> String {
        let approve = decision == RequestDecision::Accept;
        match self.gateway.set_friend_add_request(token, approve).await {
            Ok(()) => "Done".to_string(),
            Err(err) => format!("Failed to process request! Error Message:\n{err}"),
        }
    }

    /// Answers a pending group join request or invitation.
    pub async fn process_group_request(
        &self,
        decision: RequestDecision,
        token: &str,
        kind: GroupRequestKind,
    ) -> String {
        let approve = decision == RequestDecision::Accept;
        match self
            .gateway
            .set_group_add_request(token, kind, approve)
            .await
        {
            Ok(()) => "Done".to_string(),
            Err(err) => format!("Failed to process request! Error Message:\n{err}"),
        }
    }

    /// Lists all known chats: friends, then groups, then side-channel groups
    /// and discuss chats learned from events.
    ///
    /// A failing friend query degrades to a groups-only listing with an
    /// operator alert; a failing group query fails the listing.
    pub async fn list_chats(&self) -> Result<Vec<ChatIdentity>, WaddleError> {
        let gateway = self.gateway.as_ref();
        let mut chats = Vec::new();

        match self.cache.refresh_friends(gateway).await {
            Ok(()) => {
                for friend in self.cache.friends_snapshot().iter() {
                    let ctx = ResolveContext {
                        user_id: Some(friend.user_id),
                        nickname: Some(friend.nickname.clone()),
                        alias: Some(friend.remark.clone()),
                        ..ResolveContext::default()
                    };
                    chats.push(self.resolver.private_chat(&ctx).await?);
                }
            }
            Err(err) => {
                warn!(error = %err, "friend listing failed");
                self.alerter
                    .alert("Failed to retrieve the friend list.\nOnly groups are shown.")
                    .await;
            }
        }

        self.cache.refresh_groups(gateway).await?;
        let groups = self.cache.groups_snapshot();
        for group in groups.iter() {
            let ctx = ResolveContext {
                group_id: Some(group.group_id),
                group_name: Some(group.group_name.clone()),
                ..ResolveContext::default()
            };
            chats.push(self.resolver.group_chat(&ctx, false).await?);
        }
        for extra in self.cache.extra_groups_snapshot() {
            if groups.iter().any(|g| g.group_id == extra.group_id) {
                continue;
            }
            let ctx = ResolveContext {
                group_id: Some(extra.group_id),
                group_name: Some(extra.group_name.clone()),
                ..ResolveContext::default()
            };
            chats.push(self.resolver.group_chat(&ctx, false).await?);
        }
        chats.extend(self.cache.discuss_chats());
        Ok(chats)
    }

    /// Resolves a single chat by its uid, refreshing group members for group
    /// chats.
    pub async fn chat_by_uid(&self, uid: &ChatUid) -> Result<ChatIdentity, WaddleError> {
        let (kind, id) = uid.parse()?;
        match kind {
            ChatKind::Private => {
                let remark = self
                    .cache
                    .friend(self.gateway.as_ref(), id, false)
                    .await
                    .ok()
                    .flatten()
                    .map(|f| f.remark);
                let ctx = ResolveContext {
                    user_id: Some(id),
                    alias: remark,
                    ..ResolveContext::default()
                };
                self.resolver.private_chat(&ctx).await
            }
            ChatKind::Group => {
                self.resolver
                    .group_chat(&ResolveContext::for_group(id), true)
                    .await
            }
            ChatKind::Discuss => {
                let ctx = ResolveContext {
                    discuss_id: Some(id),
                    ..ResolveContext::default()
                };
                self.resolver.group_chat(&ctx, false).await
            }
            // parse() never yields System; system chats are synthesized, not
            // looked up.
            ChatKind::System => Err(WaddleError::IdentityNotFound {
                uid: uid.as_str().to_string(),
            }),
        }
    }

    /// Last observed connection state.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Stops the background loops and the delivery pool.
    pub fn shutdown(&self) {
        info!("channel shutting down");
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use waddle_core::identity::Author;
    use waddle_gateway::types::{FriendEntry, GroupEntry, GroupMemberEntry, MessageTarget};
    use waddle_test_utils::{CaptureSink, MockGateway};

    use super::*;

    fn test_config() -> WaddleConfig {
        let mut config = WaddleConfig::default();
        // Keep background loops quiet during tests.
        config.monitor.probe_interval_secs = 1;
        config.monitor.contact_refresh_interval_secs = 3600;
        config.delivery.workers = 1;
        config
    }

    async fn started_channel(gateway: &Arc<MockGateway>, sink: &Arc<CaptureSink>) -> QqChannel {
        let channel = QqChannel::start(
            &test_config(),
            Arc::clone(gateway) as Arc<dyn Gateway>,
            Arc::clone(sink) as Arc<dyn ForwardSink>,
        );
        wait_until_online(&channel).await;
        channel
    }

    async fn wait_until_online(channel: &QqChannel) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !channel.connection_state().is_online() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn friend_request_processing_reports_done() {
        let gateway = Arc::new(MockGateway::new());
        let sink = Arc::new(CaptureSink::new());
        let channel = started_channel(&gateway, &sink).await;

        let feedback = channel
            .process_friend_request(RequestDecision::Accept, "tok-9")
            .await;
        assert_eq!(feedback, "Done");
        assert_eq!(gateway.friend_decisions(), vec![("tok-9".to_string(), true)]);

        let feedback = channel
            .process_friend_request(RequestDecision::Decline, "tok-10")
            .await;
        assert_eq!(feedback, "Done");
        assert_eq!(gateway.friend_decisions()[1], ("tok-10".to_string(), false));
        channel.shutdown();
    }

    #[tokio::test]
    async fn failed_request_processing_reports_the_error() {
        let gateway = Arc::new(MockGateway::new());
        gateway.fail_approvals();
        let sink = Arc::new(CaptureSink::new());
        let channel = started_channel(&gateway, &sink).await;

        let feedback = channel
            .process_group_request(RequestDecision::Accept, "tok", GroupRequestKind::Invite)
            .await;
        assert!(feedback.starts_with("Failed to process request! Error Message:\n"));
        channel.shutdown();
    }

    #[tokio::test]
    async fn group_request_processing_passes_kind_through() {
        let gateway = Arc::new(MockGateway::new());
        let sink = Arc::new(CaptureSink::new());
        let channel = started_channel(&gateway, &sink).await;

        channel
            .process_group_request(RequestDecision::Accept, "g-tok", GroupRequestKind::Add)
            .await;
        assert_eq!(
            gateway.group_decisions(),
            vec![("g-tok".to_string(), GroupRequestKind::Add, true)]
        );
        channel.shutdown();
    }

    #[tokio::test]
    async fn list_chats_orders_friends_before_groups() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_friends(vec![
            FriendEntry {
                user_id: 1,
                nickname: "a".into(),
                remark: String::new(),
            },
            FriendEntry {
                user_id: 2,
                nickname: "b".into(),
                remark: "bee".into(),
            },
        ]);
        gateway.set_groups(vec![GroupEntry {
            group_id: 999,
            group_name: "pond".into(),
        }]);
        let sink = Arc::new(CaptureSink::new());
        let channel = started_channel(&gateway, &sink).await;

        let chats = channel.list_chats().await.unwrap();
        let uids: Vec<&str> = chats.iter().map(|c| c.uid.as_str()).collect();
        assert_eq!(uids, ["private_1", "private_2", "group_999"]);
        // Empty remark falls back to the nickname at table build time.
        assert_eq!(chats[0].alias.as_deref(), Some("a"));
        assert_eq!(chats[1].alias.as_deref(), Some("bee"));
        channel.shutdown();
    }

    #[tokio::test]
    async fn friend_listing_failure_degrades_to_groups_with_alert() {
        let gateway = Arc::new(MockGateway::new());
        gateway.fail_friend_list();
        gateway.set_groups(vec![GroupEntry {
            group_id: 999,
            group_name: "pond".into(),
        }]);
        let sink = Arc::new(CaptureSink::new());
        let channel = started_channel(&gateway, &sink).await;

        let chats = channel.list_chats().await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].uid.as_str(), "group_999");

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(1))
            .await
            .unwrap();
        let alerts = sink.messages();
        assert_eq!(alerts[0].chat.uid.as_str(), "__alert__");
        assert!(alerts[0]
            .text
            .contains("Failed to retrieve the friend list.\nOnly groups are shown."));
        channel.shutdown();
    }

    #[tokio::test]
    async fn chat_by_uid_populates_group_members() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_groups(vec![GroupEntry {
            group_id: 999,
            group_name: "pond".into(),
        }]);
        gateway.set_group_members(
            999,
            vec![GroupMemberEntry {
                user_id: 7,
                nickname: "alice".into(),
                card: "ally".into(),
            }],
        );
        let sink = Arc::new(CaptureSink::new());
        let channel = started_channel(&gateway, &sink).await;

        let chat = channel
            .chat_by_uid(&ChatUid("group_999".into()))
            .await
            .unwrap();
        assert_eq!(chat.display_name, "pond");
        assert_eq!(gateway.calls.member_list(), 1);
        channel.shutdown();
    }

    #[tokio::test]
    async fn unknown_uid_scheme_is_rejected() {
        let gateway = Arc::new(MockGateway::new());
        let sink = Arc::new(CaptureSink::new());
        let channel = started_channel(&gateway, &sink).await;

        let err = channel
            .chat_by_uid(&ChatUid("carrier_77".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, WaddleError::IdentityNotFound { .. }));
        channel.shutdown();
    }

    #[tokio::test]
    async fn send_message_round_trips_once_online() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_next_message_id(4242);
        let sink = Arc::new(CaptureSink::new());
        let channel = started_channel(&gateway, &sink).await;

        let uid = channel
            .send_message(&OutgoingMessage::text(ChatUid("private_7".into()), "hello"))
            .await
            .unwrap();
        assert_eq!(uid.unwrap().as_str(), "7_4242");
        assert_eq!(
            gateway.sent_messages(),
            vec![(MessageTarget::Private { user_id: 7 }, "hello".to_string())]
        );
        channel.shutdown();
    }

    #[tokio::test]
    async fn inbound_event_flows_to_the_sink() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_friends(vec![FriendEntry {
            user_id: 7,
            nickname: "alice".into(),
            remark: "al".into(),
        }]);
        gateway.set_login(10_000, "bot");
        let sink = Arc::new(CaptureSink::new());
        let channel = started_channel(&gateway, &sink).await;

        let event: MessageEvent = serde_json::from_value(serde_json::json!({
            "message_type": "private",
            "message_id": 31,
            "user_id": 7,
            "sender": {"nickname": "alice"},
            "message": [{"type": "text", "data": {"text": "ping"}}],
        }))
        .unwrap();
        channel.handle_message_event(event).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(1))
            .await
            .unwrap();
        let messages = sink.messages();
        assert_eq!(messages[0].text, "ping");
        assert!(matches!(messages[0].author, Author::Chat(_)));
        channel.shutdown();
    }
}
