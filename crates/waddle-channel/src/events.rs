// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event handling: messages, notices, and approval requests.
//!
//! One message event fans out into the flattened text message plus one
//! message per media payload, all sharing the gateway message id with ordinal
//! uids, media first and text last. Notices become system-authored messages
//! in the affected chat or in a synthetic system chat; recalls become
//! removal notifications.

use std::sync::Arc;

use tracing::{debug, warn};

use waddle_core::error::WaddleError;
use waddle_core::identity::{Author, ChatIdentity, ChatKind, ChatUid, MemberIdentity, MemberUid, MessageUid};
use waddle_core::message::{
    AttachmentRef, CommandAction, MessageCommand, MessageRemoval, NormalizedMessage, PayloadKind,
};
use waddle_gateway::event::{MessageEvent, MessageScope, NoticeEvent, RequestEvent};
use waddle_gateway::Gateway;

use crate::cache::CacheStore;
use crate::delivery::{system_notice, Alerter, DeliveryPool};
use crate::flatten::{FlattenScope, SegmentFlattener};
use crate::resolver::{system_member, ChatResolver, ResolveContext};

/// Turns raw gateway events into framework deliveries.
pub struct InboundHandler {
    cache: Arc<CacheStore>,
    gateway: Arc<dyn Gateway>,
    resolver: ChatResolver,
    flattener: SegmentFlattener,
    delivery: DeliveryPool,
    alerter: Alerter,
}

impl InboundHandler {
    pub fn new(
        cache: Arc<CacheStore>,
        gateway: Arc<dyn Gateway>,
        resolver: ChatResolver,
        flattener: SegmentFlattener,
        delivery: DeliveryPool,
        alerter: Alerter,
    ) -> Self {
        Self {
            cache,
            gateway,
            resolver,
            flattener,
            delivery,
            alerter,
        }
    }

    /// Resolves, flattens, and enqueues one message event.
    pub async fn handle_message(&self, event: MessageEvent) -> Result<(), WaddleError> {
        metrics::counter!("waddle_inbound_events_total", "kind" => "message").increment(1);
        let gateway = self.gateway.as_ref();
        let profile = self.cache.user_profile(gateway, event.user_id, false).await?;

        let chat = match event.message_type {
            MessageScope::Private => {
                let ctx = ResolveContext {
                    user_id: Some(event.user_id),
                    nickname: event.sender_nickname().map(str::to_string),
                    alias: Some(profile.remark.clone()),
                    ..ResolveContext::default()
                };
                self.resolver.private_chat(&ctx).await?
            }
            MessageScope::Group => {
                let ctx = ResolveContext {
                    group_id: event.group_id,
                    ..ResolveContext::default()
                };
                self.resolver.group_chat(&ctx, false).await?
            }
            MessageScope::Discuss => {
                let ctx = ResolveContext {
                    discuss_id: event.discuss_id,
                    ..ResolveContext::default()
                };
                self.resolver.group_chat(&ctx, false).await?
            }
        };

        let author = self.resolve_author(&chat, &event, &profile.remark).await?;

        let scope = FlattenScope {
            group_id: match event.message_type {
                MessageScope::Group => event.group_id,
                _ => None,
            },
            self_member: self.own_member_identity().await,
        };
        let flat = self.flattener.flatten(&scope, &event.message).await;

        // Media payloads deliver first; the flattened text closes the fan-out.
        let mut pending: Vec<(PayloadKind, String, Option<AttachmentRef>, Vec<_>)> = flat
            .extras
            .into_iter()
            .map(|extra| (extra.kind, extra.text, extra.attachment, Vec::new()))
            .collect();
        if !flat.text.is_empty() {
            pending.push((PayloadKind::Text, flat.text, None, flat.spans));
        }
        if pending.is_empty() {
            debug!(message_id = event.message_id, "event produced no deliverable payloads");
            return Ok(());
        }

        let chat_id = chat.gateway_id()?;
        for (ordinal, (kind, text, attachment, spans)) in pending.into_iter().enumerate() {
            let message = NormalizedMessage {
                uid: MessageUid::with_ordinal(chat_id, event.message_id, ordinal),
                chat: chat.clone(),
                author: author.clone(),
                kind,
                text,
                spans,
                attachment,
                commands: Vec::new(),
            };
            self.delivery.enqueue_message(message).await;
        }
        Ok(())
    }

    async fn resolve_author(
        &self,
        chat: &ChatIdentity,
        event: &MessageEvent,
        remark: &str,
    ) -> Result<Author, WaddleError> {
        if let Some(anon) = &event.anonymous {
            return Ok(Author::Member(self.resolver.anonymous_member(chat, anon)));
        }
        match event.message_type {
            MessageScope::Private => Ok(Author::Chat(chat.clone())),
            MessageScope::Group if event.sub_type.as_deref() == Some("notice") => Ok(
                Author::Member(system_member("group_notification", "System Notification")),
            ),
            MessageScope::Group => {
                let group_id = event.group_id.ok_or_else(|| {
                    WaddleError::Internal("group message event missing group id".into())
                })?;
                let entry = self
                    .cache
                    .find_member(self.gateway.as_ref(), &self.alerter, group_id, event.user_id)
                    .await;
                let alias = match &entry {
                    Some(member) if !member.card.is_empty() => Some(member.card.clone()),
                    Some(_) => None,
                    None => Some(remark.to_string()),
                };
                let ctx = ResolveContext {
                    user_id: Some(event.user_id),
                    nickname: Some(remark.to_string()),
                    alias,
                    ..ResolveContext::default()
                };
                Ok(Author::Member(self.resolver.member(chat, &ctx).await?))
            }
            MessageScope::Discuss => {
                let ctx = ResolveContext {
                    user_id: Some(event.user_id),
                    nickname: Some(remark.to_string()),
                    ..ResolveContext::default()
                };
                Ok(Author::Member(self.resolver.member(chat, &ctx).await?))
            }
        }
    }

    /// The bot's own member identity, used as the mention-span target.
    /// Unavailable login info downgrades to span-less flattening.
    async fn own_member_identity(&self) -> Option<MemberIdentity> {
        match self.cache.login_info(self.gateway.as_ref()).await {
            Ok(login) => Some(MemberIdentity {
                uid: MemberUid::from_user_id(login.user_id),
                display_name: login.nickname,
                alias: None,
            }),
            Err(err) => {
                debug!(error = %err, "login info unavailable; skipping mention spans");
                None
            }
        }
    }

    /// Routes one notice event.
    pub async fn handle_notice(&self, event: NoticeEvent) -> Result<(), WaddleError> {
        metrics::counter!("waddle_inbound_events_total", "kind" => "notice").increment(1);
        match event {
            NoticeEvent::GroupIncrease {
                group_id,
                user_id,
                sub_type,
                ..
            } => {
                let group_name = self.group_display_name(group_id).await;
                let nickname = self.display_nickname(user_id).await;
                let text = if sub_type.as_deref() == Some("invite") {
                    format!("{nickname}({user_id}) joined the group({group_name}) via invitation")
                } else {
                    format!("{nickname}({user_id}) joined the group({group_name})")
                };
                self.deliver_group_notice(group_id, "ℹ Group Member Increase Event", &text)
                    .await
            }
            NoticeEvent::GroupDecrease {
                group_id,
                user_id,
                sub_type,
                ..
            } => {
                let group_name = self.group_display_name(group_id).await;
                let text = match sub_type.as_deref() {
                    Some("kick_me") => {
                        format!("You were removed from the group({group_name})")
                    }
                    Some("kick") => {
                        let nickname = self.display_nickname(user_id).await;
                        format!("{nickname}({user_id}) was removed from the group({group_name})")
                    }
                    _ => {
                        let nickname = self.display_nickname(user_id).await;
                        format!("{nickname}({user_id}) left the group({group_name})")
                    }
                };
                self.deliver_group_notice(group_id, "ℹ Group Member Decrease Event", &text)
                    .await
            }
            NoticeEvent::GroupAdmin {
                group_id,
                user_id,
                sub_type,
            } => {
                let group_name = self.group_display_name(group_id).await;
                let nickname = self.display_nickname(user_id).await;
                let text = if sub_type.as_deref() == Some("set") {
                    format!("{nickname}({user_id}) is now an administrator of the group({group_name})")
                } else {
                    format!(
                        "{nickname}({user_id}) is no longer an administrator of the group({group_name})"
                    )
                };
                self.deliver_group_notice(group_id, "ℹ Group Admin Change Event", &text)
                    .await
            }
            NoticeEvent::GroupBan {
                group_id,
                user_id,
                duration,
                sub_type,
                ..
            } => {
                let group_name = self.group_display_name(group_id).await;
                let subject = if user_id == 0 {
                    "All members".to_string()
                } else {
                    let nickname = self.display_nickname(user_id).await;
                    format!("{nickname}({user_id})")
                };
                let text = if sub_type.as_deref() == Some("lift_ban") || duration == 0 {
                    format!("{subject} unmuted in the group({group_name})")
                } else {
                    format!(
                        "{subject} muted for {} in the group({group_name})",
                        format_duration(duration)
                    )
                };
                self.deliver_group_notice(group_id, "ℹ Group Mute Event", &text)
                    .await
            }
            NoticeEvent::GroupUpload {
                group_id,
                user_id,
                file,
            } => self.handle_group_upload(group_id, user_id, file).await,
            NoticeEvent::OfflineFile { user_id, file } => {
                self.handle_offline_file(user_id, file).await
            }
            NoticeEvent::FriendAdd { user_id } => {
                let nickname = self.display_nickname(user_id).await;
                let text = format!("{nickname}({user_id}) has become your friend!");
                self.delivery
                    .enqueue_message(system_notice(
                        "friend_add",
                        "ℹ New Friend Event",
                        &text,
                        Vec::new(),
                    ))
                    .await;
                Ok(())
            }
            NoticeEvent::GroupRecall {
                group_id,
                message_id,
                ..
            } => {
                // Removal chats skip name resolution; only the uid matters.
                let chat = ChatIdentity {
                    uid: ChatUid::group(group_id),
                    kind: ChatKind::Group,
                    display_name: group_id.to_string(),
                    alias: None,
                    is_discuss: false,
                };
                self.delivery
                    .enqueue_removal(MessageRemoval {
                        author: Author::Chat(chat.clone()),
                        chat,
                        uid: MessageUid::new(group_id, message_id),
                    })
                    .await;
                Ok(())
            }
            NoticeEvent::FriendRecall {
                user_id,
                message_id,
            } => {
                let chat = match self
                    .resolver
                    .private_chat(&ResolveContext::for_user(user_id))
                    .await
                {
                    Ok(chat) => chat,
                    Err(err) => {
                        warn!(user_id, error = %err, "dropping recall for unresolvable chat");
                        return Ok(());
                    }
                };
                self.delivery
                    .enqueue_removal(MessageRemoval {
                        author: Author::Chat(chat.clone()),
                        chat,
                        uid: MessageUid::new(user_id, message_id),
                    })
                    .await;
                Ok(())
            }
        }
    }

    async fn handle_group_upload(
        &self,
        group_id: i64,
        user_id: i64,
        file: waddle_gateway::event::UploadedFile,
    ) -> Result<(), WaddleError> {
        let nickname = self.display_nickname(user_id).await;
        let info = format!(
            "{nickname}({user_id}) uploaded a file to the group\nFilename: {}\nSize: {} bytes",
            file.name, file.size
        );
        self.deliver_group_notice(group_id, "ℹ Group File Upload Event", &info)
            .await?;

        let url = match self
            .gateway
            .get_group_file_url(group_id, &file.id, file.busid)
            .await
        {
            Ok(url) => url,
            Err(err) => {
                warn!(group_id, file = %file.name, error = %err, "group file URL fetch failed");
                self.alerter
                    .alert(&format!("Failed to fetch the uploaded group file.\n{err}"))
                    .await;
                return Ok(());
            }
        };

        let chat = self
            .resolver
            .group_chat(&ResolveContext::for_group(group_id), false)
            .await?;
        let ctx = ResolveContext {
            user_id: Some(user_id),
            nickname: Some(nickname),
            ..ResolveContext::default()
        };
        let author = Author::Member(self.resolver.member(&chat, &ctx).await?);
        self.delivery
            .enqueue_message(NormalizedMessage {
                uid: MessageUid(format!(
                    "{group_id}_{}_1",
                    chrono::Utc::now().timestamp()
                )),
                chat,
                author,
                kind: PayloadKind::File,
                text: String::new(),
                spans: Vec::new(),
                attachment: Some(AttachmentRef {
                    name: file.name,
                    url: Some(url),
                    size: Some(file.size),
                }),
                commands: Vec::new(),
            })
            .await;
        Ok(())
    }

    async fn handle_offline_file(
        &self,
        user_id: i64,
        file: waddle_gateway::event::OfflineFile,
    ) -> Result<(), WaddleError> {
        let profile = self
            .cache
            .user_profile(self.gateway.as_ref(), user_id, false)
            .await;
        let (remark, nickname) = match &profile {
            Ok(p) => (p.remark.clone(), p.nickname.clone()),
            Err(_) => (user_id.to_string(), user_id.to_string()),
        };
        let text = format!(
            "{remark}({nickname}) uploaded a file to you\nFilename: {}\nSize: {} bytes",
            file.name, file.size
        );
        self.delivery
            .enqueue_message(system_notice(
                "offline_file",
                "ℹ Offline File Upload Event",
                &text,
                Vec::new(),
            ))
            .await;

        let ctx = ResolveContext {
            user_id: Some(user_id),
            nickname: profile.ok().map(|p| p.nickname),
            ..ResolveContext::default()
        };
        let chat = self.resolver.private_chat(&ctx).await?;
        self.delivery
            .enqueue_message(NormalizedMessage {
                uid: MessageUid(format!("{user_id}_{}_1", chrono::Utc::now().timestamp())),
                author: Author::Chat(chat.clone()),
                chat,
                kind: PayloadKind::File,
                text: String::new(),
                spans: Vec::new(),
                attachment: Some(AttachmentRef {
                    name: file.name,
                    url: Some(file.url),
                    size: Some(file.size),
                }),
                commands: Vec::new(),
            })
            .await;
        Ok(())
    }

    /// Routes one approval-request event into an actionable notification.
    pub async fn handle_request(&self, event: RequestEvent) -> Result<(), WaddleError> {
        metrics::counter!("waddle_inbound_events_total", "kind" => "request").increment(1);
        match event {
            RequestEvent::Friend {
                user_id,
                flag,
                comment,
            } => {
                let nickname = self.display_nickname(user_id).await;
                let text = format!(
                    "{nickname}({user_id}) wants to be your friend!\n\
                     Here is the verification comment:\n{comment}"
                );
                let commands = vec![
                    MessageCommand {
                        label: "Accept".into(),
                        action: CommandAction::ProcessFriendRequest {
                            accept: true,
                            token: flag.clone(),
                        },
                    },
                    MessageCommand {
                        label: "Decline".into(),
                        action: CommandAction::ProcessFriendRequest {
                            accept: false,
                            token: flag,
                        },
                    },
                ];
                self.delivery
                    .enqueue_message(system_notice(
                        "friend_request",
                        "ℹ New Friend Request",
                        &text,
                        commands,
                    ))
                    .await;
                Ok(())
            }
            RequestEvent::Group {
                group_id,
                user_id,
                flag,
                sub_type,
                comment,
            } => {
                let group_name = self.group_display_name(group_id).await;
                let requester = match self
                    .cache
                    .user_profile(self.gateway.as_ref(), user_id, false)
                    .await
                {
                    Ok(p) if p.remark != p.nickname => {
                        format!("{}({})[{user_id}] ", p.nickname, p.remark)
                    }
                    Ok(p) => format!("{}[{user_id}] ", p.nickname),
                    Err(_) => format!("[{user_id}] "),
                };
                let text = format!(
                    "{requester}wants to join the group {group_name}({group_id}).\n\
                     Here is the comment: {comment}"
                );
                // Request notifications live in a decorated twin of the group
                // chat so answering them does not collide with group traffic.
                let chat = ChatIdentity {
                    uid: ChatUid(format!("group_{group_id}_notification")),
                    kind: ChatKind::Group,
                    display_name: format!("[Request]{group_name}"),
                    alias: None,
                    is_discuss: false,
                };
                let commands = vec![
                    MessageCommand {
                        label: "Accept".into(),
                        action: CommandAction::ProcessGroupRequest {
                            accept: true,
                            token: flag.clone(),
                            kind: sub_type,
                        },
                    },
                    MessageCommand {
                        label: "Decline".into(),
                        action: CommandAction::ProcessGroupRequest {
                            accept: false,
                            token: flag,
                            kind: sub_type,
                        },
                    },
                ];
                self.delivery
                    .enqueue_message(NormalizedMessage {
                        uid: MessageUid(format!(
                            "__group_request__.{}",
                            chrono::Utc::now().timestamp()
                        )),
                        chat,
                        author: Author::Member(system_member(
                            "group_request",
                            "ℹ New Group Join Request",
                        )),
                        kind: PayloadKind::Text,
                        text,
                        spans: Vec::new(),
                        attachment: None,
                        commands,
                    })
                    .await;
                Ok(())
            }
        }
    }

    /// Delivers a system-authored notice into the given group chat.
    async fn deliver_group_notice(
        &self,
        group_id: i64,
        description: &str,
        text: &str,
    ) -> Result<(), WaddleError> {
        let chat = self
            .resolver
            .group_chat(&ResolveContext::for_group(group_id), false)
            .await?;
        let message = NormalizedMessage {
            uid: MessageUid(format!(
                "__group_notice__.{}",
                chrono::Utc::now().timestamp()
            )),
            chat,
            author: Author::Member(system_member("group_notice", description)),
            kind: PayloadKind::Text,
            text: format!("{description}\n\n{text}"),
            spans: Vec::new(),
            attachment: None,
            commands: Vec::new(),
        };
        self.delivery.enqueue_message(message).await;
        Ok(())
    }

    async fn group_display_name(&self, group_id: i64) -> String {
        match self
            .cache
            .group(self.gateway.as_ref(), group_id, false)
            .await
        {
            Ok(Some(group)) if !group.group_name.is_empty() => group.group_name,
            Ok(_) => group_id.to_string(),
            Err(err) => {
                warn!(group_id, error = %err, "group name lookup failed");
                group_id.to_string()
            }
        }
    }

    async fn display_nickname(&self, user_id: i64) -> String {
        match self
            .cache
            .user_profile(self.gateway.as_ref(), user_id, false)
            .await
        {
            Ok(profile) => profile.nickname,
            Err(_) => user_id.to_string(),
        }
    }
}

/// Renders a mute duration as `1d 2h 3m 4s`, omitting zero components.
fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (days, rest) = (seconds / 86_400, seconds % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, secs) = (rest / 60, rest % 60);
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use waddle_core::sink::ForwardSink;
    use waddle_gateway::event::UploadedFile;
    use waddle_gateway::types::{FriendEntry, GroupEntry, GroupMemberEntry};
    use waddle_test_utils::{CaptureSink, MockGateway};

    use super::*;

    fn handler(gateway: Arc<MockGateway>, sink: &Arc<CaptureSink>) -> InboundHandler {
        let cache = Arc::new(CacheStore::new(Duration::from_secs(3600)));
        // Single worker keeps delivery order deterministic for assertions.
        let pool = DeliveryPool::start(
            Arc::clone(sink) as Arc<dyn ForwardSink>,
            &waddle_config::DeliveryConfig {
                queue_capacity: 32,
                workers: 1,
            },
            CancellationToken::new(),
        );
        let alerter = Alerter::new(pool.clone());
        let gateway_dyn = Arc::clone(&gateway) as Arc<dyn Gateway>;
        InboundHandler::new(
            Arc::clone(&cache),
            Arc::clone(&gateway_dyn),
            ChatResolver::new(
                Arc::clone(&cache),
                Arc::clone(&gateway_dyn),
                alerter.clone(),
            ),
            SegmentFlattener::new(Arc::clone(&cache), Arc::clone(&gateway_dyn), alerter.clone()),
            pool,
            alerter,
        )
    }

    fn message_event(value: serde_json::Value) -> MessageEvent {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn private_message_resolves_chat_with_remark_alias() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_friends(vec![FriendEntry {
            user_id: 7,
            nickname: "alice".into(),
            remark: "work alice".into(),
        }]);
        gateway.set_login(10_000, "bot");
        let sink = Arc::new(CaptureSink::new());
        let handler = handler(Arc::clone(&gateway), &sink);

        handler
            .handle_message(message_event(json!({
                "message_type": "private",
                "sub_type": "friend",
                "message_id": 555,
                "user_id": 7,
                "sender": {"nickname": "alice"},
                "message": [{"type": "text", "data": {"text": "hi"}}],
            })))
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(1))
            .await
            .unwrap();
        let messages = sink.messages();
        assert_eq!(messages[0].uid.as_str(), "7_555");
        assert_eq!(messages[0].chat.uid.as_str(), "private_7");
        assert_eq!(messages[0].chat.alias.as_deref(), Some("work alice"));
        assert!(matches!(messages[0].author, Author::Chat(_)));
        assert_eq!(messages[0].text, "hi");
    }

    #[tokio::test]
    async fn group_message_fans_out_media_first_text_last() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_groups(vec![GroupEntry {
            group_id: 999,
            group_name: "pond".into(),
        }]);
        gateway.set_group_members(999, vec![GroupMemberEntry {
            user_id: 7,
            nickname: "alice".into(),
            card: "ally".into(),
        }]);
        gateway.add_stranger(7, "alice");
        gateway.set_login(10_000, "bot");
        let sink = Arc::new(CaptureSink::new());
        let handler = handler(Arc::clone(&gateway), &sink);

        handler
            .handle_message(message_event(json!({
                "message_type": "group",
                "message_id": 12345,
                "user_id": 7,
                "group_id": 999,
                "message": [
                    {"type": "image", "data": {"file": "a.png", "url": "http://x/a.png"}},
                    {"type": "text", "data": {"text": "caption"}},
                ],
            })))
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(2))
            .await
            .unwrap();
        let messages = sink.messages();
        assert_eq!(messages[0].kind, PayloadKind::Image);
        assert_eq!(messages[0].uid.as_str(), "999_12345");
        assert_eq!(messages[1].kind, PayloadKind::Text);
        assert_eq!(messages[1].uid.as_str(), "999_12345_1");
        assert_eq!(messages[1].text, "caption");
        // Group author carries the card as alias.
        match &messages[1].author {
            Author::Member(member) => {
                assert_eq!(member.uid.as_str(), "7");
                assert_eq!(member.alias.as_deref(), Some("ally"));
            }
            other => panic!("expected member author, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn anonymous_group_message_uses_flag_uid() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_groups(vec![GroupEntry {
            group_id: 999,
            group_name: "pond".into(),
        }]);
        gateway.add_stranger(7, "alice");
        gateway.set_login(10_000, "bot");
        let sink = Arc::new(CaptureSink::new());
        let handler = handler(Arc::clone(&gateway), &sink);

        handler
            .handle_message(message_event(json!({
                "message_type": "group",
                "message_id": 42,
                "user_id": 7,
                "group_id": 999,
                "anonymous": {"flag": "fl4g", "name": "ghost"},
                "message": [{"type": "text", "data": {"text": "boo"}}],
            })))
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(1))
            .await
            .unwrap();
        match &sink.messages()[0].author {
            Author::Member(member) => {
                assert_eq!(member.uid.as_str(), "anonymous_fl4g");
                assert_eq!(member.display_name, "[Anonymous] ghost");
            }
            other => panic!("expected member author, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn notice_subtype_message_gets_system_author() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_groups(vec![GroupEntry {
            group_id: 999,
            group_name: "pond".into(),
        }]);
        gateway.add_stranger(7, "alice");
        gateway.set_login(10_000, "bot");
        let sink = Arc::new(CaptureSink::new());
        let handler = handler(Arc::clone(&gateway), &sink);

        handler
            .handle_message(message_event(json!({
                "message_type": "group",
                "sub_type": "notice",
                "message_id": 43,
                "user_id": 7,
                "group_id": 999,
                "message": [{"type": "text", "data": {"text": "pinned!"}}],
            })))
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(1))
            .await
            .unwrap();
        match &sink.messages()[0].author {
            Author::Member(member) => {
                assert_eq!(member.uid.as_str(), "__group_notification__")
            }
            other => panic!("expected member author, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn group_increase_notice_reaches_group_chat() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_groups(vec![GroupEntry {
            group_id: 999,
            group_name: "pond".into(),
        }]);
        gateway.add_stranger(8, "newbie");
        let sink = Arc::new(CaptureSink::new());
        let handler = handler(Arc::clone(&gateway), &sink);

        handler
            .handle_notice(NoticeEvent::GroupIncrease {
                group_id: 999,
                user_id: 8,
                operator_id: None,
                sub_type: Some("invite".into()),
            })
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(1))
            .await
            .unwrap();
        let messages = sink.messages();
        assert_eq!(messages[0].chat.uid.as_str(), "group_999");
        assert!(messages[0].uid.as_str().starts_with("__group_notice__."));
        assert!(messages[0].text.contains("newbie(8) joined the group(pond) via invitation"));
    }

    #[tokio::test]
    async fn group_recall_becomes_removal_with_chat_scoped_uid() {
        let gateway = Arc::new(MockGateway::new());
        let sink = Arc::new(CaptureSink::new());
        let handler = handler(Arc::clone(&gateway), &sink);

        handler
            .handle_notice(NoticeEvent::GroupRecall {
                group_id: 999,
                user_id: 7,
                operator_id: 7,
                message_id: 12345,
            })
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_removals(1))
            .await
            .unwrap();
        let removals = sink.removals();
        assert_eq!(removals[0].uid.as_str(), "999_12345");
        assert_eq!(removals[0].chat.uid.as_str(), "group_999");
        // No gateway traffic needed to process a recall.
        assert_eq!(gateway.calls.group_list(), 0);
    }

    #[tokio::test]
    async fn group_upload_delivers_notice_then_file() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_groups(vec![GroupEntry {
            group_id: 999,
            group_name: "pond".into(),
        }]);
        gateway.add_stranger(7, "alice");
        gateway.set_file_url("http://files/report.pdf");
        let sink = Arc::new(CaptureSink::new());
        let handler = handler(Arc::clone(&gateway), &sink);

        handler
            .handle_group_upload(
                999,
                7,
                UploadedFile {
                    id: "fid".into(),
                    name: "report.pdf".into(),
                    size: 2048,
                    busid: 102,
                },
            )
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(2))
            .await
            .unwrap();
        let messages = sink.messages();
        assert!(messages[0].text.contains("uploaded a file to the group"));
        assert_eq!(messages[1].kind, PayloadKind::File);
        let attachment = messages[1].attachment.as_ref().unwrap();
        assert_eq!(attachment.name, "report.pdf");
        assert_eq!(attachment.url.as_deref(), Some("http://files/report.pdf"));
        assert_eq!(attachment.size, Some(2048));
        assert!(messages[1].uid.as_str().ends_with("_1"));
    }

    #[tokio::test]
    async fn friend_request_carries_accept_and_decline_commands() {
        let gateway = Arc::new(MockGateway::new());
        gateway.add_stranger(7, "alice");
        let sink = Arc::new(CaptureSink::new());
        let handler = handler(Arc::clone(&gateway), &sink);

        handler
            .handle_request(RequestEvent::Friend {
                user_id: 7,
                flag: "tok-1".into(),
                comment: "hello".into(),
            })
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(1))
            .await
            .unwrap();
        let messages = sink.messages();
        assert_eq!(messages[0].chat.uid.as_str(), "__friend_request__");
        assert_eq!(messages[0].commands.len(), 2);
        assert!(matches!(
            &messages[0].commands[0].action,
            CommandAction::ProcessFriendRequest { accept: true, token } if token == "tok-1"
        ));
        assert!(matches!(
            &messages[0].commands[1].action,
            CommandAction::ProcessFriendRequest { accept: false, .. }
        ));
    }

    #[tokio::test]
    async fn group_request_lands_in_decorated_chat() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_groups(vec![GroupEntry {
            group_id: 999,
            group_name: "pond".into(),
        }]);
        gateway.add_stranger(7, "alice");
        let sink = Arc::new(CaptureSink::new());
        let handler = handler(Arc::clone(&gateway), &sink);

        handler
            .handle_request(RequestEvent::Group {
                group_id: 999,
                user_id: 7,
                flag: "tok-2".into(),
                sub_type: waddle_core::message::GroupRequestKind::Add,
                comment: "let me in".into(),
            })
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(1))
            .await
            .unwrap();
        let messages = sink.messages();
        assert_eq!(messages[0].chat.uid.as_str(), "group_999_notification");
        assert_eq!(messages[0].chat.display_name, "[Request]pond");
        // Decorated uid still parses back to the underlying group.
        assert_eq!(messages[0].chat.uid.parse().unwrap().1, 999);
        assert!(messages[0].text.contains("wants to join the group pond(999)"));
        assert_eq!(messages[0].commands.len(), 2);
    }

    #[test]
    fn durations_render_compactly() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(3600), "1h");
        assert_eq!(format_duration(90_061), "1d 1h 1m 1s");
    }
}
