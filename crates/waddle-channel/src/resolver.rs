// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds chat and member identities from gateway events.
//!
//! Resolution is lookup-first: every identity created here is stored back
//! into the [`CacheStore`], so resolving the same chat member twice issues at
//! most one gateway query. Event handlers carry overriding names in a
//! [`ResolveContext`] when the event payload already includes them.

use std::sync::Arc;

use tracing::warn;

use waddle_core::error::WaddleError;
use waddle_core::identity::{ChatIdentity, ChatKind, ChatUid, MemberIdentity, MemberUid};
use waddle_gateway::Gateway;
use waddle_gateway::event::AnonymousInfo;

use crate::cache::CacheStore;
use crate::delivery::Alerter;

/// Identity hints carried alongside an event.
///
/// Anything present here overrides a cache lookup; anything absent is
/// resolved through the [`CacheStore`].
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    pub user_id: Option<i64>,
    /// Display-name override for the user being resolved.
    pub nickname: Option<String>,
    /// Alias override (friend remark or group card).
    pub alias: Option<String>,
    pub group_id: Option<i64>,
    pub discuss_id: Option<i64>,
    /// Display-name override for the group itself.
    pub group_name: Option<String>,
    pub anonymous: Option<AnonymousInfo>,
}

impl ResolveContext {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn for_group(group_id: i64) -> Self {
        Self {
            group_id: Some(group_id),
            ..Self::default()
        }
    }
}

/// Resolves uids and event contexts into chat/member identities.
#[derive(Clone)]
pub struct ChatResolver {
    cache: Arc<CacheStore>,
    gateway: Arc<dyn Gateway>,
    alerter: Alerter,
}

impl ChatResolver {
    pub fn new(cache: Arc<CacheStore>, gateway: Arc<dyn Gateway>, alerter: Alerter) -> Self {
        Self {
            cache,
            gateway,
            alerter,
        }
    }

    /// A one-to-one chat with the user named by the context.
    pub async fn private_chat(&self, ctx: &ResolveContext) -> Result<ChatIdentity, WaddleError> {
        let user_id = ctx
            .user_id
            .ok_or_else(|| WaddleError::Internal("private chat context missing user id".into()))?;
        let name = match &ctx.nickname {
            Some(name) => name.clone(),
            None => {
                self.cache
                    .user_profile(self.gateway.as_ref(), user_id, false)
                    .await?
                    .nickname
            }
        };
        Ok(ChatIdentity {
            uid: ChatUid::private(user_id),
            kind: ChatKind::Private,
            display_name: name,
            alias: ctx.alias.clone(),
            is_discuss: false,
        })
    }

    /// A group or discuss chat.
    ///
    /// Group names come from the context override when present, else the
    /// group cache; a failed name lookup degrades to the numeric id rather
    /// than failing the event. With `update_members` the group's wire roster
    /// is resolved into member identities eagerly.
    pub async fn group_chat(
        &self,
        ctx: &ResolveContext,
        update_members: bool,
    ) -> Result<ChatIdentity, WaddleError> {
        if let Some(discuss_id) = ctx.discuss_id {
            let chat = ChatIdentity {
                uid: ChatUid::discuss(discuss_id),
                kind: ChatKind::Discuss,
                display_name: format!("Discuss Group_{discuss_id}"),
                alias: None,
                is_discuss: true,
            };
            self.cache.note_discuss(&chat);
            return Ok(chat);
        }

        let group_id = ctx
            .group_id
            .ok_or_else(|| WaddleError::Internal("group chat context missing group id".into()))?;
        let name = match &ctx.group_name {
            Some(name) => name.clone(),
            None => match self.cache.group(self.gateway.as_ref(), group_id, false).await {
                Ok(Some(group)) if !group.group_name.is_empty() => group.group_name,
                Ok(_) => group_id.to_string(),
                Err(err) => {
                    warn!(group_id, error = %err, "group name lookup failed; using numeric id");
                    group_id.to_string()
                }
            },
        };
        let chat = ChatIdentity {
            uid: ChatUid::group(group_id),
            kind: ChatKind::Group,
            display_name: name,
            alias: None,
            is_discuss: false,
        };
        if update_members {
            self.populate_members(&chat, group_id).await;
        }
        Ok(chat)
    }

    async fn populate_members(&self, chat: &ChatIdentity, group_id: i64) {
        let roster = self
            .cache
            .group_members(self.gateway.as_ref(), &self.alerter, group_id, false)
            .await;
        for entry in roster.iter() {
            let display_name = if entry.card.is_empty() {
                entry.nickname.clone()
            } else {
                entry.card.clone()
            };
            self.cache.store_member_identity(
                chat.uid.as_str(),
                MemberIdentity {
                    uid: MemberUid::from_user_id(entry.user_id),
                    display_name,
                    alias: Some(entry.nickname.clone()),
                },
            );
        }
    }

    /// The identity of one chat member, created on first sight and served
    /// from the roster afterwards. Re-resolving an existing member never
    /// queries the gateway.
    pub async fn member(
        &self,
        chat: &ChatIdentity,
        ctx: &ResolveContext,
    ) -> Result<MemberIdentity, WaddleError> {
        let user_id = ctx
            .user_id
            .ok_or_else(|| WaddleError::Internal("member context missing user id".into()))?;
        let uid = MemberUid::from_user_id(user_id);
        if let Some(existing) = self.cache.member_identity(chat.uid.as_str(), &uid) {
            return Ok(existing);
        }
        let display_name = match &ctx.nickname {
            Some(name) => name.clone(),
            None => {
                self.cache
                    .user_profile(self.gateway.as_ref(), user_id, false)
                    .await?
                    .nickname
            }
        };
        let member = MemberIdentity {
            uid,
            display_name,
            alias: ctx.alias.clone(),
        };
        self.cache
            .store_member_identity(chat.uid.as_str(), member.clone());
        Ok(member)
    }

    /// The synthetic member representing an anonymous group poster.
    pub fn anonymous_member(&self, chat: &ChatIdentity, anon: &AnonymousInfo) -> MemberIdentity {
        let uid = MemberUid::anonymous(&anon.flag);
        if let Some(existing) = self.cache.member_identity(chat.uid.as_str(), &uid) {
            return existing;
        }
        let member = MemberIdentity {
            uid,
            display_name: format!("[Anonymous] {}", anon.name),
            alias: None,
        };
        self.cache
            .store_member_identity(chat.uid.as_str(), member.clone());
        member
    }

    /// A synthetic chat for notifications that belong to no real
    /// conversation, addressed as `__<prefix>__`.
    pub fn system_chat(&self, prefix: &str, description: &str) -> ChatIdentity {
        ChatIdentity {
            uid: ChatUid::system(prefix),
            kind: ChatKind::System,
            display_name: description.to_string(),
            alias: None,
            is_discuss: false,
        }
    }
}

/// A synthetic member used as the author of in-chat system notices.
pub fn system_member(prefix: &str, name: &str) -> MemberIdentity {
    MemberIdentity {
        uid: MemberUid(format!("__{prefix}__")),
        display_name: name.to_string(),
        alias: None,
    }
}
