// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity cache over the gateway's contact APIs.
//!
//! Friend and group tables are replaced wholesale on refresh behind
//! [`ArcSwap`], so readers always see a complete table and never a torn
//! update. Stranger profiles are cached for the session. Group member rosters
//! carry a TTL; everything else is only invalidated by an explicit refresh.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arc_swap::{ArcSwap, ArcSwapOption};
use dashmap::DashMap;
use tracing::{debug, warn};

use waddle_core::error::WaddleError;
use waddle_core::identity::{ChatIdentity, MemberIdentity, MemberUid};
use waddle_gateway::Gateway;
use waddle_gateway::types::{FriendEntry, GroupEntry, GroupMemberEntry, LoginInfo, StrangerEntry};

use crate::delivery::Alerter;

/// Session-wide identity cache shared by the resolver, the flattener, and
/// the contact refresh loop.
pub struct CacheStore {
    member_ttl: Duration,
    friends: ArcSwap<Vec<FriendEntry>>,
    groups: ArcSwap<Vec<GroupEntry>>,
    strangers: DashMap<i64, StrangerEntry>,
    rosters: DashMap<i64, RosterEntry>,
    /// Groups learned through individual lookups that are absent from the
    /// whole-table listing (left groups, request notifications). Append-only
    /// for the session.
    extra_groups: Mutex<Vec<GroupEntry>>,
    discuss_chats: Mutex<Vec<ChatIdentity>>,
    /// Resolved member identities, keyed by (chat uid, member uid). Kept for
    /// the whole session so repeated resolution is lookup-only.
    members: DashMap<(String, String), MemberIdentity>,
    login: ArcSwapOption<LoginInfo>,
}

struct RosterEntry {
    fetched_at: Instant,
    members: Arc<Vec<GroupMemberEntry>>,
}

/// A user profile merged from the friend table or the stranger cache.
///
/// `remark` always holds something displayable: the friend remark when one is
/// set, otherwise the nickname.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub nickname: String,
    pub remark: String,
    pub is_friend: bool,
}

impl CacheStore {
    pub fn new(member_ttl: Duration) -> Self {
        Self {
            member_ttl,
            friends: ArcSwap::from_pointee(Vec::new()),
            groups: ArcSwap::from_pointee(Vec::new()),
            strangers: DashMap::new(),
            rosters: DashMap::new(),
            extra_groups: Mutex::new(Vec::new()),
            discuss_chats: Mutex::new(Vec::new()),
            members: DashMap::new(),
            login: ArcSwapOption::empty(),
        }
    }

    /// Replaces the friend table with a fresh listing. Empty remarks are
    /// normalized to the nickname at load time so lookups never see one.
    pub async fn refresh_friends(&self, gateway: &dyn Gateway) -> Result<(), WaddleError> {
        let mut list = gateway.get_friend_list().await?;
        for friend in &mut list {
            if friend.remark.is_empty() {
                friend.remark = friend.nickname.clone();
            }
        }
        debug!(count = list.len(), "friend table refreshed");
        metrics::counter!("waddle_cache_refresh_total", "table" => "friends").increment(1);
        self.friends.store(Arc::new(list));
        Ok(())
    }

    /// Replaces the group table with a fresh listing.
    pub async fn refresh_groups(&self, gateway: &dyn Gateway) -> Result<(), WaddleError> {
        let list = gateway.get_group_list().await?;
        debug!(count = list.len(), "group table refreshed");
        metrics::counter!("waddle_cache_refresh_total", "table" => "groups").increment(1);
        self.groups.store(Arc::new(list));
        Ok(())
    }

    /// Looks up a friend, refreshing the whole table first when the caller
    /// bypasses the cache or the table has never been loaded.
    pub async fn friend(
        &self,
        gateway: &dyn Gateway,
        user_id: i64,
        no_cache: bool,
    ) -> Result<Option<FriendEntry>, WaddleError> {
        if no_cache || self.friends.load().is_empty() {
            self.refresh_friends(gateway).await?;
        }
        Ok(self
            .friends
            .load()
            .iter()
            .find(|f| f.user_id == user_id)
            .cloned())
    }

    /// Profile of an arbitrary user. Friends resolve from the friend table;
    /// everyone else through the stranger cache, which keeps entries for the
    /// whole session.
    pub async fn user_profile(
        &self,
        gateway: &dyn Gateway,
        user_id: i64,
        no_cache: bool,
    ) -> Result<UserProfile, WaddleError> {
        if let Some(friend) = self.friend(gateway, user_id, no_cache).await? {
            return Ok(UserProfile {
                nickname: friend.nickname,
                remark: friend.remark,
                is_friend: true,
            });
        }
        let stranger = self.stranger(gateway, user_id, no_cache).await?;
        Ok(UserProfile {
            remark: stranger.nickname.clone(),
            nickname: stranger.nickname,
            is_friend: false,
        })
    }

    async fn stranger(
        &self,
        gateway: &dyn Gateway,
        user_id: i64,
        no_cache: bool,
    ) -> Result<StrangerEntry, WaddleError> {
        if !no_cache {
            if let Some(hit) = self.strangers.get(&user_id) {
                return Ok(hit.value().clone());
            }
        }
        let entry = gateway.get_stranger_info(user_id, no_cache).await?;
        self.strangers.insert(user_id, entry.clone());
        Ok(entry)
    }

    /// Looks up a group by id.
    ///
    /// Misses consult, in order: the whole-table listing (refreshed when
    /// stale or empty), the session's extra-group side list, and finally a
    /// direct gateway query whose result is appended to the side list. An
    /// unresolvable group yields `Ok(None)`; only table-refresh failures
    /// propagate.
    pub async fn group(
        &self,
        gateway: &dyn Gateway,
        group_id: i64,
        no_cache: bool,
    ) -> Result<Option<GroupEntry>, WaddleError> {
        if no_cache || self.groups.load().is_empty() {
            self.refresh_groups(gateway).await?;
        }
        if let Some(hit) = self
            .groups
            .load()
            .iter()
            .find(|g| g.group_id == group_id)
            .cloned()
        {
            return Ok(Some(hit));
        }
        if let Some(hit) = self
            .extra_groups
            .lock()
            .ok()
            .and_then(|extra| extra.iter().find(|g| g.group_id == group_id).cloned())
        {
            return Ok(Some(hit));
        }
        match gateway.get_group_info(group_id, no_cache).await {
            Ok(entry) => {
                if let Ok(mut extra) = self.extra_groups.lock() {
                    extra.push(entry.clone());
                }
                Ok(Some(entry))
            }
            Err(err) => {
                warn!(group_id, error = %err, "group lookup failed");
                Ok(None)
            }
        }
    }

    /// The member roster of one group, from cache while fresh.
    ///
    /// A failed fetch raises an operator alert and returns an empty roster
    /// rather than an error; the stale entry (if any) is left in place so the
    /// next call retries.
    pub async fn group_members(
        &self,
        gateway: &dyn Gateway,
        alerter: &Alerter,
        group_id: i64,
        no_cache: bool,
    ) -> Arc<Vec<GroupMemberEntry>> {
        if !no_cache {
            if let Some(entry) = self.rosters.get(&group_id) {
                if entry.fetched_at.elapsed() < self.member_ttl {
                    return Arc::clone(&entry.members);
                }
            }
        }
        match gateway.get_group_member_list(group_id).await {
            Ok(list) => {
                let members = Arc::new(list);
                self.rosters.insert(
                    group_id,
                    RosterEntry {
                        fetched_at: Instant::now(),
                        members: Arc::clone(&members),
                    },
                );
                members
            }
            Err(err) => {
                warn!(group_id, error = %err, "group member roster fetch failed");
                alerter
                    .alert("Failed to get the group member details.")
                    .await;
                Arc::new(Vec::new())
            }
        }
    }

    /// Finds one member inside a group roster, fetching a fresh roster once
    /// when the cached copy does not contain them.
    pub async fn find_member(
        &self,
        gateway: &dyn Gateway,
        alerter: &Alerter,
        group_id: i64,
        user_id: i64,
    ) -> Option<GroupMemberEntry> {
        let roster = self.group_members(gateway, alerter, group_id, false).await;
        if let Some(member) = roster.iter().find(|m| m.user_id == user_id) {
            return Some(member.clone());
        }
        let roster = self.group_members(gateway, alerter, group_id, true).await;
        roster.iter().find(|m| m.user_id == user_id).cloned()
    }

    /// The bot's own account info, fetched once per session.
    pub async fn login_info(&self, gateway: &dyn Gateway) -> Result<LoginInfo, WaddleError> {
        if let Some(info) = self.login.load_full() {
            return Ok((*info).clone());
        }
        let info = gateway.get_login_info().await?;
        self.login.store(Some(Arc::new(info.clone())));
        Ok(info)
    }

    pub fn member_identity(&self, chat_uid: &str, member_uid: &MemberUid) -> Option<MemberIdentity> {
        self.members
            .get(&(chat_uid.to_string(), member_uid.as_str().to_string()))
            .map(|m| m.value().clone())
    }

    pub fn store_member_identity(&self, chat_uid: &str, member: MemberIdentity) {
        self.members.insert(
            (chat_uid.to_string(), member.uid.as_str().to_string()),
            member,
        );
    }

    /// Remembers a discuss chat seen this session. Discuss chats cannot be
    /// listed through the gateway, so the channel only knows the ones that
    /// already produced traffic.
    pub fn note_discuss(&self, chat: &ChatIdentity) {
        if let Ok(mut list) = self.discuss_chats.lock() {
            if !list.iter().any(|c| c.uid == chat.uid) {
                list.push(chat.clone());
            }
        }
    }

    pub fn discuss_chats(&self) -> Vec<ChatIdentity> {
        self.discuss_chats
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    pub fn friends_snapshot(&self) -> Arc<Vec<FriendEntry>> {
        self.friends.load_full()
    }

    pub fn groups_snapshot(&self) -> Arc<Vec<GroupEntry>> {
        self.groups.load_full()
    }

    pub fn extra_groups_snapshot(&self) -> Vec<GroupEntry> {
        self.extra_groups
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use waddle_core::identity::{ChatKind, ChatUid};
    use waddle_core::sink::ForwardSink;
    use waddle_test_utils::{CaptureSink, MockGateway};

    use crate::delivery::DeliveryPool;

    use super::*;

    fn alerter(sink: &Arc<CaptureSink>) -> Alerter {
        let pool = DeliveryPool::start(
            Arc::clone(sink) as Arc<dyn ForwardSink>,
            &waddle_config::DeliveryConfig::default(),
            CancellationToken::new(),
        );
        Alerter::new(pool)
    }

    #[tokio::test]
    async fn friend_lookup_refreshes_once_then_serves_from_cache() {
        let gateway = MockGateway::new();
        gateway.set_friends(vec![FriendEntry {
            user_id: 7,
            nickname: "alice".into(),
            remark: String::new(),
        }]);
        let cache = CacheStore::new(Duration::from_secs(3600));

        let first = cache.friend(&gateway, 7, false).await.unwrap().unwrap();
        let second = cache.friend(&gateway, 7, false).await.unwrap().unwrap();

        assert_eq!(first.nickname, "alice");
        // Empty remark normalized to the nickname at refresh time.
        assert_eq!(second.remark, "alice");
        assert_eq!(gateway.calls.friend_list(), 1);
    }

    #[tokio::test]
    async fn friend_miss_does_not_trigger_a_second_refresh() {
        let gateway = MockGateway::new();
        gateway.set_friends(vec![FriendEntry {
            user_id: 7,
            nickname: "alice".into(),
            remark: String::new(),
        }]);
        let cache = CacheStore::new(Duration::from_secs(3600));

        assert!(cache.friend(&gateway, 999, false).await.unwrap().is_none());
        assert!(cache.friend(&gateway, 999, false).await.unwrap().is_none());
        assert_eq!(gateway.calls.friend_list(), 1);
    }

    #[tokio::test]
    async fn stranger_profiles_are_cached_for_the_session() {
        let gateway = MockGateway::new();
        gateway.add_stranger(55, "bob");
        let cache = CacheStore::new(Duration::from_secs(3600));

        let profile = cache.user_profile(&gateway, 55, false).await.unwrap();
        assert_eq!(profile.nickname, "bob");
        assert_eq!(profile.remark, "bob");
        assert!(!profile.is_friend);

        cache.user_profile(&gateway, 55, false).await.unwrap();
        assert_eq!(gateway.calls.stranger_info(), 1);
    }

    #[tokio::test]
    async fn unlisted_group_comes_from_side_list_without_requerying() {
        let gateway = MockGateway::new();
        gateway.set_groups(vec![GroupEntry {
            group_id: 1,
            group_name: "listed".into(),
        }]);
        gateway.add_group_info(2, "hidden");
        let cache = CacheStore::new(Duration::from_secs(3600));

        let hit = cache.group(&gateway, 2, false).await.unwrap().unwrap();
        assert_eq!(hit.group_name, "hidden");
        assert_eq!(gateway.calls.group_info(), 1);

        // Second lookup is served from the side list.
        let hit = cache.group(&gateway, 2, false).await.unwrap().unwrap();
        assert_eq!(hit.group_name, "hidden");
        assert_eq!(gateway.calls.group_info(), 1);
    }

    #[tokio::test]
    async fn unknown_group_resolves_to_none() {
        let gateway = MockGateway::new();
        gateway.set_groups(vec![GroupEntry {
            group_id: 1,
            group_name: "listed".into(),
        }]);
        gateway.fail_group_info();
        let cache = CacheStore::new(Duration::from_secs(3600));

        assert!(cache.group(&gateway, 404, false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn roster_failure_alerts_and_returns_empty() {
        let gateway = MockGateway::new();
        gateway.fail_member_list();
        let sink = Arc::new(CaptureSink::new());
        let alerter = alerter(&sink);
        let cache = CacheStore::new(Duration::from_secs(3600));

        let roster = cache.group_members(&gateway, &alerter, 99, false).await;
        assert!(roster.is_empty());

        tokio::time::timeout(Duration::from_secs(2), sink.wait_for_messages(1))
            .await
            .unwrap();
        assert!(sink.messages()[0].text.contains("group member details"));
    }

    #[tokio::test]
    async fn member_miss_forces_one_fresh_roster_fetch() {
        let gateway = MockGateway::new();
        gateway.set_group_members(9, vec![GroupMemberEntry {
            user_id: 1,
            nickname: "first".into(),
            card: String::new(),
        }]);
        let sink = Arc::new(CaptureSink::new());
        let alerter = alerter(&sink);
        let cache = CacheStore::new(Duration::from_secs(3600));

        // Warm the roster, then add a member the cached copy missed.
        assert!(cache.find_member(&gateway, &alerter, 9, 1).await.is_some());
        gateway.set_group_members(9, vec![
            GroupMemberEntry {
                user_id: 1,
                nickname: "first".into(),
                card: String::new(),
            },
            GroupMemberEntry {
                user_id: 2,
                nickname: "second".into(),
                card: "card2".into(),
            },
        ]);

        let found = cache.find_member(&gateway, &alerter, 9, 2).await.unwrap();
        assert_eq!(found.card, "card2");
    }

    #[tokio::test]
    async fn login_info_is_fetched_once() {
        let gateway = MockGateway::new();
        gateway.set_login(10_000, "me");
        let cache = CacheStore::new(Duration::from_secs(3600));

        assert_eq!(cache.login_info(&gateway).await.unwrap().user_id, 10_000);
        assert_eq!(cache.login_info(&gateway).await.unwrap().nickname, "me");
        assert_eq!(gateway.calls.login_info(), 1);
    }

    #[test]
    fn discuss_chats_deduplicate_by_uid() {
        let cache = CacheStore::new(Duration::from_secs(3600));
        let chat = ChatIdentity {
            uid: ChatUid::discuss(5),
            kind: ChatKind::Discuss,
            display_name: "Discuss Group_5".into(),
            alias: None,
            is_discuss: true,
        };
        cache.note_discuss(&chat);
        cache.note_discuss(&chat);
        assert_eq!(cache.discuss_chats().len(), 1);
    }
}
