// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted gateway double for deterministic testing.
//!
//! `MockGateway` implements `Gateway` against in-memory rosters configured
//! by the test, captures every mutating call for assertion, and counts
//! lookups so caching behavior can be verified. Individual endpoints can be
//! switched into failure mode.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;

use waddle_core::{GroupRequestKind, WaddleError};
use waddle_gateway::Gateway;
use waddle_gateway::types::{
    ForwardNode, FriendEntry, GroupEntry, GroupMemberEntry, LoginInfo, MessageTarget,
    StatusPayload, StrangerEntry,
};

/// One scripted answer for a `get_status` probe.
///
/// Queued via [`MockGateway::queue_status`] and consumed in order; an empty
/// queue answers `Healthy`.
#[derive(Debug, Clone, Copy)]
pub enum ScriptedStatus {
    /// `online` and `good` both set.
    Healthy,
    /// Explicit flag combination.
    Flagged { online: bool, good: bool },
    /// The probe fails at the transport level.
    Unreachable,
    /// The probe fails with an API error.
    ApiError { status: u16, retcode: i64 },
}

/// Per-endpoint lookup counters.
#[derive(Debug, Default)]
pub struct CallCounts {
    friend_list: AtomicUsize,
    group_list: AtomicUsize,
    stranger_info: AtomicUsize,
    group_info: AtomicUsize,
    member_list: AtomicUsize,
    login_info: AtomicUsize,
    forward_msg: AtomicUsize,
    status: AtomicUsize,
}

impl CallCounts {
    pub fn friend_list(&self) -> usize {
        self.friend_list.load(Ordering::SeqCst)
    }

    pub fn group_list(&self) -> usize {
        self.group_list.load(Ordering::SeqCst)
    }

    pub fn stranger_info(&self) -> usize {
        self.stranger_info.load(Ordering::SeqCst)
    }

    pub fn group_info(&self) -> usize {
        self.group_info.load(Ordering::SeqCst)
    }

    pub fn member_list(&self) -> usize {
        self.member_list.load(Ordering::SeqCst)
    }

    pub fn login_info(&self) -> usize {
        self.login_info.load(Ordering::SeqCst)
    }

    pub fn forward_msg(&self) -> usize {
        self.forward_msg.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> usize {
        self.status.load(Ordering::SeqCst)
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// A scripted QQ gateway for testing.
///
/// State falls in three groups:
/// - **rosters**: friends, groups, members, strangers and forwards returned
///   by lookups
/// - **captures**: sent messages, recalls, kicks and request decisions
/// - **failure switches**: per-endpoint toggles that turn calls into
///   `ApiFailure` responses
pub struct MockGateway {
    /// Lookup counters, readable directly from tests.
    pub calls: CallCounts,
    friends: Mutex<Vec<FriendEntry>>,
    groups: Mutex<Vec<GroupEntry>>,
    strangers: Mutex<HashMap<i64, String>>,
    group_infos: Mutex<HashMap<i64, String>>,
    members: Mutex<HashMap<i64, Vec<GroupMemberEntry>>>,
    login: Mutex<Option<LoginInfo>>,
    forwards: Mutex<HashMap<String, Vec<ForwardNode>>>,
    statuses: Mutex<VecDeque<ScriptedStatus>>,
    file_url: Mutex<Option<String>>,
    next_message_id: AtomicI64,
    sent: Mutex<Vec<(MessageTarget, String)>>,
    deleted: Mutex<Vec<i64>>,
    kicked: Mutex<Vec<(i64, i64)>>,
    friend_decisions: Mutex<Vec<(String, bool)>>,
    group_decisions: Mutex<Vec<(String, GroupRequestKind, bool)>>,
    friend_list_failure: Mutex<Option<(u16, i64)>>,
    fail_group_list: AtomicBool,
    fail_group_info: AtomicBool,
    fail_member_list: AtomicBool,
    fail_forward_msg: AtomicBool,
    fail_delete_msg: AtomicBool,
    fail_approvals: AtomicBool,
}

fn api_failure(action: &str, status: u16, retcode: i64) -> WaddleError {
    WaddleError::ApiFailure {
        message: format!("scripted failure for {action}"),
        status,
        retcode,
    }
}

impl MockGateway {
    /// A gateway with empty rosters that answers every probe `Healthy` and
    /// assigns message ids starting at 1.
    pub fn new() -> Self {
        Self {
            calls: CallCounts::default(),
            friends: Mutex::new(Vec::new()),
            groups: Mutex::new(Vec::new()),
            strangers: Mutex::new(HashMap::new()),
            group_infos: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
            login: Mutex::new(None),
            forwards: Mutex::new(HashMap::new()),
            statuses: Mutex::new(VecDeque::new()),
            file_url: Mutex::new(None),
            next_message_id: AtomicI64::new(1),
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            kicked: Mutex::new(Vec::new()),
            friend_decisions: Mutex::new(Vec::new()),
            group_decisions: Mutex::new(Vec::new()),
            friend_list_failure: Mutex::new(None),
            fail_group_list: AtomicBool::new(false),
            fail_group_info: AtomicBool::new(false),
            fail_member_list: AtomicBool::new(false),
            fail_forward_msg: AtomicBool::new(false),
            fail_delete_msg: AtomicBool::new(false),
            fail_approvals: AtomicBool::new(false),
        }
    }

    // --- roster setup ---

    pub fn set_friends(&self, friends: Vec<FriendEntry>) {
        *self.friends.lock().unwrap() = friends;
    }

    pub fn set_groups(&self, groups: Vec<GroupEntry>) {
        *self.groups.lock().unwrap() = groups;
    }

    /// Registers a stranger profile answered by `get_stranger_info`.
    pub fn add_stranger(&self, user_id: i64, nickname: &str) {
        self.strangers
            .lock()
            .unwrap()
            .insert(user_id, nickname.to_string());
    }

    /// Registers a group answered by `get_group_info` but absent from the
    /// group listing.
    pub fn add_group_info(&self, group_id: i64, group_name: &str) {
        self.group_infos
            .lock()
            .unwrap()
            .insert(group_id, group_name.to_string());
    }

    /// Replaces the member roster of one group.
    pub fn set_group_members(&self, group_id: i64, members: Vec<GroupMemberEntry>) {
        self.members.lock().unwrap().insert(group_id, members);
    }

    pub fn set_login(&self, user_id: i64, nickname: &str) {
        *self.login.lock().unwrap() = Some(LoginInfo {
            user_id,
            nickname: nickname.to_string(),
        });
    }

    /// Registers a forward bundle answered by `get_forward_msg`.
    pub fn add_forward(&self, forward_id: &str, nodes: Vec<ForwardNode>) {
        self.forwards
            .lock()
            .unwrap()
            .insert(forward_id.to_string(), nodes);
    }

    /// Queues one scripted status probe answer.
    pub fn queue_status(&self, status: ScriptedStatus) {
        self.statuses.lock().unwrap().push_back(status);
    }

    /// Sets the id assigned to the next sent message; later sends count up
    /// from there.
    pub fn set_next_message_id(&self, id: i64) {
        self.next_message_id.store(id, Ordering::SeqCst);
    }

    pub fn set_file_url(&self, url: &str) {
        *self.file_url.lock().unwrap() = Some(url.to_string());
    }

    // --- failure switches ---

    pub fn fail_friend_list(&self) {
        *self.friend_list_failure.lock().unwrap() = Some((500, -1));
    }

    /// Fails `get_friend_list` with a specific HTTP status and retcode.
    pub fn fail_friend_list_code(&self, status: u16, retcode: i64) {
        *self.friend_list_failure.lock().unwrap() = Some((status, retcode));
    }

    pub fn fail_group_list(&self) {
        self.fail_group_list.store(true, Ordering::SeqCst);
    }

    pub fn fail_group_info(&self) {
        self.fail_group_info.store(true, Ordering::SeqCst);
    }

    pub fn fail_member_list(&self) {
        self.fail_member_list.store(true, Ordering::SeqCst);
    }

    pub fn fail_forward_msg(&self) {
        self.fail_forward_msg.store(true, Ordering::SeqCst);
    }

    pub fn fail_delete_msg(&self) {
        self.fail_delete_msg.store(true, Ordering::SeqCst);
    }

    /// Fails both friend and group request approvals.
    pub fn fail_approvals(&self) {
        self.fail_approvals.store(true, Ordering::SeqCst);
    }

    // --- captures ---

    /// All `send_msg` calls in order.
    pub fn sent_messages(&self) -> Vec<(MessageTarget, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// All `delete_msg` calls in order.
    pub fn deleted_messages(&self) -> Vec<i64> {
        self.deleted.lock().unwrap().clone()
    }

    /// All `set_group_kick` calls as (group id, user id).
    pub fn kicked_members(&self) -> Vec<(i64, i64)> {
        self.kicked.lock().unwrap().clone()
    }

    /// All answered friend requests as (flag, approve).
    pub fn friend_decisions(&self) -> Vec<(String, bool)> {
        self.friend_decisions.lock().unwrap().clone()
    }

    /// All answered group requests as (flag, kind, approve).
    pub fn group_decisions(&self) -> Vec<(String, GroupRequestKind, bool)> {
        self.group_decisions.lock().unwrap().clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn get_status(&self) -> Result<StatusPayload, WaddleError> {
        CallCounts::bump(&self.calls.status);
        let scripted = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedStatus::Healthy);
        match scripted {
            ScriptedStatus::Healthy => Ok(StatusPayload {
                online: true,
                good: true,
            }),
            ScriptedStatus::Flagged { online, good } => Ok(StatusPayload { online, good }),
            ScriptedStatus::Unreachable => Err(WaddleError::TransportUnreachable {
                message: "scripted transport failure".to_string(),
                source: None,
            }),
            ScriptedStatus::ApiError { status, retcode } => {
                Err(api_failure("get_status", status, retcode))
            }
        }
    }

    async fn get_login_info(&self) -> Result<LoginInfo, WaddleError> {
        CallCounts::bump(&self.calls.login_info);
        self.login
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| api_failure("get_login_info", 200, 100))
    }

    async fn get_stranger_info(
        &self,
        user_id: i64,
        _no_cache: bool,
    ) -> Result<StrangerEntry, WaddleError> {
        CallCounts::bump(&self.calls.stranger_info);
        self.strangers
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|nickname| StrangerEntry {
                user_id,
                nickname: nickname.clone(),
            })
            .ok_or_else(|| api_failure("get_stranger_info", 200, 100))
    }

    async fn get_friend_list(&self) -> Result<Vec<FriendEntry>, WaddleError> {
        CallCounts::bump(&self.calls.friend_list);
        if let Some((status, retcode)) = *self.friend_list_failure.lock().unwrap() {
            return Err(api_failure("get_friend_list", status, retcode));
        }
        Ok(self.friends.lock().unwrap().clone())
    }

    async fn get_group_list(&self) -> Result<Vec<GroupEntry>, WaddleError> {
        CallCounts::bump(&self.calls.group_list);
        if self.fail_group_list.load(Ordering::SeqCst) {
            return Err(api_failure("get_group_list", 500, -1));
        }
        Ok(self.groups.lock().unwrap().clone())
    }

    async fn get_group_info(
        &self,
        group_id: i64,
        _no_cache: bool,
    ) -> Result<GroupEntry, WaddleError> {
        CallCounts::bump(&self.calls.group_info);
        if self.fail_group_info.load(Ordering::SeqCst) {
            return Err(api_failure("get_group_info", 500, -1));
        }
        self.group_infos
            .lock()
            .unwrap()
            .get(&group_id)
            .map(|name| GroupEntry {
                group_id,
                group_name: name.clone(),
            })
            .ok_or_else(|| api_failure("get_group_info", 200, 100))
    }

    async fn get_group_member_list(
        &self,
        group_id: i64,
    ) -> Result<Vec<GroupMemberEntry>, WaddleError> {
        CallCounts::bump(&self.calls.member_list);
        if self.fail_member_list.load(Ordering::SeqCst) {
            return Err(api_failure("get_group_member_list", 500, -1));
        }
        Ok(self
            .members
            .lock()
            .unwrap()
            .get(&group_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_group_file_url(
        &self,
        _group_id: i64,
        _file_id: &str,
        _bus_id: i64,
    ) -> Result<String, WaddleError> {
        self.file_url
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| api_failure("get_group_file_url", 200, 100))
    }

    async fn get_forward_msg(&self, forward_id: &str) -> Result<Vec<ForwardNode>, WaddleError> {
        CallCounts::bump(&self.calls.forward_msg);
        if self.fail_forward_msg.load(Ordering::SeqCst) {
            return Err(api_failure("get_forward_msg", 500, -1));
        }
        self.forwards
            .lock()
            .unwrap()
            .get(forward_id)
            .cloned()
            .ok_or_else(|| api_failure("get_forward_msg", 200, 100))
    }

    async fn send_msg(&self, target: MessageTarget, message: &str) -> Result<i64, WaddleError> {
        self.sent
            .lock()
            .unwrap()
            .push((target, message.to_string()));
        Ok(self.next_message_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn delete_msg(&self, message_id: i64) -> Result<(), WaddleError> {
        if self.fail_delete_msg.load(Ordering::SeqCst) {
            return Err(api_failure("delete_msg", 500, -1));
        }
        self.deleted.lock().unwrap().push(message_id);
        Ok(())
    }

    async fn set_group_kick(&self, group_id: i64, user_id: i64) -> Result<(), WaddleError> {
        self.kicked.lock().unwrap().push((group_id, user_id));
        Ok(())
    }

    async fn set_friend_add_request(&self, flag: &str, approve: bool) -> Result<(), WaddleError> {
        if self.fail_approvals.load(Ordering::SeqCst) {
            return Err(api_failure("set_friend_add_request", 500, -1));
        }
        self.friend_decisions
            .lock()
            .unwrap()
            .push((flag.to_string(), approve));
        Ok(())
    }

    async fn set_group_add_request(
        &self,
        flag: &str,
        kind: GroupRequestKind,
        approve: bool,
    ) -> Result<(), WaddleError> {
        if self.fail_approvals.load(Ordering::SeqCst) {
            return Err(api_failure("set_group_add_request", 500, -1));
        }
        self.group_decisions
            .lock()
            .unwrap()
            .push((flag.to_string(), kind, approve));
        Ok(())
    }
}
