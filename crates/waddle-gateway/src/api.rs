// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The gateway operation surface.
//!
//! [`Gateway`] abstracts the QQ gateway actions the channel consumes so
//! the pipeline can run against [`crate::client::HttpGateway`] in
//! production and a scripted double in tests.

use async_trait::async_trait;

use waddle_core::{GroupRequestKind, WaddleError};

use crate::types::{
    ForwardNode, FriendEntry, GroupEntry, GroupMemberEntry, LoginInfo, MessageTarget,
    StatusPayload, StrangerEntry,
};

/// Client-side view of the gateway HTTP API.
///
/// Errors split along the transport boundary: a gateway that cannot be
/// reached at all yields [`WaddleError::TransportUnreachable`], while a
/// reachable gateway refusing an action yields [`WaddleError::ApiFailure`]
/// with the HTTP status and gateway retcode.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Link health as the gateway reports it.
    async fn get_status(&self) -> Result<StatusPayload, WaddleError>;

    /// The bot's own account.
    async fn get_login_info(&self) -> Result<LoginInfo, WaddleError>;

    /// Profile of a user outside the friend roster.
    async fn get_stranger_info(
        &self,
        user_id: i64,
        no_cache: bool,
    ) -> Result<StrangerEntry, WaddleError>;

    /// The full friend roster.
    async fn get_friend_list(&self) -> Result<Vec<FriendEntry>, WaddleError>;

    /// All groups the account belongs to.
    async fn get_group_list(&self) -> Result<Vec<GroupEntry>, WaddleError>;

    /// Profile of one group, bypassing gateway caches when `no_cache`.
    async fn get_group_info(&self, group_id: i64, no_cache: bool)
        -> Result<GroupEntry, WaddleError>;

    /// The member roster of one group.
    async fn get_group_member_list(
        &self,
        group_id: i64,
    ) -> Result<Vec<GroupMemberEntry>, WaddleError>;

    /// Download URL for a file stored in a group.
    async fn get_group_file_url(
        &self,
        group_id: i64,
        file_id: &str,
        bus_id: i64,
    ) -> Result<String, WaddleError>;

    /// The messages bundled into a merged forward.
    async fn get_forward_msg(&self, forward_id: &str) -> Result<Vec<ForwardNode>, WaddleError>;

    /// Sends a CQ-markup message; returns the gateway message id.
    async fn send_msg(&self, target: MessageTarget, message: &str) -> Result<i64, WaddleError>;

    /// Recalls a previously sent message.
    async fn delete_msg(&self, message_id: i64) -> Result<(), WaddleError>;

    /// Removes a member from a group.
    async fn set_group_kick(&self, group_id: i64, user_id: i64) -> Result<(), WaddleError>;

    /// Answers a pending friend request.
    async fn set_friend_add_request(&self, flag: &str, approve: bool) -> Result<(), WaddleError>;

    /// Answers a pending group join request or invitation.
    async fn set_group_add_request(
        &self,
        flag: &str,
        kind: GroupRequestKind,
        approve: bool,
    ) -> Result<(), WaddleError>;
}
