// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound gateway events.
//!
//! The embedding server receives webhook posts from the gateway and hands
//! the decoded JSON to the channel. These types model the three event
//! families the channel consumes: messages, notices and requests.
//! Unknown notice or request flavors fail deserialization and are dropped
//! by the caller with a log line.

use serde::Deserialize;

use waddle_core::GroupRequestKind;

use crate::segment::RawSegment;

/// Scope of an inbound message event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageScope {
    Private,
    Group,
    Discuss,
}

/// Sender block attached to message events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SenderInfo {
    #[serde(default)]
    pub nickname: Option<String>,
    /// Group card, present only in group scope.
    #[serde(default)]
    pub card: Option<String>,
}

/// Anonymous-sender block of a group message.
///
/// `flag` is the gateway's opaque handle for the anonymous session; it is
/// the only stable identifier such a sender has.
#[derive(Debug, Clone, Deserialize)]
pub struct AnonymousInfo {
    pub flag: String,
    #[serde(default)]
    pub name: String,
}

/// An inbound chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    pub message_type: MessageScope,
    #[serde(default)]
    pub sub_type: Option<String>,
    pub message_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub discuss_id: Option<i64>,
    #[serde(default)]
    pub anonymous: Option<AnonymousInfo>,
    #[serde(default)]
    pub sender: Option<SenderInfo>,
    #[serde(default)]
    pub message: Vec<RawSegment>,
}

impl MessageEvent {
    /// Nickname from the sender block, if the gateway attached one.
    pub fn sender_nickname(&self) -> Option<&str> {
        self.sender
            .as_ref()
            .and_then(|s| s.nickname.as_deref())
            .filter(|n| !n.is_empty())
    }

    /// Group card from the sender block, if set and non-empty.
    pub fn sender_card(&self) -> Option<&str> {
        self.sender
            .as_ref()
            .and_then(|s| s.card.as_deref())
            .filter(|c| !c.is_empty())
    }
}

/// File block of a `group_upload` notice.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub busid: i64,
}

/// File block of an `offline_file` notice.
#[derive(Debug, Clone, Deserialize)]
pub struct OfflineFile {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub url: String,
}

/// A state-change notice from the gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "notice_type", rename_all = "snake_case")]
pub enum NoticeEvent {
    /// A user joined a group.
    GroupIncrease {
        group_id: i64,
        user_id: i64,
        #[serde(default)]
        operator_id: Option<i64>,
        /// "approve" or "invite".
        #[serde(default)]
        sub_type: Option<String>,
    },
    /// A user left or was removed from a group.
    GroupDecrease {
        group_id: i64,
        user_id: i64,
        #[serde(default)]
        operator_id: Option<i64>,
        /// "leave", "kick" or "kick_me".
        #[serde(default)]
        sub_type: Option<String>,
    },
    /// A member was promoted to or demoted from group admin.
    GroupAdmin {
        group_id: i64,
        user_id: i64,
        /// "set" or "unset".
        #[serde(default)]
        sub_type: Option<String>,
    },
    /// A member was muted or unmuted.
    GroupBan {
        group_id: i64,
        user_id: i64,
        #[serde(default)]
        operator_id: Option<i64>,
        /// Mute length in seconds; zero on unmute.
        #[serde(default)]
        duration: i64,
        /// "ban" or "lift_ban".
        #[serde(default)]
        sub_type: Option<String>,
    },
    /// A file was uploaded to a group.
    GroupUpload {
        group_id: i64,
        user_id: i64,
        file: UploadedFile,
    },
    /// A file was sent to the bot directly.
    OfflineFile { user_id: i64, file: OfflineFile },
    /// A new friend was added.
    FriendAdd { user_id: i64 },
    /// A group message was recalled.
    GroupRecall {
        group_id: i64,
        user_id: i64,
        operator_id: i64,
        message_id: i64,
    },
    /// A private message was recalled.
    FriendRecall { user_id: i64, message_id: i64 },
}

/// An approval request from the gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "request_type", rename_all = "snake_case")]
pub enum RequestEvent {
    /// Someone asked to become a friend.
    Friend {
        user_id: i64,
        /// Opaque token echoed back when answering the request.
        flag: String,
        #[serde(default)]
        comment: String,
    },
    /// Someone asked to join a group, or invited the bot into one.
    Group {
        group_id: i64,
        user_id: i64,
        flag: String,
        sub_type: GroupRequestKind,
        #[serde(default)]
        comment: String,
    },
}
