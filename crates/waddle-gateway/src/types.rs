// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the QQ gateway HTTP API.
//!
//! Every gateway response is an envelope `{status, retcode, data}`; the
//! structs here model the `data` payloads of the actions Waddle consumes.
//! Unknown fields are ignored so newer gateway builds stay compatible.

use serde::Deserialize;

use waddle_core::{ChatKind, ChatUid, WaddleError};

// --- Response envelope ---

/// The envelope every gateway action responds with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// "ok", "failed" or "async".
    pub status: String,
    /// Zero on success; gateway-specific failure code otherwise.
    #[serde(default)]
    pub retcode: i64,
    /// Action payload; absent on failures and async acks.
    pub data: Option<T>,
}

// --- Status and identity payloads ---

/// Payload of `get_status`.
///
/// The gateway reports `online` (account reachable from the QQ servers)
/// and `good` (plugin internals healthy) separately; both must hold for
/// the link to count as usable.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub good: bool,
}

/// Payload of `get_login_info`: the bot's own account.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoginInfo {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
}

/// One row of `get_friend_list`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FriendEntry {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    /// User-assigned remark; empty string when unset.
    #[serde(default)]
    pub remark: String,
}

/// Payload of `get_stranger_info`: a user outside the friend roster.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StrangerEntry {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
}

/// One row of `get_group_list`, also the payload of `get_group_info`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GroupEntry {
    pub group_id: i64,
    #[serde(default)]
    pub group_name: String,
}

/// One row of `get_group_member_list`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GroupMemberEntry {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    /// Group card (per-group display name); empty string when unset.
    #[serde(default)]
    pub card: String,
}

// --- Message payloads ---

/// Payload of `send_msg`: the gateway-assigned id of the sent message.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: i64,
}

/// Payload of `get_group_file_url`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FileUrl {
    pub url: String,
}

/// Payload of `get_forward_msg`: the messages bundled into a forward.
#[derive(Debug, Clone, Deserialize)]
pub struct ForwardBundle {
    #[serde(default)]
    pub messages: Vec<ForwardNode>,
}

/// One message inside a forward bundle.
#[derive(Debug, Clone, Deserialize)]
pub struct ForwardNode {
    pub sender: ForwardSender,
    /// Segments of the bundled message; may itself contain `forward`
    /// segments, which callers resolve recursively.
    #[serde(default)]
    pub content: Vec<crate::segment::RawSegment>,
}

/// Original author of a message inside a forward bundle.
#[derive(Debug, Clone, Deserialize)]
pub struct ForwardSender {
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
}

// --- Send targets ---

/// Destination of a `send_msg` call, derived from a chat uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTarget {
    Private { user_id: i64 },
    Group { group_id: i64 },
    Discuss { discuss_id: i64 },
}

impl MessageTarget {
    /// Derives the send target from a chat uid.
    ///
    /// System chats have no gateway id and cannot be sent to.
    pub fn from_chat_uid(uid: &ChatUid) -> Result<Self, WaddleError> {
        let (kind, id) = uid.parse()?;
        match kind {
            ChatKind::Private => Ok(MessageTarget::Private { user_id: id }),
            ChatKind::Group => Ok(MessageTarget::Group { group_id: id }),
            ChatKind::Discuss => Ok(MessageTarget::Discuss { discuss_id: id }),
            ChatKind::System => Err(WaddleError::UnsupportedOperation(
                "cannot send to a system chat".to_string(),
            )),
        }
    }

    /// The `message_type` value the gateway expects.
    pub fn message_type(&self) -> &'static str {
        match self {
            MessageTarget::Private { .. } => "private",
            MessageTarget::Group { .. } => "group",
            MessageTarget::Discuss { .. } => "discuss",
        }
    }

    /// Serializes the target into the params of a `send_msg` call.
    pub fn write_params(&self, params: &mut serde_json::Map<String, serde_json::Value>) {
        params.insert(
            "message_type".to_string(),
            serde_json::Value::String(self.message_type().to_string()),
        );
        let (key, id) = match self {
            MessageTarget::Private { user_id } => ("user_id", *user_id),
            MessageTarget::Group { group_id } => ("group_id", *group_id),
            MessageTarget::Discuss { discuss_id } => ("discuss_id", *discuss_id),
        };
        params.insert(key.to_string(), serde_json::Value::from(id));
    }
}
