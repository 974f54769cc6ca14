// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalized inbound messages and the outgoing message model.
//!
//! Inbound, one gateway event is flattened into one or more
//! [`NormalizedMessage`]s: a leading text message plus one message per media
//! or placeholder sub-payload, sharing the gateway message id and
//! distinguished by uid ordinal. Outbound, the framework hands the channel an
//! [`OutgoingMessage`] which the dispatcher re-encodes into gateway calls.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::identity::{Author, ChatIdentity, ChatUid, MemberIdentity, MemberUid, MessageUid};

/// The payload flavor of one delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadKind {
    Text,
    Image,
    Voice,
    Video,
    File,
    Location,
    Share,
    /// A segment kind the pipeline does not model; delivered as a textual
    /// placeholder rather than dropped.
    Unsupported,
}

/// A half-open character-offset range in flattened text marking an
/// interactive mention.
///
/// Offsets count characters, not bytes, so spans remain meaningful for CJK
/// display names. Ranges are non-overlapping and expressed in final-text
/// coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionSpan {
    pub start: usize,
    pub end: usize,
    pub target: MemberIdentity,
}

/// Reference to a gateway-hosted payload accompanying a message.
///
/// The channel never downloads or converts payloads; it forwards the name and
/// whatever URL the gateway exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub name: String,
    pub url: Option<String>,
    pub size: Option<u64>,
}

/// One fully resolved inbound message, ready for the framework sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub uid: MessageUid,
    pub chat: ChatIdentity,
    pub author: Author,
    pub kind: PayloadKind,
    pub text: String,
    pub spans: Vec<MentionSpan>,
    /// At most one payload per delivered message; events with several media
    /// segments fan out into several messages with ordinal uids.
    pub attachment: Option<AttachmentRef>,
    /// Interactive actions for request notifications (accept/decline).
    pub commands: Vec<MessageCommand>,
}

/// A message-removal notification pushed to the framework's status sink when
/// the gateway reports a recall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRemoval {
    pub chat: ChatIdentity,
    pub author: Author,
    pub uid: MessageUid,
}

/// A recall requested by the framework for a previously sent message.
#[derive(Debug, Clone, PartialEq)]
pub struct RecallRequest {
    pub uid: MessageUid,
    /// Whether the message being recalled was authored by the local account.
    /// The gateway only permits recalling our own messages.
    pub author_is_self: bool,
}

/// The caller's verdict on a pending friend or group request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDecision {
    Accept,
    Decline,
}

/// Flavor of a group join request: a direct application or an invitation.
///
/// The string forms match the gateway's `sub_type` values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupRequestKind {
    Add,
    Invite,
}

/// What an interactive request-notification button does when pressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandAction {
    ProcessFriendRequest {
        accept: bool,
        token: String,
    },
    ProcessGroupRequest {
        accept: bool,
        token: String,
        kind: GroupRequestKind,
    },
}

/// An interactive action attached to a request-notification message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCommand {
    pub label: String,
    pub action: CommandAction,
}

/// The payload flavor of an outgoing framework message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutgoingKind {
    Text,
    Link,
    Image,
    Sticker,
    Animation,
    Voice,
}

/// Where an outgoing attachment's bytes come from.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentSource {
    Path(PathBuf),
    Url(String),
    Bytes(Vec<u8>),
}

/// An attachment accompanying an outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingAttachment {
    pub file_name: String,
    pub source: AttachmentSource,
}

/// The message an outgoing reply quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteTarget {
    pub uid: MessageUid,
    pub text: String,
    pub author_uid: MemberUid,
    pub author_is_self: bool,
}

/// One outgoing message handed to the dispatcher by the framework.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub chat_uid: ChatUid,
    pub kind: OutgoingKind,
    pub text: String,
    pub attachment: Option<OutgoingAttachment>,
    /// Uid of a previously sent message this one replaces. Presence makes the
    /// send an edit: the prior message is recalled before the new send.
    pub edit_of: Option<MessageUid>,
    pub reply_to: Option<QuoteTarget>,
}

impl OutgoingMessage {
    /// Plain text message to a chat, no reply, no edit.
    pub fn text(chat_uid: ChatUid, text: impl Into<String>) -> Self {
        Self {
            chat_uid,
            kind: OutgoingKind::Text,
            text: text.into(),
            attachment: None,
            edit_of: None,
            reply_to: None,
        }
    }
}
