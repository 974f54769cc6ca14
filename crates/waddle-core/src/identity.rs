// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat, member, and message identities.
//!
//! Every chat the gateway knows is addressed by a namespaced string uid
//! (`private_<id>`, `group_<id>`, `discuss_<id>`, or `__<prefix>__` for
//! synthetic system chats). The namespace prefix uniquely determines the chat
//! kind, and the numeric component round-trips to the gateway id, so uids can
//! be parsed back without any lookup table.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::WaddleError;

/// Separator between uid components.
pub const UID_SEPARATOR: char = '_';

/// Prefix applied to synthetic member uids for anonymous group posters.
pub const ANONYMOUS_UID_PREFIX: &str = "anonymous_";

/// The kind of a chat, encoded as the uid namespace prefix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Discuss,
    System,
}

/// Stable string key for a chat, namespaced by kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatUid(pub String);

impl ChatUid {
    /// Uid for a one-to-one chat with the given user.
    pub fn private(user_id: i64) -> Self {
        Self(format!("private{UID_SEPARATOR}{user_id}"))
    }

    /// Uid for a group chat.
    pub fn group(group_id: i64) -> Self {
        Self(format!("group{UID_SEPARATOR}{group_id}"))
    }

    /// Uid for a discuss chat.
    pub fn discuss(discuss_id: i64) -> Self {
        Self(format!("discuss{UID_SEPARATOR}{discuss_id}"))
    }

    /// Uid for a synthetic system chat, e.g. `__alert__`.
    pub fn system(prefix: &str) -> Self {
        Self(format!("__{prefix}__"))
    }

    /// Parse the uid into its chat kind and numeric gateway id.
    ///
    /// Only private/group/discuss uids carry a numeric id; system uids and
    /// anything else fail with [`WaddleError::IdentityNotFound`]. Components
    /// past the numeric id are ignored, so decorated uids such as
    /// `group_123_notification` still resolve to their base chat.
    pub fn parse(&self) -> Result<(ChatKind, i64), WaddleError> {
        let mut parts = self.0.split(UID_SEPARATOR);
        let kind = match parts.next() {
            Some("private") => ChatKind::Private,
            Some("group") => ChatKind::Group,
            Some("discuss") => ChatKind::Discuss,
            _ => return Err(self.not_found()),
        };
        let id = parts
            .next()
            .and_then(|raw| raw.parse::<i64>().ok())
            .ok_or_else(|| self.not_found())?;
        Ok((kind, id))
    }

    /// The numeric gateway id component, if the uid carries one.
    pub fn gateway_id(&self) -> Result<i64, WaddleError> {
        self.parse().map(|(_, id)| id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn not_found(&self) -> WaddleError {
        WaddleError::IdentityNotFound {
            uid: self.0.clone(),
        }
    }
}

impl fmt::Display for ChatUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable string key for a member within one chat's roster.
///
/// Either the decimal form of the gateway user id, or `anonymous_<flag>` for
/// anonymous group posters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberUid(pub String);

impl MemberUid {
    pub fn from_user_id(user_id: i64) -> Self {
        Self(user_id.to_string())
    }

    pub fn anonymous(flag: &str) -> Self {
        Self(format!("{ANONYMOUS_UID_PREFIX}{flag}"))
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.starts_with(ANONYMOUS_UID_PREFIX)
    }

    /// The gateway user id, unless this is a synthetic anonymous uid.
    pub fn user_id(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chat-scoped message uid: `<chat numeric id>_<gateway message id>`, with an
/// extra ordinal suffix when one gateway event fans out into several delivered
/// messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageUid(pub String);

impl MessageUid {
    pub fn new(chat_id: i64, message_id: i64) -> Self {
        Self(format!("{chat_id}{UID_SEPARATOR}{message_id}"))
    }

    /// Uid for the `ordinal`-th delivered message of one gateway event.
    /// Ordinal zero uses the plain two-component form.
    pub fn with_ordinal(chat_id: i64, message_id: i64, ordinal: usize) -> Self {
        if ordinal == 0 {
            Self::new(chat_id, message_id)
        } else {
            Self(format!(
                "{chat_id}{UID_SEPARATOR}{message_id}{UID_SEPARATOR}{ordinal}"
            ))
        }
    }

    /// Extract the gateway message id (the second uid component), as used by
    /// recall and edit lookups.
    pub fn gateway_message_id(&self) -> Result<i64, WaddleError> {
        self.0
            .split(UID_SEPARATOR)
            .nth(1)
            .and_then(|raw| raw.parse::<i64>().ok())
            .ok_or_else(|| WaddleError::Internal(format!(
                "message uid `{}` has no gateway message id component",
                self.0
            )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved chat: one conversation the framework can address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatIdentity {
    pub uid: ChatUid,
    pub kind: ChatKind,
    pub display_name: String,
    pub alias: Option<String>,
    /// Vendor flag surfaced to downstream consumers: discuss chats share the
    /// group shape on the wire but cannot be queried like groups.
    pub is_discuss: bool,
}

impl ChatIdentity {
    /// The numeric gateway id encoded in the uid, if any.
    pub fn gateway_id(&self) -> Result<i64, WaddleError> {
        self.uid.gateway_id()
    }
}

/// A resolved member of one group/discuss chat's roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberIdentity {
    pub uid: MemberUid,
    /// Group-card name if one is set, else the nickname.
    pub display_name: String,
    pub alias: Option<String>,
}

/// The author of an inbound message: a chat member, or the chat itself for
/// private and system messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Author {
    Member(MemberIdentity),
    Chat(ChatIdentity),
}

impl Author {
    pub fn display_name(&self) -> &str {
        match self {
            Author::Member(m) => &m.display_name,
            Author::Chat(c) => &c.display_name,
        }
    }

    pub fn uid_str(&self) -> &str {
        match self {
            Author::Member(m) => m.uid.as_str(),
            Author::Chat(c) => c.uid.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn chat_uid_constructors_round_trip() {
        assert_eq!(
            ChatUid::private(12345).parse().unwrap(),
            (ChatKind::Private, 12345)
        );
        assert_eq!(
            ChatUid::group(999).parse().unwrap(),
            (ChatKind::Group, 999)
        );
        assert_eq!(
            ChatUid::discuss(42).parse().unwrap(),
            (ChatKind::Discuss, 42)
        );
    }

    #[test]
    fn system_uid_does_not_parse_to_a_chat() {
        let uid = ChatUid::system("alert");
        assert_eq!(uid.as_str(), "__alert__");
        assert!(matches!(
            uid.parse(),
            Err(WaddleError::IdentityNotFound { .. })
        ));
    }

    #[test]
    fn decorated_uid_resolves_to_base_chat() {
        let uid = ChatUid(String::from("group_123456_notification"));
        assert_eq!(uid.parse().unwrap(), (ChatKind::Group, 123456));
    }

    #[test]
    fn unknown_namespace_is_not_found() {
        let uid = ChatUid(String::from("channel_55"));
        assert!(uid.parse().is_err());
        let uid = ChatUid(String::from("group_abc"));
        assert!(uid.parse().is_err());
        let uid = ChatUid(String::from("group"));
        assert!(uid.parse().is_err());
    }

    #[test]
    fn chat_kind_prefix_round_trips() {
        for kind in [
            ChatKind::Private,
            ChatKind::Group,
            ChatKind::Discuss,
            ChatKind::System,
        ] {
            let s = kind.to_string();
            assert_eq!(ChatKind::from_str(&s).unwrap(), kind);
        }
        assert_eq!(ChatKind::Group.to_string(), "group");
    }

    #[test]
    fn member_uid_anonymous() {
        let uid = MemberUid::anonymous("fl4g");
        assert_eq!(uid.as_str(), "anonymous_fl4g");
        assert!(uid.is_anonymous());
        assert_eq!(uid.user_id(), None);

        let uid = MemberUid::from_user_id(777);
        assert!(!uid.is_anonymous());
        assert_eq!(uid.user_id(), Some(777));
    }

    #[test]
    fn message_uid_ordinals() {
        assert_eq!(MessageUid::with_ordinal(999, 12345, 0).as_str(), "999_12345");
        assert_eq!(
            MessageUid::with_ordinal(999, 12345, 2).as_str(),
            "999_12345_2"
        );
    }

    #[test]
    fn message_uid_extracts_gateway_id() {
        let uid = MessageUid::new(999, 12345);
        assert_eq!(uid.gateway_message_id().unwrap(), 12345);
        let uid = MessageUid::with_ordinal(999, 12345, 3);
        assert_eq!(uid.gateway_message_id().unwrap(), 12345);
        let uid = MessageUid(String::from("bare"));
        assert!(uid.gateway_message_id().is_err());
    }

    proptest! {
        // Parsing must never panic regardless of what string arrives in a uid.
        #[test]
        fn chat_uid_parse_never_panics(s in "\\PC*") {
            let _ = ChatUid(s.clone()).parse();
            let _ = MessageUid(s).gateway_message_id();
        }

        #[test]
        fn well_formed_group_uids_parse(id in 0i64..i64::MAX) {
            let uid = ChatUid::group(id);
            prop_assert_eq!(uid.parse().unwrap(), (ChatKind::Group, id));
        }
    }
}
