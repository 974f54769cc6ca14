// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Waddle QQ channel adapter.
//!
//! This crate defines the error taxonomy, the chat/member identity model with
//! its namespaced uid scheme, the normalized message types exchanged with the
//! chat-forwarding framework, and the delivery-sink trait the framework
//! implements.

pub mod error;
pub mod identity;
pub mod message;
pub mod sink;
pub mod state;

// Re-export key items at crate root for ergonomic imports.
pub use error::WaddleError;
pub use identity::{
    Author, ChatIdentity, ChatKind, ChatUid, MemberIdentity, MemberUid, MessageUid,
};
pub use message::{
    AttachmentRef, AttachmentSource, CommandAction, GroupRequestKind, MentionSpan,
    MessageCommand, MessageRemoval, NormalizedMessage, OutgoingAttachment, OutgoingKind,
    OutgoingMessage, PayloadKind, QuoteTarget, RecallRequest, RequestDecision,
};
pub use sink::ForwardSink;
pub use state::ConnectionState;
