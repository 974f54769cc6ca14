// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! QQ gateway protocol layer for Waddle.
//!
//! This crate speaks the gateway's HTTP API: [`client::HttpGateway`]
//! performs the actions behind the [`api::Gateway`] trait, [`event`]
//! models the webhook events the gateway pushes, and [`segment`] decodes
//! message bodies into the closed segment set the pipeline understands.

pub mod api;
pub mod client;
pub mod cq;
pub mod event;
pub mod segment;
pub mod types;

pub use api::Gateway;
pub use client::HttpGateway;
pub use event::{MessageEvent, MessageScope, NoticeEvent, RequestEvent};
pub use segment::{RawSegment, Segment};
pub use types::{
    ForwardNode, ForwardSender, FriendEntry, GroupEntry, GroupMemberEntry, LoginInfo,
    MessageTarget, StatusPayload, StrangerEntry,
};
