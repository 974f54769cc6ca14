// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The delivery seam between the channel and the chat-forwarding framework.

use async_trait::async_trait;

use crate::error::WaddleError;
use crate::message::{MessageRemoval, NormalizedMessage};

/// Delivery interface implemented by the framework collaborator.
///
/// The channel treats delivery as fire-and-forget: messages are handed to a
/// worker pool which invokes this trait, so a slow sink never blocks inbound
/// event processing. Implementations must be safe to call concurrently.
#[async_trait]
pub trait ForwardSink: Send + Sync {
    /// Deliver one fully resolved inbound message.
    async fn deliver_message(&self, message: NormalizedMessage) -> Result<(), WaddleError>;

    /// Deliver a message-removal notification.
    async fn deliver_removal(&self, removal: MessageRemoval) -> Result<(), WaddleError>;
}
