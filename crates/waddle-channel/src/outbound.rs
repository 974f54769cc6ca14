// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Re-encodes outgoing framework messages into gateway send calls.
//!
//! Edits become recall-then-resend. Replies are rendered as a quoted prefix
//! with an optional mention of the quoted author. A magic `` kick` `` text
//! body sent as a reply in a group kicks the quoted author instead of
//! sending anything.

use std::sync::Arc;

use tracing::{debug, info};

use waddle_core::error::WaddleError;
use waddle_core::identity::MessageUid;
use waddle_core::message::{OutgoingKind, OutgoingMessage, QuoteTarget, RecallRequest};
use waddle_gateway::cq;
use waddle_gateway::types::MessageTarget;
use waddle_gateway::Gateway;

/// Message body that triggers a group kick of the quoted author.
pub const KICK_COMMAND: &str = "kick`";

/// Longest quoted-text prefix rendered into a reply.
const QUOTE_MAX_CHARS: usize = 50;

pub struct OutboundDispatcher {
    gateway: Arc<dyn Gateway>,
}

impl OutboundDispatcher {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Sends one outgoing message.
    ///
    /// Returns the uid the framework should track for the delivered message,
    /// or `None` when the body was a command (kick) that produces no
    /// message.
    pub async fn send(&self, msg: &OutgoingMessage) -> Result<Option<MessageUid>, WaddleError> {
        let target = MessageTarget::from_chat_uid(&msg.chat_uid)?;
        let chat_id = msg.chat_uid.gateway_id()?;
        if let Some(prior) = &msg.edit_of {
            self.recall_prior(prior).await?;
        }
        match msg.kind {
            OutgoingKind::Text | OutgoingKind::Link => self.send_text(target, chat_id, msg).await,
            OutgoingKind::Image | OutgoingKind::Sticker | OutgoingKind::Animation => {
                self.send_picture(target, chat_id, msg).await.map(Some)
            }
            OutgoingKind::Voice => self.send_voice(target, chat_id, msg).await.map(Some),
        }
    }

    /// Recalls a message previously sent by the local account.
    pub async fn recall(&self, request: &RecallRequest) -> Result<(), WaddleError> {
        if !request.author_is_self {
            return Err(WaddleError::PermissionDenied(
                "You can only recall your own messages.".into(),
            ));
        }
        let message_id = request.uid.gateway_message_id()?;
        match self.gateway.delete_msg(message_id).await {
            Ok(()) => {
                debug!(message_id, "message recalled");
                Ok(())
            }
            Err(WaddleError::ApiFailure { .. }) => Err(WaddleError::UnsupportedOperation(
                "Failed to recall the message.\n\
                 This message may have already expired."
                    .into(),
            )),
            Err(err) => Err(err),
        }
    }

    /// Recall step of an edit. A gateway refusal means the original can no
    /// longer be withdrawn, which makes the edit itself unsupported.
    async fn recall_prior(&self, prior: &MessageUid) -> Result<(), WaddleError> {
        let message_id = prior.gateway_message_id()?;
        match self.gateway.delete_msg(message_id).await {
            Ok(()) => Ok(()),
            Err(WaddleError::ApiFailure { .. }) => Err(WaddleError::UnsupportedOperation(
                "Failed to recall the message.\n\
                 This message may have already expired."
                    .into(),
            )),
            Err(err) => Err(err),
        }
    }

    async fn send_text(
        &self,
        target: MessageTarget,
        chat_id: i64,
        msg: &OutgoingMessage,
    ) -> Result<Option<MessageUid>, WaddleError> {
        if msg.text == KICK_COMMAND {
            return self.kick_quoted_author(target, msg.reply_to.as_ref()).await;
        }
        let mut body = cq::escape_text(&msg.text);
        if let Some(quote) = &msg.reply_to {
            body = format!("{}{}\n\n{}", self.quote_marker(target, quote), self.quote_text(quote), body);
        }
        let message_id = self.gateway.send_msg(target, &body).await?;
        Ok(Some(MessageUid::new(chat_id, message_id)))
    }

    /// Mention prefix for a reply: quoted authors other than ourselves get
    /// an at-code, except in private chats where mentioning is meaningless.
    fn quote_marker(&self, target: MessageTarget, quote: &QuoteTarget) -> String {
        if matches!(target, MessageTarget::Private { .. }) || quote.author_is_self {
            String::new()
        } else {
            cq::at(quote.author_uid.as_str())
        }
    }

    fn quote_text(&self, quote: &QuoteTarget) -> String {
        cq::escape_text(&cq::truncate_quote(&quote.text, QUOTE_MAX_CHARS))
    }

    async fn kick_quoted_author(
        &self,
        target: MessageTarget,
        quote: Option<&QuoteTarget>,
    ) -> Result<Option<MessageUid>, WaddleError> {
        let MessageTarget::Group { group_id } = target else {
            return Err(WaddleError::UnsupportedOperation(
                "Kick is only available in group chats.".into(),
            ));
        };
        let Some(quote) = quote else {
            return Err(WaddleError::UnsupportedOperation(
                "Reply to a message with kick` to kick its author.".into(),
            ));
        };
        let user_id = quote.author_uid.user_id().ok_or_else(|| {
            WaddleError::UnsupportedOperation("Anonymous members cannot be kicked.".into())
        })?;
        self.gateway.set_group_kick(group_id, user_id).await?;
        info!(group_id, user_id, "kicked group member by reply command");
        Ok(None)
    }

    async fn send_picture(
        &self,
        target: MessageTarget,
        chat_id: i64,
        msg: &OutgoingMessage,
    ) -> Result<MessageUid, WaddleError> {
        let attachment = msg.attachment.as_ref().ok_or_else(|| {
            WaddleError::UnsupportedOperation("Picture message carries no attachment.".into())
        })?;
        let mut body = cq::image(&cq::attachment_reference(&attachment.source));
        if !msg.text.is_empty() {
            body.push_str(&cq::escape_text(&msg.text));
        }
        let message_id = self.gateway.send_msg(target, &body).await?;
        Ok(MessageUid::new(chat_id, message_id))
    }

    /// Voice notes cannot carry inline captions; the caption goes out as a
    /// follow-up text message while the tracked uid stays on the voice send.
    async fn send_voice(
        &self,
        target: MessageTarget,
        chat_id: i64,
        msg: &OutgoingMessage,
    ) -> Result<MessageUid, WaddleError> {
        let attachment = msg.attachment.as_ref().ok_or_else(|| {
            WaddleError::UnsupportedOperation("Voice message carries no attachment.".into())
        })?;
        let body = cq::record(&cq::attachment_reference(&attachment.source));
        let message_id = self.gateway.send_msg(target, &body).await?;
        if !msg.text.is_empty() {
            let caption_id = self
                .gateway
                .send_msg(target, &cq::escape_text(&msg.text))
                .await?;
            debug!(caption_id, "voice caption sent as follow-up");
        }
        Ok(MessageUid::new(chat_id, message_id))
    }
}
