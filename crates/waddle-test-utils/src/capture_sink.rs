// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Forward-sink double capturing everything the channel delivers.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use waddle_core::WaddleError;
use waddle_core::message::{MessageRemoval, NormalizedMessage};
use waddle_core::sink::ForwardSink;

/// A forward sink that records deliveries for assertion.
///
/// Deliveries arrive from the channel's worker pool, so tests await
/// [`CaptureSink::wait_for_messages`] or [`CaptureSink::wait_for_removals`]
/// before asserting. A configurable failure budget makes the next N
/// deliveries fail; failed deliveries are not recorded.
pub struct CaptureSink {
    messages: Mutex<Vec<NormalizedMessage>>,
    removals: Mutex<Vec<MessageRemoval>>,
    fail_budget: AtomicUsize,
    notify: Notify,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            removals: Mutex::new(Vec::new()),
            fail_budget: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Everything delivered so far, in delivery order.
    pub fn messages(&self) -> Vec<NormalizedMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Every removal delivered so far, in delivery order.
    pub fn removals(&self) -> Vec<MessageRemoval> {
        self.removals.lock().unwrap().clone()
    }

    /// Makes the next `n` deliveries (messages or removals) fail.
    pub fn fail_next_deliveries(&self, n: usize) {
        self.fail_budget.store(n, Ordering::SeqCst);
    }

    /// Waits until at least `n` messages have been recorded.
    pub async fn wait_for_messages(&self, n: usize) {
        loop {
            // Register before checking so a delivery racing the check still
            // wakes this waiter.
            let notified = self.notify.notified();
            if self.messages.lock().unwrap().len() >= n {
                return;
            }
            notified.await;
        }
    }

    /// Waits until at least `n` removals have been recorded.
    pub async fn wait_for_removals(&self, n: usize) {
        loop {
            let notified = self.notify.notified();
            if self.removals.lock().unwrap().len() >= n {
                return;
            }
            notified.await;
        }
    }

    fn claim_failure(&self) -> bool {
        self.fail_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for CaptureSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ForwardSink for CaptureSink {
    async fn deliver_message(&self, message: NormalizedMessage) -> Result<(), WaddleError> {
        if self.claim_failure() {
            return Err(WaddleError::Internal("scripted sink failure".to_string()));
        }
        self.messages.lock().unwrap().push(message);
        self.notify.notify_waiters();
        Ok(())
    }

    async fn deliver_removal(&self, removal: MessageRemoval) -> Result<(), WaddleError> {
        if self.claim_failure() {
            return Err(WaddleError::Internal("scripted sink failure".to_string()));
        }
        self.removals.lock().unwrap().push(removal);
        self.notify.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use waddle_core::identity::{Author, ChatIdentity, ChatKind, ChatUid, MessageUid};
    use waddle_core::message::PayloadKind;

    use super::*;

    fn message(text: &str) -> NormalizedMessage {
        let chat = ChatIdentity {
            uid: ChatUid::private(7),
            kind: ChatKind::Private,
            display_name: "alice".to_string(),
            alias: None,
            is_discuss: false,
        };
        NormalizedMessage {
            uid: MessageUid::new(7, 1),
            author: Author::Chat(chat.clone()),
            chat,
            kind: PayloadKind::Text,
            text: text.to_string(),
            spans: vec![],
            attachment: None,
            commands: vec![],
        }
    }

    #[tokio::test]
    async fn wait_returns_once_enough_messages_arrived() {
        let sink = Arc::new(CaptureSink::new());
        let waiter = Arc::clone(&sink);
        let handle = tokio::spawn(async move {
            waiter.wait_for_messages(2).await;
            waiter.messages().len()
        });

        sink.deliver_message(message("one")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        sink.deliver_message(message("two")).await.unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen, 2);
    }

    #[tokio::test]
    async fn failed_deliveries_are_not_recorded() {
        let sink = CaptureSink::new();
        sink.fail_next_deliveries(1);

        assert!(sink.deliver_message(message("dropped")).await.is_err());
        assert!(sink.deliver_message(message("kept")).await.is_ok());

        let recorded = sink.messages();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].text, "kept");
    }
}
