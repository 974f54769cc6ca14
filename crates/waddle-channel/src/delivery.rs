// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded delivery queue between the event pipeline and the framework sink.
//!
//! Inbound processing never calls the sink directly: resolved messages are
//! queued and a fixed pool of workers drains the queue, so a slow sink
//! backpressures producers at the channel boundary instead of stalling event
//! handling mid-resolution.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use waddle_core::identity::{Author, ChatIdentity, ChatKind, ChatUid, MessageUid};
use waddle_core::message::{MessageCommand, MessageRemoval, NormalizedMessage, PayloadKind};
use waddle_core::sink::ForwardSink;
use waddle_config::DeliveryConfig;

/// One unit of work for the delivery pool.
#[derive(Debug)]
pub enum Delivery {
    Message(NormalizedMessage),
    Removal(MessageRemoval),
}

/// Handle to the delivery worker pool. Cheap to clone.
#[derive(Clone)]
pub struct DeliveryPool {
    tx: mpsc::Sender<Delivery>,
}

impl DeliveryPool {
    /// Spawns the worker pool on the current runtime and returns the
    /// producer handle. Workers stop when the token is cancelled or every
    /// producer handle is dropped.
    pub fn start(
        sink: Arc<dyn ForwardSink>,
        config: &DeliveryConfig,
        token: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        for worker in 0..config.workers.max(1) {
            tokio::spawn(worker_loop(
                worker,
                Arc::clone(&rx),
                Arc::clone(&sink),
                token.clone(),
            ));
        }
        Self { tx }
    }

    pub async fn enqueue_message(&self, message: NormalizedMessage) {
        metrics::counter!("waddle_delivery_enqueued_total", "kind" => "message").increment(1);
        if self.tx.send(Delivery::Message(message)).await.is_err() {
            warn!("delivery queue closed; dropping inbound message");
        }
    }

    pub async fn enqueue_removal(&self, removal: MessageRemoval) {
        metrics::counter!("waddle_delivery_enqueued_total", "kind" => "removal").increment(1);
        if self.tx.send(Delivery::Removal(removal)).await.is_err() {
            warn!("delivery queue closed; dropping removal notification");
        }
    }
}

async fn worker_loop(
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<Delivery>>>,
    sink: Arc<dyn ForwardSink>,
    token: CancellationToken,
) {
    loop {
        let item = tokio::select! {
            _ = token.cancelled() => break,
            item = async { rx.lock().await.recv().await } => item,
        };
        let Some(item) = item else { break };
        let result = match item {
            Delivery::Message(message) => sink.deliver_message(message).await,
            Delivery::Removal(removal) => sink.deliver_removal(removal).await,
        };
        if let Err(err) = result {
            metrics::counter!("waddle_delivery_failures_total").increment(1);
            warn!(worker, error = %err, "framework sink rejected delivery");
        }
    }
    debug!(worker, "delivery worker stopped");
}

/// Counts consecutive alerts for one failure category and goes silent after
/// the configured threshold. A fully healthy observation resets the count.
#[derive(Debug)]
pub struct AlertThrottle {
    limit: u32,
    fired: AtomicU32,
}

impl AlertThrottle {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            fired: AtomicU32::new(0),
        }
    }

    /// Claims one alert slot. Returns false once the threshold is exhausted.
    pub fn fire(&self) -> bool {
        self.fired
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .is_ok()
    }

    /// Whether the next [`fire`](Self::fire) would still alert.
    pub fn is_open(&self) -> bool {
        self.fired.load(Ordering::Relaxed) < self.limit
    }

    pub fn reset(&self) {
        self.fired.store(0, Ordering::Relaxed);
    }
}

/// Builds a message originating from a synthetic system chat, stamped with
/// the current unix time so repeated notices stay distinguishable.
pub fn system_notice(
    prefix: &str,
    description: &str,
    text: &str,
    commands: Vec<MessageCommand>,
) -> NormalizedMessage {
    let chat = ChatIdentity {
        uid: ChatUid::system(prefix),
        kind: ChatKind::System,
        display_name: description.to_string(),
        alias: None,
        is_discuss: false,
    };
    let uid = MessageUid(format!(
        "{}.{}",
        chat.uid.as_str(),
        chrono::Utc::now().timestamp()
    ));
    NormalizedMessage {
        uid,
        author: Author::Chat(chat.clone()),
        chat,
        kind: PayloadKind::Text,
        text: text.to_string(),
        spans: Vec::new(),
        attachment: None,
        commands,
    }
}

/// Sends operator-facing alerts through the delivery pool as messages from
/// the `__alert__` system chat.
#[derive(Clone)]
pub struct Alerter {
    pool: DeliveryPool,
}

impl Alerter {
    pub fn new(pool: DeliveryPool) -> Self {
        Self { pool }
    }

    pub async fn alert(&self, text: &str) {
        metrics::counter!("waddle_alerts_total").increment(1);
        debug!(text, "raising operator alert");
        self.pool
            .enqueue_message(system_notice("alert", "QQ Alert", text, Vec::new()))
            .await;
    }
}
