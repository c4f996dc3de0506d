//! Topic-based publish/subscribe abstraction (mechanics only).
//!
//! Delivery is **at-least-once** and best-effort: publishing happens after the
//! state change is persisted, and consumers must tolerate duplicates. The
//! abstraction makes no assumption about the transport.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::envelope::Message;

#[derive(Debug, Error)]
pub enum EventBusError {
    /// Internal lock poisoning.
    #[error("event bus lock poisoned")]
    Poisoned,

    /// The payload could not be encoded as JSON.
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    /// The underlying transport rejected the message.
    #[error("transport error: {0}")]
    Transport(String),
}

/// A subscription to a single topic.
///
/// Each subscription receives its own copy of every message published on the
/// topic after it was created (broadcast semantics).
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    receiver: mpsc::UnboundedReceiver<Message>,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, receiver: mpsc::UnboundedReceiver<Message>) -> Self {
        Self {
            topic: topic.into(),
            receiver,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next message; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}

/// Publishing side of the bus.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, message: Message) -> Result<(), EventBusError>;
}

/// Subscribing side of the bus.
pub trait Subscriber: Send + Sync {
    fn subscribe(&self, topic: &str) -> Subscription;
}
