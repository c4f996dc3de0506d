//! In-memory event bus for tests/dev.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bus::{EventBusError, Publisher, Subscriber, Subscription};
use crate::envelope::Message;

/// In-memory pub/sub bus.
///
/// - No IO
/// - Best-effort fan-out per topic
/// - Dead subscribers are dropped on the next publish to their topic
#[derive(Debug, Default)]
pub struct InMemoryEventBus {
    subscribers: Mutex<Vec<(String, mpsc::UnboundedSender<Message>)>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Publisher for InMemoryEventBus {
    async fn publish(&self, message: Message) -> Result<(), EventBusError> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| EventBusError::Poisoned)?;

        subs.retain(|(topic, tx)| topic != message.topic() || tx.send(message.clone()).is_ok());

        tracing::debug!(topic = message.topic(), message_id = %message.id(), "message published");
        Ok(())
    }
}

impl Subscriber for InMemoryEventBus {
    fn subscribe(&self, topic: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();

        // A poisoned lock still yields a subscription; it just never receives.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push((topic.to_string(), tx));
        }

        Subscription::new(topic, rx)
    }
}
