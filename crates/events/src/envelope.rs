use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for an integration message published on a topic.
///
/// The payload is kept as JSON so transports never need to know the concrete
/// message type; consumers decode it with [`Message::decode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    topic: String,
    published_at: DateTime<Utc>,
    payload: serde_json::Value,
}

impl Message {
    pub fn new<T: Serialize>(
        topic: impl Into<String>,
        payload: &T,
        published_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::now_v7(),
            topic: topic.into(),
            published_at,
            payload: serde_json::to_value(payload)?,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}
