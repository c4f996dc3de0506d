//! Identifier generation.
//!
//! Use cases never call `Uuid::now_v7` directly so tests can pin ids.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait IdGenerator: Send + Sync {
    async fn generate(&self) -> Uuid;
}

/// Time-ordered UUIDv7 ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7Generator;

#[async_trait]
impl IdGenerator for UuidV7Generator {
    async fn generate(&self) -> Uuid {
        Uuid::now_v7()
    }
}

/// Deterministic ids `1, 2, 3, ...`, for tests and fixtures.
#[derive(Debug, Default)]
pub struct SequenceIdGenerator {
    next: AtomicU64,
}

impl SequenceIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdGenerator for SequenceIdGenerator {
    async fn generate(&self) -> Uuid {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        Uuid::from_u128(u128::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequence_generator_is_monotonic() {
        let ids = SequenceIdGenerator::new();
        assert_eq!(ids.generate().await, Uuid::from_u128(1));
        assert_eq!(ids.generate().await, Uuid::from_u128(2));
    }

    #[tokio::test]
    async fn v7_ids_are_unique() {
        let ids = UuidV7Generator;
        assert_ne!(ids.generate().await, ids.generate().await);
    }
}
