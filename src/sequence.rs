use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::errors::ServiceError;

/// Movement-number collaborator. Any generator satisfies the contract as long
/// as numbers are globally unique and sortable; the format itself is opaque
/// to callers.
#[async_trait]
pub trait MovementNumberGenerator: Send + Sync {
    async fn next_movement_number(&self) -> Result<String, ServiceError>;
}

/// Default generator: millisecond timestamp plus a process-local monotonic
/// counter, e.g. `MV-1717000000000-000042`. Both components are
/// non-decreasing, so lexicographic order matches allocation order. Unique
/// within a deployment; multi-node setups substitute a database sequence
/// behind the same trait.
pub struct TimestampSequence {
    counter: AtomicU64,
}

impl TimestampSequence {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }
}

impl Default for TimestampSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MovementNumberGenerator for TimestampSequence {
    async fn next_movement_number(&self) -> Result<String, ServiceError> {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let millis = Utc::now().timestamp_millis();
        Ok(format!("MV-{:013}-{:06}", millis, seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn numbers_are_unique_and_sorted() {
        let gen = TimestampSequence::new();
        let mut numbers = Vec::new();
        for _ in 0..100 {
            numbers.push(gen.next_movement_number().await.unwrap());
        }
        let mut sorted = numbers.clone();
        sorted.sort();
        assert_eq!(numbers, sorted);
        sorted.dedup();
        assert_eq!(sorted.len(), 100);
    }
}
