//! Bounded Transmission Queue
//!
//! FIFO of items awaiting bulk transmission. When full, the oldest item is
//! evicted and the eviction is counted.

mod queue;

pub use queue::{Batch, BulkQueue, QueueStats, DEFAULT_CAPACITY};

use thiserror::Error;

/// Queue construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Queue capacity must be at least 1")]
    ZeroCapacity,
}
