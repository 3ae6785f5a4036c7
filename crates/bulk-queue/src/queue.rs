//! Bulk Queue Implementation

use serde::Serialize;
use std::collections::VecDeque;
use tracing::warn;

use crate::QueueError;

/// Default queue capacity
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
struct Entry<T> {
    seq: u64,
    item: T,
}

/// Oldest entries copied out of the queue for transmission
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    pub items: Vec<T>,
    /// Sequence number of the newest item in the batch
    pub last_seq: u64,
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Queue statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub len: usize,
    pub capacity: usize,
    pub overflow_count: u64,
    pub total_enqueued: u64,
}

/// Bounded FIFO with drop-oldest overflow.
///
/// Each entry gets a sequence number so a batch taken earlier can be matched
/// against the head even after evictions.
#[derive(Debug, Clone)]
pub struct BulkQueue<T> {
    entries: VecDeque<Entry<T>>,
    capacity: usize,
    next_seq: u64,
    overflow_count: u64,
}

impl<T: Clone> BulkQueue<T> {
    /// Create a queue holding at most `capacity` items
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 1,
            overflow_count: 0,
        })
    }

    /// Create a queue with the default capacity (100 items)
    pub fn with_default_capacity() -> Self {
        Self {
            entries: VecDeque::with_capacity(DEFAULT_CAPACITY),
            capacity: DEFAULT_CAPACITY,
            next_seq: 1,
            overflow_count: 0,
        }
    }

    /// Append an item, evicting and returning the oldest one on overflow
    pub fn enqueue(&mut self, item: T) -> Option<T> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(Entry { seq, item });

        if self.entries.len() > self.capacity {
            let evicted = self.entries.pop_front()?;
            self.overflow_count += 1;
            metrics::counter!("telemetry_queue_overflow_total").increment(1);
            warn!(
                "Queue full ({}), dropped oldest entry #{} ({} dropped so far)",
                self.capacity, evicted.seq, self.overflow_count
            );
            return Some(evicted.item);
        }
        None
    }

    /// Copy up to `max` oldest items without removing them
    pub fn peek_batch(&self, max: usize) -> Batch<T> {
        let mut items = Vec::with_capacity(max.min(self.entries.len()));
        let mut last_seq = 0;
        for entry in self.entries.iter().take(max) {
            items.push(entry.item.clone());
            last_seq = entry.seq;
        }
        Batch { items, last_seq }
    }

    /// Remove exactly `count` oldest items (fewer if the queue is shorter)
    pub fn remove_front(&mut self, count: usize) -> usize {
        let count = count.min(self.entries.len());
        self.entries.drain(..count);
        count
    }

    /// Number of head entries still covered by a batch ending at `last_seq`
    pub fn acknowledged_len(&self, last_seq: u64) -> usize {
        self.entries.iter().take_while(|e| e.seq <= last_seq).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.entries.len() as f64 / self.capacity as f64
    }

    /// Items dropped because the queue was full
    pub fn overflow_count(&self) -> u64 {
        self.overflow_count
    }

    /// Iterate items oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.item)
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            len: self.entries.len(),
            capacity: self.capacity,
            overflow_count: self.overflow_count,
            total_enqueued: self.next_seq - 1,
        }
    }

    /// Drop every queued item
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
