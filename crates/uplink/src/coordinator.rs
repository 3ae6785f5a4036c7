//! Transmission Coordinator
//!
//! Per flush: `Idle -> Sending -> Acked (remove sent) | Failed (keep) -> Idle`.
//! Only one bulk flush is in flight at a time; triggers arriving while a
//! flush is outstanding are ignored.

use bulk_queue::BulkQueue;
use serde::Serialize;
use tracing::{debug, info, warn};
use vehicle_metrics::TelemetrySnapshot;

use crate::error::{TransportError, UplinkError};
use crate::wire::{Credentials, UplinkConfig, UplinkRequest};

/// Flush state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    Idle,
    Sending {
        /// Sequence number of the newest snapshot in the request
        last_seq: u64,
        count: usize,
    },
}

/// Result of applying a flush completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Endpoint accepted the batch; `removed` entries left the queue
    Acked { sent: usize, removed: usize },
    /// Batch not accepted; the queue is untouched
    Failed(UplinkError),
    /// A completion arrived with no flush in flight
    Unexpected,
}

/// Flush counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushStats {
    pub attempted: u64,
    pub acked: u64,
    pub failed: u64,
    pub delivered: u64,
}

/// Coordinates bulk flushes of the transmission queue
#[derive(Debug)]
pub struct TransmissionCoordinator {
    config: UplinkConfig,
    state: FlushState,
    stats: FlushStats,
}

impl TransmissionCoordinator {
    pub fn new(config: UplinkConfig) -> Self {
        info!(
            "Creating transmission coordinator: bulk_url={}, batch={}",
            config.bulk_url,
            config.batch_size()
        );
        Self {
            config,
            state: FlushState::Idle,
            stats: FlushStats::default(),
        }
    }

    pub fn config(&self) -> &UplinkConfig {
        &self.config
    }

    pub fn state(&self) -> FlushState {
        self.state
    }

    pub fn is_sending(&self) -> bool {
        matches!(self.state, FlushState::Sending { .. })
    }

    pub fn stats(&self) -> FlushStats {
        self.stats
    }

    /// Build the next bulk request and mark the flush in flight.
    ///
    /// Returns `Ok(None)` when a flush is already outstanding or the queue
    /// is empty. The queue itself is not modified.
    pub fn begin_flush(
        &mut self,
        queue: &BulkQueue<TelemetrySnapshot>,
        credentials: &Credentials,
    ) -> Result<Option<UplinkRequest>, UplinkError> {
        if let FlushState::Sending { count, .. } = self.state {
            debug!("Flush of {} snapshots still in flight, ignoring trigger", count);
            return Ok(None);
        }
        if queue.is_empty() {
            return Ok(None);
        }

        let batch = queue.peek_batch(self.config.batch_size());
        let count = batch.len();
        let request = UplinkRequest::bulk(&self.config, credentials, batch.items)?;

        self.state = FlushState::Sending {
            last_seq: batch.last_seq,
            count,
        };
        self.stats.attempted += 1;
        metrics::counter!("telemetry_flush_attempted_total").increment(1);
        debug!("Flushing {} of {} queued snapshots", count, queue.len());

        Ok(Some(request))
    }

    /// Apply the transport result of the outstanding flush
    pub fn complete(
        &mut self,
        result: Result<u16, TransportError>,
        queue: &mut BulkQueue<TelemetrySnapshot>,
    ) -> FlushOutcome {
        let FlushState::Sending { last_seq, count } = self.state else {
            warn!("Flush completion received with no flush in flight");
            return FlushOutcome::Unexpected;
        };
        self.state = FlushState::Idle;

        let failure = match result {
            Ok(status) if (200..300).contains(&status) => None,
            Ok(status) => Some(UplinkError::Rejected(status)),
            Err(e) => Some(UplinkError::Transport(e)),
        };

        if let Some(error) = failure {
            self.stats.failed += 1;
            metrics::counter!("telemetry_flush_failed_total").increment(1);
            warn!("Bulk flush of {} snapshots failed: {}; will retry", count, error);
            return FlushOutcome::Failed(error);
        }

        // Entries evicted by overflow since the batch was built are already gone
        let removed = queue.remove_front(queue.acknowledged_len(last_seq));
        self.stats.acked += 1;
        self.stats.delivered += count as u64;
        metrics::counter!("telemetry_flush_acked_total").increment(1);
        info!("Bulk flush acknowledged: {} sent, {} removed, {} left", count, removed, queue.len());

        FlushOutcome::Acked { sent: count, removed }
    }

    /// One-shot request for a single snapshot; does not touch the queue or
    /// the in-flight state
    pub fn single(
        &self,
        snapshot: &TelemetrySnapshot,
        credentials: &Credentials,
    ) -> Result<UplinkRequest, UplinkError> {
        UplinkRequest::single(&self.config, credentials, snapshot)
    }
}
