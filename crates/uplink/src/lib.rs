//! Telemetry Uplink
//!
//! Sends snapshots to the remote ingestion endpoint:
//! - one-shot single snapshot requests
//! - bulk flushes of the transmission queue, one in flight at a time
//! - acknowledgement-driven queue removal

mod coordinator;
mod error;
mod transport;
mod wire;

pub use coordinator::{FlushOutcome, FlushState, FlushStats, TransmissionCoordinator};
pub use error::{TransportError, UplinkError};
pub use transport::{HttpTransport, Transport, TransportFuture};
pub use wire::{BulkEntry, BulkPayload, Credentials, Method, UplinkConfig, UplinkRequest, MAX_BULK_BATCH};
