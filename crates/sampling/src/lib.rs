//! Adaptive Telemetry Sampling
//!
//! Decides how stale the remote view of the vehicle may become before the
//! next snapshot must be queued, and smooths noisy power/speed readings
//! between samples.

mod controller;
mod significance;
mod smoother;

pub use controller::{Rule, SamplingConfig, SamplingDecision, SamplingError, SamplingRateController};
pub use significance::is_significant;
pub use smoother::{MetricSmoother, PowerSample};
