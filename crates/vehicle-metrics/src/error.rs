//! Metric Error Types

use thiserror::Error;

/// Reasons a telemetry field cannot be produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    /// Field name outside the telemetry vocabulary
    #[error("Unknown telemetry field: {0}")]
    UnknownField(String),

    /// No raw metrics are mapped for this field on this vehicle
    #[error("Field {0} is not supported by this vehicle")]
    Unsupported(&'static str),

    /// A required raw metric has no fresh value
    #[error("Field {field} requires {metric}, which is stale or missing")]
    Stale { field: &'static str, metric: String },

    /// All inputs were present but the derivation produced nothing
    #[error("Field {0} could not be derived from its inputs")]
    Underivable(&'static str),
}
