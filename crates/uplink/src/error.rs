//! Uplink Error Types

use thiserror::Error;

/// Failure delivering a request to the endpoint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request could not be built: {0}")]
    InvalidRequest(String),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Uplink error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UplinkError {
    /// No user token configured; nothing can be sent until it is set
    #[error("User token is not configured")]
    MissingToken,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Endpoint rejected request with status {0}")]
    Rejected(u16),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<serde_json::Error> for UplinkError {
    fn from(err: serde_json::Error) -> Self {
        UplinkError::Serialization(err.to_string())
    }
}
