//! Agent Error Types

use bulk_queue::QueueError;
use sampling::SamplingError;
use thiserror::Error;
use uplink::UplinkError;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid sampling configuration: {0}")]
    Sampling(#[from] SamplingError),

    #[error("Invalid queue configuration: {0}")]
    Queue(#[from] QueueError),
}

/// Errors surfaced by agent commands
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Uplink(#[from] UplinkError),

    /// The clock has not reached a plausible time yet
    #[error("Time source is not valid yet")]
    TimeNotValid,
}

impl AgentError {
    /// Whether the operator has to change configuration before retrying
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            AgentError::Config(_) | AgentError::Uplink(UplinkError::MissingToken)
        )
    }
}
