//! Onboard Telemetry Agent
//!
//! Samples live vehicle state on every tick, decides whether the remote view
//! has become too stale, queues snapshots and flushes them in bulk.

mod clock;
mod context;
mod error;
mod events;
mod notify;
pub mod runtime;
mod settings;

pub use clock::{Clock, ManualClock, SystemClock, MIN_VALID_UTC};
pub use context::{Activation, AgentContext, AgentStatus, SamplingState, TickOutcome};
pub use error::{AgentError, ConfigError};
pub use events::{AgentEvent, EventBus, LocalEventBus, SubscriptionHandle, Topic};
pub use notify::{LogNotifier, MemoryNotifier, Notifier};
pub use runtime::FlushCompletion;
pub use settings::{AgentConfig, LogFormat};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(config: &AgentConfig) -> Result<(), ConfigError> {
    let level: Level = config
        .log_level
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("unknown log level {:?}", config.log_level)))?;

    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);
    let result = match config.log_format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };

    result.map_err(|e| ConfigError::Invalid(format!("failed to set tracing subscriber: {}", e)))
}
