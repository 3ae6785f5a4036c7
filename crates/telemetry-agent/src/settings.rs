//! Agent Configuration
//!
//! Layered from built-in defaults, an optional TOML file and `TLM_`-prefixed
//! environment variables (nested keys use `__`, e.g.
//! `TLM_SAMPLING__KEEP_ALIVE_SECS=120`).

use sampling::SamplingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;
use uplink::{Credentials, UplinkConfig};

use crate::error::ConfigError;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Endpoint API key
    pub api_key: String,
    /// Per-user token; nothing is sent while unset
    pub user_token: Option<String>,
    /// Vehicle type tag; read from the vehicle when unset
    pub vehicle_type: Option<String>,
    /// Maximum snapshots held for transmission
    pub queue_capacity: usize,
    /// Sampling tick period (seconds)
    pub sample_interval_secs: u64,
    /// Bulk flush tick period (seconds)
    pub flush_interval_secs: u64,
    pub log_level: String,
    pub log_format: LogFormat,
    pub sampling: SamplingConfig,
    pub uplink: UplinkConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            user_token: None,
            vehicle_type: None,
            queue_capacity: bulk_queue::DEFAULT_CAPACITY,
            sample_interval_secs: 1,
            flush_interval_secs: 10,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            sampling: SamplingConfig::default(),
            uplink: UplinkConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from an optional file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("TLM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: AgentConfig = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse configuration from TOML text, without the environment
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let settings: AgentConfig = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sampling.validate()?;
        if self.queue_capacity == 0 {
            return Err(bulk_queue::QueueError::ZeroCapacity.into());
        }
        if self.sample_interval_secs == 0 || self.flush_interval_secs == 0 {
            return Err(ConfigError::Invalid("tick intervals must be at least one second".into()));
        }
        if self.uplink.url.is_empty() || self.uplink.bulk_url.is_empty() {
            return Err(ConfigError::Invalid("endpoint URLs must be set".into()));
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_key: self.api_key.clone(),
            user_token: self.user_token.clone(),
        }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}
