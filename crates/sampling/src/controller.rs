//! Sampling Rate Controller
//!
//! Priority-ordered decision table selecting the staleness budget for the
//! next snapshot. The first matching rule wins.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use vehicle_metrics::{Field, TelemetrySnapshot};

use crate::significance::is_significant;

/// Invalid sampling configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplingError {
    #[error("{0} budget must be greater than zero")]
    ZeroBudget(&'static str),

    #[error("calibration speed must be positive, got {0}")]
    InvalidCalibrationSpeed(f64),
}

/// Configuration for the sampling controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Speed above which positions are sent at the tightest rate (kph)
    pub calibration_speed_kph: f64,
    /// Budget while above calibration speed (seconds)
    pub calibration_secs: i64,
    /// Budget while driving or DC fast charging (seconds); kept below typical
    /// cellular idle teardown so the connection stays warm
    pub keep_alive_secs: i64,
    /// Budget while AC charging (seconds)
    pub charging_secs: i64,
    /// Budget while parked and idle (seconds)
    pub parked_secs: i64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            calibration_speed_kph: 70.0,
            calibration_secs: 5,
            keep_alive_secs: 160, // 2:40
            charging_secs: 30 * 60,
            parked_secs: 24 * 3600,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<(), SamplingError> {
        if self.calibration_speed_kph.is_nan() || self.calibration_speed_kph <= 0.0 {
            return Err(SamplingError::InvalidCalibrationSpeed(self.calibration_speed_kph));
        }
        for (name, secs) in [
            ("calibration", self.calibration_secs),
            ("keep-alive", self.keep_alive_secs),
            ("charging", self.charging_secs),
            ("parked", self.parked_secs),
        ] {
            if secs <= 0 {
                return Err(SamplingError::ZeroBudget(name));
            }
        }
        Ok(())
    }
}

/// Rule of the decision table that produced a budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    SignificantChange,
    Calibration,
    KeepAlive,
    Charging,
    Parked,
}

/// Outcome of a sampling decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingDecision {
    /// Required inputs are missing; do not sample at all
    Suppressed,
    /// Queue once the last queued snapshot is older than `max_staleness_secs`
    Budget { rule: Rule, max_staleness_secs: i64 },
}

impl SamplingDecision {
    /// Whether `current` must be queued given the last queued snapshot.
    ///
    /// A significant change queues unconditionally. A clock that stepped back
    /// behind the last queued snapshot also queues, so the new sample becomes
    /// the baseline instead of waiting for the clock to catch up.
    pub fn should_queue(&self, current: &TelemetrySnapshot, last_queued: &TelemetrySnapshot) -> bool {
        match self {
            SamplingDecision::Suppressed => false,
            SamplingDecision::Budget {
                rule: Rule::SignificantChange,
                ..
            } => true,
            SamplingDecision::Budget {
                max_staleness_secs, ..
            } => {
                let (Some(now), Some(then)) = (current.utc(), last_queued.utc()) else {
                    return false;
                };
                if now < then {
                    debug!("Clock moved back {}s; re-baselining", then - now);
                    return true;
                }
                now - then >= *max_staleness_secs
            }
        }
    }

    pub fn rule(&self) -> Option<Rule> {
        match self {
            SamplingDecision::Suppressed => None,
            SamplingDecision::Budget { rule, .. } => Some(*rule),
        }
    }
}

/// Selects the staleness budget for the next transmission
#[derive(Debug, Clone, Default)]
pub struct SamplingRateController {
    config: SamplingConfig,
}

impl SamplingRateController {
    pub fn new(config: SamplingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Evaluate the decision table for `current` against the last queued snapshot
    pub fn decide(&self, current: &TelemetrySnapshot, last_queued: &TelemetrySnapshot) -> SamplingDecision {
        // No GPS/clock time means nothing can be sampled, not "parked"
        if current.utc().is_none() {
            return SamplingDecision::Suppressed;
        }

        let (rule, max_staleness_secs) = self.select(current, last_queued);
        debug!("Sampling rule {:?}: max staleness {}s", rule, max_staleness_secs);
        SamplingDecision::Budget {
            rule,
            max_staleness_secs,
        }
    }

    fn select(&self, current: &TelemetrySnapshot, last_queued: &TelemetrySnapshot) -> (Rule, i64) {
        let cfg = &self.config;

        if is_significant(current, last_queued) {
            return (Rule::SignificantChange, 0);
        }

        let speed = current.number(Field::Speed).unwrap_or(0.0);
        if speed > cfg.calibration_speed_kph {
            return (Rule::Calibration, cfg.calibration_secs);
        }

        let parked = current.flag(Field::IsParked).unwrap_or(false);
        let dc_fast = current.flag(Field::IsDcfc).unwrap_or(false);
        if !parked || dc_fast {
            return (Rule::KeepAlive, cfg.keep_alive_secs);
        }

        if current.flag(Field::IsCharging).unwrap_or(false) {
            return (Rule::Charging, cfg.charging_secs);
        }

        (Rule::Parked, cfg.parked_secs)
    }
}
