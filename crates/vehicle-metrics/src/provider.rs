//! Raw Metric Providers
//!
//! The vehicle publishes named raw metrics; the agent only reads them through
//! [`SnapshotProvider`].

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::field::{RawValue, RawValues};
use crate::ids;

/// Source of raw vehicle metrics
pub trait SnapshotProvider {
    /// Whether the metric currently has a fresh value
    fn has_fresh(&self, id: &str) -> bool;

    /// Values for the requested metrics; missing metrics are left out
    fn get_values(&self, ids: &BTreeSet<String>) -> RawValues;

    /// Value of a single metric
    fn get_single(&self, id: &str) -> Option<RawValue>;
}

/// In-memory provider with explicit staleness control
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    values: BTreeMap<String, RawValue>,
    stale: HashSet<String>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a fresh value
    pub fn set(&mut self, id: &str, value: impl Into<RawValue>) {
        self.stale.remove(id);
        self.values.insert(id.to_string(), value.into());
    }

    /// Keep the last value but report it as stale
    pub fn mark_stale(&mut self, id: &str) {
        self.stale.insert(id.to_string());
    }

    pub fn remove(&mut self, id: &str) {
        self.values.remove(id);
        self.stale.remove(id);
    }
}

impl SnapshotProvider for MemoryProvider {
    fn has_fresh(&self, id: &str) -> bool {
        self.values.contains_key(id) && !self.stale.contains(id)
    }

    fn get_values(&self, ids: &BTreeSet<String>) -> RawValues {
        ids.iter()
            .filter_map(|id| self.values.get(id).map(|v| (id.clone(), v.clone())))
            .collect()
    }

    fn get_single(&self, id: &str) -> Option<RawValue> {
        self.values.get(id).cloned()
    }
}

/// Simulated vehicle for running without hardware.
///
/// Produces pseudo-random but deterministic values per second, like a car
/// cruising with occasional stops.
pub struct SimulatedProvider {
    vehicle_type: String,
}

impl SimulatedProvider {
    pub fn new(vehicle_type: &str) -> Self {
        info!("Creating simulated vehicle provider ({})", vehicle_type);
        Self {
            vehicle_type: vehicle_type.to_string(),
        }
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn hash(secs: u64, id: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        secs.hash(&mut hasher);
        id.hash(&mut hasher);
        hasher.finish()
    }

    fn simulate(&self, id: &str) -> Option<RawValue> {
        let secs = Self::now_secs();
        let hash = Self::hash(secs, id);
        // Ten minute driving / parking cycle
        let driving = (secs / 600) % 2 == 0;

        let value = match id {
            ids::SOC => RawValue::Number(90.0 - ((secs / 60) % 600) as f64 / 10.0),
            ids::SOH => RawValue::Number(94.0),
            ids::POWER if driving => RawValue::Number(2.0 + (hash % 3000) as f64 / 100.0),
            ids::POWER => RawValue::Number(0.0),
            ids::SPEED if driving => RawValue::Number(30.0 + (hash % 900) as f64 / 10.0),
            ids::SPEED => RawValue::Number(0.0),
            ids::PARK_TIME if driving => RawValue::Number(0.0),
            ids::PARK_TIME => RawValue::Number((secs % 600) as f64),
            ids::CHARGING => RawValue::Bool(false),
            ids::CHARGE_TYPE => RawValue::from("type2"),
            ids::GPS_LOCK => RawValue::Bool(true),
            ids::LATITUDE => RawValue::Number(52.3676 + (secs % 600) as f64 * 1e-4),
            ids::LONGITUDE => RawValue::Number(4.9041),
            ids::DIRECTION => RawValue::Number((hash % 360) as f64),
            ids::ALTITUDE => RawValue::Number(2.0),
            ids::AMBIENT_TEMP => RawValue::Number(14.0),
            ids::BATT_TEMP => RawValue::Number(22.0 + (hash % 50) as f64 / 10.0),
            ids::VOLTAGE => RawValue::Number(360.0 + (hash % 200) as f64 / 10.0),
            ids::CURRENT => RawValue::Number((hash % 1000) as f64 / 10.0),
            ids::ODOMETER => RawValue::Number(42_000.0 + (secs % 100_000) as f64 / 100.0),
            ids::VEHICLE_TYPE => RawValue::from(self.vehicle_type.as_str()),
            _ => return None,
        };
        Some(value)
    }
}

impl SnapshotProvider for SimulatedProvider {
    fn has_fresh(&self, id: &str) -> bool {
        self.simulate(id).is_some()
    }

    fn get_values(&self, ids: &BTreeSet<String>) -> RawValues {
        let values: RawValues = ids
            .iter()
            .filter_map(|id| self.simulate(id).map(|v| (id.clone(), v)))
            .collect();
        debug!("Simulated {} of {} metrics", values.len(), ids.len());
        values
    }

    fn get_single(&self, id: &str) -> Option<RawValue> {
        self.simulate(id)
    }
}
