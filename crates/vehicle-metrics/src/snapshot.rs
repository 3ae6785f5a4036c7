//! Telemetry Snapshot

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::field::{Field, FieldValue};

/// One point-in-time set of derived telemetry values.
///
/// A snapshot is immutable once built; changes produce a new snapshot.
/// Unsupported fields are absent rather than null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetrySnapshot {
    fields: BTreeMap<Field, FieldValue>,
}

impl TelemetrySnapshot {
    /// Start building a snapshot
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// Empty baseline used before anything has been queued (`utc = 0`)
    pub fn baseline() -> Self {
        Self::builder().with(Field::Utc, FieldValue::Int(0)).build()
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    /// Timestamp in UTC seconds, if the time source was valid
    pub fn utc(&self) -> Option<i64> {
        match self.fields.get(&Field::Utc)? {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Float(v) => Some(*v as i64),
            FieldValue::Bool(_) => None,
        }
    }

    pub fn number(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }

    pub fn flag(&self, field: Field) -> Option<bool> {
        self.get(field).and_then(FieldValue::as_bool)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    /// Copy of this snapshot with power and speed replaced by smoothed values.
    ///
    /// A non-finite smoothed value leaves the original reading in place.
    pub fn with_smoothed(&self, power: f64, speed: f64) -> Self {
        let mut builder = SnapshotBuilder {
            fields: self.fields.clone(),
        };
        builder.insert(Field::Power, FieldValue::Float(power));
        builder.insert(Field::Speed, FieldValue::Float(speed));
        builder.build()
    }
}

/// Builder for [`TelemetrySnapshot`].
///
/// NaN and infinite floats are not valid telemetry and are silently skipped.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    fields: BTreeMap<Field, FieldValue>,
}

impl SnapshotBuilder {
    pub fn with(mut self, field: Field, value: FieldValue) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: Field, value: FieldValue) {
        if let FieldValue::Float(v) = value {
            if !v.is_finite() {
                return;
            }
        }
        self.fields.insert(field, value);
    }

    pub fn build(self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            fields: self.fields,
        }
    }
}
