//! Metric Catalog
//!
//! Declarative table mapping each telemetry field to the raw metrics it needs
//! and a pure derivation over them.

use std::collections::BTreeSet;
use tracing::debug;

use crate::error::MetricError;
use crate::field::{Field, FieldValue, RawValues};
use crate::ids;
use crate::provider::SnapshotProvider;
use crate::vehicle::VehicleType;

/// How a field value is derived from its raw inputs
#[derive(Debug, Clone, Copy)]
pub enum Derive {
    /// Numeric value of one raw metric
    Number(&'static str),
    /// Boolean value of one raw metric
    Flag(&'static str),
    /// Numeric value of one raw metric, only while the GPS has a lock
    Located(&'static str),
    /// Arbitrary pure function over all inputs
    Custom(fn(&RawValues) -> Option<FieldValue>),
    /// Nothing to derive
    Unsupported,
}

impl Derive {
    pub fn apply(&self, values: &RawValues) -> Option<FieldValue> {
        match self {
            Derive::Number(id) => read_number(values, id),
            Derive::Flag(id) => read_flag(values, id),
            Derive::Located(id) => with_gps_lock(values, id),
            Derive::Custom(f) => f(values),
            Derive::Unsupported => None,
        }
    }
}

/// One row of the catalog
#[derive(Debug, Clone)]
pub struct MetricCatalogEntry {
    pub field: Field,
    pub label: &'static str,
    pub unit: Option<&'static str>,
    /// Raw metrics that must all be fresh; empty means unsupported
    pub required_raw_ids: BTreeSet<String>,
    pub derive: Derive,
}

impl MetricCatalogEntry {
    fn new(
        field: Field,
        label: &'static str,
        unit: Option<&'static str>,
        required: &[&str],
        derive: Derive,
    ) -> Self {
        Self {
            field,
            label,
            unit,
            required_raw_ids: required.iter().map(|id| id.to_string()).collect(),
            derive,
        }
    }

    /// Whether any raw metrics are mapped for this field
    pub fn is_mapped(&self) -> bool {
        !self.required_raw_ids.is_empty()
    }

    /// Derive the field value, requiring every raw input to be fresh
    pub fn evaluate<P: SnapshotProvider + ?Sized>(
        &self,
        provider: &P,
    ) -> Result<FieldValue, MetricError> {
        if !self.is_mapped() {
            return Err(MetricError::Unsupported(self.field.as_str()));
        }
        if let Some(stale) = self.required_raw_ids.iter().find(|id| !provider.has_fresh(id)) {
            return Err(MetricError::Stale {
                field: self.field.as_str(),
                metric: stale.clone(),
            });
        }
        let values = provider.get_values(&self.required_raw_ids);
        self.derive.apply(&values).ok_or(MetricError::Underivable(self.field.as_str()))
    }
}

/// Immutable catalog of telemetry fields for one vehicle type
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    vehicle_type: VehicleType,
    entries: Vec<MetricCatalogEntry>,
}

impl MetricCatalog {
    /// Catalog built from the generic vehicle metrics
    pub fn standard() -> Self {
        use Field::*;
        use MetricCatalogEntry as E;

        let entries = vec![
            E::new(Soc, "State of charge", Some("%"), &[ids::SOC], Derive::Number(ids::SOC)),
            E::new(Soh, "State of health", Some("%"), &[ids::SOH], Derive::Number(ids::SOH)),
            E::new(Power, "Battery power", Some("kW"), &[ids::POWER], Derive::Number(ids::POWER)),
            E::new(Speed, "Speed", Some("kph"), &[ids::SPEED], Derive::Number(ids::SPEED)),
            E::new(Lat, "Latitude", Some("°"), &[ids::GPS_LOCK, ids::LATITUDE], Derive::Located(ids::LATITUDE)),
            E::new(Lon, "Longitude", Some("°"), &[ids::GPS_LOCK, ids::LONGITUDE], Derive::Located(ids::LONGITUDE)),
            E::new(Heading, "Heading", Some("°"), &[ids::GPS_LOCK, ids::DIRECTION], Derive::Located(ids::DIRECTION)),
            E::new(Elevation, "Elevation", Some("m"), &[ids::GPS_LOCK, ids::ALTITUDE], Derive::Located(ids::ALTITUDE)),
            E::new(IsCharging, "Charging", None, &[ids::CHARGING], Derive::Flag(ids::CHARGING)),
            E::new(IsDcfc, "DC fast charging", None, &[ids::CHARGING, ids::CHARGE_TYPE], Derive::Custom(dc_fast_charging)),
            E::new(IsParked, "Parked", None, &[ids::PARK_TIME], Derive::Custom(parked)),
            E::new(KwhCharged, "Energy charged", Some("kWh"), &[ids::CHARGE_KWH], Derive::Number(ids::CHARGE_KWH)),
            E::new(Capacity, "Usable capacity", Some("kWh"), &[], Derive::Unsupported),
            E::new(ExtTemp, "Outside temperature", Some("°C"), &[ids::AMBIENT_TEMP], Derive::Number(ids::AMBIENT_TEMP)),
            E::new(BattTemp, "Battery temperature", Some("°C"), &[ids::BATT_TEMP], Derive::Number(ids::BATT_TEMP)),
            E::new(CabinTemp, "Cabin temperature", Some("°C"), &[ids::CABIN_TEMP], Derive::Number(ids::CABIN_TEMP)),
            E::new(Voltage, "Battery voltage", Some("V"), &[ids::VOLTAGE], Derive::Number(ids::VOLTAGE)),
            E::new(Current, "Battery current", Some("A"), &[ids::CURRENT], Derive::Number(ids::CURRENT)),
            E::new(Odometer, "Odometer", Some("km"), &[ids::ODOMETER], Derive::Number(ids::ODOMETER)),
            E::new(EstBatteryRange, "Estimated range", Some("km"), &[ids::RANGE_EST], Derive::Number(ids::RANGE_EST)),
            E::new(HvacPower, "HVAC power", Some("kW"), &[], Derive::Unsupported),
            E::new(HvacSetpoint, "HVAC setpoint", Some("°C"), &[ids::CABIN_SETPOINT], Derive::Number(ids::CABIN_SETPOINT)),
            E::new(TirePressureFl, "Tire pressure FL", Some("kPa"), &[ids::TPMS_FL], Derive::Number(ids::TPMS_FL)),
            E::new(TirePressureFr, "Tire pressure FR", Some("kPa"), &[ids::TPMS_FR], Derive::Number(ids::TPMS_FR)),
            E::new(TirePressureRl, "Tire pressure RL", Some("kPa"), &[ids::TPMS_RL], Derive::Number(ids::TPMS_RL)),
            E::new(TirePressureRr, "Tire pressure RR", Some("kPa"), &[ids::TPMS_RR], Derive::Number(ids::TPMS_RR)),
        ];

        Self {
            vehicle_type: VehicleType::Generic,
            entries,
        }
    }

    /// Catalog for a vehicle type tag.
    ///
    /// Always derived from the standard table, so applying the same tag any
    /// number of times gives the same catalog.
    pub fn for_vehicle(tag: &str) -> Self {
        let vehicle_type = VehicleType::from_tag(tag);
        let mut catalog = Self::standard();
        catalog.vehicle_type = vehicle_type;

        for patch in vehicle_type.overrides() {
            if let Some(entry) = catalog.entries.iter_mut().find(|e| e.field == patch.field) {
                debug!("{:?}: remapping {} to {:?}", vehicle_type, patch.field, patch.required);
                entry.required_raw_ids = patch.required.iter().map(|id| id.to_string()).collect();
                entry.derive = patch.derive;
            }
        }

        catalog
    }

    pub fn vehicle_type(&self) -> VehicleType {
        self.vehicle_type
    }

    pub fn entries(&self) -> &[MetricCatalogEntry] {
        &self.entries
    }

    pub fn entry(&self, field: Field) -> Option<&MetricCatalogEntry> {
        self.entries.iter().find(|e| e.field == field)
    }

    /// Human-readable listing of every field the vehicle currently supplies
    pub fn describe<P: SnapshotProvider + ?Sized>(&self, provider: &P) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            if let Ok(value) = entry.evaluate(provider) {
                let unit = entry.unit.map(|u| format!(" {}", u)).unwrap_or_default();
                out.push_str(&format!(
                    "{:<20} {:<24} {}{}\n",
                    entry.field.as_str(),
                    entry.label,
                    value,
                    unit
                ));
            }
        }
        out
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Number read from the named raw metric
pub(crate) fn read_number(values: &RawValues, id: &str) -> Option<FieldValue> {
    values
        .get(id)
        .and_then(|r| r.as_f64())
        .filter(|v| v.is_finite())
        .map(FieldValue::Float)
}

pub(crate) fn read_flag(values: &RawValues, id: &str) -> Option<FieldValue> {
    values.get(id).and_then(|r| r.as_bool()).map(FieldValue::Bool)
}

fn with_gps_lock(values: &RawValues, id: &str) -> Option<FieldValue> {
    let locked = values.get(ids::GPS_LOCK).and_then(|r| r.as_bool())?;
    if locked {
        read_number(values, id)
    } else {
        None
    }
}

fn dc_fast_charging(values: &RawValues) -> Option<FieldValue> {
    let charging = values.get(ids::CHARGING).and_then(|r| r.as_bool())?;
    let connector = values.get(ids::CHARGE_TYPE).and_then(|r| r.as_str()).unwrap_or("");
    let dc = matches!(connector, "ccs" | "chademo" | "gbt" | "tesla-sc");
    Some(FieldValue::Bool(charging && dc))
}

fn parked(values: &RawValues) -> Option<FieldValue> {
    values
        .get(ids::PARK_TIME)
        .and_then(|r| r.as_f64())
        .map(|secs| FieldValue::Bool(secs > 0.0))
}
