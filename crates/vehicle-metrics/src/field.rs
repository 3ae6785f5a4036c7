//! Telemetry Field Vocabulary and Values

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::MetricError;

/// Raw metric values keyed by metric identifier
pub type RawValues = BTreeMap<String, RawValue>;

/// Fixed vocabulary of snapshot keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Utc,
    Soc,
    Soh,
    Power,
    Speed,
    Lat,
    Lon,
    Heading,
    Elevation,
    IsCharging,
    IsDcfc,
    IsParked,
    KwhCharged,
    Capacity,
    ExtTemp,
    BattTemp,
    CabinTemp,
    Voltage,
    Current,
    Odometer,
    EstBatteryRange,
    HvacPower,
    HvacSetpoint,
    TirePressureFl,
    TirePressureFr,
    TirePressureRl,
    TirePressureRr,
}

impl Field {
    /// Every field, in catalog order
    pub const ALL: [Field; 27] = [
        Field::Utc,
        Field::Soc,
        Field::Soh,
        Field::Power,
        Field::Speed,
        Field::Lat,
        Field::Lon,
        Field::Heading,
        Field::Elevation,
        Field::IsCharging,
        Field::IsDcfc,
        Field::IsParked,
        Field::KwhCharged,
        Field::Capacity,
        Field::ExtTemp,
        Field::BattTemp,
        Field::CabinTemp,
        Field::Voltage,
        Field::Current,
        Field::Odometer,
        Field::EstBatteryRange,
        Field::HvacPower,
        Field::HvacSetpoint,
        Field::TirePressureFl,
        Field::TirePressureFr,
        Field::TirePressureRl,
        Field::TirePressureRr,
    ];

    /// Wire name of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Utc => "utc",
            Field::Soc => "soc",
            Field::Soh => "soh",
            Field::Power => "power",
            Field::Speed => "speed",
            Field::Lat => "lat",
            Field::Lon => "lon",
            Field::Heading => "heading",
            Field::Elevation => "elevation",
            Field::IsCharging => "is_charging",
            Field::IsDcfc => "is_dcfc",
            Field::IsParked => "is_parked",
            Field::KwhCharged => "kwh_charged",
            Field::Capacity => "capacity",
            Field::ExtTemp => "ext_temp",
            Field::BattTemp => "batt_temp",
            Field::CabinTemp => "cabin_temp",
            Field::Voltage => "voltage",
            Field::Current => "current",
            Field::Odometer => "odometer",
            Field::EstBatteryRange => "est_battery_range",
            Field::HvacPower => "hvac_power",
            Field::HvacSetpoint => "hvac_setpoint",
            Field::TirePressureFl => "tire_pressure_fl",
            Field::TirePressureFr => "tire_pressure_fr",
            Field::TirePressureRl => "tire_pressure_rl",
            Field::TirePressureRr => "tire_pressure_rr",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| MetricError::UnknownField(s.to_string()))
    }
}

/// Derived value of a telemetry field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl FieldValue {
    /// Numeric view of the value, `None` for booleans
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Bool(_) => None,
        }
    }

    /// Boolean view of the value, `None` for numbers
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Round half away from zero to a whole number.
    ///
    /// Zero, booleans and non-finite numbers come back unchanged rather than
    /// being coerced.
    pub fn rounded(&self) -> FieldValue {
        match self {
            FieldValue::Float(v) if *v != 0.0 && v.is_finite() => FieldValue::Float(v.round()),
            other => *other,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Value of a raw vehicle metric as published by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(v) => Some(*v),
            RawValue::Text(s) => s.trim().parse().ok(),
            RawValue::Bool(_) => None,
        }
    }

    /// Truthiness; numbers are true when non-zero
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Bool(v) => Some(*v),
            RawValue::Number(v) => Some(*v != 0.0),
            RawValue::Text(s) => match s.trim() {
                "yes" | "true" | "1" => Some(true),
                "no" | "false" | "0" => Some(false),
                _ => None,
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(field.as_str().parse::<Field>().unwrap(), field);
        }
        assert!("warp_factor".parse::<Field>().is_err());
    }

    #[test]
    fn test_serde_name_matches_as_str() {
        let json = serde_json::to_string(&Field::EstBatteryRange).unwrap();
        assert_eq!(json, "\"est_battery_range\"");
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        assert_eq!(FieldValue::Float(2.5).rounded(), FieldValue::Float(3.0));
        assert_eq!(FieldValue::Float(-2.5).rounded(), FieldValue::Float(-3.0));
        assert_eq!(FieldValue::Float(7.49).rounded(), FieldValue::Float(7.0));
    }

    #[test]
    fn test_rounding_preserves_falsy_values() {
        assert_eq!(FieldValue::Float(0.0).rounded(), FieldValue::Float(0.0));
        assert_eq!(FieldValue::Bool(false).rounded(), FieldValue::Bool(false));
        assert_eq!(FieldValue::Int(0).rounded(), FieldValue::Int(0));
    }

    #[test]
    fn test_raw_value_coercions() {
        assert_eq!(RawValue::from("42.5").as_f64(), Some(42.5));
        assert_eq!(RawValue::Number(3.0).as_bool(), Some(true));
        assert_eq!(RawValue::from("no").as_bool(), Some(false));
        assert_eq!(RawValue::Bool(true).as_f64(), None);
    }

    proptest::proptest! {
        #[test]
        fn prop_rounding_is_stable(v in -1.0e6f64..1.0e6) {
            let once = FieldValue::Float(v).rounded();
            proptest::prop_assert_eq!(once.rounded(), once);
            proptest::prop_assert!((once.as_f64().unwrap() - v).abs() <= 0.5);
        }
    }
}
