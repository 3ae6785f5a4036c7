//! Per-Vehicle Catalog Overrides
//!
//! Each supported vehicle type carries a static list of field remaps applied
//! on top of the standard catalog.

use serde::{Deserialize, Serialize};

use crate::catalog::{read_number, Derive};
use crate::field::{Field, FieldValue, RawValues};
use crate::ids;

/// Replacement mapping for one catalog field
#[derive(Debug, Clone, Copy)]
pub struct FieldOverride {
    pub field: Field,
    pub required: &'static [&'static str],
    pub derive: Derive,
}

/// Vehicle types with known metric remaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    /// Any vehicle publishing the standard metrics
    Generic,
    NissanLeaf,
    RenaultTwizy,
    SmartEq,
    VwEUp,
    KiaENiro,
    HyundaiIoniqVfl,
}

impl VehicleType {
    /// Parse a vehicle type tag; unknown tags map to `Generic`
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "NL" => VehicleType::NissanLeaf,
            "RT" => VehicleType::RenaultTwizy,
            "SQ" => VehicleType::SmartEq,
            "VWUP" => VehicleType::VwEUp,
            "KN" => VehicleType::KiaENiro,
            "HIONVFL" => VehicleType::HyundaiIoniqVfl,
            _ => VehicleType::Generic,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            VehicleType::Generic => "",
            VehicleType::NissanLeaf => "NL",
            VehicleType::RenaultTwizy => "RT",
            VehicleType::SmartEq => "SQ",
            VehicleType::VwEUp => "VWUP",
            VehicleType::KiaENiro => "KN",
            VehicleType::HyundaiIoniqVfl => "HIONVFL",
        }
    }

    /// Field remaps for this vehicle type
    pub fn overrides(&self) -> &'static [FieldOverride] {
        match self {
            VehicleType::Generic => &[],
            VehicleType::NissanLeaf => NISSAN_LEAF,
            VehicleType::RenaultTwizy => RENAULT_TWIZY,
            VehicleType::SmartEq => SMART_EQ,
            VehicleType::VwEUp => VW_E_UP,
            VehicleType::KiaENiro => KIA_E_NIRO,
            VehicleType::HyundaiIoniqVfl => HYUNDAI_IONIQ_VFL,
        }
    }
}

const LEAF_SOC: &str = "xnl.v.b.soc.instrument";
const LEAF_SOH: &str = "xnl.v.b.soh.instrument";

// The dash gauges are what the driver sees; the BMS values drift from them.
static NISSAN_LEAF: &[FieldOverride] = &[
    FieldOverride {
        field: Field::Soc,
        required: &[LEAF_SOC],
        derive: Derive::Number(LEAF_SOC),
    },
    FieldOverride {
        field: Field::Soh,
        required: &[LEAF_SOH],
        derive: Derive::Number(LEAF_SOH),
    },
];

static RENAULT_TWIZY: &[FieldOverride] = &[
    FieldOverride {
        field: Field::Power,
        required: &[ids::VOLTAGE, ids::CURRENT],
        derive: Derive::Custom(power_from_voltage_current),
    },
    // AC only
    FieldOverride {
        field: Field::IsDcfc,
        required: &[ids::CHARGING],
        derive: Derive::Custom(never),
    },
];

const SMART_EQ_CAPACITY: &str = "xsq.bms.cap.kwh";

static SMART_EQ: &[FieldOverride] = &[
    FieldOverride {
        field: Field::Capacity,
        required: &[SMART_EQ_CAPACITY],
        derive: Derive::Number(SMART_EQ_CAPACITY),
    },
    FieldOverride {
        field: Field::IsDcfc,
        required: &[ids::CHARGING],
        derive: Derive::Custom(never),
    },
];

const E_UP_CAPACITY: &str = "xvu.b.cap.kwh.abs";
const E_UP_HVAC: &str = "xvu.e.hv.power";

static VW_E_UP: &[FieldOverride] = &[
    FieldOverride {
        field: Field::Capacity,
        required: &[E_UP_CAPACITY],
        derive: Derive::Number(E_UP_CAPACITY),
    },
    FieldOverride {
        field: Field::HvacPower,
        required: &[E_UP_HVAC],
        derive: Derive::Number(E_UP_HVAC),
    },
];

const NIRO_SOH: &str = "xkn.v.b.soh";

static KIA_E_NIRO: &[FieldOverride] = &[FieldOverride {
    field: Field::Soh,
    required: &[NIRO_SOH],
    derive: Derive::Number(NIRO_SOH),
}];

const IONIQ_CAPACITY: &str = "xhi.b.cap.kwh";

static HYUNDAI_IONIQ_VFL: &[FieldOverride] = &[
    FieldOverride {
        field: Field::Capacity,
        required: &[IONIQ_CAPACITY],
        derive: Derive::Number(IONIQ_CAPACITY),
    },
    // Park time is not published; fall back to the gear selector
    FieldOverride {
        field: Field::IsParked,
        required: &["v.e.gear"],
        derive: Derive::Custom(parked_from_gear),
    },
];

fn power_from_voltage_current(values: &RawValues) -> Option<FieldValue> {
    let volts = read_number(values, ids::VOLTAGE)?.as_f64()?;
    let amps = read_number(values, ids::CURRENT)?.as_f64()?;
    Some(FieldValue::Float(volts * amps / 1000.0))
}

fn never(_: &RawValues) -> Option<FieldValue> {
    Some(FieldValue::Bool(false))
}

fn parked_from_gear(values: &RawValues) -> Option<FieldValue> {
    let gear = values.get("v.e.gear").and_then(|r| r.as_f64())?;
    Some(FieldValue::Bool(gear == 0.0))
}
