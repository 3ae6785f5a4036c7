//! Vehicle Metric Catalog
//!
//! Maps abstract telemetry fields onto the raw metric identifiers published by
//! the vehicle, and assembles point-in-time snapshots from them.

mod assembler;
mod catalog;
mod error;
mod field;
mod provider;
mod snapshot;
mod vehicle;

pub use assembler::SnapshotAssembler;
pub use catalog::{Derive, MetricCatalog, MetricCatalogEntry};
pub use error::MetricError;
pub use field::{Field, FieldValue, RawValue, RawValues};
pub use provider::{MemoryProvider, SimulatedProvider, SnapshotProvider};
pub use snapshot::{SnapshotBuilder, TelemetrySnapshot};
pub use vehicle::{FieldOverride, VehicleType};

/// Well-known raw metric identifiers
pub mod ids {
    /// State of charge (%)
    pub const SOC: &str = "v.b.soc";
    /// State of health (%)
    pub const SOH: &str = "v.b.soh";
    /// Main battery power (kW, negative while regenerating)
    pub const POWER: &str = "v.b.power";
    /// Main battery voltage (V)
    pub const VOLTAGE: &str = "v.b.voltage";
    /// Main battery current (A)
    pub const CURRENT: &str = "v.b.current";
    /// Battery temperature (°C)
    pub const BATT_TEMP: &str = "v.b.temp";
    /// Estimated range (km)
    pub const RANGE_EST: &str = "v.b.range.est";
    /// Vehicle speed (kph)
    pub const SPEED: &str = "v.p.speed";
    /// GPS lock flag
    pub const GPS_LOCK: &str = "v.p.gpslock";
    pub const LATITUDE: &str = "v.p.latitude";
    pub const LONGITUDE: &str = "v.p.longitude";
    pub const DIRECTION: &str = "v.p.direction";
    pub const ALTITUDE: &str = "v.p.altitude";
    /// Odometer (km)
    pub const ODOMETER: &str = "v.p.odometer";
    /// Charging in progress
    pub const CHARGING: &str = "v.c.charging";
    /// Connector type (type2, ccs, chademo, ...)
    pub const CHARGE_TYPE: &str = "v.c.type";
    /// Energy added this charge session (kWh)
    pub const CHARGE_KWH: &str = "v.c.kwh";
    /// Seconds since the vehicle was parked, zero while driving
    pub const PARK_TIME: &str = "v.e.parktime";
    /// Ambient temperature (°C)
    pub const AMBIENT_TEMP: &str = "v.e.temp";
    pub const CABIN_TEMP: &str = "v.e.cabintemp";
    pub const CABIN_SETPOINT: &str = "v.e.cabinsetpoint";
    pub const TPMS_FL: &str = "v.tp.fl.p";
    pub const TPMS_FR: &str = "v.tp.fr.p";
    pub const TPMS_RL: &str = "v.tp.rl.p";
    pub const TPMS_RR: &str = "v.tp.rr.p";
    /// Vehicle type tag
    pub const VEHICLE_TYPE: &str = "v.type";
}
