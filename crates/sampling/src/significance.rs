//! Change Significance
//!
//! A significant change is queued immediately, regardless of how recently
//! the last snapshot went out.

use vehicle_metrics::{Field, TelemetrySnapshot};

/// Whether `current` differs from `previous` enough to transmit right away.
///
/// True when state of charge, charging or parked state changed, or when
/// charging and the power rounded to a whole kW changed.
pub fn is_significant(current: &TelemetrySnapshot, previous: &TelemetrySnapshot) -> bool {
    if current.get(Field::Soc) != previous.get(Field::Soc) {
        return true;
    }
    if current.get(Field::IsCharging) != previous.get(Field::IsCharging) {
        return true;
    }
    if current.get(Field::IsParked) != previous.get(Field::IsParked) {
        return true;
    }

    let charging = current.flag(Field::IsCharging).unwrap_or(false);
    if charging {
        let now = current.get(Field::Power).map(|v| v.rounded());
        let before = previous.get(Field::Power).map(|v| v.rounded());
        return now != before;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vehicle_metrics::FieldValue;

    fn snapshot(soc: f64, charging: bool, parked: bool, power: f64) -> TelemetrySnapshot {
        TelemetrySnapshot::builder()
            .with(Field::Utc, FieldValue::Int(1_700_000_000))
            .with(Field::Soc, FieldValue::Float(soc))
            .with(Field::IsCharging, FieldValue::Bool(charging))
            .with(Field::IsParked, FieldValue::Bool(parked))
            .with(Field::Power, FieldValue::Float(power))
            .build()
    }

    #[test]
    fn test_soc_change_is_significant() {
        let prev = snapshot(50.0, false, false, 10.0);
        let curr = snapshot(50.1, false, false, 10.0);
        assert!(is_significant(&curr, &prev));
    }

    #[test]
    fn test_charging_and_parked_flips_are_significant() {
        let prev = snapshot(50.0, false, false, 0.0);
        assert!(is_significant(&snapshot(50.0, true, false, 0.0), &prev));
        assert!(is_significant(&snapshot(50.0, false, true, 0.0), &prev));
    }

    #[test]
    fn test_power_change_only_matters_while_charging() {
        let prev = snapshot(50.0, false, false, 10.0);
        assert!(!is_significant(&snapshot(50.0, false, false, 30.0), &prev));

        let prev = snapshot(50.0, true, true, -10.2);
        assert!(!is_significant(&snapshot(50.0, true, true, -10.4), &prev));
        assert!(is_significant(&snapshot(50.0, true, true, -10.6), &prev));
    }

    #[test]
    fn test_other_fields_are_not_significant() {
        let prev = snapshot(50.0, false, false, 10.0);
        let curr = TelemetrySnapshot::builder()
            .with(Field::Utc, FieldValue::Int(1_700_000_900))
            .with(Field::Soc, FieldValue::Float(50.0))
            .with(Field::IsCharging, FieldValue::Bool(false))
            .with(Field::IsParked, FieldValue::Bool(false))
            .with(Field::Power, FieldValue::Float(10.0))
            .with(Field::Speed, FieldValue::Float(120.0))
            .build();
        assert!(!is_significant(&curr, &prev));
    }

    #[test]
    fn test_missing_soc_against_present_soc() {
        let prev = TelemetrySnapshot::baseline();
        let curr = snapshot(50.0, false, false, 0.0);
        assert!(is_significant(&curr, &prev));
    }

    #[test]
    fn test_absent_power_while_charging_compares_equal() {
        let make = || {
            TelemetrySnapshot::builder()
                .with(Field::Soc, FieldValue::Float(20.0))
                .with(Field::IsCharging, FieldValue::Bool(true))
                .build()
        };
        assert!(!is_significant(&make(), &make()));
    }

    #[test]
    fn test_nan_readings_are_not_significant_against_themselves() {
        let s = snapshot(f64::NAN, true, false, f64::NAN);
        assert!(!is_significant(&s, &s.clone()));
    }

    proptest! {
        #[test]
        fn prop_snapshot_never_significant_against_itself(
            soc in any::<f64>(),
            charging in any::<bool>(),
            parked in any::<bool>(),
            power in any::<f64>(),
        ) {
            let s = snapshot(soc, charging, parked, power);
            prop_assert!(!is_significant(&s, &s.clone()));
        }
    }
}
