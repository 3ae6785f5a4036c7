//! Power/Speed Smoothing
//!
//! Accumulates per-tick power and speed readings between queued snapshots and
//! reduces them to one representative reading.

use serde::{Deserialize, Serialize};

/// One paired power/speed reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSample {
    pub power: f64,
    pub speed: f64,
}

/// Rolling window of readings reduced by median-by-power selection.
///
/// The median is always a real reading: power and speed come from the same
/// tick. For an even count the lower middle reading is chosen, since the two
/// middle readings may be seconds apart.
#[derive(Debug, Clone, Default)]
pub struct MetricSmoother {
    window: Vec<PowerSample>,
}

impl MetricSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading; partial readings are discarded
    pub fn push(&mut self, power: Option<f64>, speed: Option<f64>) {
        if let (Some(power), Some(speed)) = (power, speed) {
            self.window.push(PowerSample { power, speed });
        }
    }

    /// Median-by-power reading of the current window
    pub fn reduce(&self) -> Option<PowerSample> {
        if self.window.is_empty() {
            return None;
        }

        let mut sorted = self.window.clone();
        sorted.sort_by(|a, b| a.power.total_cmp(&b.power));

        let n = sorted.len();
        let index = if n % 2 == 1 { n / 2 } else { n / 2 - 1 };
        Some(sorted[index])
    }

    /// Reduce and clear the window in one step
    pub fn take(&mut self) -> Option<PowerSample> {
        let median = self.reduce();
        self.window.clear();
        median
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smoother(powers: &[f64]) -> MetricSmoother {
        let mut s = MetricSmoother::new();
        for (i, p) in powers.iter().enumerate() {
            s.push(Some(*p), Some(i as f64 * 10.0));
        }
        s
    }

    #[test]
    fn test_empty_window_reduces_to_none() {
        assert_eq!(MetricSmoother::new().reduce(), None);
    }

    #[test]
    fn test_single_reading_is_returned_unchanged() {
        let mut s = MetricSmoother::new();
        s.push(Some(12.5), Some(88.0));
        assert_eq!(s.reduce(), Some(PowerSample { power: 12.5, speed: 88.0 }));
    }

    #[test]
    fn test_odd_window_returns_middle() {
        let s = smoother(&[1.0, 3.0, 2.0]);
        // power 2 was the third push, speed 20
        assert_eq!(s.reduce(), Some(PowerSample { power: 2.0, speed: 20.0 }));
    }

    #[test]
    fn test_even_window_returns_lower_middle_not_average() {
        let s = smoother(&[1.0, 4.0]);
        let median = s.reduce().unwrap();
        assert_eq!(median.power, 1.0);
        assert_ne!(median.power, 2.5);
    }

    #[test]
    fn test_partial_readings_are_skipped() {
        let mut s = MetricSmoother::new();
        s.push(Some(5.0), None);
        s.push(None, Some(30.0));
        s.push(None, None);
        assert!(s.is_empty());
    }

    #[test]
    fn test_take_clears_window() {
        let mut s = smoother(&[3.0, 9.0, 6.0, 1.0, 7.0]);
        assert_eq!(s.take().map(|m| m.power), Some(6.0));
        assert!(s.is_empty());
        assert_eq!(s.take(), None);
    }

    #[test]
    fn test_negative_power_sorts_first() {
        let s = smoother(&[-20.0, 5.0, -3.0, 40.0]);
        // sorted: -20, -3, 5, 40 -> lower middle -3
        assert_eq!(s.reduce().map(|m| m.power), Some(-3.0));
    }
}
