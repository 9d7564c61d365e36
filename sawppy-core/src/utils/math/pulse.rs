//! Hobby RC pulse-width arithmetic.
//!
//! Standard RC receivers encode a stick position as the width of a high
//! pulse, nominally 1000 µs (full negative) to 2000 µs (full positive).

use serde::{Deserialize, Serialize};

/// Calibrated pulse-width range of the receiver, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseCalibration {
    pub min_us: u32,
    pub max_us: u32,
}

impl Default for PulseCalibration {
    fn default() -> Self {
        Self {
            min_us: 1000,
            max_us: 2000,
        }
    }
}

impl PulseCalibration {
    pub const fn new(
        min_us: u32,
        max_us: u32,
    ) -> Self {
        Self { min_us, max_us }
    }

    /// A range is usable only if it is non-empty.
    pub fn is_valid(&self) -> bool {
        self.min_us < self.max_us
    }

    /// Map a pulse width onto `[-1.0, 1.0]`.
    ///
    /// Widths outside the calibrated range are pinned to its ends first, so
    /// glitches saturate instead of producing out-of-range values. An invalid
    /// calibration always yields center.
    pub fn normalize(
        &self,
        width_us: u32,
    ) -> f32 {
        if !self.is_valid() {
            return 0.0;
        }
        let clamped = width_us.clamp(self.min_us, self.max_us);
        let span = (self.max_us - self.min_us) as f32;
        let value = -1.0 + 2.0 * (clamped - self.min_us) as f32 / span;
        value.clamp(-1.0, 1.0)
    }
}

/// Convert capture ticks to microseconds for a capture clock of `resolution_hz`.
///
/// Saturates at `u32::MAX` for very slow clocks.
pub fn ticks_to_micros(
    ticks: u32,
    resolution_hz: u32,
) -> u32 {
    if resolution_hz == 1_000_000 {
        return ticks;
    }
    let micros = (ticks as u64 * 1_000_000) / resolution_hz.max(1) as u64;
    u32::try_from(micros).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(
        a: f32,
        b: f32,
    ) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn endpoints_and_midpoint() {
        let cal = PulseCalibration::default();
        assert!(close(cal.normalize(1000), -1.0));
        assert!(close(cal.normalize(2000), 1.0));
        assert!(close(cal.normalize(1500), 0.0));
    }

    #[test]
    fn out_of_range_widths_saturate() {
        let cal = PulseCalibration::default();
        assert!(close(cal.normalize(0), -1.0));
        assert!(close(cal.normalize(999), -1.0));
        assert!(close(cal.normalize(2001), 1.0));
        assert!(close(cal.normalize(u32::MAX), 1.0));
    }

    #[test]
    fn mapping_is_monotonic_and_bounded() {
        let cal = PulseCalibration::new(1100, 1900);
        let mut prev = -1.0f32;
        for width in (900..=2100).step_by(7) {
            let v = cal.normalize(width);
            assert!((-1.0..=1.0).contains(&v), "{} -> {}", width, v);
            assert!(v >= prev, "not monotonic at {}", width);
            prev = v;
        }
    }

    #[test]
    fn empty_range_is_invalid() {
        assert!(!PulseCalibration::new(1500, 1500).is_valid());
        assert!(!PulseCalibration::new(2000, 1000).is_valid());
        assert!(PulseCalibration::default().is_valid());
        assert_eq!(PulseCalibration::new(2000, 1000).normalize(1500), 0.0);
    }

    #[test]
    fn tick_conversion() {
        assert_eq!(ticks_to_micros(1500, 1_000_000), 1500);
        assert_eq!(ticks_to_micros(3000, 2_000_000), 1500);
        assert_eq!(ticks_to_micros(150, 100_000), 1500);
    }

    #[test]
    fn slow_clock_saturates() {
        assert_eq!(ticks_to_micros(65_535, 1), u32::MAX);
        assert_eq!(ticks_to_micros(50_000, 10), u32::MAX);
        assert_eq!(ticks_to_micros(20_000, 10), 2_000_000_000);
        // Still clamps to full positive deflection.
        assert_eq!(PulseCalibration::default().normalize(ticks_to_micros(65_535, 1)), 1.0);
    }
}
