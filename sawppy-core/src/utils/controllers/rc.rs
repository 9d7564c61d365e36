//! Radio-control pulse decoder.
//!
//! Reads one [`PulseCapture`] per RC axis, converts the latest pulse width of
//! each to a value in `[-1.0, 1.0]`, and publishes a [`JoystickSnapshot`]
//! every cycle. An axis that produces nothing within its wait bound reads as
//! centered (0.0) for that cycle; stale stick positions are never reused.

use embassy_time::{with_timeout, Duration, Instant};
use serde::{Deserialize, Serialize};

use super::{
    capture::{CaptureConfig, PulseCapture, PulseItem},
    check_timeout, ConfigError,
};
use crate::utils::{
    math::pulse::{ticks_to_micros, PulseCalibration},
    messages::{JoystickChannel, JoystickSnapshot},
    sync::LossMonitor,
};

/// Decoder settings shared by all axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    #[serde(default)]
    pub calibration: PulseCalibration,
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Longest wait for one axis per cycle (ms)
    #[serde(default = "default_axis_timeout_ms")]
    pub axis_timeout_ms: u64,
}

fn default_axis_timeout_ms() -> u64 {
    // Two and a half frames of a 50 Hz receiver.
    50
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            calibration: PulseCalibration::default(),
            capture: CaptureConfig::default(),
            axis_timeout_ms: default_axis_timeout_ms(),
        }
    }
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.calibration.is_valid() {
            return Err(ConfigError::InvalidCalibration {
                min_us: self.calibration.min_us,
                max_us: self.calibration.max_us,
            });
        }
        check_timeout("axis", self.axis_timeout_ms)?;
        self.capture.validate()
    }
}

/// Errors that stop the decoder from starting.
#[derive(Debug)]
pub enum DecoderError<E: core::fmt::Debug> {
    Config(ConfigError),
    Capture { axis: usize, error: E },
}

impl<E: core::fmt::Debug> From<ConfigError> for DecoderError<E> {
    fn from(e: ConfigError) -> Self {
        DecoderError::Config(e)
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for DecoderError<E> {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            DecoderError::Config(e) => write!(f, "{}", e),
            DecoderError::Capture { axis, error } => {
                write!(f, "capture for axis {} failed to start: {:?}", axis, error)
            }
        }
    }
}

/// Width of the high phase of the last entry in a frame, in microseconds.
///
/// `None` for an empty frame.
pub fn last_pulse_width_us(
    items: &[PulseItem],
    resolution_hz: u32,
) -> Option<u32> {
    items
        .last()
        .map(|item| ticks_to_micros(item.high_ticks(), resolution_hz))
}

/// Periodic RC decoder over `AXES` owned capture resources.
pub struct PulseDecoder<'a, C, const AXES: usize> {
    captures: [C; AXES],
    monitors: [LossMonitor; AXES],
    calibration: PulseCalibration,
    resolution_hz: u32,
    axis_timeout: Duration,
    output: &'a JoystickChannel<AXES>,
}

impl<'a, C, const AXES: usize> PulseDecoder<'a, C, AXES>
where
    C: PulseCapture,
{
    /// Validate `config`, start every capture and bind the output channel.
    ///
    /// Fails without starting anything further if the channel is missing,
    /// the configuration is unusable, or a capture refuses to start.
    pub fn new(
        mut captures: [C; AXES],
        output: Option<&'a JoystickChannel<AXES>>,
        config: DecoderConfig,
    ) -> Result<Self, DecoderError<C::Error>> {
        let output = output.ok_or(ConfigError::MissingChannel("joystick"))?;
        config.validate()?;

        for (axis, capture) in captures.iter_mut().enumerate() {
            let wiring = capture.channel();
            capture
                .start(&config.capture)
                .map_err(|error| DecoderError::Capture { axis, error })?;
            tracing::info!(axis, channel = wiring.channel, pin = wiring.pin, "RC capture started");
        }

        Ok(Self {
            captures,
            monitors: [LossMonitor::new(); AXES],
            calibration: config.calibration,
            resolution_hz: config.capture.resolution_hz,
            axis_timeout: Duration::from_millis(config.axis_timeout_ms),
            output,
        })
    }

    pub fn captures(&self) -> &[C; AXES] {
        &self.captures
    }

    /// Decode one snapshot, publish it, and return it.
    pub async fn step(&mut self) -> JoystickSnapshot<AXES> {
        let mut axes = [0.0f32; AXES];

        for (axis, (capture, monitor)) in self
            .captures
            .iter_mut()
            .zip(self.monitors.iter_mut())
            .enumerate()
        {
            let width = match with_timeout(self.axis_timeout, capture.receive()).await {
                Ok(Some(frame)) => {
                    let width = last_pulse_width_us(&*frame, self.resolution_hz);
                    drop(frame);
                    width
                }
                Ok(None) | Err(_) => None,
            };

            axes[axis] = match width {
                Some(width_us) => {
                    if monitor.received() {
                        tracing::info!(axis, "RC signal restored");
                    }
                    self.calibration.normalize(width_us)
                }
                None => {
                    if monitor.missed() {
                        tracing::warn!(axis, "no RC pulse captured, centering axis");
                    }
                    0.0
                }
            };
        }

        let snapshot = JoystickSnapshot {
            axes,
            timestamp: Instant::now(),
        };
        self.output.publish(snapshot);
        snapshot
    }

    /// Decode forever.
    pub async fn run(&mut self) -> ! {
        tracing::info!(axes = AXES, "RC pulse decoder running");
        loop {
            let snapshot = self.step().await;
            tracing::trace!(axes = ?snapshot.axes, "joystick");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::controllers::MAX_TIMEOUT_MS;

    #[test]
    fn last_entry_wins() {
        let items = [PulseItem::pulse(1100, 18900), PulseItem::pulse(1700, 18300)];
        assert_eq!(last_pulse_width_us(&items, 1_000_000), Some(1700));
    }

    #[test]
    fn low_first_entry_uses_second_phase() {
        let items = [PulseItem::new(false, 18000, true, 1250)];
        assert_eq!(last_pulse_width_us(&items, 1_000_000), Some(1250));
    }

    #[test]
    fn empty_frame_has_no_width() {
        assert_eq!(last_pulse_width_us(&[], 1_000_000), None);
    }

    #[test]
    fn resolution_scales_width() {
        let items = [PulseItem::pulse(3000, 100)];
        assert_eq!(last_pulse_width_us(&items, 2_000_000), Some(1500));
    }

    #[test]
    fn config_validation() {
        assert!(DecoderConfig::default().validate().is_ok());

        let bad_cal = DecoderConfig {
            calibration: PulseCalibration::new(2000, 1000),
            ..DecoderConfig::default()
        };
        assert_eq!(
            bad_cal.validate(),
            Err(ConfigError::InvalidCalibration {
                min_us: 2000,
                max_us: 1000
            })
        );

        let no_wait = DecoderConfig {
            axis_timeout_ms: 0,
            ..DecoderConfig::default()
        };
        assert_eq!(no_wait.validate(), Err(ConfigError::ZeroTimeout("axis")));

        let forever = DecoderConfig {
            axis_timeout_ms: u64::MAX,
            ..DecoderConfig::default()
        };
        assert_eq!(
            forever.validate(),
            Err(ConfigError::TimeoutTooLong {
                name: "axis",
                max_ms: MAX_TIMEOUT_MS
            })
        );
    }

    #[test]
    fn config_defaults_fill_missing_json_fields() {
        let cfg: DecoderConfig = serde_json::from_str(r#"{"axis_timeout_ms": 30}"#).unwrap();
        assert_eq!(cfg.axis_timeout_ms, 30);
        assert_eq!(cfg.calibration, PulseCalibration::default());
        assert_eq!(cfg.capture, CaptureConfig::default());
    }
}
