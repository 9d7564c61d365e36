//! Control tasks and the resources they own.
//!
//! - `capture`: pulse-width capture resources, real or simulated
//! - `rc`: RC pulse decoder publishing joystick snapshots
//! - `wheels`: Ackermann solver publishing wheel commands

pub mod capture;
pub mod rc;
pub mod wheels;

pub use capture::{
    CaptureConfig, CaptureError, FrameChannel, PulseCapture, PulseFrame, PulseItem, RcChannel,
    SimulatedCapture,
};
pub use rc::{DecoderConfig, DecoderError, PulseDecoder};
pub use wheels::{AckermannSolver, Cycle, SolverConfig, TimeoutPolicy};

/// Configuration problems that keep a task from starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A required channel was not provided.
    MissingChannel(&'static str),
    /// Pulse-width range is empty or inverted.
    InvalidCalibration { min_us: u32, max_us: u32 },
    InvalidCapture(&'static str),
    /// A wait bound of zero would never let data through.
    ZeroTimeout(&'static str),
    /// A wait bound above [`MAX_TIMEOUT_MS`].
    TimeoutTooLong { name: &'static str, max_ms: u64 },
}

/// Longest wait bound any task accepts (ms).
pub const MAX_TIMEOUT_MS: u64 = 3_600_000;

/// Check that a wait bound is usable as an `embassy_time::Duration`.
pub(crate) fn check_timeout(
    name: &'static str,
    timeout_ms: u64,
) -> Result<(), ConfigError> {
    if timeout_ms == 0 {
        return Err(ConfigError::ZeroTimeout(name));
    }
    if timeout_ms > MAX_TIMEOUT_MS {
        return Err(ConfigError::TimeoutTooLong {
            name,
            max_ms: MAX_TIMEOUT_MS,
        });
    }
    Ok(())
}

impl core::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            ConfigError::MissingChannel(name) => write!(f, "{} channel was not provided", name),
            ConfigError::InvalidCalibration { min_us, max_us } => {
                write!(f, "pulse range {}..{} us is empty", min_us, max_us)
            }
            ConfigError::InvalidCapture(why) => write!(f, "invalid capture config: {}", why),
            ConfigError::ZeroTimeout(name) => write!(f, "{} timeout must be non-zero", name),
            ConfigError::TimeoutTooLong { name, max_ms } => {
                write!(f, "{} timeout exceeds {} ms", name, max_ms)
            }
        }
    }
}
