//! Messages exchanged between the rover's control tasks.
//!
//! Every message travels through a [`StateChannel`](crate::utils::sync::StateChannel);
//! the aliases at the bottom of this file fix the mutex flavor and read policy
//! each message is meant to use.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Instant;
use serde::{Deserialize, Serialize};

use crate::utils::sync::StateChannel;

/// Three-component vector in the body frame (x forward, y left, z up).
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Vector3 {
    pub const fn new(
        x: f32,
        y: f32,
        z: f32,
    ) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Commanded body velocity: linear in m/s, angular in rad/s.
///
/// Only `linear.x` and `angular.z` drive a ground rover; the other components
/// are accepted and ignored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityCommand {
    #[serde(default)]
    pub linear: Vector3,
    #[serde(default)]
    pub angular: Vector3,
}

impl VelocityCommand {
    /// Planar command: forward speed and counter-clockwise yaw rate.
    pub const fn planar(
        linear_x: f32,
        angular_z: f32,
    ) -> Self {
        Self {
            linear: Vector3::new(linear_x, 0.0, 0.0),
            angular: Vector3::new(0.0, 0.0, angular_z),
        }
    }

    /// True if any component a ground rover cannot act on is non-zero.
    pub fn has_out_of_plane(&self) -> bool {
        self.angular.x != 0.0 || self.angular.y != 0.0 || self.linear.y != 0.0 || self.linear.z != 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.linear.is_finite() && self.angular.is_finite()
    }
}

/// Normalized RC stick positions, one per axis, each in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoystickSnapshot<const AXES: usize> {
    pub axes: [f32; AXES],
    pub timestamp: Instant,
}

impl<const AXES: usize> JoystickSnapshot<AXES> {
    /// All axes centered.
    pub fn centered(timestamp: Instant) -> Self {
        Self {
            axes: [0.0; AXES],
            timestamp,
        }
    }
}

/// Steering angle (rad, CCW positive) and signed wheel speed (m/s) of one wheel.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct WheelState {
    pub steer: f32,
    pub speed: f32,
}

/// Per-wheel drive targets for the actuation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelCommand<const WHEELS: usize> {
    pub wheels: [WheelState; WHEELS],
    pub timestamp: Instant,
}

impl<const WHEELS: usize> WheelCommand<WHEELS> {
    /// Straight ahead and stopped.
    pub fn new(timestamp: Instant) -> Self {
        Self {
            wheels: [WheelState::default(); WHEELS],
            timestamp,
        }
    }

    /// Point every wheel straight ahead and stop it.
    pub fn reset(&mut self) {
        self.wheels = [WheelState::default(); WHEELS];
    }

    pub fn is_neutral(&self) -> bool {
        self.wheels.iter().all(|w| *w == WheelState::default())
    }

    pub fn is_finite(&self) -> bool {
        self.wheels
            .iter()
            .all(|w| w.steer.is_finite() && w.speed.is_finite())
    }
}

/// Velocity commands: one reader, drained on read.
pub type CommandChannel = StateChannel<CriticalSectionRawMutex, VelocityCommand>;
/// Joystick state: overwritten by the decoder, peeked by anyone interested.
pub type JoystickChannel<const AXES: usize> = StateChannel<CriticalSectionRawMutex, JoystickSnapshot<AXES>>;
/// Wheel targets: overwritten by the solver, peeked by the actuation layer.
pub type WheelChannel<const WHEELS: usize> = StateChannel<CriticalSectionRawMutex, WheelCommand<WHEELS>>;
