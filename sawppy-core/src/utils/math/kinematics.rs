//! Ackermann kinematics for multi-wheel rovers with independently steered wheels.
//!
//! `AckermannKinematics` turns a commanded forward speed and yaw rate into a
//! steering angle and signed speed for every wheel, so that all wheels roll
//! around one shared instantaneous center of rotation.
//!
//! Lengths are in meters, angles in radians, and coordinates follow REP-103:
//! x forward, y left, positive yaw counter-clockwise.
//!
//! # Example
//! ```rust
//! use sawppy_core::utils::math::kinematics::{AckermannKinematics, SAWPPY_WHEELS};
//! let kin = AckermannKinematics::new(SAWPPY_WHEELS);
//! let wheels = kin.compute_wheel_states(0.3, 0.5);
//! assert_eq!(wheels.len(), 6);
//! ```
use core::f32::consts::FRAC_PI_2;
use libm;
use serde::{Deserialize, Serialize};

use crate::utils::messages::{VelocityCommand, WheelCommand, WheelState};

/// Wheel contact point in the body frame (m).
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelPosition {
    pub x: f32,
    pub y: f32,
}

impl WheelPosition {
    pub const fn new(
        x: f32,
        y: f32,
    ) -> Self {
        Self { x, y }
    }
}

/// Six-wheel rocker-bogie layout: front, middle and rear pairs, left before right.
pub const SAWPPY_WHEELS: [WheelPosition; 6] = [
    WheelPosition::new(0.285, 0.255),
    WheelPosition::new(0.285, -0.255),
    WheelPosition::new(0.0, 0.285),
    WheelPosition::new(0.0, -0.285),
    WheelPosition::new(-0.255, 0.255),
    WheelPosition::new(-0.255, -0.255),
];

/// Ackermann solver for a fixed set of wheels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AckermannKinematics<const WHEELS: usize> {
    /// Body-frame wheel positions (m)
    positions: [WheelPosition; WHEELS],
}

impl<const WHEELS: usize> AckermannKinematics<WHEELS> {
    pub fn new(positions: [WheelPosition; WHEELS]) -> Self {
        Self { positions }
    }

    pub fn positions(&self) -> &[WheelPosition; WHEELS] {
        &self.positions
    }

    /// Lateral offset of the center of rotation, or `None` when driving straight.
    ///
    /// Positive values lie to the left of the rover; zero means turning in place.
    /// A yaw rate so small that the offset is not representable counts as straight.
    pub fn turn_center(
        linear_x: f32,
        angular_z: f32,
    ) -> Option<f32> {
        if angular_z == 0.0 {
            return None;
        }
        let turn_center = linear_x / angular_z;
        turn_center.is_finite().then_some(turn_center)
    }

    /// Wheel targets for forward speed `linear_x` (m/s) and yaw rate `angular_z` (rad/s).
    pub fn compute_wheel_states(
        &self,
        linear_x: f32,
        angular_z: f32,
    ) -> [WheelState; WHEELS] {
        let mut out = [WheelState::default(); WHEELS];
        match Self::turn_center(linear_x, angular_z) {
            // Parallel straight paths: no steering, uniform speed.
            None => {
                for wheel in out.iter_mut() {
                    wheel.speed = linear_x;
                }
            }
            Some(turn_center) => {
                for (wheel, pos) in out.iter_mut().zip(self.positions.iter()) {
                    *wheel = arc_wheel_state(*pos, turn_center, linear_x, angular_z);
                }
            }
        }
        out
    }

    /// Reset `out` and fill it from the planar part of `cmd`.
    ///
    /// The timestamp is left to the caller.
    pub fn apply(
        &self,
        cmd: &VelocityCommand,
        out: &mut WheelCommand<WHEELS>,
    ) {
        out.reset();
        out.wheels = self.compute_wheel_states(cmd.linear.x, cmd.angular.z);
    }
}

/// Steering and speed of one wheel tracing a circle around `turn_center`.
fn arc_wheel_state(
    pos: WheelPosition,
    turn_center: f32,
    linear_x: f32,
    angular_z: f32,
) -> WheelState {
    // Right triangle from the center of rotation to the wheel.
    let opposite = pos.x;
    let adjacent = turn_center - pos.y;
    let hypotenuse = libm::hypotf(opposite, adjacent);

    let steer = steer_angle(opposite, adjacent);

    let mut speed = angular_z * hypotenuse;
    if turn_center != 0.0 {
        // The hypotenuse lost the sign of travel; restore it from the commanded direction.
        speed = libm::copysignf(speed, linear_x);
    }

    // Center of rotation between the centerline and this wheel: wheel runs backwards.
    if (turn_center > 0.0 && pos.y > 0.0 && pos.y > turn_center)
        || (turn_center < 0.0 && pos.y < 0.0 && pos.y < turn_center)
    {
        speed = -speed;
    }

    WheelState { steer, speed }
}

fn steer_angle(
    opposite: f32,
    adjacent: f32,
) -> f32 {
    if opposite == 0.0 {
        // Wheel sits on the turning axis.
        0.0
    } else if adjacent == 0.0 {
        libm::copysignf(FRAC_PI_2, opposite)
    } else {
        libm::atanf(opposite / adjacent)
    }
}
