//! Math utilities for the rover.
//!
//! - `kinematics`: Ackermann steering for independently steered wheels
//! - `pulse`: RC pulse-width calibration and normalization

pub mod kinematics;
pub mod pulse;
