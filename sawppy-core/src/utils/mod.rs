//! Utility re-exports and helper macros for the rover motion core.
//!
//! - `controllers`: capture resources, the RC pulse decoder and the Ackermann solver task
//! - `math`: Ackermann geometry and pulse-width normalization
//! - `messages`: joystick, velocity and wheel messages plus their channel types
//! - `sync`: the single-slot state channel and loss-episode tracking
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod controllers;
pub mod math;
pub mod messages;
pub mod sync;

pub use controllers::{AckermannSolver, PulseDecoder};
pub use embassy_time::*;
pub use math::kinematics::AckermannKinematics as ak;

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: $crate::reexports::StaticCell<$t> = $crate::reexports::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
