//! RC pulse decoding and Ackermann wheel kinematics for six-wheel rovers on
//! no-std embedded platforms.
//!
//! For a host-side simulation, see the `mock-rover` crate in `sawppy-app/`.
#![no_std]

pub mod utils;

#[doc(hidden)]
pub mod reexports {
    pub use static_cell::StaticCell;
}
