//! Task-to-task state sharing.
//!
//! - `state_channel`: single-slot, latest-value-wins mailbox with timeout-bounded reads
//! - `loss_monitor`: edge-triggered bookkeeping for missed reads

pub mod loss_monitor;
pub mod state_channel;

pub use loss_monitor::LossMonitor;
pub use state_channel::{ReadPolicy, StateChannel};
