//! Edge-triggered tracking of input-loss episodes.
//!
//! Control loops miss reads routinely (idle command streams, an RC receiver
//! out of range). Reporting each miss would flood the log, so a `LossMonitor`
//! only answers "is this the first miss since the last good read?" and
//! "is this the first good read since a miss?".

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LossMonitor {
    lost: bool,
}

impl LossMonitor {
    pub const fn new() -> Self {
        Self { lost: false }
    }

    /// Record a missed read. Returns `true` only for the first miss of an episode.
    pub fn missed(&mut self) -> bool {
        !core::mem::replace(&mut self.lost, true)
    }

    /// Record a good read. Returns `true` if this ends a loss episode.
    pub fn received(&mut self) -> bool {
        core::mem::replace(&mut self.lost, false)
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }
}
