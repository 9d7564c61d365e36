//! Pulse-width capture resources for RC receiver channels.
//!
//! A capture resource watches one receiver output and records each completed
//! frame as a list of `(level, duration)` pairs, the way remote-control
//! capture peripherals such as the ESP32 RMT report them. Frames are handed
//! out as scoped buffers: dropping the buffer returns it to the driver.

use core::ops::Deref;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::utils::sync::StateChannel;

/// Largest number of entries a single capture frame can hold.
pub const FRAME_CAPACITY: usize = 16;

/// One captured entry: two consecutive phases with their logic levels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PulseItem {
    pub level0: bool,
    pub duration0: u16,
    pub level1: bool,
    pub duration1: u16,
}

impl PulseItem {
    pub const fn new(
        level0: bool,
        duration0: u16,
        level1: bool,
        duration1: u16,
    ) -> Self {
        Self {
            level0,
            duration0,
            level1,
            duration1,
        }
    }

    /// High phase of `high_ticks` followed by a low phase of `low_ticks`.
    pub const fn pulse(
        high_ticks: u16,
        low_ticks: u16,
    ) -> Self {
        Self::new(true, high_ticks, false, low_ticks)
    }

    /// Duration of the high phase in ticks, or 0 if neither phase is high.
    ///
    /// Hardware may report either polarity first.
    pub fn high_ticks(&self) -> u32 {
        if self.level0 {
            self.duration0 as u32
        } else if self.level1 {
            self.duration1 as u32
        } else {
            0
        }
    }
}

/// A captured frame owned by value.
pub type PulseFrame = heapless::Vec<PulseItem, FRAME_CAPACITY>;

/// Receiver output wiring for one axis.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcChannel {
    /// Capture unit index
    pub channel: u8,
    /// GPIO the receiver output is wired to
    pub pin: u8,
}

impl RcChannel {
    pub const fn new(
        channel: u8,
        pin: u8,
    ) -> Self {
        Self { channel, pin }
    }
}

/// Capture timing shared by every axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Capture clock after division (ticks per second)
    pub resolution_hz: u32,
    /// Pulses shorter than this are treated as noise
    pub filter_threshold_ticks: u16,
    /// A low phase this long ends the frame
    pub idle_threshold_ticks: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        // 80 MHz APB / 80 = one tick per microsecond.
        Self {
            resolution_hz: 1_000_000,
            filter_threshold_ticks: 100,
            idle_threshold_ticks: 3000,
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution_hz == 0 {
            return Err(ConfigError::InvalidCapture("resolution must be non-zero"));
        }
        if self.filter_threshold_ticks >= self.idle_threshold_ticks {
            return Err(ConfigError::InvalidCapture(
                "noise filter must be shorter than the idle gap",
            ));
        }
        Ok(())
    }
}

/// A pulse-width capture resource owned by the decoder.
#[allow(async_fn_in_trait)]
pub trait PulseCapture {
    type Error: core::fmt::Debug;
    /// Borrowed capture buffer; released when dropped.
    type Frame<'f>: Deref<Target = [PulseItem]>
    where
        Self: 'f;

    /// Wiring of this resource.
    fn channel(&self) -> RcChannel;

    /// Configure and start capturing. Called once at startup.
    fn start(
        &mut self,
        config: &CaptureConfig,
    ) -> Result<(), Self::Error>;

    /// Wait for the next completed frame.
    ///
    /// `None` means the driver had nothing to hand out.
    async fn receive(&mut self) -> Option<Self::Frame<'_>>;
}

/// Errors reported by [`SimulatedCapture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    InvalidConfig(ConfigError),
    AlreadyStarted,
}

/// Frames fed to a simulated capture resource.
pub type FrameChannel = StateChannel<CriticalSectionRawMutex, PulseFrame>;

/// Capture resource backed by a [`FrameChannel`] instead of hardware.
///
/// Whoever plays the receiver publishes frames into the channel; the noise
/// filter configured at `start` is applied to them as a peripheral would.
pub struct SimulatedCapture<'a> {
    wiring: RcChannel,
    source: &'a FrameChannel,
    config: Option<CaptureConfig>,
    buffer: PulseFrame,
    acquired: usize,
    released: usize,
}

impl<'a> SimulatedCapture<'a> {
    pub fn new(
        wiring: RcChannel,
        source: &'a FrameChannel,
    ) -> Self {
        Self {
            wiring,
            source,
            config: None,
            buffer: PulseFrame::new(),
            acquired: 0,
            released: 0,
        }
    }

    /// Number of buffers handed out so far.
    pub fn acquired(&self) -> usize {
        self.acquired
    }

    /// Number of buffers given back so far.
    pub fn released(&self) -> usize {
        self.released
    }

    pub fn is_started(&self) -> bool {
        self.config.is_some()
    }
}

/// Buffer lent out by [`SimulatedCapture`].
pub struct SimulatedFrame<'f, 'a> {
    capture: &'f mut SimulatedCapture<'a>,
}

impl Deref for SimulatedFrame<'_, '_> {
    type Target = [PulseItem];

    fn deref(&self) -> &[PulseItem] {
        &self.capture.buffer
    }
}

impl Drop for SimulatedFrame<'_, '_> {
    fn drop(&mut self) {
        self.capture.buffer.clear();
        self.capture.released += 1;
    }
}

impl<'a> PulseCapture for SimulatedCapture<'a> {
    type Error = CaptureError;
    type Frame<'f>
        = SimulatedFrame<'f, 'a>
    where
        Self: 'f;

    fn channel(&self) -> RcChannel {
        self.wiring
    }

    fn start(
        &mut self,
        config: &CaptureConfig,
    ) -> Result<(), CaptureError> {
        if self.config.is_some() {
            return Err(CaptureError::AlreadyStarted);
        }
        config.validate().map_err(CaptureError::InvalidConfig)?;
        self.config = Some(*config);
        Ok(())
    }

    async fn receive(&mut self) -> Option<Self::Frame<'_>> {
        let Some(config) = self.config else {
            tracing::error!(channel = self.wiring.channel, "capture read before start");
            return None;
        };
        let threshold = config.filter_threshold_ticks as u32;
        loop {
            let mut frame = self.source.receive().await;
            frame.retain(|item| item.high_ticks() >= threshold);
            if !frame.is_empty() {
                self.buffer = frame;
                break;
            }
        }
        self.acquired += 1;
        Some(SimulatedFrame { capture: self })
    }
}
