//! Single-slot overwrite mailbox.
//!
//! A `StateChannel` holds at most one value: the freshest one published.
//! Publishing never blocks and silently replaces whatever is pending, so a
//! slow reader never builds up a backlog. Readers suspend until a value is
//! present or their deadline passes.
//!
//! Two read policies exist:
//! - [`ReadPolicy::Drain`]: a successful read empties the slot (commands).
//! - [`ReadPolicy::Peek`]: a successful read leaves the slot populated so any
//!   number of readers can observe the current state (snapshots).

use core::{cell::RefCell, future::poll_fn, task::Poll};

use embassy_sync::{
    blocking_mutex::{raw::RawMutex, Mutex},
    waitqueue::MultiWakerRegistration,
};
use embassy_time::{with_timeout, Duration, TimeoutError};

/// Maximum number of readers that may be suspended on one channel at a time.
///
/// Extra readers are still served: registering past this limit wakes every
/// waiting reader, which then re-register.
pub const MAX_READERS: usize = 4;

/// What a successful read does to the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Take the value, leaving the slot empty.
    Drain,
    /// Copy the value, leaving it in place.
    Peek,
}

struct Slot<T> {
    value: Option<T>,
    readers: MultiWakerRegistration<MAX_READERS>,
}

/// Latest-value-wins channel shared between one writer and one or more readers.
pub struct StateChannel<M: RawMutex, T> {
    policy: ReadPolicy,
    slot: Mutex<M, RefCell<Slot<T>>>,
}

impl<M: RawMutex, T: Clone> StateChannel<M, T> {
    /// Create an empty channel with the given read policy.
    pub const fn new(policy: ReadPolicy) -> Self {
        Self {
            policy,
            slot: Mutex::new(RefCell::new(Slot {
                value: None,
                readers: MultiWakerRegistration::new(),
            })),
        }
    }

    /// Empty channel whose reads take the value.
    pub const fn drain() -> Self {
        Self::new(ReadPolicy::Drain)
    }

    /// Empty channel whose reads leave the value in place.
    pub const fn peek_only() -> Self {
        Self::new(ReadPolicy::Peek)
    }

    pub fn policy(&self) -> ReadPolicy {
        self.policy
    }

    /// Replace the pending value and wake all suspended readers.
    pub fn publish(
        &self,
        value: T,
    ) {
        self.slot.lock(|slot| {
            let mut slot = slot.borrow_mut();
            slot.value = Some(value);
            slot.readers.wake();
        });
    }

    /// Wait up to `timeout` for a value.
    ///
    /// Returns `Err(TimeoutError)` if nothing was published in time; the
    /// caller decides what to fall back to.
    pub async fn consume(
        &self,
        timeout: Duration,
    ) -> Result<T, TimeoutError> {
        with_timeout(timeout, self.receive()).await
    }

    /// Wait without a deadline for a value.
    pub fn receive(&self) -> impl core::future::Future<Output = T> + '_ {
        poll_fn(move |cx| {
            self.slot.lock(|slot| {
                let mut slot = slot.borrow_mut();
                match self.read(&mut slot) {
                    Some(value) => Poll::Ready(value),
                    None => {
                        slot.readers.register(cx.waker());
                        Poll::Pending
                    }
                }
            })
        })
    }

    /// Non-blocking read honoring the channel's policy.
    pub fn try_consume(&self) -> Option<T> {
        self.slot.lock(|slot| self.read(&mut slot.borrow_mut()))
    }

    /// Non-blocking copy of the pending value, whatever the policy.
    pub fn peek(&self) -> Option<T> {
        self.slot.lock(|slot| slot.borrow().value.clone())
    }

    pub fn has_value(&self) -> bool {
        self.slot.lock(|slot| slot.borrow().value.is_some())
    }

    /// Discard any pending value.
    pub fn clear(&self) {
        self.slot.lock(|slot| slot.borrow_mut().value = None);
    }

    fn read(
        &self,
        slot: &mut Slot<T>,
    ) -> Option<T> {
        match self.policy {
            ReadPolicy::Drain => slot.value.take(),
            ReadPolicy::Peek => slot.value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::{block_on, join::join};
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_time::Timer;

    type TestChannel = StateChannel<CriticalSectionRawMutex, u32>;

    #[test]
    fn publish_overwrites_pending_value() {
        let ch = TestChannel::drain();
        ch.publish(1);
        ch.publish(2);
        assert_eq!(ch.try_consume(), Some(2));
        assert_eq!(ch.try_consume(), None);
    }

    #[test]
    fn drain_read_empties_slot() {
        let ch = TestChannel::drain();
        ch.publish(7);
        assert_eq!(block_on(ch.consume(Duration::from_millis(10))), Ok(7));
        assert!(!ch.has_value());
    }

    #[test]
    fn peek_read_keeps_slot() {
        let ch = TestChannel::peek_only();
        ch.publish(3);
        assert_eq!(block_on(ch.consume(Duration::from_millis(10))), Ok(3));
        assert_eq!(block_on(ch.consume(Duration::from_millis(10))), Ok(3));
        assert_eq!(ch.peek(), Some(3));
    }

    #[test]
    fn peek_does_not_drain() {
        let ch = TestChannel::drain();
        ch.publish(9);
        assert_eq!(ch.peek(), Some(9));
        assert_eq!(ch.try_consume(), Some(9));
    }

    #[test]
    fn consume_times_out_on_empty_channel() {
        let ch = TestChannel::drain();
        assert_eq!(
            block_on(ch.consume(Duration::from_millis(5))),
            Err(TimeoutError)
        );
    }

    #[test]
    fn suspended_reader_is_woken_by_publish() {
        let ch = TestChannel::drain();
        let (got, _) = block_on(join(ch.consume(Duration::from_secs(1)), async {
            Timer::after_millis(5).await;
            ch.publish(42);
        }));
        assert_eq!(got, Ok(42));
    }

    #[test]
    fn clear_discards_pending_value() {
        let ch = TestChannel::peek_only();
        ch.publish(5);
        ch.clear();
        assert_eq!(ch.peek(), None);
    }
}
