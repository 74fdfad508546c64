//! Monotonic tick counter
//!
//! Incremented only from the hardware timer's periodic interrupt; everyone
//! else reads it through [`TickSource`].

use airmon_hal::TickSource;
use portable_atomic::{AtomicU32, Ordering};

/// One period of the hardware timer interrupt
pub type Tick = u32;

/// Ticks elapsed from `since` to `now`, tolerant of counter wrap
#[inline]
pub fn elapsed(since: Tick, now: Tick) -> Tick {
    now.wrapping_sub(since)
}

/// Process-wide tick counter
pub struct TickCounter {
    count: AtomicU32,
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Advance by one tick and return the new count
    ///
    /// Only the timer interrupt handler may call this.
    pub fn advance(&self) -> Tick {
        self.count.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    pub fn now(&self) -> Tick {
        self.count.load(Ordering::Acquire)
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for TickCounter {
    fn now(&self) -> u32 {
        TickCounter::now(self)
    }
}
