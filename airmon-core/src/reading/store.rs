//! Double-buffered reading publication
//!
//! One writer fills the slot readers are not pointed at, then flips the
//! published index. Readers copy whichever slot the index names, so they see
//! either the previous complete reading or the new complete one.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use portable_atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use super::SensorReading;

type Slot = Mutex<CriticalSectionRawMutex, Cell<SensorReading>>;

/// Process-wide latest sensor reading
pub struct ReadingStore {
    slots: [Slot; 2],
    published: AtomicU8,
    sequence: AtomicU32,
    writer_taken: AtomicBool,
}

impl ReadingStore {
    pub const fn new() -> Self {
        Self {
            slots: [
                Mutex::new(Cell::new(SensorReading::EMPTY)),
                Mutex::new(Cell::new(SensorReading::EMPTY)),
            ],
            published: AtomicU8::new(0),
            sequence: AtomicU32::new(0),
            writer_taken: AtomicBool::new(false),
        }
    }

    /// Claim the single writer handle
    ///
    /// Returns `None` once the handle has been handed out.
    pub fn take_publisher(&self) -> Option<ReadingPublisher<'_>> {
        if self.writer_taken.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(ReadingPublisher { store: self })
        }
    }

    /// Copy of the most recently published reading
    pub fn latest(&self) -> SensorReading {
        let index = self.published.load(Ordering::Acquire) as usize & 1;
        self.slots[index].lock(Cell::get)
    }

    /// Number of readings published so far
    ///
    /// Consumers compare this against a remembered value to detect new data.
    pub fn sequence(&self) -> u32 {
        self.sequence.load(Ordering::Acquire)
    }

    fn publish(&self, reading: SensorReading) {
        let next = (self.published.load(Ordering::Relaxed) ^ 1) & 1;
        self.slots[next as usize].lock(|slot| slot.set(reading));
        self.published.store(next, Ordering::Release);
        self.sequence.fetch_add(1, Ordering::AcqRel);
    }
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The only handle allowed to publish into a [`ReadingStore`]
pub struct ReadingPublisher<'a> {
    store: &'a ReadingStore,
}

impl<'a> ReadingPublisher<'a> {
    pub fn publish(&mut self, reading: SensorReading) {
        self.store.publish(reading);
    }

    pub fn store(&self) -> &'a ReadingStore {
        self.store
    }
}
