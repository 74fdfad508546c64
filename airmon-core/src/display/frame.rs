//! Regions queued for the next redraw

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::{FnvIndexMap, Vec};

use crate::traits::{DisplayError, Region};

/// Maximum distinct regions per frame (power of two)
pub const FRAME_CAPACITY: usize = 8;

/// Caller-chosen region key
pub type RegionId = u8;

/// A region as captured for one redraw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedRegion {
    pub id: RegionId,
    pub region: Region,
    generation: u32,
}

#[derive(Clone, Copy)]
struct Entry {
    region: Region,
    generation: u32,
}

struct FrameState {
    entries: FnvIndexMap<RegionId, Entry, FRAME_CAPACITY>,
    next_generation: u32,
}

/// Set of regions to paint on the next redraw, keyed by region id
///
/// Safe to share between the main loop and interrupt handlers.
pub struct DisplayFrame {
    state: Mutex<CriticalSectionRawMutex, RefCell<FrameState>>,
}

impl DisplayFrame {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(FrameState {
                entries: FnvIndexMap::new(),
                next_generation: 0,
            })),
        }
    }

    /// Insert or replace the region under `id`
    ///
    /// Re-queuing identical content is a no-op.
    pub fn enqueue(&self, id: RegionId, region: Region) -> Result<(), DisplayError> {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            if let Some(existing) = state.entries.get(&id) {
                if existing.region == region {
                    return Ok(());
                }
            }
            let generation = state.next_generation;
            state.next_generation = generation.wrapping_add(1);
            state
                .entries
                .insert(id, Entry { region, generation })
                .map(|_| ())
                .map_err(|_| DisplayError::FrameFull)
        })
    }

    /// Copy of every queued region, in no particular order
    pub fn snapshot(&self) -> Vec<QueuedRegion, FRAME_CAPACITY> {
        self.state.lock(|cell| {
            cell.borrow()
                .entries
                .iter()
                .map(|(&id, entry)| QueuedRegion {
                    id,
                    region: entry.region,
                    generation: entry.generation,
                })
                .collect()
        })
    }

    /// Remove the captured regions that were not replaced since the snapshot
    pub fn retire(&self, drawn: &[QueuedRegion]) {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            for queued in drawn {
                let unchanged = state
                    .entries
                    .get(&queued.id)
                    .is_some_and(|e| e.generation == queued.generation);
                if unchanged {
                    state.entries.remove(&queued.id);
                }
            }
        })
    }

    pub fn get(&self, id: RegionId) -> Option<Region> {
        self.state
            .lock(|cell| cell.borrow().entries.get(&id).map(|e| e.region))
    }

    pub fn len(&self) -> usize {
        self.state.lock(|cell| cell.borrow().entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.state.lock(|cell| cell.borrow_mut().entries.clear())
    }
}

impl Default for DisplayFrame {
    fn default() -> Self {
        Self::new()
    }
}
