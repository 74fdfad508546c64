//! Display command pipeline
//!
//! Other components upsert regions into the [`DisplayFrame`]; the
//! [`DisplayPipeline`] pushes them to the controller over QSPI on its
//! redraw cadence or when a redraw is requested.

mod frame;
pub mod layout;
mod pipeline;

pub use frame::{DisplayFrame, QueuedRegion, RegionId, FRAME_CAPACITY};
pub use pipeline::{DisplayPipeline, RedrawOutcome};
