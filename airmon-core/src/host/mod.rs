//! Host link: framed commands over UART
//!
//! Incoming bytes are drained without blocking and assembled by the
//! protocol's [`FrameParser`](airmon_protocol::FrameParser). Malformed frames
//! are dropped and the parser resynchronizes on the next START byte.
//! Responses are written with a bounded stall budget.

mod link;

pub use link::{DispatchContext, HostLink, RX_BUFFER_SIZE};
