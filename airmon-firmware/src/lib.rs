//! Firmware runtime for airmon boards
//!
//! A board support crate provides the reset entry, the concrete peripherals
//! (as a [`Board`] implementation) and the interrupt vectors. Everything else
//! lives here:
//!
//! ```text
//!  timer IRQ ──► on_timer_interrupt ──► SHARED.ticks / tick signal
//!  UART RX IRQ ─► on_uart_rx_interrupt ─► SHARED receive queue
//!                                              │
//!  main loop: App::run ─► App::poll ───────────┘
//!     ├─ Sampler (I2C via arbiter) ─► ReadingStore
//!     ├─ layout ─► DisplayPipeline (QSPI via arbiter)
//!     └─ HostLink (hp_uart) ─► dispatch ─► responses
//! ```
//!
//! No executor and no heap: interrupt handlers only record events, and all
//! work that may wait on a bus runs in the main loop.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod app;
pub mod board;
pub mod shared;

pub use app::{App, StartupError};
pub use board::{Board, BoardParts};
pub use shared::{
    on_timer_interrupt, on_uart_rx_interrupt, start_timebase, QueuedUartRx, Shared, SHARED,
};
