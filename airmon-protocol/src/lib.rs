//! Host Link Communication Protocol
//!
//! This crate defines the UART protocol between a host computer and the
//! airmon board. The host issues commands; the board answers every accepted
//! command with exactly one response frame.
//!
//! # Protocol Overview
//!
//! All messages use a simple binary frame format:
//! ```text
//! ┌───────┬────────┬──────┬─────────────┬──────────┐
//! │ START │ OPCODE │ LEN  │ PAYLOAD     │ CHECKSUM │
//! │ 1B    │ 1B     │ 1B   │ 0–32B       │ 1B       │
//! └───────┴────────┴──────┴─────────────┴──────────┘
//! ```
//!
//! The checksum is the sum of OPCODE, LEN and every PAYLOAD byte, modulo 256.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod frame;
pub mod messages;

pub use frame::{Frame, FrameError, FrameParser, FRAME_START, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use messages::{HostCommand, HostResponse, NakReason, ReadingReport, StatusReport};
