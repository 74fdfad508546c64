//! Host link implementation

use airmon_hal::{TickSource, UartRx, UartTx};
use airmon_protocol::{
    FrameError, FrameParser, HostCommand, HostResponse, NakReason, StatusReport,
};
use heapless::Deque;

use crate::config::{sampling_period_in_range, LinkConfig};
use crate::error::LinkError;
use crate::reading::SensorReading;
use crate::tick::{elapsed, Tick};

/// Bytes buffered between UART reads and the parser
pub const RX_BUFFER_SIZE: usize = 64;

/// Frames handled per `service` call
const MAX_FRAMES_PER_SERVICE: usize = 4;

/// What host commands can reach
///
/// Implemented by the firmware application, which owns the sampler and the
/// display pipeline.
pub trait DispatchContext {
    /// Last published reading
    fn latest_reading(&self) -> SensorReading;

    /// Apply a new base sampling period (already range-checked)
    fn set_sampling_period(&mut self, ticks: Tick);

    /// Queue host feedback and schedule a redraw
    fn request_redraw(&mut self);

    /// Sampler and display health; link counters are filled in by the link
    fn status(&self) -> StatusReport;
}

pub struct HostLink<Rx, Tx> {
    rx: Rx,
    tx: Tx,
    config: LinkConfig,
    parser: FrameParser,
    pending: Deque<u8, RX_BUFFER_SIZE>,
    /// Opcode of the last checksum-valid frame, for NAKs
    last_opcode: u8,
    frame_errors: u16,
    link_timeouts: u16,
    uart_errors: u16,
}

impl<Rx: UartRx, Tx: UartTx> HostLink<Rx, Tx> {
    pub fn new(rx: Rx, tx: Tx, config: LinkConfig) -> Self {
        Self {
            rx,
            tx,
            config,
            parser: FrameParser::new(),
            pending: Deque::new(),
            last_opcode: 0,
            frame_errors: 0,
            link_timeouts: 0,
            uart_errors: 0,
        }
    }

    fn refill(&mut self) {
        let mut chunk = [0u8; RX_BUFFER_SIZE];
        let room = RX_BUFFER_SIZE - self.pending.len();
        if room == 0 {
            return;
        }
        match self.rx.read_nonblocking(&mut chunk[..room]) {
            Ok(n) => {
                for &byte in &chunk[..n] {
                    // Capacity is guaranteed by `room`
                    let _ = self.pending.push_back(byte);
                }
            }
            Err(_) => self.uart_errors = self.uart_errors.wrapping_add(1),
        }
    }

    /// Assemble the next command from whatever bytes are available
    ///
    /// Never blocks. `Ok(None)` means no complete frame yet. A malformed
    /// frame is discarded and reported; bytes after it stay buffered for the
    /// next call.
    pub fn poll_incoming(&mut self) -> Result<Option<HostCommand>, FrameError> {
        loop {
            if self.pending.is_empty() {
                self.refill();
                if self.pending.is_empty() {
                    return Ok(None);
                }
            }

            while let Some(byte) = self.pending.pop_front() {
                match self.parser.feed(byte) {
                    Ok(None) => {}
                    Ok(Some(frame)) => {
                        self.last_opcode = frame.opcode;
                        return HostCommand::from_frame(&frame)
                            .map(Some)
                            .map_err(|e| self.count_frame_error(e));
                    }
                    Err(e) => return Err(self.count_frame_error(e)),
                }
            }
        }
    }

    fn count_frame_error(&mut self, error: FrameError) -> FrameError {
        self.frame_errors = self.frame_errors.wrapping_add(1);
        #[cfg(feature = "defmt")]
        defmt::warn!("host frame dropped: {}", error);
        error
    }

    /// Carry out `command` and build its response
    pub fn dispatch<X>(&mut self, command: HostCommand, ctx: &mut X) -> HostResponse
    where
        X: DispatchContext + ?Sized,
    {
        match command {
            HostCommand::GetReading => HostResponse::Reading(ctx.latest_reading().into()),
            HostCommand::SetSamplingPeriod { ticks } => {
                if sampling_period_in_range(ticks as Tick) {
                    ctx.set_sampling_period(ticks as Tick);
                    HostResponse::PeriodSet { ticks }
                } else {
                    HostResponse::Nak {
                        opcode: command.opcode(),
                        reason: NakReason::OutOfRange,
                    }
                }
            }
            HostCommand::ForceRedraw => {
                ctx.request_redraw();
                HostResponse::RedrawQueued
            }
            HostCommand::GetStatus => HostResponse::Status(StatusReport {
                frame_errors: self.frame_errors,
                link_timeouts: self.link_timeouts,
                ..ctx.status()
            }),
        }
    }

    /// Write one response frame
    ///
    /// Waits on a full transmit FIFO for at most `tx_timeout` ticks without
    /// progress, then drops the rest of the response.
    pub fn send<C>(&mut self, response: &HostResponse, clock: &C) -> Result<(), LinkError>
    where
        C: TickSource + ?Sized,
    {
        let bytes = response
            .to_frame()
            .and_then(|frame| frame.encode_to_vec())
            .map_err(|_| LinkError::Encode)?;

        let mut remaining = &bytes[..];
        let mut stalled_since = clock.now();
        while !remaining.is_empty() {
            let accepted = self.tx.write(remaining).map_err(|_| {
                self.uart_errors = self.uart_errors.wrapping_add(1);
                LinkError::Uart
            })?;
            let now = clock.now();
            if accepted > 0 {
                remaining = &remaining[accepted.min(remaining.len())..];
                stalled_since = now;
            } else if elapsed(stalled_since, now) >= self.config.tx_timeout {
                self.link_timeouts = self.link_timeouts.wrapping_add(1);
                #[cfg(feature = "defmt")]
                defmt::warn!("host response dropped, {} bytes unsent", remaining.len());
                return Err(LinkError::Timeout);
            } else {
                core::hint::spin_loop();
            }
        }
        Ok(())
    }

    /// Drain, dispatch and answer pending commands
    ///
    /// Handles a bounded number of frames per call. Unknown opcodes and bad
    /// payloads are answered with a NAK; corrupted frames get no answer.
    /// Returns the number of frames handled.
    pub fn service<X, C>(&mut self, ctx: &mut X, clock: &C) -> usize
    where
        X: DispatchContext + ?Sized,
        C: TickSource + ?Sized,
    {
        let mut handled = 0;
        while handled < MAX_FRAMES_PER_SERVICE {
            let response = match self.poll_incoming() {
                Ok(None) => break,
                Ok(Some(command)) => self.dispatch(command, ctx),
                Err(e) => match nak_reason(e) {
                    Some(reason) => HostResponse::Nak {
                        opcode: self.last_opcode,
                        reason,
                    },
                    None => {
                        handled += 1;
                        continue;
                    }
                },
            };
            handled += 1;
            // A dropped response is already counted and logged
            let _ = self.send(&response, clock);
        }
        handled
    }

    pub fn frame_errors(&self) -> u16 {
        self.frame_errors
    }

    pub fn link_timeouts(&self) -> u16 {
        self.link_timeouts
    }

    pub fn uart_errors(&self) -> u16 {
        self.uart_errors
    }

    /// True while a partial frame or unparsed bytes are buffered
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty() || !self.parser.is_idle()
    }

    pub fn tx(&self) -> &Tx {
        &self.tx
    }

    pub fn rx_mut(&mut self) -> &mut Rx {
        &mut self.rx
    }
}

/// NAK reason for frames that arrived intact but could not be understood
fn nak_reason(error: FrameError) -> Option<NakReason> {
    match error {
        FrameError::UnknownOpcode => Some(NakReason::UnknownOpcode),
        FrameError::InvalidPayload => Some(NakReason::InvalidPayload),
        _ => None,
    }
}
