//! Message types for the host link
//!
//! Message types are divided into two categories:
//! - Host → Board: commands
//! - Board → Host: acknowledgements carrying results, or a NAK

use crate::frame::{Frame, FrameError};

// Opcodes: Host → Board
pub const OP_GET_READING: u8 = 0x01;
pub const OP_SET_SAMPLING_PERIOD: u8 = 0x02;
pub const OP_FORCE_REDRAW: u8 = 0x03;
pub const OP_GET_STATUS: u8 = 0x04;

// Opcodes: Board → Host
/// Set on a request opcode to form its acknowledgement opcode
pub const ACK_FLAG: u8 = 0x80;
pub const OP_NAK: u8 = 0x7F;

/// Size of an encoded reading report
pub const READING_REPORT_LEN: usize = 11;

/// Size of an encoded status report
pub const STATUS_REPORT_LEN: usize = 10;

/// Commands sent by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostCommand {
    /// Report the last published sensor reading
    GetReading,
    /// Change the sampling period (ticks)
    SetSamplingPeriod { ticks: u16 },
    /// Redraw the display at the next opportunity
    ForceRedraw,
    /// Report scheduler and link health
    GetStatus,
}

impl HostCommand {
    /// Opcode this command is sent with
    pub fn opcode(&self) -> u8 {
        match self {
            HostCommand::GetReading => OP_GET_READING,
            HostCommand::SetSamplingPeriod { .. } => OP_SET_SAMPLING_PERIOD,
            HostCommand::ForceRedraw => OP_FORCE_REDRAW,
            HostCommand::GetStatus => OP_GET_STATUS,
        }
    }

    /// Parse a command from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        match frame.opcode {
            OP_GET_READING => expect_empty(frame).map(|_| HostCommand::GetReading),
            OP_SET_SAMPLING_PERIOD => match frame.payload.as_slice() {
                &[hi, lo] => Ok(HostCommand::SetSamplingPeriod {
                    ticks: u16::from_be_bytes([hi, lo]),
                }),
                _ => Err(FrameError::InvalidPayload),
            },
            OP_FORCE_REDRAW => expect_empty(frame).map(|_| HostCommand::ForceRedraw),
            OP_GET_STATUS => expect_empty(frame).map(|_| HostCommand::GetStatus),
            _ => Err(FrameError::UnknownOpcode),
        }
    }

    /// Encode this command into a frame (for host tools and testing)
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            HostCommand::SetSamplingPeriod { ticks } => {
                Frame::new(OP_SET_SAMPLING_PERIOD, &ticks.to_be_bytes())
            }
            other => Ok(Frame::empty(other.opcode())),
        }
    }
}

fn expect_empty(frame: &Frame) -> Result<(), FrameError> {
    if frame.payload.is_empty() {
        Ok(())
    } else {
        Err(FrameError::InvalidPayload)
    }
}

/// Snapshot of one sensor reading as sent to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadingReport {
    pub valid: bool,
    /// Gas concentration (ppm)
    pub gas_ppm: u16,
    /// Absolute humidity (mg/m³)
    pub humidity_mg_m3: u32,
    /// Tick the reading was taken at
    pub tick: u32,
}

impl ReadingReport {
    /// Payload: `[valid][gas:u16][humidity:u32][tick:u32]`, big-endian
    pub fn encode(&self) -> [u8; READING_REPORT_LEN] {
        let mut out = [0u8; READING_REPORT_LEN];
        out[0] = self.valid as u8;
        out[1..3].copy_from_slice(&self.gas_ppm.to_be_bytes());
        out[3..7].copy_from_slice(&self.humidity_mg_m3.to_be_bytes());
        out[7..11].copy_from_slice(&self.tick.to_be_bytes());
        out
    }

    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() != READING_REPORT_LEN || payload[0] > 1 {
            return Err(FrameError::InvalidPayload);
        }
        Ok(Self {
            valid: payload[0] == 1,
            gas_ppm: u16::from_be_bytes([payload[1], payload[2]]),
            humidity_mg_m3: u32::from_be_bytes([payload[3], payload[4], payload[5], payload[6]]),
            tick: u32::from_be_bytes([payload[7], payload[8], payload[9], payload[10]]),
        })
    }
}

/// Health summary sent in answer to `GetStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusReport {
    pub sampler_degraded: bool,
    pub display_degraded: bool,
    /// Effective sampling period (ticks), including any backoff
    pub sampling_period: u32,
    pub consecutive_failures: u8,
    pub frame_errors: u16,
    pub link_timeouts: u16,
}

impl StatusReport {
    /// Payload: `[flags][period:u32][failures][frame_errors:u16][link_timeouts:u16]`
    pub fn encode(&self) -> [u8; STATUS_REPORT_LEN] {
        let mut out = [0u8; STATUS_REPORT_LEN];
        out[0] = (self.sampler_degraded as u8) | ((self.display_degraded as u8) << 1);
        out[1..5].copy_from_slice(&self.sampling_period.to_be_bytes());
        out[5] = self.consecutive_failures;
        out[6..8].copy_from_slice(&self.frame_errors.to_be_bytes());
        out[8..10].copy_from_slice(&self.link_timeouts.to_be_bytes());
        out
    }

    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() != STATUS_REPORT_LEN {
            return Err(FrameError::InvalidPayload);
        }
        Ok(Self {
            sampler_degraded: payload[0] & 0x01 != 0,
            display_degraded: payload[0] & 0x02 != 0,
            sampling_period: u32::from_be_bytes([payload[1], payload[2], payload[3], payload[4]]),
            consecutive_failures: payload[5],
            frame_errors: u16::from_be_bytes([payload[6], payload[7]]),
            link_timeouts: u16::from_be_bytes([payload[8], payload[9]]),
        })
    }
}

/// Why a command was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum NakReason {
    UnknownOpcode = 1,
    InvalidPayload = 2,
    /// Well-formed, but the value is outside the accepted range
    OutOfRange = 3,
}

impl NakReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(NakReason::UnknownOpcode),
            2 => Some(NakReason::InvalidPayload),
            3 => Some(NakReason::OutOfRange),
            _ => None,
        }
    }
}

/// Responses sent by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostResponse {
    Reading(ReadingReport),
    /// Sampling period accepted (echoes the new value)
    PeriodSet { ticks: u16 },
    /// Redraw was scheduled
    RedrawQueued,
    Status(StatusReport),
    Nak { opcode: u8, reason: NakReason },
}

impl HostResponse {
    /// Encode this response into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            HostResponse::Reading(report) => {
                Frame::new(OP_GET_READING | ACK_FLAG, &report.encode())
            }
            HostResponse::PeriodSet { ticks } => {
                Frame::new(OP_SET_SAMPLING_PERIOD | ACK_FLAG, &ticks.to_be_bytes())
            }
            HostResponse::RedrawQueued => Ok(Frame::empty(OP_FORCE_REDRAW | ACK_FLAG)),
            HostResponse::Status(report) => Frame::new(OP_GET_STATUS | ACK_FLAG, &report.encode()),
            HostResponse::Nak { opcode, reason } => Frame::new(OP_NAK, &[*opcode, *reason as u8]),
        }
    }

    /// Parse a response from a frame (for host tools and testing)
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        const READING_ACK: u8 = OP_GET_READING | ACK_FLAG;
        const PERIOD_ACK: u8 = OP_SET_SAMPLING_PERIOD | ACK_FLAG;
        const REDRAW_ACK: u8 = OP_FORCE_REDRAW | ACK_FLAG;
        const STATUS_ACK: u8 = OP_GET_STATUS | ACK_FLAG;

        match frame.opcode {
            READING_ACK => ReadingReport::decode(&frame.payload).map(HostResponse::Reading),
            PERIOD_ACK => match frame.payload.as_slice() {
                &[hi, lo] => Ok(HostResponse::PeriodSet {
                    ticks: u16::from_be_bytes([hi, lo]),
                }),
                _ => Err(FrameError::InvalidPayload),
            },
            REDRAW_ACK => expect_empty(frame).map(|_| HostResponse::RedrawQueued),
            STATUS_ACK => StatusReport::decode(&frame.payload).map(HostResponse::Status),
            OP_NAK => match frame.payload.as_slice() {
                &[opcode, reason] => Ok(HostResponse::Nak {
                    opcode,
                    reason: NakReason::from_u8(reason).ok_or(FrameError::InvalidPayload)?,
                }),
                _ => Err(FrameError::InvalidPayload),
            },
            _ => Err(FrameError::UnknownOpcode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_reading_command() {
        let frame = Frame::empty(OP_GET_READING);
        assert_eq!(HostCommand::from_frame(&frame), Ok(HostCommand::GetReading));
    }

    #[test]
    fn test_set_period_payload_is_big_endian() {
        let frame = HostCommand::SetSamplingPeriod { ticks: 0x0190 }
            .to_frame()
            .unwrap();
        assert_eq!(frame.opcode, OP_SET_SAMPLING_PERIOD);
        assert_eq!(&frame.payload[..], &[0x01, 0x90]);
    }

    #[test]
    fn test_set_period_rejects_wrong_length() {
        let frame = Frame::new(OP_SET_SAMPLING_PERIOD, &[0x64]).unwrap();
        assert_eq!(
            HostCommand::from_frame(&frame),
            Err(FrameError::InvalidPayload)
        );
    }

    #[test]
    fn test_unknown_opcode() {
        let frame = Frame::empty(0x42);
        assert_eq!(
            HostCommand::from_frame(&frame),
            Err(FrameError::UnknownOpcode)
        );
    }

    #[test]
    fn test_reading_report_layout() {
        let report = ReadingReport {
            valid: true,
            gas_ppm: 400,
            humidity_mg_m3: 1953,
            tick: 100,
        };
        let frame = HostResponse::Reading(report).to_frame().unwrap();
        assert_eq!(frame.opcode, 0x81);
        assert_eq!(
            &frame.payload[..],
            &[1, 0x01, 0x90, 0, 0, 0x07, 0xA1, 0, 0, 0, 100]
        );
    }

    #[test]
    fn test_status_report_flags() {
        let report = StatusReport {
            sampler_degraded: true,
            display_degraded: false,
            sampling_period: 200,
            consecutive_failures: 3,
            frame_errors: 1,
            link_timeouts: 0,
        };
        let bytes = report.encode();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(StatusReport::decode(&bytes), Ok(report));
    }

    #[test]
    fn test_nak_response() {
        let resp = HostResponse::Nak {
            opcode: 0x42,
            reason: NakReason::UnknownOpcode,
        };
        let frame = resp.to_frame().unwrap();
        assert_eq!(frame.opcode, OP_NAK);
        assert_eq!(HostResponse::from_frame(&frame), Ok(resp));
    }

    #[test]
    fn test_command_survives_the_wire() {
        let original = HostCommand::SetSamplingPeriod { ticks: 250 };
        let frame = original.to_frame().unwrap();
        assert_eq!(HostCommand::from_frame(&frame), Ok(original));
    }
}
