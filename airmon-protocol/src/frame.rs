//! Wire framing for the host link
//!
//! ```text
//! 0xAA | opcode | len | payload[len] | sum
//! ```
//!
//! `sum` is the byte-wise sum of opcode, len and payload, truncated to 8
//! bits. `len` is at most [`MAX_PAYLOAD_SIZE`].

use heapless::Vec;

/// First byte of every frame
pub const FRAME_START: u8 = 0xAA;

pub const MAX_PAYLOAD_SIZE: usize = 32;

/// Start, opcode, length, payload and checksum
pub const MAX_FRAME_SIZE: usize = 1 + 1 + 1 + MAX_PAYLOAD_SIZE + 1;

/// Bytes around the payload
const OVERHEAD: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Received checksum differs from the computed one
    ChecksumMismatch,
    /// Received length byte is larger than [`MAX_PAYLOAD_SIZE`]
    LengthOverrun,
    /// Payload handed to [`Frame::new`] does not fit
    PayloadTooLarge,
    /// Output buffer handed to [`Frame::encode`] is too short
    BufferTooSmall,
    UnknownOpcode,
    /// Payload length or contents wrong for the opcode
    InvalidPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub opcode: u8,
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    pub fn new(opcode: u8, payload: &[u8]) -> Result<Self, FrameError> {
        Ok(Self {
            opcode,
            payload: Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?,
        })
    }

    pub fn empty(opcode: u8) -> Self {
        Self {
            opcode,
            payload: Vec::new(),
        }
    }

    /// Checksum over the header fields and payload
    pub fn checksum(opcode: u8, length: u8, payload: &[u8]) -> u8 {
        let header = opcode.wrapping_add(length);
        payload.iter().fold(header, |sum, &b| sum.wrapping_add(b))
    }

    /// Size on the wire
    pub fn encoded_len(&self) -> usize {
        self.payload.len() + OVERHEAD
    }

    /// Write the frame to the front of `out`, returning the bytes used
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, FrameError> {
        let total = self.encoded_len();
        let out = out.get_mut(..total).ok_or(FrameError::BufferTooSmall)?;
        let len = self.payload.len() as u8;
        let (header, rest) = out.split_at_mut(3);
        header.copy_from_slice(&[FRAME_START, self.opcode, len]);
        let (body, sum) = rest.split_at_mut(self.payload.len());
        body.copy_from_slice(&self.payload);
        sum[0] = Self::checksum(self.opcode, len, &self.payload);
        Ok(total)
    }

    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut out: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
        out.resize_default(self.encoded_len())
            .map_err(|_| FrameError::BufferTooSmall)?;
        self.encode(&mut out)?;
        Ok(out)
    }
}

/// Where the parser is inside the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Hunt,
    Opcode,
    Length { opcode: u8 },
    Payload { opcode: u8, len: u8 },
    Checksum { opcode: u8, len: u8 },
}

/// Byte-at-a-time frame decoder
///
/// Bytes before a start byte are skipped. A malformed frame yields one
/// error and the parser goes back to hunting, so the stream resynchronizes
/// on the next start byte.
#[derive(Debug, Clone)]
pub struct FrameParser {
    stage: Stage,
    payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub const fn new() -> Self {
        Self {
            stage: Stage::Hunt,
            payload: Vec::new(),
        }
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.stage = Stage::Hunt;
        self.payload.clear();
    }

    /// No partial frame is buffered
    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Hunt
    }

    /// Advance by one received byte
    ///
    /// `Ok(Some(_))` completes a frame, `Ok(None)` wants more input.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        self.stage = match self.stage {
            Stage::Hunt if byte == FRAME_START => Stage::Opcode,
            Stage::Hunt => Stage::Hunt,
            Stage::Opcode => Stage::Length { opcode: byte },
            Stage::Length { .. } if byte as usize > MAX_PAYLOAD_SIZE => {
                self.reset();
                return Err(FrameError::LengthOverrun);
            }
            Stage::Length { opcode } => {
                self.payload.clear();
                if byte == 0 {
                    Stage::Checksum { opcode, len: 0 }
                } else {
                    Stage::Payload { opcode, len: byte }
                }
            }
            Stage::Payload { opcode, len } => {
                // Length was checked against capacity
                let _ = self.payload.push(byte);
                if self.payload.len() < len as usize {
                    Stage::Payload { opcode, len }
                } else {
                    Stage::Checksum { opcode, len }
                }
            }
            Stage::Checksum { opcode, len } => {
                let valid = byte == Frame::checksum(opcode, len, &self.payload);
                let payload = core::mem::take(&mut self.payload);
                self.reset();
                return if valid {
                    Ok(Some(Frame { opcode, payload }))
                } else {
                    Err(FrameError::ChecksumMismatch)
                };
            }
        };
        Ok(None)
    }

    /// Feed bytes until a frame completes or fails
    ///
    /// Returns how many bytes were consumed alongside the outcome; the
    /// caller resumes from there.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> (usize, Result<Option<Frame>, FrameError>) {
        for (i, &byte) in bytes.iter().enumerate() {
            let outcome = self.feed(byte);
            if !matches!(outcome, Ok(None)) {
                return (i + 1, outcome);
            }
        }
        (bytes.len(), Ok(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wire(frame: &Frame) -> Vec<u8, MAX_FRAME_SIZE> {
        frame.encode_to_vec().unwrap()
    }

    #[test]
    fn test_empty_frame_bytes() {
        assert_eq!(&wire(&Frame::empty(0x03))[..], &[0xAA, 0x03, 0x00, 0x03]);
    }

    #[test]
    fn test_period_frame_bytes() {
        let frame = Frame::new(0x02, &[0x00, 0xC8]).unwrap();
        assert_eq!(&wire(&frame)[..], &[0xAA, 0x02, 0x02, 0x00, 0xC8, 0xCC]);
        assert_eq!(frame.encoded_len(), 6);
    }

    #[test]
    fn test_checksum_truncates() {
        assert_eq!(Frame::checksum(0xFF, 2, &[0x80, 0x80]), 0x01);
    }

    #[test]
    fn test_encode_into_short_buffer() {
        let frame = Frame::new(0x02, &[1, 2]).unwrap();
        let mut out = [0u8; 5];
        assert_eq!(frame.encode(&mut out), Err(FrameError::BufferTooSmall));
        let mut out = [0u8; 8];
        assert_eq!(frame.encode(&mut out), Ok(6));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(Frame::new(0x02, &payload), Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_bad_checksum_returns_to_hunt() {
        let mut bytes = wire(&Frame::empty(0x01));
        bytes[3] ^= 0xFF;
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_bytes(&bytes).1, Err(FrameError::ChecksumMismatch));
        assert!(parser.is_idle());
    }

    #[test]
    fn test_flipped_checksum_does_not_affect_next_frame() {
        let mut stream: Vec<u8, 16> = Vec::new();
        let bad = wire(&Frame::new(0x02, &[0x00, 0x64]).unwrap());
        let last = bad.len() - 1;
        stream.extend_from_slice(&bad[..last]).unwrap();
        stream.push(!bad[last]).unwrap();
        stream.extend_from_slice(&wire(&Frame::empty(0x01))).unwrap();

        let mut parser = FrameParser::new();
        let (used, first) = parser.feed_bytes(&stream);
        assert_eq!((used, first), (bad.len(), Err(FrameError::ChecksumMismatch)));
        let (_, second) = parser.feed_bytes(&stream[used..]);
        assert_eq!(second, Ok(Some(Frame::empty(0x01))));
    }

    #[test]
    fn test_length_overrun_stops_at_length_byte() {
        let mut parser = FrameParser::new();
        let (used, outcome) = parser.feed_bytes(&[0xAA, 0x02, 200, 0, 0]);
        assert_eq!((used, outcome), (3, Err(FrameError::LengthOverrun)));
        assert!(parser.is_idle());
    }

    #[test]
    fn test_partial_frame_is_not_idle() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_bytes(&[0x11, 0xAA, 0x04]).1, Ok(None));
        assert!(!parser.is_idle());
        parser.reset();
        assert!(parser.is_idle());
    }

    proptest! {
        #[test]
        fn prop_any_frame_parses_back(
            opcode in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
        ) {
            let frame = Frame::new(opcode, &payload).unwrap();
            let bytes = wire(&frame);
            let mut parser = FrameParser::new();
            prop_assert_eq!(parser.feed_bytes(&bytes), (bytes.len(), Ok(Some(frame))));
        }

        #[test]
        fn prop_noise_before_start_is_skipped(
            noise in proptest::collection::vec(any::<u8>().prop_filter("start byte", |b| *b != FRAME_START), 0..16),
            payload in proptest::collection::vec(any::<u8>(), 0..8),
        ) {
            let frame = Frame::new(0x01, &payload).unwrap();
            let mut stream: Vec<u8, 64> = Vec::new();
            stream.extend_from_slice(&noise).unwrap();
            stream.extend_from_slice(&wire(&frame)).unwrap();
            let mut parser = FrameParser::new();
            prop_assert_eq!(parser.feed_bytes(&stream).1, Ok(Some(frame)));
        }
    }
}
