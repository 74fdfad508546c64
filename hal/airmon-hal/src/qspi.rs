//! QSPI bus abstractions
//!
//! The display controller sits on a QSPI master that splits every transfer
//! into a command phase and a data phase, so the data/command select line is
//! driven by the peripheral rather than by software.

/// Hardware-reported QSPI failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QspiFault {
    /// Transfer did not complete before the hardware timeout
    Timeout,
    /// Chip-select conflict detected by the controller
    ChipSelect,
    /// Any other controller fault
    Other,
}

/// QSPI bus master
pub trait QspiBus {
    /// Error type for QSPI operations
    type Error: Into<QspiFault>;

    /// Issue one command phase followed by an optional data phase
    ///
    /// Blocks until the controller reports completion, bounded by the
    /// controller's hardware timeout.
    fn transfer(&mut self, command: &[u8], data: &[u8]) -> Result<(), Self::Error>;
}

/// Supported FIFO burst sizes in 32-bit words, largest first
pub const BURST_WORDS: [usize; 5] = [32, 16, 8, 2, 1];

/// Largest burst that fits in `remaining` words
///
/// Returns 0 only when nothing remains.
pub fn chunk_len(remaining: usize) -> usize {
    BURST_WORDS
        .iter()
        .copied()
        .find(|&burst| burst <= remaining)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_len_picks_largest_burst() {
        assert_eq!(chunk_len(40), 32);
        assert_eq!(chunk_len(31), 16);
        assert_eq!(chunk_len(9), 8);
        assert_eq!(chunk_len(7), 2);
        assert_eq!(chunk_len(1), 1);
        assert_eq!(chunk_len(0), 0);
    }
}
