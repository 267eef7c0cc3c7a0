/// Value that the HEX checksum rule sums to.
///
/// A HEX frame is valid when the command nibble plus every decoded byte
/// (including the trailing checksum byte) equals `0x55` modulo 256.
pub const HEX_CHECKSUM_TARGET: u8 = 0x55;

/// Running modulo-256 sum over the bytes of a text block.
///
/// Devices choose the value of the `Checksum` field so that the sum of every
/// byte of the block, delimiters included, is zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumAccumulator {
    sum: u8,
}

impl ChecksumAccumulator {
    /// Creates an accumulator with a zero sum.
    pub const fn new() -> Self {
        Self { sum: 0 }
    }

    /// Adds a byte to the running sum.
    #[inline]
    pub fn add(&mut self, byte: u8) {
        self.sum = self.sum.wrapping_add(byte);
    }

    /// Adds every byte of `bytes` to the running sum.
    pub fn add_all(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.add(byte);
        }
    }

    pub fn reset(&mut self) {
        self.sum = 0;
    }

    /// Returns the current sum.
    pub const fn sum(&self) -> u8 {
        self.sum
    }

    /// Returns `true` if the bytes added so far sum to zero.
    pub const fn is_valid(&self) -> bool {
        self.sum == 0
    }
}

/// Checks a HEX frame against the HEX checksum rule.
///
/// `bytes` are the decoded hex digit pairs, including the checksum byte that
/// ends the frame.
pub fn hex_checksum_valid(command: u8, bytes: &[u8]) -> bool {
    bytes
        .iter()
        .fold(command, |sum, &byte| sum.wrapping_add(byte))
        == HEX_CHECKSUM_TARGET
}
