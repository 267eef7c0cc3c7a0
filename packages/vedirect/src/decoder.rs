//! The byte-level frame decoder.

use log::{debug, trace};
use thiserror::Error;

use crate::{
    FIELD_TERMINATOR, HEX_MARKER, LABEL_DELIMITER,
    checksum::ChecksumAccumulator,
    field::{FieldBuffer, FieldStep},
    hex::{HexFrame, HexFrameDetector, HexStep},
    label::Label,
    record::{Record, RecordAssembler},
};

/// Longest label accepted. The longest known label is `AC_OUT_V`.
pub const DEFAULT_MAX_LABEL_LEN: usize = 16;

/// Longest value accepted. Devices send at most 33 bytes (`BMV` model names).
pub const DEFAULT_MAX_VALUE_LEN: usize = 40;

/// Most distinct labels accepted in one block.
pub const DEFAULT_MAX_FIELDS: usize = 64;

/// Most decoded bytes accepted in one HEX frame, checksum included.
pub const DEFAULT_MAX_HEX_LEN: usize = 128;

/// Which bytes of a text block the device's checksum covers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChecksumCoverage {
    /// Every field, the first included, is preceded by CR LF and those bytes
    /// are covered. This is what devices send.
    #[default]
    LeadingNewline,

    /// Coverage starts at the first byte of the first label.
    FirstLabel,
}

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct DecoderConfig {
    pub coverage: ChecksumCoverage,
    /// Byte that starts a HEX frame.
    pub hex_marker: u8,
    /// Label that always opens a block.
    ///
    /// When this label shows up while a block is still being collected, the
    /// earlier block lost its tail. It is dropped and a new block starts at
    /// the label. `None` disables the check.
    pub start_label: Option<Label>,
    pub max_label_len: usize,
    pub max_value_len: usize,
    pub max_fields: usize,
    pub max_hex_len: usize,
}

impl DecoderConfig {
    pub const fn new() -> Self {
        Self {
            coverage: ChecksumCoverage::LeadingNewline,
            hex_marker: HEX_MARKER,
            start_label: Some(Label::ProductId),
            max_label_len: DEFAULT_MAX_LABEL_LEN,
            max_value_len: DEFAULT_MAX_VALUE_LEN,
            max_fields: DEFAULT_MAX_FIELDS,
            max_hex_len: DEFAULT_MAX_HEX_LEN,
        }
    }

    pub const fn with_coverage(mut self, coverage: ChecksumCoverage) -> Self {
        self.coverage = coverage;
        self
    }

    pub const fn with_start_label(mut self, start_label: Option<Label>) -> Self {
        self.start_label = start_label;
        self
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoder state, as seen from outside.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Waiting for the next block or HEX frame.
    #[default]
    Idle,
    ReadingLabel,
    ReadingValue,
    ReadingHex,
}

/// Why an in-progress block or HEX frame was dropped.
///
/// Discards are a normal part of reading a live serial line and are never
/// returned to the caller. They are logged and counted in [`DecoderStats`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscardReason {
    #[error("block checksum did not resolve to zero (sum {sum:#04x})")]
    ChecksumMismatch { sum: u8 },

    #[error("unexpected byte {0:#04x}")]
    UnexpectedByte(u8),

    #[error("field exceeded the configured length limit")]
    FieldTooLong,

    #[error("block exceeded the configured field limit")]
    TooManyFields,

    #[error("block was cut off by the start of the next one")]
    Interrupted,

    #[error("block had no fields besides its checksum")]
    EmptyBlock,

    #[error("HEX frame checksum mismatch")]
    HexChecksumMismatch,

    #[error("HEX frame ended before its checksum")]
    TruncatedHex,
}

/// A unit produced by the [`Decoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(Record),
    Hex(HexFrame),
}

impl Frame {
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Frame::Text(record) => Some(record),
            Frame::Hex(_) => None,
        }
    }

    pub fn as_hex(&self) -> Option<&HexFrame> {
        match self {
            Frame::Hex(frame) => Some(frame),
            Frame::Text(_) => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Frame::Text(record) => Some(record),
            Frame::Hex(_) => None,
        }
    }
}

/// Counters describing what a decoder has seen.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecoderStats {
    pub records: u64,
    pub hex_frames: u64,
    pub checksum_mismatches: u64,
    pub hex_checksum_mismatches: u64,
    /// Misplaced delimiters, invalid HEX digits, empty blocks and truncated
    /// HEX frames.
    pub malformed: u64,
    /// Blocks dropped because the start label of the next block arrived first.
    pub interrupted: u64,
    /// Fields, blocks or HEX frames over the configured limits.
    pub overflows: u64,
}

impl DecoderStats {
    /// Total number of dropped blocks and HEX frames.
    pub fn discarded(&self) -> u64 {
        self.checksum_mismatches
            + self.hex_checksum_mismatches
            + self.malformed
            + self.interrupted
            + self.overflows
    }

    fn count(&mut self, reason: DiscardReason) {
        match reason {
            DiscardReason::ChecksumMismatch { .. } => self.checksum_mismatches += 1,
            DiscardReason::HexChecksumMismatch => self.hex_checksum_mismatches += 1,
            DiscardReason::UnexpectedByte(_)
            | DiscardReason::EmptyBlock
            | DiscardReason::TruncatedHex => self.malformed += 1,
            DiscardReason::Interrupted => self.interrupted += 1,
            DiscardReason::FieldTooLong | DiscardReason::TooManyFields => self.overflows += 1,
        }
    }
}

/// Streaming VE.Direct decoder.
///
/// Feed it bytes in the order they arrive; it hands back every complete,
/// checksum-verified text block and HEX frame. Corrupted input is dropped and
/// the decoder waits for the next block. One decoder should be used per byte
/// stream.
///
/// HEX frames may arrive in the middle of a text block. The block is suspended
/// while the HEX frame is read and resumed after its terminator. A block whose
/// tail was lost is dropped as soon as the configured start label of the next
/// block arrives.
#[derive(Debug, Clone)]
pub struct Decoder {
    config: DecoderConfig,
    state: State,
    /// Text state to return to once the current HEX frame ends.
    suspended: State,
    field: FieldBuffer,
    record: RecordAssembler,
    checksum: ChecksumAccumulator,
    hex: HexFrameDetector,
    stats: DecoderStats,
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            suspended: State::Idle,
            field: FieldBuffer::new(config.max_label_len, config.max_value_len),
            record: RecordAssembler::new(config.max_fields),
            checksum: ChecksumAccumulator::new(),
            hex: HexFrameDetector::new(config.max_hex_len),
            stats: DecoderStats::default(),
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Drops anything in progress and returns to [`State::Idle`].
    ///
    /// Statistics are kept.
    pub fn reset(&mut self) {
        self.field.clear();
        self.record.clear();
        self.checksum.reset();
        self.hex.clear();
        self.state = State::Idle;
        self.suspended = State::Idle;
    }

    /// Consumes one byte, returning a frame if the byte completed one.
    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        match self.state {
            State::ReadingHex => self.feed_hex(byte),
            // The checksum value may be any byte, the marker included.
            _ if byte == self.config.hex_marker && !self.field.awaiting_checksum() => {
                self.suspended = self.state;
                self.state = State::ReadingHex;
                self.hex.begin();
                None
            }
            State::Idle if byte.is_ascii_graphic() => {
                self.begin_record();
                self.feed_text(byte)
            }
            // Line endings before a block, or noise.
            State::Idle => None,
            State::ReadingLabel | State::ReadingValue => self.feed_text(byte),
        }
    }

    /// Returns a lazy iterator of the frames decoded from `bytes`.
    pub fn frames<I: IntoIterator<Item = u8>>(&mut self, bytes: I) -> Frames<'_, I::IntoIter> {
        Frames {
            decoder: self,
            bytes: bytes.into_iter(),
        }
    }

    fn begin_record(&mut self) {
        self.checksum.reset();
        if self.config.coverage == ChecksumCoverage::LeadingNewline {
            self.checksum.add_all(&FIELD_TERMINATOR);
        }
    }

    fn feed_text(&mut self, byte: u8) -> Option<Frame> {
        self.checksum.add(byte);

        match self.field.push(byte) {
            FieldStep::Label => {
                self.state = State::ReadingLabel;
                None
            }
            FieldStep::Value => {
                if self.state == State::ReadingLabel && self.interrupts_record() {
                    self.restart_record();
                }
                self.state = State::ReadingValue;
                None
            }
            FieldStep::Complete(field) if field.is_checksum() => {
                let result = self.record.finish(field, &self.checksum);
                self.checksum.reset();
                self.state = State::Idle;

                match result {
                    Ok(record) => {
                        trace!("Decoded block with {} fields", record.len());
                        self.stats.records += 1;
                        Some(Frame::Text(record))
                    }
                    Err(reason) => {
                        self.discard(reason);
                        None
                    }
                }
            }
            FieldStep::Complete(field) => {
                if let Err(reason) = self.record.insert(field) {
                    self.discard(reason);
                } else {
                    self.state = State::ReadingLabel;
                }
                None
            }
            FieldStep::Malformed(reason) => {
                self.discard(reason);
                None
            }
        }
    }

    /// Whether the label just completed opens a new block while the current one
    /// is unfinished.
    fn interrupts_record(&self) -> bool {
        !self.record.is_empty()
            && self
                .config
                .start_label
                .is_some_and(|label| self.field.label() == label.code().as_bytes())
    }

    /// Drops the unfinished block and starts a new one at the current label.
    fn restart_record(&mut self) {
        debug!(
            "Discarding in-progress frame in state {:?}: {}",
            self.state,
            DiscardReason::Interrupted
        );
        self.stats.count(DiscardReason::Interrupted);
        self.record.clear();

        self.begin_record();
        self.checksum.add_all(self.field.label());
        self.checksum.add(LABEL_DELIMITER);
    }

    fn feed_hex(&mut self, byte: u8) -> Option<Frame> {
        if byte == self.config.hex_marker {
            // A new frame started before the previous one ended.
            debug!("Discarding HEX frame: {}", DiscardReason::TruncatedHex);
            self.stats.count(DiscardReason::TruncatedHex);
            self.hex.begin();
            return None;
        }

        match self.hex.push(byte) {
            HexStep::Pending => None,
            HexStep::Complete(result) => {
                self.state = core::mem::take(&mut self.suspended);

                match result {
                    Ok(frame) => {
                        trace!("Decoded HEX frame with command {:#x}", frame.command());
                        self.stats.hex_frames += 1;
                        Some(Frame::Hex(frame))
                    }
                    Err(reason) => {
                        debug!("Discarding HEX frame: {reason}");
                        self.stats.count(reason);
                        None
                    }
                }
            }
            HexStep::Malformed(reason) => {
                self.discard(reason);
                None
            }
        }
    }

    fn discard(&mut self, reason: DiscardReason) {
        debug!("Discarding in-progress frame in state {:?}: {reason}", self.state);
        self.stats.count(reason);
        self.reset();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`Decoder::frames`].
#[derive(Debug)]
pub struct Frames<'a, I> {
    decoder: &'a mut Decoder,
    bytes: I,
}

impl<I: Iterator<Item = u8>> Iterator for Frames<'_, I> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        for byte in self.bytes.by_ref() {
            if let Some(frame) = self.decoder.feed(byte) {
                return Some(frame);
            }
        }
        None
    }
}
