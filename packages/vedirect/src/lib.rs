//! Implementation of the Victron VE.Direct serial protocol in Rust.
//!
//! VE.Direct devices (MPPT solar chargers, battery monitors, inverters) send a
//! continuous stream of human readable *text blocks*, each a list of
//! `label<TAB>value` fields terminated by a `Checksum` field. Interleaved with
//! those blocks, the same wire carries *HEX frames*: `:`-prefixed command and
//! response messages with their own checksum.
//!
//! The crate is structured around the [`Decoder`], a byte-at-a-time state
//! machine that turns the raw stream into [`Frame`]s. It never blocks, never
//! fails, and silently resynchronizes after line noise. Decoded text records
//! can then be turned into typed values with [`interpret`] or folded into a
//! caller-owned [`Snapshot`].
//!
//! ```
//! use vedirect::{Decoder, Frame};
//!
//! let mut decoder = Decoder::new();
//! for frame in decoder.frames(b"\r\nV\t12800\r\nChecksum\t\x3c".iter().copied()) {
//!     if let Frame::Text(record) = frame {
//!         assert_eq!(record.get_str("V"), Some("12800"));
//!     }
//! }
//! ```

#![no_std]

extern crate alloc;

pub mod hex;
pub mod states;

mod checksum;
mod decode;
mod decoder;
mod field;
mod interpret;
mod label;
mod record;
mod snapshot;

pub use checksum::{ChecksumAccumulator, HEX_CHECKSUM_TARGET, hex_checksum_valid};
pub use decode::{Decode, DecodeError, DecodeErrorKind};
pub use decoder::{
    ChecksumCoverage, Decoder, DecoderConfig, DecoderStats, DiscardReason, Frame, Frames, State,
};
pub use field::{Field, FieldBuffer, FieldStep};
pub use hex::{HexFrame, HexFrameDetector, HexStep};
pub use interpret::{FieldError, Interpretation, Key, Quantity, Unit, Value, interpret};
pub use label::{Kind, Label};
pub use record::{Record, RecordAssembler};
pub use snapshot::Snapshot;

/// Byte separating a field label from its value.
pub const LABEL_DELIMITER: u8 = b'\t';

/// Bytes terminating a text field (and prefixing the next one).
pub const FIELD_TERMINATOR: [u8; 2] = *b"\r\n";

/// Label of the field that ends every text block.
pub const CHECKSUM_LABEL: &[u8] = b"Checksum";

/// Byte starting a HEX frame.
pub const HEX_MARKER: u8 = b':';

/// Byte ending a HEX frame.
pub const HEX_TERMINATOR: u8 = b'\n';
