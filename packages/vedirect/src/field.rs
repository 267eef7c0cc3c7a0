use alloc::vec::Vec;
use core::fmt;

use crate::{CHECKSUM_LABEL, LABEL_DELIMITER, decoder::DiscardReason};

/// One `label<TAB>value` pair of a text block.
///
/// Labels and values are kept as raw bytes. Nothing is validated here;
/// corruption is caught by the block checksum.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Field {
    label: Vec<u8>,
    value: Vec<u8>,
}

impl Field {
    pub fn new(label: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    pub fn label(&self) -> &[u8] {
        &self.label
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns the value as a string slice, if it is valid UTF-8.
    pub fn value_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.value).ok()
    }

    /// Whether this is the `Checksum` field that terminates a block.
    pub fn is_checksum(&self) -> bool {
        self.label == CHECKSUM_LABEL
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.label, self.value)
    }

    pub(crate) fn set_value(&mut self, value: Vec<u8>) {
        self.value = value;
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("label", &self.label.escape_ascii())
            .field("value", &self.value.escape_ascii())
            .finish()
    }
}

/// Result of pushing one byte into a [`FieldBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldStep {
    /// The byte belongs to the label.
    Label,
    /// The byte belongs to the value (or its terminator).
    Value,
    /// The byte completed a field.
    Complete(Field),
    /// The byte cannot appear here. The buffer has been cleared.
    Malformed(DiscardReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Label,
    Value,
    /// Saw CR, expecting LF.
    LineFeed,
    /// Label was `Checksum`; the next byte is the raw checksum value.
    Checksum,
}

/// Accumulates the bytes of a single field between delimiters.
#[derive(Debug, Clone)]
pub struct FieldBuffer {
    label: Vec<u8>,
    value: Vec<u8>,
    phase: Phase,
    max_label_len: usize,
    max_value_len: usize,
}

impl FieldBuffer {
    pub fn new(max_label_len: usize, max_value_len: usize) -> Self {
        Self {
            label: Vec::new(),
            value: Vec::new(),
            phase: Phase::Label,
            max_label_len,
            max_value_len,
        }
    }

    /// Consumes one byte.
    pub fn push(&mut self, byte: u8) -> FieldStep {
        match self.phase {
            Phase::Label => match byte {
                LABEL_DELIMITER => {
                    self.phase = if self.label == CHECKSUM_LABEL {
                        Phase::Checksum
                    } else {
                        Phase::Value
                    };
                    FieldStep::Value
                }
                b'\r' | b'\n' => self.malformed(DiscardReason::UnexpectedByte(byte)),
                _ if self.label.len() >= self.max_label_len => {
                    self.malformed(DiscardReason::FieldTooLong)
                }
                _ => {
                    self.label.push(byte);
                    FieldStep::Label
                }
            },
            Phase::Value => match byte {
                b'\r' => {
                    self.phase = Phase::LineFeed;
                    FieldStep::Value
                }
                b'\n' => FieldStep::Complete(self.take()),
                LABEL_DELIMITER => self.malformed(DiscardReason::UnexpectedByte(byte)),
                _ if self.value.len() >= self.max_value_len => {
                    self.malformed(DiscardReason::FieldTooLong)
                }
                _ => {
                    self.value.push(byte);
                    FieldStep::Value
                }
            },
            Phase::LineFeed => match byte {
                b'\n' => FieldStep::Complete(self.take()),
                _ => self.malformed(DiscardReason::UnexpectedByte(byte)),
            },
            Phase::Checksum => {
                self.value.push(byte);
                FieldStep::Complete(self.take())
            }
        }
    }

    /// Whether the next byte is the raw value of a `Checksum` field.
    ///
    /// That byte may take any value, including the HEX marker and delimiters.
    pub fn awaiting_checksum(&self) -> bool {
        self.phase == Phase::Checksum
    }

    /// The label read so far, or the complete label once its TAB arrived.
    pub fn label(&self) -> &[u8] {
        &self.label
    }

    /// Whether the buffer is still reading a label.
    pub fn in_label(&self) -> bool {
        self.phase == Phase::Label
    }

    pub fn clear(&mut self) {
        self.label.clear();
        self.value.clear();
        self.phase = Phase::Label;
    }

    fn take(&mut self) -> Field {
        let field = Field {
            label: core::mem::take(&mut self.label),
            value: core::mem::take(&mut self.value),
        };
        self.phase = Phase::Label;
        field
    }

    fn malformed(&mut self, reason: DiscardReason) -> FieldStep {
        self.clear();
        FieldStep::Malformed(reason)
    }
}
