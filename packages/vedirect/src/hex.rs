//! VE.Direct HEX frames.
//!
//! HEX frames share the wire with text blocks. A frame starts with `:`, is
//! followed by a single hex digit holding the command (or response) nibble,
//! then pairs of hex digits holding the payload, then a final pair holding the
//! checksum byte, and ends with a line feed:
//!
//! ```text
//! :  7  F0ED  00  9001  E0  \n
//! ^  ^  ^     ^   ^     ^   ^
//! |  |  |     |   |     |   terminator
//! |  |  |     |   |     checksum (0x55 - sum of everything before it)
//! |  |  |     |   value (little-endian)
//! |  |  |     flags
//! |  |  register id (little-endian)
//! |  response nibble (Get)
//! marker
//! ```
//!
//! The detector only validates framing and the checksum. [`HexFrame::response`]
//! decodes the payload of device responses.

use alloc::vec::Vec;
use bitflags::bitflags;

use crate::{
    HEX_TERMINATOR,
    checksum::hex_checksum_valid,
    decode::{Decode, DecodeError, DecodeErrorKind},
    decoder::DiscardReason,
};

/// Response nibbles sent by devices.
pub mod responses {
    pub const DONE: u8 = 0x1;
    pub const UNKNOWN: u8 = 0x3;
    pub const ERROR: u8 = 0x4;
    pub const PING: u8 = 0x5;
    pub const GET: u8 = 0x7;
    pub const SET: u8 = 0x8;
    pub const ASYNC: u8 = 0xA;
}

/// A checksum-verified HEX frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HexFrame {
    command: u8,
    payload: Vec<u8>,
}

impl HexFrame {
    /// The command (or response) nibble.
    pub const fn command(&self) -> u8 {
        self.command
    }

    /// Decoded payload bytes, without the trailing checksum byte.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Decodes the frame as a device response.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the nibble is not a known response or the
    /// payload is too short for it.
    pub fn response(&self) -> Result<Response, DecodeError> {
        let mut data = self.payload.as_slice();
        let data = &mut data;

        Ok(match self.command {
            responses::DONE => Response::Done(Vec::decode(data)?),
            responses::UNKNOWN => Response::Unknown(Vec::decode(data)?),
            responses::ERROR => Response::Error(Vec::decode(data)?),
            responses::PING => Response::Ping {
                version: u16::decode_exact(&self.payload)?,
            },
            responses::GET => Response::Get(RegisterResponse::decode(data)?),
            responses::SET => Response::Set(RegisterResponse::decode(data)?),
            responses::ASYNC => Response::Async(RegisterResponse::decode(data)?),
            value => {
                return Err(DecodeError::new::<Response>(
                    DecodeErrorKind::UnexpectedByte {
                        name: "response",
                        value,
                        expected: &[
                            responses::DONE,
                            responses::UNKNOWN,
                            responses::ERROR,
                            responses::PING,
                            responses::GET,
                            responses::SET,
                            responses::ASYNC,
                        ],
                    },
                ));
            }
        })
    }
}

/// A decoded device response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Acknowledges a command; carries the requested data, if any.
    Done(Vec<u8>),
    /// The device did not recognise the command.
    Unknown(Vec<u8>),
    /// The frame sent to the device was malformed.
    Error(Vec<u8>),
    /// Reply to a ping, carrying the application version.
    Ping { version: u16 },
    /// Reply to a register read.
    Get(RegisterResponse),
    /// Reply to a register write.
    Set(RegisterResponse),
    /// Register value pushed by the device without a request.
    Async(RegisterResponse),
}

bitflags! {
    /// Status flags of a register response.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ResponseFlags: u8 {
        /// The register does not exist.
        const UNKNOWN_ID = 1 << 0;
        /// The register exists but cannot be accessed this way.
        const NOT_SUPPORTED = 1 << 1;
        /// The value written was out of range.
        const PARAMETER_ERROR = 1 << 2;
    }
}

/// Payload of a Get, Set or Async response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterResponse {
    pub register: u16,
    pub flags: ResponseFlags,
    /// Raw little-endian value. Its width depends on the register.
    pub value: Vec<u8>,
}

impl RegisterResponse {
    /// Whether the device reported no error flags.
    pub fn is_ok(&self) -> bool {
        self.flags.is_empty()
    }

    /// Decodes the value as a specific integer type, requiring an exact width.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the value has a different width.
    pub fn value_as<T: Decode>(&self) -> Result<T, DecodeError> {
        T::decode_exact(&self.value)
    }

    pub fn value_u8(&self) -> Result<u8, DecodeError> {
        self.value_as()
    }

    pub fn value_u16(&self) -> Result<u16, DecodeError> {
        self.value_as()
    }

    pub fn value_u32(&self) -> Result<u32, DecodeError> {
        self.value_as()
    }

    pub fn value_i16(&self) -> Result<i16, DecodeError> {
        self.value_as()
    }

    pub fn value_i32(&self) -> Result<i32, DecodeError> {
        self.value_as()
    }
}

impl Decode for RegisterResponse {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let register = u16::decode(data)?;
        let flags = ResponseFlags::from_bits_retain(u8::decode(data)?);
        let value = Vec::decode(data)?;

        Ok(Self {
            register,
            flags,
            value,
        })
    }
}

/// Result of pushing one byte into a [`HexFrameDetector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HexStep {
    /// The frame is still being read.
    Pending,
    /// The terminator arrived. The frame either passed its checksum or was
    /// dropped.
    Complete(Result<HexFrame, DiscardReason>),
    /// The frame cannot be parsed. The detector has been cleared.
    Malformed(DiscardReason),
}

/// Reads one HEX frame, from the byte after the marker up to the terminator.
#[derive(Debug, Clone)]
pub struct HexFrameDetector {
    command: Option<u8>,
    bytes: Vec<u8>,
    high_nibble: Option<u8>,
    max_len: usize,
}

impl HexFrameDetector {
    pub fn new(max_len: usize) -> Self {
        Self {
            command: None,
            bytes: Vec::new(),
            high_nibble: None,
            max_len,
        }
    }

    /// Starts a new frame. Call this after the marker byte.
    pub fn begin(&mut self) {
        self.clear();
    }

    /// Consumes one byte of the frame.
    pub fn push(&mut self, byte: u8) -> HexStep {
        match byte {
            HEX_TERMINATOR => self.finish(),
            // Tolerate CR LF line endings.
            b'\r' => HexStep::Pending,
            _ => {
                let Some(nibble) = hex_digit(byte) else {
                    return self.malformed(DiscardReason::UnexpectedByte(byte));
                };

                if self.command.is_none() {
                    self.command = Some(nibble);
                } else if let Some(high) = self.high_nibble.take() {
                    if self.bytes.len() >= self.max_len {
                        return self.malformed(DiscardReason::FieldTooLong);
                    }
                    self.bytes.push((high << 4) | nibble);
                } else {
                    self.high_nibble = Some(nibble);
                }

                HexStep::Pending
            }
        }
    }

    pub fn clear(&mut self) {
        self.command = None;
        self.bytes.clear();
        self.high_nibble = None;
    }

    fn finish(&mut self) -> HexStep {
        let (Some(command), None) = (self.command, self.high_nibble) else {
            return self.malformed(DiscardReason::TruncatedHex);
        };
        if self.bytes.is_empty() {
            return self.malformed(DiscardReason::TruncatedHex);
        }

        let mut payload = core::mem::take(&mut self.bytes);
        self.clear();

        if !hex_checksum_valid(command, &payload) {
            return HexStep::Complete(Err(DiscardReason::HexChecksumMismatch));
        }

        // Drop the checksum byte.
        payload.pop();
        HexStep::Complete(Ok(HexFrame { command, payload }))
    }

    fn malformed(&mut self, reason: DiscardReason) -> HexStep {
        self.clear();
        HexStep::Malformed(reason)
    }
}

fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}
