use alloc::vec::Vec;
use thiserror::Error;

/// Returned when a HEX payload cannot be decoded into the requested type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    type_name: &'static str,
}

impl DecodeError {
    /// Creates an error for a failed decode of `T`.
    pub fn new<T>(kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            type_name: core::any::type_name::<T>(),
        }
    }

    pub const fn kind(&self) -> DecodeErrorKind {
        self.kind
    }
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "invalid {} payload: {}", self.type_name, self.kind)
    }
}

/// What went wrong while decoding a HEX payload.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("payload ended early")]
    UnexpectedEnd,

    /// A tag byte (such as a response nibble) had no known meaning.
    #[error("unknown {name} {value:#x}, expected one of {expected:x?}")]
    UnexpectedByte {
        name: &'static str,
        value: u8,
        expected: &'static [u8],
    },

    #[error("{remaining} bytes left over")]
    TrailingBytes { remaining: usize },
}

/// A type that can be reconstructed (decoded) from a raw sequence of bytes.
///
/// HEX payloads are little-endian. The input slice is advanced by the number
/// of bytes consumed during decoding.
pub trait Decode {
    /// Attempts to decode `Self` from the beginning of the provided byte slice.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the input is malformed or too short.
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError>
    where
        Self: Sized;

    /// Decodes `Self` from the whole slice, rejecting leftover bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if decoding fails or bytes remain afterwards.
    fn decode_exact(mut data: &[u8]) -> Result<Self, DecodeError>
    where
        Self: Sized,
    {
        let value = Self::decode(&mut data)?;
        if !data.is_empty() {
            return Err(DecodeError::new::<Self>(DecodeErrorKind::TrailingBytes {
                remaining: data.len(),
            }));
        }
        Ok(value)
    }
}

impl Decode for () {
    fn decode(_data: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(())
    }
}

/// Consumes every remaining byte.
impl Decode for Vec<u8> {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let bytes = data.to_vec();
        *data = &[];
        Ok(bytes)
    }
}

macro_rules! impl_decode_for_primitive {
    ($($t:ty),*) => {
        $(
            impl Decode for $t {
                fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
                    let (bytes, rest) = data
                        .split_first_chunk::<{ core::mem::size_of::<$t>() }>()
                        .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?;
                    *data = rest;
                    Ok(Self::from_le_bytes(*bytes))
                }
            }
        )*
    };
}

impl_decode_for_primitive!(u8, u16, u32, i8, i16, i32);
