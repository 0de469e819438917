//! # Row decoding
//!
//! Turns a raw buffer tagged with a [`NativeType`] into a [`Value`].
//! Numbers are laid out in native byte order, strings are UTF-8.
//!

use super::value::Value;
use serde::{Deserialize, Serialize};
use std::{error, fmt, result};

// Error management

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    UnknownType(String),
    BufferTooSmall(String),
    InvalidUtf8(String),
}

impl Error {
    pub fn unknown_type(code: impl fmt::Display) -> Error {
        Error::UnknownType(format!("{} is not a known native type", code))
    }
    pub fn buffer_too_small(native_type: NativeType, expected: usize, len: usize) -> Error {
        Error::BufferTooSmall(format!(
            "{} needs {} bytes, got {}",
            native_type, expected, len
        ))
    }
    pub fn invalid_utf8(err: impl fmt::Display) -> Error {
        Error::InvalidUtf8(format!("{}", err))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownType(desc) => writeln!(f, "UnknownType: {}", desc),
            Error::BufferTooSmall(desc) => writeln!(f, "BufferTooSmall: {}", desc),
            Error::InvalidUtf8(desc) => writeln!(f, "InvalidUtf8: {}", desc),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Native type tags, codes follow declaration order
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum NativeType {
    /// The complete absence of a value
    None = 0,
    Null = 1,
    Bool = 2,
    Int8 = 3,
    UInt8 = 4,
    Int16 = 5,
    UInt16 = 6,
    Int32 = 7,
    UInt32 = 8,
    Int64 = 9,
    UInt64 = 10,
    String = 11,
    Float32 = 12,
    Float64 = 13,
    Bytes = 14,
}

impl NativeType {
    const ALL: [NativeType; 15] = [
        NativeType::None,
        NativeType::Null,
        NativeType::Bool,
        NativeType::Int8,
        NativeType::UInt8,
        NativeType::Int16,
        NativeType::UInt16,
        NativeType::Int32,
        NativeType::UInt32,
        NativeType::Int64,
        NativeType::UInt64,
        NativeType::String,
        NativeType::Float32,
        NativeType::Float64,
        NativeType::Bytes,
    ];

    /// Size in bytes for fixed size types
    pub fn size(&self) -> Option<usize> {
        match self {
            NativeType::None | NativeType::Null => Some(0),
            NativeType::Bool | NativeType::Int8 | NativeType::UInt8 => Some(1),
            NativeType::Int16 | NativeType::UInt16 => Some(2),
            NativeType::Int32 | NativeType::UInt32 | NativeType::Float32 => Some(4),
            NativeType::Int64 | NativeType::UInt64 | NativeType::Float64 => Some(8),
            NativeType::String | NativeType::Bytes => None,
        }
    }
}

impl TryFrom<i32> for NativeType {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| NativeType::ALL.get(index).copied())
            .ok_or_else(|| Error::unknown_type(code))
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Take the first `N` bytes of the buffer
fn array<const N: usize>(native_type: NativeType, data: &[u8]) -> Result<[u8; N]> {
    data.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| Error::buffer_too_small(native_type, N, data.len()))
}

/// Decode a raw buffer into a value
pub fn decode(native_type: NativeType, data: &[u8]) -> Result<Value> {
    Ok(match native_type {
        NativeType::None | NativeType::Null => Value::Null,
        NativeType::Bool => Value::Boolean(array::<1>(native_type, data)?[0] != 0),
        NativeType::Int8 => Value::from(i8::from_ne_bytes(array(native_type, data)?)),
        NativeType::UInt8 => Value::from(u8::from_ne_bytes(array(native_type, data)?)),
        NativeType::Int16 => Value::from(i16::from_ne_bytes(array(native_type, data)?)),
        NativeType::UInt16 => Value::from(u16::from_ne_bytes(array(native_type, data)?)),
        NativeType::Int32 => Value::from(i32::from_ne_bytes(array(native_type, data)?)),
        NativeType::UInt32 => Value::from(u32::from_ne_bytes(array(native_type, data)?)),
        NativeType::Int64 => Value::from(i64::from_ne_bytes(array(native_type, data)?)),
        NativeType::UInt64 => Value::from(u64::from_ne_bytes(array(native_type, data)?)),
        NativeType::Float32 => Value::from(f32::from_ne_bytes(array(native_type, data)?)),
        NativeType::Float64 => Value::from(f64::from_ne_bytes(array(native_type, data)?)),
        NativeType::String => Value::Text(
            std::str::from_utf8(data)
                .map_err(Error::invalid_utf8)?
                .to_string(),
        ),
        NativeType::Bytes => Value::Bytes(data.to_vec()),
    })
}

/// Decode a buffer tagged with a raw type code
pub fn decode_raw(code: i32, data: &[u8]) -> Result<Value> {
    decode(NativeType::try_from(code)?, data)
}
