//! Compact encoding for [`Value`]s and stored row bodies.
//!
//! # Format
//!
//! Each value is encoded with a 1-byte type tag followed by the payload:
//!
//! - `Null`: `0x00`
//! - `Bool`: `0x01` + `0x00` (false) or `0x01` (true)
//! - `Int`: `0x02` + 8 bytes (big-endian i64)
//! - `Float`: `0x03` + 8 bytes (IEEE 754 f64)
//! - `String`: `0x04` + 4 bytes length + UTF-8 bytes
//! - `Bytes`: `0x05` + 4 bytes length + raw bytes
//!
//! A row body is `FORMAT_VERSION`, a 4 byte field count, then the fields.
//! This format is not order-preserving; keys use [`sortable`](super::sortable).

use crate::error::CoreError;
use crate::types::Value;

use super::traits::{Decoder, Encoder, FORMAT_VERSION};

/// Type tags for value variants.
mod tags {
    pub const NULL: u8 = 0x00;
    pub const BOOL: u8 = 0x01;
    pub const INT: u8 = 0x02;
    pub const FLOAT: u8 = 0x03;
    pub const STRING: u8 = 0x04;
    pub const BYTES: u8 = 0x05;
}

fn write_len(len: usize, what: &str, buf: &mut Vec<u8>) -> Result<(), CoreError> {
    let len = u32::try_from(len).map_err(|_| CoreError::Encoding(format!("{what} too long")))?;
    buf.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn read_u32(bytes: &[u8]) -> Result<usize, CoreError> {
    let raw: [u8; 4] = bytes
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| CoreError::Encoding("unexpected end of input reading length".to_owned()))?;
    Ok(u32::from_be_bytes(raw) as usize)
}

fn read_u64(bytes: &[u8]) -> Result<[u8; 8], CoreError> {
    bytes
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| CoreError::Encoding("unexpected end of input".to_owned()))
}

impl Encoder for Value {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), CoreError> {
        match self {
            Self::Null => buf.push(tags::NULL),
            Self::Bool(b) => {
                buf.push(tags::BOOL);
                buf.push(u8::from(*b));
            }
            Self::Int(i) => {
                buf.push(tags::INT);
                buf.extend_from_slice(&i.to_be_bytes());
            }
            Self::Float(f) => {
                buf.push(tags::FLOAT);
                buf.extend_from_slice(&f.to_be_bytes());
            }
            Self::String(s) => {
                buf.push(tags::STRING);
                write_len(s.len(), "string", buf)?;
                buf.extend_from_slice(s.as_bytes());
            }
            Self::Bytes(b) => {
                buf.push(tags::BYTES);
                write_len(b.len(), "bytes", buf)?;
                buf.extend_from_slice(b);
            }
        }
        Ok(())
    }
}

impl Decoder for Value {
    fn decode(bytes: &[u8]) -> Result<Self, CoreError> {
        let (value, _) = decode_value(bytes)?;
        Ok(value)
    }
}

/// Decode a value and return the number of bytes consumed.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] on truncated or malformed input.
pub fn decode_value(bytes: &[u8]) -> Result<(Value, usize), CoreError> {
    let (&tag, rest) =
        bytes.split_first().ok_or_else(|| CoreError::Encoding("unexpected end of input".to_owned()))?;

    match tag {
        tags::NULL => Ok((Value::Null, 1)),
        tags::BOOL => {
            let b = rest
                .first()
                .ok_or_else(|| CoreError::Encoding("unexpected end of input".to_owned()))?;
            Ok((Value::Bool(*b != 0), 2))
        }
        tags::INT => Ok((Value::Int(i64::from_be_bytes(read_u64(rest)?)), 9)),
        tags::FLOAT => Ok((Value::Float(f64::from_be_bytes(read_u64(rest)?)), 9)),
        tags::STRING => {
            let len = read_u32(rest)?;
            let data = rest
                .get(4..4 + len)
                .ok_or_else(|| CoreError::Encoding("unexpected end of input".to_owned()))?;
            let s = String::from_utf8(data.to_vec())
                .map_err(|e| CoreError::Encoding(format!("invalid UTF-8: {e}")))?;
            Ok((Value::String(s), 5 + len))
        }
        tags::BYTES => {
            let len = read_u32(rest)?;
            let data = rest
                .get(4..4 + len)
                .ok_or_else(|| CoreError::Encoding("unexpected end of input".to_owned()))?;
            Ok((Value::Bytes(data.to_vec()), 5 + len))
        }
        _ => Err(CoreError::Encoding(format!("unknown value tag: {tag:#x}"))),
    }
}

/// Encode the fields of a row into a stored row body.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] if a field is too large to encode.
pub fn encode_row(values: &[Value]) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::with_capacity(5 + values.len() * 9);
    buf.push(FORMAT_VERSION);
    write_len(values.len(), "row", &mut buf)?;
    for value in values {
        value.encode_to(&mut buf)?;
    }
    Ok(buf)
}

/// Decode a stored row body produced by [`encode_row`].
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] on version mismatch, truncated input or
/// trailing bytes.
pub fn decode_row(bytes: &[u8]) -> Result<Vec<Value>, CoreError> {
    let (&version, rest) = bytes
        .split_first()
        .ok_or_else(|| CoreError::Encoding("empty row body".to_owned()))?;
    if version != FORMAT_VERSION {
        return Err(CoreError::Encoding(format!("unsupported row format version {version}")));
    }
    let count = read_u32(rest)?;
    let mut offset = 4;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let (value, consumed) = decode_value(&rest[offset..])?;
        values.push(value);
        offset += consumed;
    }
    if offset != rest.len() {
        return Err(CoreError::Encoding(format!(
            "{} trailing bytes after row body",
            rest.len() - offset
        )));
    }
    Ok(values)
}
