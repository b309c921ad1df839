//! Order-preserving, prefix-free encoding for [`Value`]s.
//!
//! Byte-wise comparison of two encodings gives the same ordering as comparing
//! the values themselves (with `Null` first, then by type tag). No encoding is
//! a strict prefix of another, so concatenating encodings keeps the segment
//! boundaries of a compound key unambiguous.
//!
//! # Format
//!
//! | Type     | Tag    | Payload                                              |
//! |----------|--------|------------------------------------------------------|
//! | `Null`   | `0x00` | none                                                 |
//! | `Bool`   | `0x01` | `0x00` or `0x01`                                     |
//! | `Int`    | `0x02` | 8 bytes, sign bit flipped, big-endian                |
//! | `Float`  | `0x03` | 8 bytes, IEEE 754 with sign handling                 |
//! | `String` | `0x04` | UTF-8, `0x00` escaped to `0x00 0x01`, `0x00 0x00` end |
//! | `Bytes`  | `0x05` | raw, `0x00` escaped to `0x00 0x01`, `0x00 0x00` end   |

use crate::error::CoreError;
use crate::types::Value;

/// Type tags, ordered so that mixed-type keys sort by type first.
mod tags {
    pub const NULL: u8 = 0x00;
    pub const BOOL: u8 = 0x01;
    pub const INT: u8 = 0x02;
    pub const FLOAT: u8 = 0x03;
    pub const STRING: u8 = 0x04;
    pub const BYTES: u8 = 0x05;
}

const ESCAPE: u8 = 0x00;
const ESCAPED_ZERO: u8 = 0x01;
const TERMINATOR: u8 = 0x00;

const SIGN_BIT: u64 = 0x8000_0000_0000_0000;

/// Encode a single value into a new buffer.
#[must_use]
pub fn encode_sortable(value: &Value) -> Vec<u8> {
    let mut buf = Vec::with_capacity(10);
    encode_sortable_to(value, &mut buf);
    buf
}

/// Append the sortable encoding of `value` to `buf`.
pub fn encode_sortable_to(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Null => buf.push(tags::NULL),
        Value::Bool(b) => {
            buf.push(tags::BOOL);
            buf.push(u8::from(*b));
        }
        Value::Int(i) => {
            buf.push(tags::INT);
            buf.extend_from_slice(&((*i as u64) ^ SIGN_BIT).to_be_bytes());
        }
        Value::Float(f) => {
            buf.push(tags::FLOAT);
            buf.extend_from_slice(&encode_float(*f).to_be_bytes());
        }
        Value::String(s) => {
            buf.push(tags::STRING);
            encode_escaped(s.as_bytes(), buf);
        }
        Value::Bytes(b) => {
            buf.push(tags::BYTES);
            encode_escaped(b, buf);
        }
    }
}

/// Positive floats get the sign bit set; negative floats are fully inverted so
/// that larger magnitudes sort first. NaN is canonicalised to sort last.
fn encode_float(f: f64) -> u64 {
    if f.is_nan() {
        return u64::MAX;
    }
    let bits = f.to_bits();
    if bits & SIGN_BIT == 0 {
        bits | SIGN_BIT
    } else {
        !bits
    }
}

fn decode_float(bits: u64) -> f64 {
    if bits == u64::MAX {
        return f64::NAN;
    }
    if bits & SIGN_BIT == 0 {
        f64::from_bits(!bits)
    } else {
        f64::from_bits(bits & !SIGN_BIT)
    }
}

fn encode_escaped(data: &[u8], buf: &mut Vec<u8>) {
    for &byte in data {
        if byte == ESCAPE {
            buf.push(ESCAPE);
            buf.push(ESCAPED_ZERO);
        } else {
            buf.push(byte);
        }
    }
    buf.push(ESCAPE);
    buf.push(TERMINATOR);
}

/// Returns the unescaped payload and the number of input bytes consumed,
/// terminator included.
fn decode_escaped(bytes: &[u8]) -> Result<(Vec<u8>, usize), CoreError> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        if byte != ESCAPE {
            out.push(byte);
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(&TERMINATOR) => return Ok((out, i + 2)),
            Some(&ESCAPED_ZERO) => {
                out.push(0x00);
                i += 2;
            }
            Some(other) => {
                return Err(CoreError::Encoding(format!("invalid escape sequence 0x00 {other:#x}")))
            }
            None => break,
        }
    }
    Err(CoreError::Encoding("unterminated escaped field".to_owned()))
}

fn fixed8(bytes: &[u8]) -> Result<u64, CoreError> {
    let raw: [u8; 8] = bytes
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| CoreError::Encoding("truncated sortable value".to_owned()))?;
    Ok(u64::from_be_bytes(raw))
}

/// Decode one value from the front of `bytes`, returning it together with the
/// number of bytes it occupied.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] on empty, truncated or malformed input.
pub fn decode_sortable_prefix(bytes: &[u8]) -> Result<(Value, usize), CoreError> {
    let (&tag, rest) = bytes
        .split_first()
        .ok_or_else(|| CoreError::Encoding("empty sortable value".to_owned()))?;
    match tag {
        tags::NULL => Ok((Value::Null, 1)),
        tags::BOOL => match rest.first() {
            Some(0) => Ok((Value::Bool(false), 2)),
            Some(1) => Ok((Value::Bool(true), 2)),
            Some(b) => Err(CoreError::Encoding(format!("invalid bool byte {b:#x}"))),
            None => Err(CoreError::Encoding("truncated sortable value".to_owned())),
        },
        tags::INT => Ok((Value::Int((fixed8(rest)? ^ SIGN_BIT) as i64), 9)),
        tags::FLOAT => Ok((Value::Float(decode_float(fixed8(rest)?)), 9)),
        tags::STRING => {
            let (data, used) = decode_escaped(rest)?;
            let s = String::from_utf8(data)
                .map_err(|e| CoreError::Encoding(format!("invalid UTF-8: {e}")))?;
            Ok((Value::String(s), 1 + used))
        }
        tags::BYTES => {
            let (data, used) = decode_escaped(rest)?;
            Ok((Value::Bytes(data), 1 + used))
        }
        _ => Err(CoreError::Encoding(format!("unknown sortable tag {tag:#x}"))),
    }
}

/// Decode exactly one value; trailing bytes are an error.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] if the input is malformed or has trailing
/// bytes.
pub fn decode_sortable(bytes: &[u8]) -> Result<Value, CoreError> {
    let (value, used) = decode_sortable_prefix(bytes)?;
    if used != bytes.len() {
        return Err(CoreError::Encoding(format!(
            "{} trailing bytes after sortable value",
            bytes.len() - used
        )));
    }
    Ok(value)
}

/// Smallest byte string greater than every string that starts with `prefix`.
///
/// Returns `None` when no such string exists (empty prefix or all `0xFF`).
#[must_use]
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut succ = prefix.to_vec();
    while let Some(last) = succ.pop() {
        if last < u8::MAX {
            succ.push(last + 1);
            return Some(succ);
        }
    }
    None
}
