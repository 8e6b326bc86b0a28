//! Little-endian payload pack/unpack helpers.
//!
//! System messages carry integers and integer vectors; these helpers keep
//! the encoding in one place and match the wire codec's endianness.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::{Buf, BufMut};

// Layer 3: Internal module imports
// (none)

/// Pack one `i32`.
pub fn pack_i32(value: i32) -> Vec<u8> {
    let mut out = Vec::with_capacity(4);
    out.put_i32_le(value);
    out
}

/// Unpack one `i32`, or `None` when the payload is too short.
pub fn unpack_i32(payload: &[u8]) -> Option<i32> {
    let mut cursor = payload;
    if cursor.remaining() < 4 {
        return None;
    }
    Some(cursor.get_i32_le())
}

/// Pack a vector of `i32` with a leading element count.
pub fn pack_i32_vec(values: &[i32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + values.len() * 4);
    out.put_u32_le(values.len() as u32);
    for value in values {
        out.put_i32_le(*value);
    }
    out
}

/// Unpack a counted vector of `i32`, or `None` on a short payload.
pub fn unpack_i32_vec(payload: &[u8]) -> Option<Vec<i32>> {
    let mut cursor = payload;
    if cursor.remaining() < 4 {
        return None;
    }
    let count = cursor.get_u32_le() as usize;
    if cursor.remaining() < count * 4 {
        return None;
    }
    Some((0..count).map(|_| cursor.get_i32_le()).collect())
}
