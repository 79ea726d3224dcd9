//! Base-128 varint codec used for the length and type prefixes of every frame.
//!
//! # What is a varint? (for beginners)
//!
//! A varint stores an unsigned integer in as few bytes as possible.  Each byte
//! carries 7 bits of the value, least-significant group first.  The high bit
//! (`0x80`) of a byte is the *continuation bit*: when set, another byte
//! follows; when clear, this is the last byte.
//!
//! ```text
//! 1     -> 0x01
//! 127   -> 0x7F
//! 128   -> 0x80 0x01
//! 16384 -> 0x80 0x80 0x01
//! ```
//!
//! Small numbers (the common case for message types and short payloads) cost
//! a single byte on the wire.

use thiserror::Error;

/// Longest possible encoding of a `u64` (ceil(64 / 7)).
pub const MAX_VARINT_LEN: usize = 10;

/// Errors returned by [`decode_varint`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// The buffer ended before a byte with a clear continuation bit.
    ///
    /// This is not a protocol violation: the rest of the varint simply has
    /// not arrived yet.
    #[error("incomplete varint: buffer ended after {available} byte(s)")]
    Incomplete { available: usize },

    /// The encoded value does not fit in 64 bits.
    #[error("varint exceeds 64 bits")]
    Overflow,
}

/// Encodes `value` as a varint and returns the bytes.
///
/// # Examples
///
/// ```rust
/// use espmock_core::encode_varint;
///
/// assert_eq!(encode_varint(1), vec![0x01]);
/// assert_eq!(encode_varint(300), vec![0xAC, 0x02]);
/// ```
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_VARINT_LEN);
    encode_varint_into(&mut buf, value);
    buf
}

/// Appends the varint encoding of `value` to `buf`.
pub fn encode_varint_into(buf: &mut Vec<u8>, mut value: u64) {
    while value > 0x7F {
        buf.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Decodes one varint starting at `offset`.
///
/// Returns the value and the number of bytes it occupied, so the caller can
/// advance its cursor.
///
/// # Errors
///
/// - [`VarintError::Incomplete`] if `buf` ends before the terminating byte.
///   Callers reading from a stream should wait for more data.
/// - [`VarintError::Overflow`] if the value would not fit in a `u64`.
///
/// # Examples
///
/// ```rust
/// use espmock_core::{decode_varint, VarintError};
///
/// assert_eq!(decode_varint(&[0xAC, 0x02], 0), Ok((300, 2)));
/// assert!(matches!(decode_varint(&[0x80], 0), Err(VarintError::Incomplete { .. })));
/// ```
pub fn decode_varint(buf: &[u8], offset: usize) -> Result<(u64, usize), VarintError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;

    for (i, &byte) in buf.iter().enumerate().skip(offset) {
        let group = u64::from(byte & 0x7F);

        // The tenth byte may only contribute the single remaining bit.
        if shift == 63 && group > 1 {
            return Err(VarintError::Overflow);
        }
        value |= group << shift;

        if byte & 0x80 == 0 {
            return Ok((value, i + 1 - offset));
        }

        shift += 7;
        if shift > 63 {
            return Err(VarintError::Overflow);
        }
    }

    Err(VarintError::Incomplete {
        available: buf.len().saturating_sub(offset),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
