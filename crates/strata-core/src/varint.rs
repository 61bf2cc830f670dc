//! Variable-length integer codec.
//!
//! Each byte carries 7 payload bits plus a continuation bit (high bit set
//! means more bytes follow). Groups are stored least-significant first.
//!
//! Decoding is bounded by the width of the target type: a `u32` consumes at
//! most 5 groups and a `u64` at most 10. The last permitted group ends the
//! value whatever its continuation bit says, and payload bits beyond the
//! target width are discarded.
//!
//! | Value   | Encoded bytes        |
//! |---------|----------------------|
//! | 0       | `[0x00]`             |
//! | 127     | `[0x7F]`             |
//! | 128     | `[0x80, 0x01]`       |
//! | 300     | `[0xAC, 0x02]`       |
//! | 16384   | `[0x80, 0x80, 0x01]` |

use crate::error::{Error, Result};

/// Maximum number of bytes a u64 varint can occupy (ceil(64 / 7))
pub const MAX_VARINT_BYTES: usize = 10;

const PAYLOAD_MASK: u8 = 0x7F;
const CONTINUATION: u8 = 0x80;

/// Unsigned integer types a varint can be decoded into
pub trait VarintTarget: Copy {
    /// Bit width of the type
    const BITS: u32;

    /// Keeps the low `BITS` bits of `value`
    fn from_truncated(value: u64) -> Self;

    /// Maximum number of 7-bit groups decoded for this type
    fn max_groups() -> usize {
        Self::BITS.div_ceil(7) as usize
    }
}

impl VarintTarget for u32 {
    const BITS: u32 = u32::BITS;

    fn from_truncated(value: u64) -> Self {
        value as u32
    }
}

impl VarintTarget for u64 {
    const BITS: u32 = u64::BITS;

    fn from_truncated(value: u64) -> Self {
        value
    }
}

/// Encode `value` into `buf`, returning the number of bytes written (1-10).
///
/// # Panics
///
/// Panics if `buf` is shorter than the encoding. A buffer of
/// [`MAX_VARINT_BYTES`] is always sufficient.
pub fn encode_varint(mut value: u64, buf: &mut [u8]) -> usize {
    let mut i = 0;
    loop {
        let mut byte = (value as u8) & PAYLOAD_MASK;
        value >>= 7;
        if value > 0 {
            byte |= CONTINUATION;
        }
        buf[i] = byte;
        i += 1;
        if value == 0 {
            return i;
        }
    }
}

/// Append the varint encoding of `value` to `out`
pub fn write_varint(value: u64, out: &mut Vec<u8>) {
    let mut buf = [0u8; MAX_VARINT_BYTES];
    let len = encode_varint(value, &mut buf);
    out.extend_from_slice(&buf[..len]);
}

/// Decode a varint by pulling bytes from `next` until the value ends.
///
/// `next` reports exhaustion with an error (normally
/// [`Error::EndOfStream`]), which is propagated unchanged.
pub fn read_varint<T, F>(mut next: F) -> Result<T>
where
    T: VarintTarget,
    F: FnMut() -> Result<u8>,
{
    let mut value: u64 = 0;
    for group in 0..T::max_groups() {
        let byte = next()?;
        let shift = 7 * group as u32;
        if shift < u64::BITS {
            value |= u64::from(byte & PAYLOAD_MASK) << shift;
        }
        if byte & CONTINUATION == 0 {
            break;
        }
    }
    Ok(T::from_truncated(value))
}

/// Decode a varint from the start of `data`.
///
/// Returns the decoded value and the number of bytes consumed. A sequence
/// still carrying the continuation bit on its final byte fails with
/// [`Error::EndOfStream`] at the slice length.
pub fn decode_varint<T: VarintTarget>(data: &[u8]) -> Result<(T, usize)> {
    let mut position = 0;
    let value = read_varint(|| {
        let byte = *data
            .get(position)
            .ok_or_else(|| Error::end_of_stream(data.len() as u64))?;
        position += 1;
        Ok(byte)
    })?;
    Ok((value, position))
}
