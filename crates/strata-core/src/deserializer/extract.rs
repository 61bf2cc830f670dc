//! Typed extraction: scalars, strings, counted collections and raw element
//! arrays.
//!
//! Only unsigned integers honor the wire byte order. `u32` follows the
//! deserializer's [`Encoding`]; `u64` is always big-endian. `i32` and `f64`
//! are read in native byte order. Existing record formats depend on this
//! split, so it is kept as is.

use super::{Deserializer, Encoding, DEFAULT_CHUNK_SIZE};
use crate::error::{Error, Result};
use crate::varint::read_varint;

/// Upper bound on capacity reserved up front from an untrusted count
const PREALLOC_LIMIT: usize = 4096;

/// A value that can be pulled from a [`Deserializer`]
pub trait Extract: Sized {
    /// Reads one value
    fn extract(de: &mut Deserializer<'_>) -> Result<Self>;
}

impl Extract for u8 {
    fn extract(de: &mut Deserializer<'_>) -> Result<Self> {
        de.read_u8()
    }
}

impl Extract for u32 {
    fn extract(de: &mut Deserializer<'_>) -> Result<Self> {
        de.read_u32()
    }
}

impl Extract for i32 {
    fn extract(de: &mut Deserializer<'_>) -> Result<Self> {
        de.read_i32()
    }
}

impl Extract for u64 {
    fn extract(de: &mut Deserializer<'_>) -> Result<Self> {
        de.read_u64()
    }
}

impl Extract for f64 {
    fn extract(de: &mut Deserializer<'_>) -> Result<Self> {
        de.read_f64()
    }
}

impl Extract for String {
    fn extract(de: &mut Deserializer<'_>) -> Result<Self> {
        de.read_string()
    }
}

impl Extract for Vec<String> {
    fn extract(de: &mut Deserializer<'_>) -> Result<Self> {
        de.read_string_vec()
    }
}

impl Extract for Vec<Vec<u8>> {
    fn extract(de: &mut Deserializer<'_>) -> Result<Self> {
        de.read_cstring_vec()
    }
}

impl Extract for Vec<u32> {
    fn extract(de: &mut Deserializer<'_>) -> Result<Self> {
        de.read_u32_vec()
    }
}

/// Fixed-width plain value decoded from native-order bytes
pub trait Scalar: Copy {
    /// Size in bytes
    const WIDTH: usize;

    /// Decodes from exactly `WIDTH` native-order bytes
    fn from_ne_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl Scalar for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                fn from_ne_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_ne_bytes(raw)
                }
            }
        )*
    };
}

impl_scalar!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// Outcome of an element-counted raw read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRead {
    /// Elements asked for
    pub requested: usize,
    /// Whole elements decoded
    pub elements: usize,
    /// Bytes consumed, including any incomplete trailing element
    pub bytes: usize,
    width: usize,
}

impl RawRead {
    /// Every requested element was read
    pub fn is_complete(&self) -> bool {
        self.elements == self.requested
    }

    /// Nothing could be read
    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    /// The data ended inside an element
    pub fn has_partial_element(&self) -> bool {
        self.bytes > self.elements * self.width
    }
}

impl Deserializer<'_> {
    /// Reads any [`Extract`] value
    pub fn extract<T: Extract>(&mut self) -> Result<T> {
        T::extract(self)
    }

    /// Reads one byte
    pub fn read_u8(&mut self) -> Result<u8> {
        let [byte] = self.read_fixed::<1>()?;
        Ok(byte)
    }

    /// Reads an unsigned 32-bit value in the deserializer's encoding
    pub fn read_u32(&mut self) -> Result<u32> {
        match self.encoding {
            Encoding::Varint => self.read_varint_u32(),
            Encoding::FixedBigEndian => Ok(u32::from_be_bytes(self.read_fixed()?)),
        }
    }

    /// Reads a signed 32-bit value in native byte order
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_ne_bytes(self.read_fixed()?))
    }

    /// Reads an unsigned 64-bit big-endian value
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_fixed()?))
    }

    /// Reads a 64-bit float in native byte order
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_ne_bytes(self.read_fixed()?))
    }

    /// Reads a varint into a `u32` regardless of the encoding
    pub fn read_varint_u32(&mut self) -> Result<u32> {
        read_varint(|| self.read_u8())
    }

    /// Reads a varint into a `u64` regardless of the encoding
    pub fn read_varint_u64(&mut self) -> Result<u64> {
        read_varint(|| self.read_u8())
    }

    /// Reads the raw bytes of a `\0`-terminated string, consuming the
    /// terminator
    pub fn read_cstring(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        if !self.read_to(&mut out, 0)? {
            return Err(self.end_of_stream());
        }
        Ok(out)
    }

    /// Reads a `\0`-terminated UTF-8 string
    pub fn read_string(&mut self) -> Result<String> {
        let offset = self.position();
        let raw = self.read_cstring()?;
        String::from_utf8(raw).map_err(|_| Error::InvalidUtf8 { offset })
    }

    /// Reads a count followed by that many raw `\0`-terminated byte strings.
    ///
    /// Elements may hold any bytes except the terminator.
    pub fn read_cstring_vec(&mut self) -> Result<Vec<Vec<u8>>> {
        self.read_counted(Self::read_cstring)
    }

    /// Reads a count followed by that many UTF-8 strings.
    ///
    /// Fails with [`Error::InvalidUtf8`] at the offending element; use
    /// [`read_cstring_vec`](Self::read_cstring_vec) for binary content.
    pub fn read_string_vec(&mut self) -> Result<Vec<String>> {
        self.read_counted(Self::read_string)
    }

    /// Reads a count followed by that many `u32` values in the
    /// deserializer's encoding
    pub fn read_u32_vec(&mut self) -> Result<Vec<u32>> {
        self.read_counted(Self::read_u32)
    }

    fn read_counted<T>(
        &mut self,
        mut element: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let n = self.read_u32()? as usize;
        let mut out = Vec::with_capacity(n.min(PREALLOC_LIMIT));
        for _ in 0..n {
            out.push(element(self)?);
        }
        Ok(out)
    }

    /// Reads exactly `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; n];
        if self.read_raw(&mut out)? != n {
            return Err(self.end_of_stream());
        }
        Ok(out)
    }

    /// Reads up to `count` native-order elements into `out`.
    ///
    /// Short data is not an error: the returned [`RawRead`] tells how many
    /// whole elements arrived and how many bytes were consumed. Bytes of an
    /// incomplete trailing element are consumed but not decoded.
    ///
    /// The data is staged through a scratch buffer of at most one chunk, so a
    /// large `count` over a short origin allocates only what it can fill.
    pub fn read_array<T: Scalar>(&mut self, out: &mut Vec<T>, count: usize) -> Result<RawRead> {
        let chunk = (DEFAULT_CHUNK_SIZE / T::WIDTH).max(1) * T::WIDTH;
        let mut scratch = vec![0u8; count.saturating_mul(T::WIDTH).min(chunk)];
        let mut elements = 0;
        let mut bytes = 0;

        while elements < count {
            // Always a whole number of elements
            let want = (count - elements)
                .saturating_mul(T::WIDTH)
                .min(scratch.len());
            let got = self.read_raw(&mut scratch[..want])?;
            let whole = got / T::WIDTH;
            out.extend(scratch[..whole * T::WIDTH].chunks_exact(T::WIDTH).map(T::from_ne_slice));
            elements += whole;
            bytes += got;
            if got < want {
                break;
            }
        }

        Ok(RawRead {
            requested: count,
            elements,
            bytes,
            width: T::WIDTH,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::write_varint;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fixed_u32_is_big_endian() {
        let mut de = Deserializer::from_slice(&[0x00, 0x00, 0x01, 0x02], Encoding::FixedBigEndian);
        assert_eq!(de.read_u32().unwrap(), 0x0102);
        assert_eq!(de.avail(), 0);
    }

    #[test]
    fn test_varint_u32() {
        let mut de = Deserializer::from_slice(&[0xAC, 0x02, 0x05], Encoding::Varint);
        assert_eq!(de.read_u32().unwrap(), 300);
        assert_eq!(de.read_u32().unwrap(), 5);
    }

    #[test]
    fn test_u64_ignores_varint_mode() {
        let data = 0x0102_0304_0506_0708u64.to_be_bytes();
        let mut de = Deserializer::from_slice(&data, Encoding::Varint);
        assert_eq!(de.read_u64().unwrap(), 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_signed_and_float_are_native() {
        let mut data = Vec::new();
        data.extend_from_slice(&(-7i32).to_ne_bytes());
        data.extend_from_slice(&2.5f64.to_ne_bytes());
        let mut de = Deserializer::from_slice(&data, Encoding::Varint);
        assert_eq!(de.read_i32().unwrap(), -7);
        assert_eq!(de.read_f64().unwrap(), 2.5);
    }

    #[test]
    fn test_truncated_scalar() {
        let mut de = Deserializer::from_slice(&[0x01, 0x02], Encoding::FixedBigEndian);
        let err = de.read_u32().unwrap_err();
        assert!(matches!(err, Error::EndOfStream { offset: 2 }));
    }

    #[test]
    fn test_string() {
        let mut de = Deserializer::from_slice(b"abc\0def", Encoding::FixedBigEndian);
        assert_eq!(de.read_string().unwrap(), "abc");
        assert_eq!(de.position(), 4);
        assert!(de.read_string().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_invalid_utf8() {
        let mut de = Deserializer::from_slice(b"ok\0\xFF\xFE\0", Encoding::FixedBigEndian);
        assert_eq!(de.read_string().unwrap(), "ok");
        let err = de.read_string().unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8 { offset: 3 }));
    }

    #[test]
    fn test_string_vec_varint() {
        let mut data = Vec::new();
        write_varint(2, &mut data);
        data.extend_from_slice(b"x\0yz\0");
        let mut de = Deserializer::from_slice(&data, Encoding::Varint);
        assert_eq!(de.extract::<Vec<String>>().unwrap(), vec!["x", "yz"]);
    }

    #[test]
    fn test_cstring_vec_keeps_binary_elements() {
        let mut data = 2u32.to_be_bytes().to_vec();
        data.extend_from_slice(b"ok\0\xFF\xFE\0");

        let mut de = Deserializer::from_slice(&data, Encoding::FixedBigEndian);
        assert_eq!(
            de.read_cstring_vec().unwrap(),
            vec![b"ok".to_vec(), vec![0xFF, 0xFE]]
        );
        assert_eq!(de.avail(), 0);

        let mut de = Deserializer::from_slice(&data, Encoding::FixedBigEndian);
        let err = de.read_string_vec().unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8 { offset: 7 }));
    }

    #[test]
    fn test_u32_vec_aborts_on_truncation() {
        let mut data = 3u32.to_be_bytes().to_vec();
        data.extend_from_slice(&1u32.to_be_bytes());
        let mut de = Deserializer::from_slice(&data, Encoding::FixedBigEndian);
        assert!(de.read_u32_vec().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_read_array_partial() {
        let data = [1u8, 0, 2, 0, 3];
        let mut de = Deserializer::from_slice(&data, Encoding::FixedBigEndian);
        let mut out: Vec<u16> = Vec::new();
        let read = de.read_array(&mut out, 4).unwrap();
        assert_eq!(read.elements, 2);
        assert_eq!(read.bytes, 5);
        assert!(!read.is_complete());
        assert!(read.has_partial_element());
        assert_eq!(out, vec![u16::from_ne_bytes([1, 0]), u16::from_ne_bytes([2, 0])]);

        let read = de.read_array(&mut out, 1).unwrap();
        assert!(read.is_empty());
        assert!(!read.has_partial_element());
    }

    #[test]
    fn test_read_array_huge_count_over_short_data() {
        let mut de = Deserializer::from_slice(b"abcd", Encoding::FixedBigEndian);
        let mut out: Vec<u64> = Vec::new();
        let read = de.read_array(&mut out, usize::MAX / 4).unwrap();
        assert_eq!(read.elements, 0);
        assert_eq!(read.bytes, 4);
        assert!(read.has_partial_element());
        assert!(out.is_empty());
        assert_eq!(de.avail(), 0);
    }

    #[test]
    fn test_read_array_spans_several_chunks() {
        let count = DEFAULT_CHUNK_SIZE / 4 * 3 + 1;
        let data: Vec<u8> = (0..count as u32).flat_map(u32::to_ne_bytes).collect();
        let mut de = Deserializer::from_slice(&data, Encoding::FixedBigEndian);
        let mut out: Vec<u32> = Vec::new();
        let read = de.read_array(&mut out, count + 10).unwrap();
        assert_eq!(read.elements, count);
        assert_eq!(read.bytes, data.len());
        assert!(!read.has_partial_element());
        assert_eq!(out.last(), Some(&(count as u32 - 1)));
    }

    #[test]
    fn test_read_array_complete() {
        let data = [7u8, 8, 9];
        let mut de = Deserializer::from_slice(&data, Encoding::FixedBigEndian);
        let mut out: Vec<u8> = Vec::new();
        let read = de.read_array(&mut out, 3).unwrap();
        assert!(read.is_complete());
        assert!(!read.has_partial_element());
        assert_eq!(out, vec![7, 8, 9]);
    }
}
