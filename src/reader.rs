//! Binary reader over a signature blob.

use crate::error::{Error, Result};

/// A cursor over a signature blob, reading little-endian data.
///
/// Besides the primitive reads the reader tracks how deeply the signature
/// decoders have recursed, so a corrupt or adversarial blob cannot overflow
/// the stack. See [`Reader::nested`].
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Reader<'a> {
    /// Nesting limit used by [`Reader::new`].
    pub const DEFAULT_MAX_DEPTH: usize = 64;

    /// Create a new reader from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_max_depth(data, Self::DEFAULT_MAX_DEPTH)
    }

    /// Create a reader with a custom nesting limit.
    #[must_use]
    pub fn with_max_depth(data: &'a [u8], max_depth: usize) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    /// Get the current position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Check if the reader is at the end.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Build a [`Error::MalformedSignature`] at the current position.
    pub(crate) fn malformed(&self, reason: &'static str) -> Error {
        Error::malformed(self.pos, reason)
    }

    /// Fail unless every byte has been consumed.
    pub(crate) fn expect_end(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.malformed("trailing bytes after signature"))
        }
    }

    /// Run `f` one nesting level deeper, failing once the limit is reached.
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.max_depth {
            return Err(Error::RecursionLimit(self.max_depth));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Peek at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        self.data.get(self.pos).copied().ok_or(Error::UnexpectedEof {
            offset: self.pos,
            needed: 1,
        })
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let value = self.peek_u8()?;
        self.pos += 1;
        Ok(value)
    }

    /// Read a signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_u8().map(|b| b as i8)
    }

    /// Read a little-endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Read a little-endian i16.
    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_array().map(i16::from_le_bytes)
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read a little-endian i32.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Read a little-endian u64.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Read a little-endian i64.
    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    /// Read an IEEE 754 single.
    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Read an IEEE 754 double.
    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_array().map(f64::from_le_bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a slice of bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::UnexpectedEof {
                offset: self.pos,
                needed: len,
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read a compressed unsigned integer (ECMA-335 II.23.2).
    ///
    /// Only the shortest encoding of a value is accepted, so every value
    /// read here writes back to the same bytes.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let start = self.pos;
        let (value, width) = self.read_compressed_raw()?;
        let canonical = match width {
            1 => true,
            2 => value >= 0x80,
            _ => value >= 0x4000,
        };
        if !canonical {
            self.pos = start;
            return Err(Error::malformed(start, "non-canonical compressed integer"));
        }
        Ok(value)
    }

    /// Read a compressed signed integer (ECMA-335 II.23.2).
    ///
    /// The sign bit is rotated into the least significant bit of the
    /// 7, 14 or 29 bit payload. As with unsigned values, only the shortest
    /// width that holds the value is accepted.
    pub fn read_compressed_int(&mut self) -> Result<i32> {
        let start = self.pos;
        let (raw, width) = self.read_compressed_raw()?;
        let (sign_extension, narrower) = match width {
            1 => (0xFFFF_FFC0u32, None),
            2 => (0xFFFF_E000, Some(-0x40..0x40)),
            _ => (0xF000_0000, Some(-0x2000..0x2000)),
        };
        let magnitude = raw >> 1;
        let bits = if raw & 1 != 0 {
            magnitude | sign_extension
        } else {
            magnitude
        };
        let value = bits as i32;
        if narrower.is_some_and(|range| range.contains(&value)) {
            self.pos = start;
            return Err(Error::malformed(start, "non-canonical compressed integer"));
        }
        Ok(value)
    }

    /// Read the payload of a compressed integer and the width it used.
    fn read_compressed_raw(&mut self) -> Result<(u32, usize)> {
        let start = self.pos;
        let first = self.read_u8()?;

        if first & 0x80 == 0 {
            // 1 byte: 0xxxxxxx
            Ok((u32::from(first), 1))
        } else if first & 0xC0 == 0x80 {
            // 2 bytes: 10xxxxxx xxxxxxxx
            let second = self.read_u8()?;
            Ok((u32::from(first & 0x3F) << 8 | u32::from(second), 2))
        } else if first & 0xE0 == 0xC0 {
            // 4 bytes: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
            let bytes = self.read_bytes(3)?;
            let value = u32::from(first & 0x1F) << 24
                | u32::from(bytes[0]) << 16
                | u32::from(bytes[1]) << 8
                | u32::from(bytes[2]);
            Ok((value, 4))
        } else {
            self.pos = start;
            Err(Error::InvalidCompressedInt(start))
        }
    }

    /// Read a serialized string: compressed length then UTF-8 bytes.
    ///
    /// A lone `0xFF` byte encodes the null string and yields `None`.
    pub fn read_ser_string(&mut self) -> Result<Option<String>> {
        if self.peek_u8()? == 0xFF {
            self.pos += 1;
            return Ok(None);
        }
        let len = self.read_compressed_uint()? as usize;
        let start = self.pos;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(|s| Some(s.to_owned()))
            .map_err(|_| Error::InvalidString(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_uint_widths() {
        let data = [0x03, 0x80, 0x80, 0xBF, 0xFF, 0xC0, 0x00, 0x40, 0x00];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_compressed_uint().unwrap(), 0x03);
        assert_eq!(reader.read_compressed_uint().unwrap(), 0x80);
        assert_eq!(reader.read_compressed_uint().unwrap(), 0x3FFF);
        assert_eq!(reader.read_compressed_uint().unwrap(), 0x4000);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_compressed_uint_invalid_prefix() {
        let mut reader = Reader::new(&[0xE0, 0x00, 0x00, 0x00]);
        assert!(matches!(
            reader.read_compressed_uint(),
            Err(Error::InvalidCompressedInt(0))
        ));
    }

    #[test]
    fn test_compressed_int_examples() {
        // Values from ECMA-335 II.23.2.
        let data = [
            0x06, 0x7B, 0x80, 0x80, 0x01, 0xC0, 0x00, 0x40, 0x00, 0x80, 0x01, 0xDF, 0xFF, 0xFF,
            0xFE, 0xC0, 0x00, 0x00, 0x01,
        ];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_compressed_int().unwrap(), 3);
        assert_eq!(reader.read_compressed_int().unwrap(), -3);
        assert_eq!(reader.read_compressed_int().unwrap(), 64);
        assert_eq!(reader.read_compressed_int().unwrap(), -64);
        assert_eq!(reader.read_compressed_int().unwrap(), 8192);
        assert_eq!(reader.read_compressed_int().unwrap(), -8192);
        assert_eq!(reader.read_compressed_int().unwrap(), 268_435_455);
        assert_eq!(reader.read_compressed_int().unwrap(), -268_435_456);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_compressed_uint_rejects_wide_forms() {
        for data in [
            &[0x80, 0x08][..],
            &[0x80, 0x7F][..],
            &[0xC0, 0x00, 0x00, 0x7F][..],
            &[0xC0, 0x00, 0x3F, 0xFF][..],
        ] {
            let mut reader = Reader::new(data);
            assert!(
                matches!(
                    reader.read_compressed_uint(),
                    Err(Error::MalformedSignature { offset: 0, .. })
                ),
                "{data:02x?}"
            );
            assert_eq!(reader.position(), 0);
        }
    }

    #[test]
    fn test_compressed_int_rejects_wide_forms() {
        // 3 in two bytes, -64 in two bytes, 1 and -8192 in four bytes.
        for data in [
            &[0x80, 0x06][..],
            &[0xBF, 0x81][..],
            &[0xC0, 0x00, 0x00, 0x02][..],
            &[0xDF, 0xFF, 0xC0, 0x01][..],
        ] {
            let mut reader = Reader::new(data);
            assert!(
                matches!(
                    reader.read_compressed_int(),
                    Err(Error::MalformedSignature { offset: 0, .. })
                ),
                "{data:02x?}"
            );
        }
    }

    #[test]
    fn test_ser_string_long_length_is_compressed() {
        let text = "x".repeat(200);
        let mut data = vec![0x80, 0xC8];
        data.extend_from_slice(text.as_bytes());
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_ser_string().unwrap().as_deref(), Some(text.as_str()));
        assert!(reader.is_empty());

        // A bare 0xC8 opens a four-byte length, not a 200-byte string.
        let mut data = vec![0xC8];
        data.extend_from_slice(text.as_bytes());
        assert!(Reader::new(&data).read_ser_string().is_err());
    }

    #[test]
    fn test_ser_string() {
        let data = [0x03, b'F', b'o', b'o', 0xFF, 0x00];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_ser_string().unwrap().as_deref(), Some("Foo"));
        assert_eq!(reader.read_ser_string().unwrap(), None);
        assert_eq!(reader.read_ser_string().unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_ser_string_invalid_utf8() {
        let mut reader = Reader::new(&[0x02, 0xC3, 0x28]);
        assert!(matches!(
            reader.read_ser_string(),
            Err(Error::InvalidString(1))
        ));
    }

    #[test]
    fn test_fixed_width_reads() {
        let data = [0xFE, 0x34, 0x12, 0x00, 0x00, 0x80, 0x3F];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_i8().unwrap(), -2);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_f32().unwrap(), 1.0);
        assert!(matches!(
            reader.read_u8(),
            Err(Error::UnexpectedEof {
                offset: 7,
                needed: 1
            })
        ));
    }

    #[test]
    fn test_nested_depth_limit() {
        fn descend(reader: &mut Reader<'_>) -> Result<()> {
            reader.nested(descend)
        }
        let mut reader = Reader::with_max_depth(&[], 8);
        assert!(matches!(descend(&mut reader), Err(Error::RecursionLimit(8))));
        // The counter unwinds with the failed calls.
        assert_eq!(reader.nested(|_| Ok(1)).unwrap(), 1);
    }
}
