//! Binary writer for serializing signature blobs.

use crate::error::{Error, Result};

/// A binary writer for producing little-endian data.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    data: Vec<u8>,
}

impl Writer {
    /// Create a new empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Get the current length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the writer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the written data.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Get a reference to the written data.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Build a [`Error::MalformedSignature`] at the current end of output.
    pub(crate) fn malformed(&self, reason: &'static str) -> Error {
        Error::malformed(self.data.len(), reason)
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a signed byte.
    pub fn write_i8(&mut self, value: i8) {
        self.data.push(value as u8);
    }

    /// Write a little-endian u16.
    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian i16.
    pub fn write_i16(&mut self, value: i16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian u32.
    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian i32.
    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian u64.
    pub fn write_u64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian i64.
    pub fn write_i64(&mut self, value: i64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write an IEEE 754 single.
    pub fn write_f32(&mut self, value: f32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write an IEEE 754 double.
    pub fn write_f64(&mut self, value: f64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a slice of bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write a compressed unsigned integer (ECMA-335 II.23.2).
    pub fn write_compressed_uint(&mut self, value: u32) -> Result<()> {
        if value < 0x80 {
            // 1 byte: 0xxxxxxx
            self.write_u8(value as u8);
        } else if value < 0x4000 {
            // 2 bytes: 10xxxxxx xxxxxxxx
            self.write_u8((0x80 | (value >> 8)) as u8);
            self.write_u8(value as u8);
        } else if value <= 0x1FFF_FFFF {
            // 4 bytes: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
            self.write_u8((0xC0 | (value >> 24)) as u8);
            self.write_u8((value >> 16) as u8);
            self.write_u8((value >> 8) as u8);
            self.write_u8(value as u8);
        } else {
            return Err(Error::CompressedIntOutOfRange(i64::from(value)));
        }
        Ok(())
    }

    /// Write a count as a compressed unsigned integer.
    pub(crate) fn write_compressed_len(&mut self, what: &'static str, count: usize) -> Result<()> {
        let count = u32::try_from(count)
            .ok()
            .filter(|&c| c <= 0x1FFF_FFFF)
            .ok_or(Error::CountOutOfRange { what, count })?;
        self.write_compressed_uint(count)
    }

    /// Write a compressed signed integer (ECMA-335 II.23.2).
    ///
    /// The width follows from the value, not from the rotated payload: a
    /// negative value's payload can be small enough for a narrower form
    /// that would decode to a different number.
    pub fn write_compressed_int(&mut self, value: i32) -> Result<()> {
        let sign = u32::from(value < 0);
        let bits = value as u32;
        if (-0x40..0x40).contains(&value) {
            self.write_u8((((bits & 0x3F) << 1) | sign) as u8);
        } else if (-0x2000..0x2000).contains(&value) {
            let payload = ((bits & 0x1FFF) << 1) | sign;
            self.write_u8((0x80 | (payload >> 8)) as u8);
            self.write_u8(payload as u8);
        } else if (-0x1000_0000..0x1000_0000).contains(&value) {
            let payload = ((bits & 0x0FFF_FFFF) << 1) | sign;
            self.write_u8((0xC0 | (payload >> 24)) as u8);
            self.write_u8((payload >> 16) as u8);
            self.write_u8((payload >> 8) as u8);
            self.write_u8(payload as u8);
        } else {
            return Err(Error::CompressedIntOutOfRange(i64::from(value)));
        }
        Ok(())
    }

    /// Write a serialized string; `None` writes the null marker `0xFF`.
    pub fn write_ser_string(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            Some(s) => {
                self.write_compressed_len("string byte", s.len())?;
                self.write_bytes(s.as_bytes());
            }
            None => self.write_u8(0xFF),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;

    #[test]
    fn test_compressed_uint_widths() {
        let mut writer = Writer::new();
        for value in [0x03, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1FFF_FFFF] {
            writer.write_compressed_uint(value).unwrap();
        }
        assert_eq!(
            writer.as_slice(),
            &[
                0x03, 0x7F, 0x80, 0x80, 0xBF, 0xFF, 0xC0, 0x00, 0x40, 0x00, 0xDF, 0xFF, 0xFF,
                0xFF
            ]
        );
    }

    #[test]
    fn test_compressed_uint_out_of_range() {
        let mut writer = Writer::new();
        assert!(matches!(
            writer.write_compressed_uint(0x2000_0000),
            Err(Error::CompressedIntOutOfRange(0x2000_0000))
        ));
        assert!(writer.is_empty());
    }

    #[test]
    fn test_compressed_int_matches_reader() {
        let values = [
            0,
            3,
            -3,
            63,
            -64,
            64,
            -65,
            8191,
            -8192,
            8192,
            268_435_455,
            -268_435_456,
        ];
        let mut writer = Writer::new();
        for value in values {
            writer.write_compressed_int(value).unwrap();
        }
        let bytes = writer.into_inner();
        let mut reader = Reader::new(&bytes);
        for value in values {
            assert_eq!(reader.read_compressed_int().unwrap(), value);
        }
        assert!(reader.is_empty());
    }

    #[test]
    fn test_compressed_int_width_follows_value() {
        for (value, bytes) in [
            (-64, &[0x01][..]),
            (-65, &[0xBF, 0x7F][..]),
            (-8192, &[0x80, 0x01][..]),
            (-8129, &[0x80, 0x7F][..]),
            (-8193, &[0xDF, 0xFF, 0xBF, 0xFF][..]),
            (-0x1000_0000, &[0xC0, 0x00, 0x00, 0x01][..]),
        ] {
            let mut writer = Writer::new();
            writer.write_compressed_int(value).unwrap();
            assert_eq!(writer.as_slice(), bytes, "{value}");
            assert_eq!(Reader::new(bytes).read_compressed_int().unwrap(), value);
        }
    }

    #[test]
    fn test_ser_string_long_length() {
        let text = "y".repeat(200);
        let mut writer = Writer::new();
        writer.write_ser_string(Some(&text)).unwrap();
        assert_eq!(&writer.as_slice()[..2], &[0x80, 0xC8]);
        assert_eq!(writer.len(), 202);
    }

    #[test]
    fn test_compressed_int_out_of_range() {
        let mut writer = Writer::new();
        assert!(writer.write_compressed_int(0x1000_0000).is_err());
        assert!(writer.write_compressed_int(-0x1000_0001).is_err());
    }

    #[test]
    fn test_ser_string() {
        let mut writer = Writer::new();
        writer.write_ser_string(Some("Bar")).unwrap();
        writer.write_ser_string(None).unwrap();
        assert_eq!(writer.as_slice(), &[0x03, b'B', b'a', b'r', 0xFF]);
    }
}
