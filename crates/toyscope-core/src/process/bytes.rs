//! Byte buffer utilities for parsing binary data structures.
//!
//! `ByteBuffer` gives offset-based access into a struct image read from target
//! memory in one call, so a header like `Namespace` costs a single read.

use encoding_rs::UTF_8;
use tracing::debug;

use crate::error::{Error, Result};

/// Offset-addressed view over a struct image.
///
/// # Example
///
/// ```
/// use toyscope_core::process::ByteBuffer;
///
/// let data = [0x78, 0x56, 0x34, 0x12, 0x00, 0x00, 0x00, 0x00];
/// let buf = ByteBuffer::at(0x2000, &data);
///
/// assert_eq!(buf.read_u32_at(0).unwrap(), 0x12345678);
/// assert_eq!(buf.word_at(0, 8).unwrap(), 0x12345678);
/// ```
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    address: u64,
}

impl<'a> ByteBuffer<'a> {
    /// Wraps bytes that were read from `address` in the target.
    pub fn at(address: u64, data: &'a [u8]) -> Self {
        Self { data, address }
    }

    /// Returns the total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a slice of bytes at the specified offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is out of bounds. The reported address is
    /// the target address of the field, not the buffer offset.
    pub fn slice_at(&self, offset: u64, len: usize) -> Result<&'a [u8]> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or_else(|| Error::MemoryReadFailed {
            address: self.address.wrapping_add(offset),
            message: "Offset overflow".to_string(),
        })?;

        if end > self.data.len() {
            return Err(Error::MemoryReadFailed {
                address: self.address.wrapping_add(offset),
                message: format!(
                    "Field range {}..{} exceeds struct image of {} bytes",
                    start,
                    end,
                    self.data.len()
                ),
            });
        }

        Ok(&self.data[start..end])
    }

    /// Reads an unsigned 32-bit integer (little-endian) at the specified offset.
    pub fn read_u32_at(&self, offset: u64) -> Result<u32> {
        let bytes = self.slice_at(offset, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads an unsigned 64-bit integer (little-endian) at the specified offset.
    pub fn read_u64_at(&self, offset: u64) -> Result<u64> {
        let bytes = self.slice_at(offset, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Reads a pointer or `size_t` of `width` bytes at the specified offset.
    pub fn word_at(&self, offset: u64, width: usize) -> Result<u64> {
        match width {
            8 => self.read_u64_at(offset),
            4 => self.read_u32_at(offset).map(u64::from),
            other => Err(Error::MemoryReadFailed {
                address: self.address.wrapping_add(offset),
                message: format!("Unsupported word width {}", other),
            }),
        }
    }
}

/// Decodes UTF-8, replacing each invalid sequence with U+FFFD.
///
/// Never fails. Embedded NUL bytes are kept: toyscript strings are
/// length-delimited, not NUL-terminated.
pub fn decode_utf8_lossy(bytes: &[u8]) -> String {
    let (decoded, had_errors) = UTF_8.decode_without_bom_handling(bytes);
    if had_errors {
        debug!(
            "UTF-8 decoding replaced invalid bytes in: {:?}",
            &bytes[..bytes.len().min(20)]
        );
    }
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_buffer_read_u64_at() {
        let data = [0xEF, 0xCD, 0xAB, 0x90, 0x78, 0x56, 0x34, 0x12];
        let buf = ByteBuffer::at(0, &data);

        assert_eq!(buf.read_u64_at(0).unwrap(), 0x1234567890ABCDEF);
    }

    #[test]
    fn test_byte_buffer_word_at() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let buf = ByteBuffer::at(0, &data);

        assert_eq!(buf.word_at(4, 4).unwrap(), 0x08070605);
        assert!(buf.word_at(4, 8).is_err());
        assert!(buf.word_at(0, 3).is_err());
    }

    #[test]
    fn test_byte_buffer_error_reports_target_address() {
        let data = [0x01, 0x02];
        let buf = ByteBuffer::at(0x5000, &data);

        match buf.read_u32_at(0) {
            Err(Error::MemoryReadFailed { address, .. }) => assert_eq!(address, 0x5000),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_decode_utf8_valid() {
        assert_eq!(decode_utf8_lossy("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn test_decode_utf8_invalid_sequences() {
        let data = [b'a', 0xFF, b'b', 0xC3];
        assert_eq!(decode_utf8_lossy(&data), "a\u{FFFD}b\u{FFFD}");
    }

    #[test]
    fn test_decode_utf8_keeps_nul() {
        assert_eq!(decode_utf8_lossy(b"a\0b"), "a\0b");
    }
}
