// ABOUTME: Shared decode primitives for the SMS codec: the bounds-checked binary reader and error type
// ABOUTME: Every read either succeeds and advances by exactly its width or fails leaving the offset untouched

use bytes::Buf;
use thiserror::Error;

/// Errors produced by the PDU and GSM text codecs.
///
/// Causes are local and specific; none of them is a transport condition, so
/// callers usually log the variant and fall back to rendering the raw PDU.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Incomplete data: need {needed} bytes, {remaining} remaining")]
    Incomplete { needed: usize, remaining: usize },

    #[error("Invalid timestamp field '{field}': {value:#04x}")]
    InvalidTimestamp { field: &'static str, value: u8 },

    #[error("Timezone offset out of range: {quarters} quarter hours")]
    InvalidTimezone { quarters: i32 },

    #[error("User data too long: {length} bytes, max {max}")]
    UserDataTooLong { length: usize, max: usize },

    #[error("Unsupported data coding scheme: {0:#04x}")]
    UnsupportedDcs(u8),

    #[error("Compressed user data is not supported")]
    Compressed,

    #[error("Malformed user data header: {0}")]
    InvalidUserDataHeader(&'static str),

    #[error("UCS-2 data has odd length: {0}")]
    OddLength(usize),

    #[error("Invalid UTF-16 surrogate sequence at byte {0}")]
    InvalidSurrogate(usize),

    #[error("Invalid codepoint: U+{0:04X}")]
    InvalidCodepoint(u32),

    #[error("USSD text with ISO language prefix or compression is not supported")]
    UnsupportedUssd,

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Unknown message <stat>: {0}")]
    InvalidStat(i32),

    #[error("Malformed message listing entry: {0}")]
    MalformedListing(String),

    #[error("Unsupported PDU type: {0:?}")]
    UnsupportedPduType(crate::pdu::PduType),
}

/// Sequential reader over an immutable byte slice.
///
/// The logical size can be shrunk with [`BinaryReader::truncate`] to bound a
/// sub-region. Reads never touch bytes past the logical size.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    size: usize,
    offset: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            size: data.len(),
            offset: 0,
        }
    }

    /// Logical size of the readable region
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.size.saturating_sub(self.offset)
    }

    pub fn eof(&self) -> bool {
        self.remaining() == 0
    }

    /// Read exactly `len` bytes, borrowing them from the underlying slice
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if len > self.remaining() {
            return Err(CodecError::Incomplete {
                needed: len,
                remaining: self.remaining(),
            });
        }

        let chunk = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(chunk)
    }

    /// Read a fixed-size array
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_byte(&mut self) -> Result<u8, CodecError> {
        let mut chunk = self.read_bytes(1)?;
        Ok(chunk.get_u8())
    }

    /// Decode a 16-bit little-endian integer
    pub fn read_u16_le(&mut self) -> Result<u16, CodecError> {
        let mut chunk = self.read_bytes(2)?;
        Ok(chunk.get_u16_le())
    }

    /// Decode a 16-bit big-endian integer
    pub fn read_u16_be(&mut self) -> Result<u16, CodecError> {
        let mut chunk = self.read_bytes(2)?;
        Ok(chunk.get_u16())
    }

    /// Read `len` bytes as text, replacing invalid UTF-8 sequences
    pub fn read_string(&mut self, len: usize) -> Result<String, CodecError> {
        let chunk = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(chunk).into_owned())
    }

    pub fn skip(&mut self, len: usize) -> Result<(), CodecError> {
        self.read_bytes(len).map(|_| ())
    }

    /// Shrink the logical size to `len` bytes from the start of the buffer
    pub fn truncate(&mut self, len: usize) -> Result<(), CodecError> {
        if len > self.size {
            return Err(CodecError::Incomplete {
                needed: len,
                remaining: self.size,
            });
        }
        self.size = len;
        Ok(())
    }

    /// Everything between the offset and the logical end, without consuming it
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.offset.min(self.size)..self.size]
    }
}
