//! Forward-only big-endian reader over an in-memory buffer
//!
//! Every decode call owns its own cursor. Sub-records are read through
//! bounded child cursors created with [`ByteCursor::take`], which advance the
//! parent past the whole record no matter how much of it the child consumes.

use byteorder::{BigEndian, ByteOrder};

use super::error::PsdError;

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]` in the original buffer
    base: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Absolute position in the original buffer
    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn truncated(&self, needed: u64) -> PsdError {
        PsdError::Truncated {
            offset: self.position(),
            needed,
            available: self.remaining(),
        }
    }

    fn checked_len(&self, len: u64) -> Result<usize, PsdError> {
        match usize::try_from(len) {
            Ok(n) if n <= self.remaining() => Ok(n),
            _ => Err(self.truncated(len)),
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], PsdError> {
        let len = self.checked_len(len as u64)?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: u64) -> Result<(), PsdError> {
        let len = self.checked_len(len)?;
        self.pos += len;
        Ok(())
    }

    /// Split off the next `len` bytes as a child cursor and move past them.
    pub fn take(&mut self, len: u64) -> Result<ByteCursor<'a>, PsdError> {
        let len = self.checked_len(len)?;
        let child = ByteCursor {
            data: &self.data[self.pos..self.pos + len],
            pos: 0,
            base: self.position(),
        };
        self.pos += len;
        Ok(child)
    }

    pub fn read_u8(&mut self) -> Result<u8, PsdError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, PsdError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, PsdError> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_i16(&mut self) -> Result<i16, PsdError> {
        Ok(BigEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, PsdError> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, PsdError> {
        Ok(BigEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, PsdError> {
        Ok(BigEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i64(&mut self) -> Result<i64, PsdError> {
        Ok(BigEndian::read_i64(self.read_bytes(8)?))
    }

    pub fn read_f64(&mut self) -> Result<f64, PsdError> {
        Ok(BigEndian::read_f64(self.read_bytes(8)?))
    }

    /// Read a 4-byte signature or key
    pub fn read_signature(&mut self) -> Result<[u8; 4], PsdError> {
        let mut sig = [0u8; 4];
        sig.copy_from_slice(self.read_bytes(4)?);
        Ok(sig)
    }

    /// Read a length field: 64-bit when `wide`, 32-bit otherwise
    pub fn read_length(&mut self, wide: bool) -> Result<u64, PsdError> {
        if wide {
            self.read_u64()
        } else {
            Ok(self.read_u32()? as u64)
        }
    }

    /// Read a Pascal string (one length byte + bytes), returning the raw bytes
    pub fn read_pascal_bytes(&mut self) -> Result<&'a [u8], PsdError> {
        let len = self.read_u8()? as usize;
        self.read_bytes(len)
    }

    /// Read a UTF-16 string prefixed by its 32-bit code unit count
    pub fn read_unicode_string(&mut self) -> Result<String, PsdError> {
        let len = self.read_u32()? as u64;
        let byte_len = self.checked_len(len.saturating_mul(2))?;
        let bytes = self.read_bytes(byte_len)?;
        let mut utf16: Vec<u16> = bytes.chunks_exact(2).map(BigEndian::read_u16).collect();
        // Remove null terminator if present
        if let Some(&0) = utf16.last() {
            utf16.pop();
        }
        String::from_utf16(&utf16)
            .map_err(|e| PsdError::Format(format!("invalid UTF-16 string: {}", e)))
    }
}

/// Render a 4-byte tag for log and error messages
pub fn tag_str(tag: &[u8; 4]) -> String {
    String::from_utf8_lossy(tag).into_owned()
}
