//! Sequential little-endian reader over a bundle image.

use super::{ManifestError, ManifestResult};

/// Longest relative path accepted in a manifest entry.
pub const MAX_PATH_LENGTH: usize = 4096;

/// Forward-only cursor over a byte buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Reader positioned at `offset` inside `data`.
    pub fn at(data: &'a [u8], offset: usize) -> ManifestResult<Self> {
        if offset > data.len() {
            return Err(ManifestError::UnexpectedEof { offset, needed: 0 });
        }
        Ok(Self { data, offset })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn read_bytes(&mut self, len: usize) -> ManifestResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(ManifestError::UnexpectedEof {
                offset: self.offset,
                needed: len,
            });
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> ManifestResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i64(&mut self) -> ManifestResult<i64> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(buf))
    }

    /// Length prefix encoded seven bits per byte, low bits first.
    pub fn read_7bit_length(&mut self) -> ManifestResult<usize> {
        let start = self.offset;
        let mut value: usize = 0;

        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7F) as usize) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }

        Err(ManifestError::InvalidLength { offset: start })
    }

    /// Length-prefixed UTF-8 path.
    pub fn read_path(&mut self) -> ManifestResult<&'a str> {
        let start = self.offset;
        let len = self.read_7bit_length()?;
        if len == 0 || len > MAX_PATH_LENGTH {
            return Err(ManifestError::InvalidPathLength { offset: start, len });
        }

        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|_| ManifestError::InvalidUtf8 { offset: start })
    }
}

/// Append `len` in the seven-bit prefix encoding used by [`Reader::read_7bit_length`].
pub fn write_7bit_length(out: &mut Vec<u8>, mut len: usize) {
    while len >= 0x80 {
        out.push((len as u8 & 0x7F) | 0x80);
        len >>= 7;
    }
    out.push(len as u8);
}
