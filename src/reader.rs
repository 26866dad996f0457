use alloc::string::String;
use byteorder::{ByteOrder, LittleEndian};

use crate::error::Error;

/// Bounded little-endian cursor over a byte slice.
///
/// Every read is checked against the end of the slice; running off the end
/// yields `Error::Truncated` with the offset of the failed read.
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Move to an absolute offset.
    pub(crate) fn seek(&mut self, pos: usize) -> Result<(), Error> {
        if pos > self.data.len() {
            return Err(Error::Truncated { offset: pos });
        }
        self.pos = pos;
        Ok(())
    }

    /// Move forward by `n` bytes.
    pub(crate) fn skip(&mut self, n: usize) -> Result<(), Error> {
        self.take(n).map(|_| ())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::Truncated { offset: self.pos })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;

        Ok(bytes)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub(crate) fn read_i16(&mut self) -> Result<i16, Error> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub(crate) fn read_f32(&mut self) -> Result<f32, Error> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Read a fixed-length field holding a NUL-padded string.
    ///
    /// Bytes are taken as Latin-1, so arbitrary data never fails to decode.
    pub(crate) fn read_str(&mut self, len: usize) -> Result<String, Error> {
        let bytes = self.take(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(len);

        Ok(bytes[..end].iter().map(|&b| char::from(b)).collect())
    }

    /// Read a 16-bit record count. Negative counts hold no records.
    pub(crate) fn read_count(&mut self) -> Result<usize, Error> {
        let count = self.read_i16()?;
        if count < 0 {
            log::warn!("Negative record count {} at offset {}", count, self.pos - 2);
        }

        Ok(count.max(0) as usize)
    }
}
