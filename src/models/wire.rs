//! Little-endian reader over serialized models and archives.

use crate::error::{Error, Result};

pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8], what: &'static str) -> Self {
        Self { buf, pos: 0, what }
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.buf.len());
        match end {
            Some(end) => {
                let bytes = &self.buf[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            None => Err(self.error(format!("truncated at byte {}", self.pos))),
        }
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut arr = [0; N];
        arr.copy_from_slice(self.bytes(N)?);
        Ok(arr)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn expect_magic(&mut self, magic: &[u8; 4]) -> Result<()> {
        let found = self.array::<4>()?;
        if &found == magic {
            Ok(())
        } else {
            Err(self.error(format!("bad magic {found:02x?}")))
        }
    }

    /// Everything not read yet.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.pos..];
        self.pos = self.buf.len();
        rest
    }

    /// Fails if anything is left unread.
    pub fn finish(self) -> Result<()> {
        match self.buf.len() - self.pos {
            0 => Ok(()),
            left => Err(self.error(format!("{left} trailing bytes"))),
        }
    }

    pub fn error(&self, reason: String) -> Error {
        Error::format(self.what, reason)
    }
}
