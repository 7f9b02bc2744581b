use core::slice::from_mut as into_slice;
use std::io::{self, ErrorKind, Read, Write};

use super::{ACRead, ACWrite};

/// Arithmetic coder read io for `io::Read` types, MSB first
pub struct ACReader<R> {
    inner: R,
    buf: u8,
    mask: u8,
    exhausted: bool,
    padded: u64,
}

impl<R: Read> ACReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, buf: 0, mask: 0, exhausted: false, padded: 0 }
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        debug_assert!(self.mask == 0);
        let mut byte = 0;
        match self.inner.read_exact(into_slice(&mut byte)) {
            Ok(()) => Ok(Some(byte)),
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl<R: Read> ACRead for ACReader<R> {
    fn read_bit(&mut self) -> io::Result<u8> {
        self.mask >>= 1; // move to next bit
        if self.mask == 0 {
            let byte = if self.exhausted { None } else { self.read_byte()? };
            self.exhausted = byte.is_none();
            self.buf = byte.unwrap_or(0); // fill
            self.mask = 1 << 7; // then move to first bit
        }
        self.padded += u64::from(self.exhausted);
        Ok((self.buf & self.mask > 0).into())
    }

    fn padded_bits(&self) -> u64 {
        self.padded
    }
}

/// Arithmetic coder write io for `io::Write` types, MSB first
pub struct ACWriter<W> {
    inner: W,
    buf: u8,
    idx: u8,
    rev_bits: u64,
}

impl<W: Write> ACWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, buf: 0, idx: 0, rev_bits: 0 }
    }

    pub fn into_inner(self) -> W {
        debug_assert!(self.idx == 0, "unflushed bits");
        self.inner
    }

    fn write_bit_raw(&mut self, bit: u8) -> io::Result<()> {
        self.buf = (self.buf << 1) | bit;
        self.idx = (self.idx + 1) % 8;
        if self.idx == 0 {
            self.inner.write_all(&[self.buf])?;
        }
        Ok(())
    }
}

impl<W: Write> ACWrite for ACWriter<W> {
    fn inc_parity(&mut self) {
        self.rev_bits += 1;
    }

    fn write_bit(&mut self, bit: u8) -> io::Result<()> {
        debug_assert!(bit <= 1, "Tried to write invalid bit");

        self.write_bit_raw(bit)?;
        while self.rev_bits > 0 {
            self.rev_bits -= 1;
            self.write_bit_raw(bit ^ 1)?;
        }
        Ok(())
    }

    fn flush(&mut self, bit: u8) -> io::Result<()> {
        self.inc_parity();
        self.write_bit(bit)?;
        while self.idx > 0 {
            self.write_bit_raw(0)?;
        }
        self.inner.flush()
    }
}
