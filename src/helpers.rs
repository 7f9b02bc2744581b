use crate::entropy_coding;
use std::io;

/// Position of the first byte where `a` and `b` differ, or the shorter
/// length if one is a prefix of the other.
pub fn first_mismatch(a: &[u8], b: &[u8]) -> Option<usize> {
    match a.iter().zip(b).position(|(x, y)| x != y) {
        Some(pos) => Some(pos),
        None if a.len() != b.len() => Some(a.len().min(b.len())),
        None => None,
    }
}

/// Line (0-based) that contains byte `pos`.
pub fn line_of(buf: &[u8], pos: usize) -> usize {
    buf[..pos.min(buf.len())].iter().filter(|&&b| b == b'\n').count()
}

pub fn histogram(buf: &[u8]) -> Vec<u32> {
    let mut res = vec![0; 256];
    for &byte in buf {
        res[usize::from(byte)] += 1;
    }
    res
}

/// Bit sink that only counts what an `ACWriter` would emit.
pub struct ACStats {
    bit_count: u64,
    rev_bits: u64,
}

impl ACStats {
    pub fn new() -> Self {
        Self { bit_count: 0, rev_bits: 0 }
    }

    /// Bytes in compressed size, exact after `flush`
    pub fn result(&self) -> u64 {
        self.bit_count.div_ceil(8)
    }
}

impl Default for ACStats {
    fn default() -> Self {
        Self::new()
    }
}

impl entropy_coding::ACWrite for ACStats {
    fn inc_parity(&mut self) {
        self.rev_bits += 1;
    }

    fn write_bit(&mut self, _bit: u8) -> io::Result<()> {
        self.bit_count += 1 + self.rev_bits;
        self.rev_bits = 0;
        Ok(())
    }

    fn flush(&mut self, bit: u8) -> io::Result<()> {
        self.inc_parity();
        self.write_bit(bit)?;
        self.bit_count = self.bit_count.div_ceil(8) * 8;
        Ok(())
    }
}
