pub mod ac_io;


use std::io;

use tracing::{debug, trace};

use self::ac_io::{ACReader, ACWriter};
use crate::cast;
use crate::error::{Error, ModelingError, Result};
use crate::helpers::ACStats;
use crate::models::{ProbabilitySource, SymbolRange};

pub const DEFAULT_PRECISION: u32 = 32;
pub const MIN_PRECISION: u32 = 8;
pub const MAX_PRECISION: u32 = 62;
/// Most symbols `decode` reserves room for up front, `count` may come from
/// an untrusted header.
const MAX_PREALLOC: usize = 1 << 20;

/// Interval bounds derived from the coder precision `P`.
///
/// `full = 2^P` and the half/quarter marks of `[0, full)`. Construction is
/// the only place precision is validated, so a coder can't exist with bad
/// bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    precision: u32,
    full: u64,
    half: u64,
    quarter: u64,
    three_quarters: u64,
}

impl Bounds {
    pub fn new(precision_bits: u32) -> Result<Self> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision_bits) {
            return Err(Error::config(format!(
                "precision of {precision_bits} bits outside {MIN_PRECISION}..={MAX_PRECISION}"
            )));
        }
        let full = 1u64 << precision_bits;
        let half = full >> 1;
        let quarter = half >> 1;
        Ok(Self { precision: precision_bits, full, half, quarter, three_quarters: half + quarter })
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Largest model total the coder accepts.
    ///
    /// After renormalization the interval is always wider than a quarter, so
    /// with `total <= quarter / 2` every symbol with a non-zero count gets a
    /// sub-interval of at least two values and `low < high` holds strictly.
    pub fn max_total(&self) -> u64 {
        self.quarter >> 1
    }

    pub fn check_capacity(&self, total: u64) -> Result<()> {
        if total > self.max_total() {
            return Err(Error::config(format!(
                "model total {total} needs more than {} bits of coder precision (max total {})",
                self.precision,
                self.max_total()
            )));
        }
        Ok(())
    }
}

/// Writes a bit and its pending opposite bits, or reads bits back.
pub trait ACWrite {
    /// Increases the number of opposite bits to write after the next bit (E3)
    fn inc_parity(&mut self);
    /// Writes a bit followed by all pending opposite bits
    fn write_bit(&mut self, bit: u8) -> io::Result<()>;
    /// Writes the final disambiguating `bit` plus one more opposite bit than
    /// pending, then zero-pads to a byte
    fn flush(&mut self, bit: u8) -> io::Result<()>;
}

pub trait ACRead {
    /// Read bit or 0 past the end
    fn read_bit(&mut self) -> io::Result<u8>;
    /// Bits returned past the end of input so far
    fn padded_bits(&self) -> u64;
}

/// Multi-symbol integer arithmetic coder (Witten, Neal & Cleary).
///
/// Symbols are coded against the `(low, high, total)` triplets of a
/// [`ProbabilitySource`]. The coder calls `advance` on the source exactly
/// once per symbol, after all queries for it.
pub struct ArithmeticCoder<T> {
    bounds: Bounds,
    low: u64,
    high: u64,
    value: u64, // decoder window
    io: T,
}

impl<T> ArithmeticCoder<T> {
    /// Current `[low, high]` interval.
    pub fn interval(&self) -> (u64, u64) {
        (self.low, self.high)
    }

    fn narrow(&mut self, range: SymbolRange) -> Result<()> {
        self.bounds.check_capacity(range.total)?;
        let SymbolRange { low, high, total } = range;
        if !(low < high && high <= total) {
            return Err(ModelingError::InvalidRange { low, high, total }.into());
        }

        let size = u128::from(self.high - self.low + 1);
        let total = u128::from(total);
        self.high = self.low + cast!(u64, size * u128::from(high) / total) - 1;
        self.low += cast!(u64, size * u128::from(low) / total);

        debug_assert!(self.low < self.high, "coding interval collapsed");
        Ok(())
    }
}

impl<W: ACWrite> ArithmeticCoder<W> {
    pub fn new_coder(bounds: Bounds, writer: W) -> Self {
        Self { bounds, low: 0, high: bounds.full - 1, value: 0, io: writer }
    }

    pub fn encode<M: ProbabilitySource>(&mut self, symbol: u8, model: &mut M) -> Result<()> {
        let range = model.range(symbol)?;
        self.narrow(range)?;
        model.advance(symbol);

        let Bounds { half, quarter, three_quarters, .. } = self.bounds;
        loop {
            if self.high < half {
                // E1
                self.io.write_bit(0)?;
            } else if self.low >= half {
                // E2
                self.io.write_bit(1)?;
                self.low -= half;
                self.high -= half;
            } else if self.low >= quarter && self.high < three_quarters {
                // E3
                self.io.inc_parity();
                self.low -= quarter;
                self.high -= quarter;
            } else {
                break;
            }
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
        }

        Ok(())
    }

    /// Disambiguates the final interval and hands back the writer.
    pub fn flush(mut self) -> Result<W> {
        let bit = u8::from(self.low >= self.bounds.quarter);
        self.io.flush(bit)?;
        Ok(self.io)
    }
}

impl<R: ACRead> ArithmeticCoder<R> {
    /// Fills the value window with the first `P` bits, zero-padded.
    pub fn new_decoder(bounds: Bounds, mut reader: R) -> Result<Self> {
        let mut value = 0;
        for _ in 0..bounds.precision() {
            value = (value << 1) | u64::from(reader.read_bit()?);
        }
        Ok(Self { bounds, low: 0, high: bounds.full - 1, value, io: reader })
    }

    pub fn decode<M: ProbabilitySource>(&mut self, model: &mut M) -> Result<u8> {
        let total = model.total()?;
        if total == 0 {
            return Err(ModelingError::EmptyModel.into());
        }

        // value never leaves [low, high] for any input, this only trips on a
        // broken coder state
        let delta = match self.value.checked_sub(self.low) {
            Some(delta) if self.value <= self.high => delta,
            _ => return Err(Error::format("arithmetic stream", "value outside of interval")),
        };
        let size = u128::from(self.high - self.low + 1);
        let offset = ((u128::from(delta) + 1) * u128::from(total) - 1) / size;

        let symbol = model.symbol_for_offset(cast!(u64, offset))?;
        let range = model.range(symbol)?;
        self.narrow(range)?;
        model.advance(symbol);

        let Bounds { half, quarter, three_quarters, .. } = self.bounds;
        loop {
            if self.high < half {
                // E1, nothing to subtract
            } else if self.low >= half {
                self.low -= half;
                self.high -= half;
                self.value -= half;
            } else if self.low >= quarter && self.high < three_quarters {
                self.low -= quarter;
                self.high -= quarter;
                self.value -= quarter;
            } else {
                break;
            }
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
            self.value = (self.value << 1) | u64::from(self.io.read_bit()?);
        }

        Ok(symbol)
    }

    pub fn padded_bits(&self) -> u64 {
        self.io.padded_bits()
    }
}

fn encode_with<M, W>(symbols: &[u8], model: &mut M, precision_bits: u32, writer: W) -> Result<W>
where
    M: ProbabilitySource,
    W: ACWrite,
{
    let bounds = Bounds::new(precision_bits)?;
    // before any bit is written
    bounds.check_capacity(model.max_total())?;

    model.start_session();
    let mut ac = ArithmeticCoder::new_coder(bounds, writer);
    for &symbol in symbols {
        ac.encode(symbol, model)?;
    }
    ac.flush()
}

/// Codes `symbols` with a fresh session on `model`.
///
/// Fails before writing anything if the model's totals don't fit the
/// precision. Any query error from the model aborts the whole call.
pub fn encode<M: ProbabilitySource>(
    symbols: &[u8],
    model: &mut M,
    precision_bits: u32,
) -> Result<Vec<u8>> {
    let writer = ACWriter::new(Vec::with_capacity(symbols.len() / 2 + 8));
    let out = encode_with(symbols, model, precision_bits, writer)?.into_inner();
    debug!(symbols = symbols.len(), bytes = out.len(), precision_bits, "encoded");
    Ok(out)
}

/// Compressed size in bytes `encode` would produce, without producing it.
pub fn encoded_size<M: ProbabilitySource>(
    symbols: &[u8],
    model: &mut M,
    precision_bits: u32,
) -> Result<u64> {
    encode_with(symbols, model, precision_bits, ACStats::new()).map(|stats| stats.result())
}

fn preallocation(count: usize) -> usize {
    count.min(MAX_PREALLOC)
}

/// Decodes exactly `count` symbols with a fresh session on `model`.
///
/// There is no length recovery: `count` must be the number of symbols that
/// were encoded. Input running out is not an error, the stream is read as
/// if zero-padded, which is how the final flush expects to be read back. A
/// `count` that is too large therefore yields garbage trailing symbols
/// instead of failing.
pub fn decode<M: ProbabilitySource>(
    bytes: &[u8],
    model: &mut M,
    count: usize,
    precision_bits: u32,
) -> Result<Vec<u8>> {
    let bounds = Bounds::new(precision_bits)?;
    bounds.check_capacity(model.max_total())?;

    model.start_session();
    let mut ac = ArithmeticCoder::new_decoder(bounds, ACReader::new(bytes))?;
    let mut out = Vec::with_capacity(preallocation(count));
    for _ in 0..count {
        out.push(ac.decode(model)?);
    }

    if ac.padded_bits() > 0 {
        trace!(padded_bits = ac.padded_bits(), "decoder read past end of input");
    }
    debug!(symbols = count, bytes = bytes.len(), precision_bits, "decoded");
    Ok(out)
}
