use super::{wire::WireReader, FrequencyTable, ProbabilitySource, SymbolRange};
use crate::cast;
use crate::error::{ModelingError, Result};
use crate::helpers::histogram;

const MAGIC: &[u8; 4] = b"WFM1";

/// Static order-0 model with precomputed cumulative counts.
///
/// Ignores the running context entirely, `advance` is a no-op. Offset lookup
/// is a binary search instead of the linear scan `ContextModel` does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequencyModel {
    /// `cumulative[s]..cumulative[s + 1]` is the range of symbol `s`
    cumulative: Vec<u64>,
}

impl FrequencyModel {
    pub fn build(data: &[u8]) -> Self {
        Self::from_counts(&histogram(data))
    }

    fn from_counts(counts: &[u32]) -> Self {
        debug_assert_eq!(counts.len(), 256);
        let mut cumulative = Vec::with_capacity(257);
        cumulative.push(0);
        for &count in counts {
            let last = cumulative[cumulative.len() - 1];
            cumulative.push(last + u64::from(count));
        }
        Self { cumulative }
    }

    fn count(&self, symbol: u8) -> u64 {
        let s = usize::from(symbol);
        self.cumulative[s + 1] - self.cumulative[s]
    }

    fn grand_total(&self) -> u64 {
        self.cumulative[256]
    }

    /// Same table layout as the order-0 part of a `ContextModel` blob.
    pub fn to_bytes(&self) -> Vec<u8> {
        let table = FrequencyTable::from_counts((0..=255).map(|s| (s, cast!(u32, self.count(s)))));
        let mut out = MAGIC.to_vec();
        table.write_to(&mut out);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(bytes, "frequency model");
        reader.expect_magic(MAGIC)?;
        let table = FrequencyTable::read_from(&mut reader)?;
        reader.finish()?;

        let mut counts = vec![0; 256];
        table.iter().for_each(|(s, c)| counts[usize::from(s)] = c);
        Ok(Self::from_counts(&counts))
    }
}

impl ProbabilitySource for FrequencyModel {
    fn start_session(&mut self) {}

    fn range(&self, symbol: u8) -> Result<SymbolRange> {
        let total = self.grand_total();
        if total == 0 {
            return Err(ModelingError::EmptyModel.into());
        }
        let s = usize::from(symbol);
        let (low, high) = (self.cumulative[s], self.cumulative[s + 1]);
        if low == high {
            return Err(ModelingError::UnseenSymbol { symbol, context_len: 0 }.into());
        }
        Ok(SymbolRange::new(low, high, total))
    }

    fn total(&self) -> Result<u64> {
        match self.grand_total() {
            0 => Err(ModelingError::EmptyModel.into()),
            total => Ok(total),
        }
    }

    fn symbol_for_offset(&self, offset: u64) -> Result<u8> {
        let total = self.total()?;
        if offset >= total {
            return Err(ModelingError::OffsetOutOfRange { offset, total }.into());
        }
        // first boundary above offset closes the symbol's range
        let idx = self.cumulative.partition_point(|&c| c <= offset);
        Ok(u8::try_from(idx - 1).unwrap_or(u8::MAX))
    }

    fn advance(&mut self, _symbol: u8) {}

    fn max_total(&self) -> u64 {
        self.grand_total()
    }
}
