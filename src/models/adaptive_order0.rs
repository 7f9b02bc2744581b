use super::{ProbabilitySource, SymbolRange};
use crate::error::{ModelingError, Result};

/// Total at which all counts get halved.
pub const RESCALE_LIMIT: u64 = 1 << 16;

/// Order-0 model that learns while coding, nothing to train or transport.
///
/// Every byte value starts at count 1 so any input is codeable. `advance`
/// counts the coded symbol, and both sides of the coder see the same counts
/// at the same symbol index because they advance in lockstep.
#[derive(Clone, Debug)]
pub struct AdaptiveOrder0 {
    counts: [u32; 256],
    total: u64,
}

impl AdaptiveOrder0 {
    pub fn new() -> Self {
        Self { counts: [1; 256], total: 256 }
    }

    fn rescale(&mut self) {
        self.total = 0;
        for count in self.counts.iter_mut() {
            *count = (*count + 1) / 2;
            self.total += u64::from(*count);
        }
    }
}

impl Default for AdaptiveOrder0 {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbabilitySource for AdaptiveOrder0 {
    fn start_session(&mut self) {
        *self = Self::new();
    }

    fn range(&self, symbol: u8) -> Result<SymbolRange> {
        let s = usize::from(symbol);
        let low: u64 = self.counts[..s].iter().map(|&c| u64::from(c)).sum();
        Ok(SymbolRange::new(low, low + u64::from(self.counts[s]), self.total))
    }

    fn total(&self) -> Result<u64> {
        Ok(self.total)
    }

    fn symbol_for_offset(&self, offset: u64) -> Result<u8> {
        let mut high = 0;
        for (symbol, &count) in (0..=u8::MAX).zip(self.counts.iter()) {
            high += u64::from(count);
            if offset < high {
                return Ok(symbol);
            }
        }
        Err(ModelingError::OffsetOutOfRange { offset, total: self.total }.into())
    }

    fn advance(&mut self, symbol: u8) {
        self.counts[usize::from(symbol)] += 1;
        self.total += 1;
        if self.total >= RESCALE_LIMIT {
            self.rescale();
        }
    }

    fn max_total(&self) -> u64 {
        RESCALE_LIMIT
    }
}
