use std::collections::HashMap;

use super::{adaptive_order0::RESCALE_LIMIT, FrequencyTable, ProbabilitySource, SymbolRange};
use crate::cast;
use crate::error::{Error, ModelingError, Result};
use crate::history::{RunningContext, MAX_ORDER};

/// Order-N model that learns while coding.
///
/// Nothing is trained ahead or transported: both sides start from empty
/// context tables and an order-0 table holding every byte once. `advance`
/// counts the coded symbol under each of its contexts of length `0..=order`,
/// halving a table once its total reaches [`RESCALE_LIMIT`].
///
/// A query blends the order-0 table with every suffix of the running context
/// that already has a table, a length-`len` table weighted `2^len`. The
/// order-0 part gives every byte a non-zero count, so any input is codeable.
#[derive(Clone, Debug)]
pub struct AdaptiveContextModel {
    order: usize,
    /// `contexts[len - 1]` holds the tables of all contexts of length `len`
    contexts: Vec<HashMap<u64, FrequencyTable>>,
    fallback: FrequencyTable,
    history: RunningContext,
}

impl AdaptiveContextModel {
    pub fn new(order: usize) -> Result<Self> {
        if order > MAX_ORDER {
            return Err(Error::config(format!("order {order} above maximum {MAX_ORDER}")));
        }
        Ok(Self::fresh(order))
    }

    fn fresh(order: usize) -> Self {
        Self {
            order,
            contexts: (0..order).map(|_| HashMap::new()).collect(),
            fallback: FrequencyTable::from_counts((0..=u8::MAX).map(|s| (s, 1))),
            history: RunningContext::new(order),
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Contexts of length 1 and above seen so far in this session.
    pub fn context_count(&self) -> usize {
        self.contexts.iter().map(HashMap::len).sum()
    }

    /// Tables blended into the current query, with their weight as a shift.
    fn active(&self) -> impl Iterator<Item = (u32, &FrequencyTable)> + '_ {
        let contexts = (1..=self.history.len()).filter_map(move |len| {
            let table = self.contexts[len - 1].get(&self.history.suffix(len))?;
            Some((cast!(u32, len), table))
        });
        std::iter::once((0, &self.fallback)).chain(contexts)
    }

    fn low_of(&self, symbol: u8) -> u64 {
        self.active().map(|(shift, table)| table.cumulative_below(symbol) << shift).sum()
    }
}

fn count_into(table: &mut FrequencyTable, symbol: u8) {
    table.increment(symbol);
    if table.total() >= RESCALE_LIMIT {
        table.halve();
    }
}

impl ProbabilitySource for AdaptiveContextModel {
    fn start_session(&mut self) {
        *self = Self::fresh(self.order);
    }

    fn range(&self, symbol: u8) -> Result<SymbolRange> {
        let (mut low, mut count, mut total) = (0, 0, 0);
        for (shift, table) in self.active() {
            low += table.cumulative_below(symbol) << shift;
            count += u64::from(table.count(symbol)) << shift;
            total += table.total() << shift;
        }
        Ok(SymbolRange::new(low, low + count, total))
    }

    fn total(&self) -> Result<u64> {
        Ok(self.active().map(|(shift, table)| table.total() << shift).sum())
    }

    fn symbol_for_offset(&self, offset: u64) -> Result<u8> {
        let total = self.total()?;
        if offset >= total {
            return Err(ModelingError::OffsetOutOfRange { offset, total }.into());
        }
        // every byte has a count, so the cumulative lows strictly increase
        let (mut lo, mut hi) = (0u16, 256u16);
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.low_of(cast!(u8, mid)) <= offset {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Ok(cast!(u8, lo))
    }

    fn advance(&mut self, symbol: u8) {
        for len in 1..=self.history.len() {
            let key = self.history.suffix(len);
            count_into(self.contexts[len - 1].entry(key).or_default(), symbol);
        }
        count_into(&mut self.fallback, symbol);
        self.history.push(symbol);
    }

    fn max_total(&self) -> u64 {
        // each table stays below the limit, weights are 1, 2, .., 2^order
        (RESCALE_LIMIT - 1) * ((1 << (self.order + 1)) - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::AdaptiveContextModel;
    use crate::error::Error;
    use crate::models::{ProbabilitySource, SymbolRange};

    #[test]
    fn starts_uniform() {
        let model = AdaptiveContextModel::new(2).unwrap();
        assert_eq!(model.range(b'a').unwrap(), SymbolRange::new(97, 98, 256));
        assert_eq!(model.symbol_for_offset(0).unwrap(), 0x00);
        assert_eq!(model.symbol_for_offset(255).unwrap(), 0xff);
        assert!(model.symbol_for_offset(256).is_err());
    }

    #[test]
    fn blends_seen_contexts() {
        let mut model = AdaptiveContextModel::new(1).unwrap();
        model.advance(b'a');
        model.advance(b'b');
        // "b" was never followed by anything yet, order-0 only
        assert_eq!(model.range(b'a').unwrap(), SymbolRange::new(97, 99, 258));

        model.advance(b'a');
        // order-0: a:3 b:2, "a" -> b:1 weighted 2
        assert_eq!(model.range(b'b').unwrap(), SymbolRange::new(100, 104, 261));
        assert_eq!(model.symbol_for_offset(99).unwrap(), b'a');
        assert_eq!(model.symbol_for_offset(103).unwrap(), b'b');
        assert_eq!(model.symbol_for_offset(104).unwrap(), b'c');
        assert_eq!(model.context_count(), 2);
    }

    #[test]
    fn start_session_forgets_everything() {
        let mut model = AdaptiveContextModel::new(3).unwrap();
        b"abcabc".iter().for_each(|&s| model.advance(s));
        model.start_session();
        assert_eq!(model.total().unwrap(), 256);
        assert_eq!(model.context_count(), 0);
    }

    #[test]
    fn totals_stay_within_capacity() {
        let mut model = AdaptiveContextModel::new(2).unwrap();
        for _ in 0..200_000 {
            model.advance(b'e');
            assert!(model.total().unwrap() <= model.max_total());
        }
        // halving never drops a symbol
        assert_eq!(model.range(0).unwrap().high - model.range(0).unwrap().low, 1);
    }

    #[test]
    fn rejects_orders_above_max() {
        assert!(matches!(AdaptiveContextModel::new(8), Err(Error::Configuration(_))));
        assert_eq!(AdaptiveContextModel::new(7).unwrap().order(), 7);
    }
}
