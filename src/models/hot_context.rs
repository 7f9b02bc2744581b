use std::collections::HashMap;

use tracing::debug;

use super::{wire::WireReader, ContextModel, FrequencyTable, ProbabilitySource, SymbolRange};
use crate::cast;
use crate::error::{Error, ModelingError, Result};
use crate::history::{pack, unpack, RunningContext, MAX_ORDER};

const MAGIC: &[u8; 4] = b"WHC1";

/// Two-order model that keeps high-order tables for hot contexts only.
///
/// Training counts every context of exactly `high_order` bytes. The most used
/// ones, which together cover `hot_percent` of those positions, keep their
/// table. Everything else is coded by an order-`low_order` [`ContextModel`].
/// Most long contexts occur a handful of times, so a small share of them
/// covers most of the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HotContextModel {
    high_order: usize,
    hot_percent: u8,
    hot: HashMap<u64, FrequencyTable>,
    low: ContextModel,
    history: RunningContext,
}

impl HotContextModel {
    pub fn new(high_order: usize, low_order: usize, hot_percent: u8) -> Result<Self> {
        if high_order > MAX_ORDER || low_order >= high_order {
            return Err(Error::config(format!(
                "orders {low_order} < {high_order} <= {MAX_ORDER} expected"
            )));
        }
        if !(1..=100).contains(&hot_percent) {
            return Err(Error::config(format!("hot percentile {hot_percent} outside 1..=100")));
        }
        Ok(Self {
            high_order,
            hot_percent,
            hot: HashMap::new(),
            low: ContextModel::new(low_order)?,
            history: RunningContext::new(high_order),
        })
    }

    /// Trains the low-order model on `data` and keeps the hot
    /// `high_order` contexts. Replaces whatever was trained before.
    pub fn train(&mut self, data: &[u8]) {
        self.low.train(data);
        self.history.clear();

        let mut counts: HashMap<u64, FrequencyTable> = HashMap::new();
        let mut window = RunningContext::new(self.high_order);
        for &symbol in data {
            if window.len() == window.capacity() {
                counts.entry(window.suffix(self.high_order)).or_default().increment(symbol);
            }
            window.push(symbol);
        }

        let seen = counts.len();
        let threshold = hot_threshold(counts.values().map(FrequencyTable::total), self.hot_percent);
        counts.retain(|_, table| table.total() >= threshold);
        self.hot = counts;
        debug!(
            high_order = self.high_order,
            low_order = self.low.order(),
            contexts = seen,
            hot = self.hot.len(),
            threshold,
            "trained hot context model"
        );
    }

    pub fn high_order(&self) -> usize {
        self.high_order
    }

    pub fn low_order(&self) -> usize {
        self.low.order()
    }

    pub fn hot_count(&self) -> usize {
        self.hot.len()
    }

    /// Whether the running context is a hot one.
    pub fn is_hot(&self) -> bool {
        self.hot_table().is_some()
    }

    fn hot_table(&self) -> Option<&FrequencyTable> {
        if self.history.len() < self.high_order {
            return None;
        }
        self.hot.get(&self.history.suffix(self.high_order))
    }

    /// Layout:
    /// ```text
    /// "WHC1" high_order:u8 hot_percent:u8 count:u32 LE
    /// count × (key: high_order bytes, table)
    /// low-order model blob
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut keys: Vec<u64> = self.hot.keys().copied().collect();
        keys.sort_unstable();

        let mut out = Vec::with_capacity(10 + keys.len() * 8);
        out.extend_from_slice(MAGIC);
        out.push(cast!(u8, self.high_order));
        out.push(self.hot_percent);
        out.extend_from_slice(&cast!(u32, keys.len()).to_le_bytes());
        for key in keys {
            out.extend_from_slice(&unpack(key, self.high_order));
            self.hot[&key].write_to(&mut out);
        }
        out.extend_from_slice(&self.low.to_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(bytes, "hot context model");
        reader.expect_magic(MAGIC)?;
        let high_order = usize::from(reader.u8()?);
        let hot_percent = reader.u8()?;
        if high_order == 0 || high_order > MAX_ORDER {
            return Err(reader.error(format!("high order {high_order} outside 1..={MAX_ORDER}")));
        }

        let count = reader.u32()?;
        let mut hot = HashMap::new();
        for _ in 0..count {
            let key = pack(reader.bytes(high_order)?);
            let table = FrequencyTable::read_from(&mut reader)?;
            if table.is_empty() {
                return Err(reader.error("empty hot context".into()));
            }
            if hot.insert(key, table).is_some() {
                return Err(reader.error("duplicate hot context".into()));
            }
        }
        let low = ContextModel::from_bytes(reader.rest())?;

        let mut model = Self::new(high_order, low.order(), hot_percent)
            .map_err(|err| reader.error(err.to_string()))?;
        model.hot = hot;
        model.low = low;
        Ok(model)
    }
}

/// Smallest usage among the most used contexts that together cover
/// `percent` of all uses. `u64::MAX` when there is nothing to cover.
fn hot_threshold(usages: impl Iterator<Item = u64>, percent: u8) -> u64 {
    let mut usages: Vec<u64> = usages.collect();
    usages.sort_unstable_by(|a, b| b.cmp(a));
    let total: u64 = usages.iter().sum();

    let mut covered = 0;
    for usage in usages {
        covered += usage;
        if covered * 100 >= total * u64::from(percent) {
            return usage;
        }
    }
    u64::MAX
}

impl ProbabilitySource for HotContextModel {
    fn start_session(&mut self) {
        self.history.clear();
        self.low.start_session();
    }

    fn range(&self, symbol: u8) -> Result<SymbolRange> {
        match self.hot_table() {
            Some(table) => table.range(symbol).ok_or_else(|| {
                ModelingError::UnseenSymbol { symbol, context_len: self.high_order }.into()
            }),
            None => self.low.range(symbol),
        }
    }

    fn total(&self) -> Result<u64> {
        match self.hot_table() {
            Some(table) => Ok(table.total()),
            None => self.low.total(),
        }
    }

    fn symbol_for_offset(&self, offset: u64) -> Result<u8> {
        match self.hot_table() {
            Some(table) => table.symbol_for_offset(offset).ok_or_else(|| {
                ModelingError::OffsetOutOfRange { offset, total: table.total() }.into()
            }),
            None => self.low.symbol_for_offset(offset),
        }
    }

    fn advance(&mut self, symbol: u8) {
        self.history.push(symbol);
        self.low.advance(symbol);
    }

    fn max_total(&self) -> u64 {
        let hot = self.hot.values().map(FrequencyTable::total).max().unwrap_or(0);
        hot.max(self.low.max_total())
    }
}
