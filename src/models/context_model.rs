use std::collections::HashMap;

use tracing::debug;

use super::{wire::WireReader, FrequencyTable, ProbabilitySource, SymbolRange};
use crate::cast;
use crate::error::{Error, ModelingError, Result};
use crate::history::{pack, unpack, RunningContext, MAX_ORDER};

const MAGIC: &[u8; 4] = b"WCM1";

/// Static order-N model with shortest-context back-off.
///
/// Trained once, then queried against a running context of the last `order`
/// coded symbols. A query resolves the longest suffix of the running context
/// that was seen in training, down to the order-0 table.
///
/// Training is O(len × order) in time, and the number of distinct contexts
/// grows close to linearly with the input at high orders: order 6+ on inputs
/// of 100MB and more does not fit in memory without pruning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextModel {
    order: usize,
    /// `contexts[len - 1]` holds the tables of all contexts of length `len`
    contexts: Vec<HashMap<u64, FrequencyTable>>,
    /// order-0, the end of every back-off chain
    fallback: FrequencyTable,
    history: RunningContext,
}

impl ContextModel {
    pub fn new(order: usize) -> Result<Self> {
        if order > MAX_ORDER {
            return Err(Error::config(format!("order {order} above maximum {MAX_ORDER}")));
        }
        Ok(Self {
            order,
            contexts: (0..order).map(|_| HashMap::new()).collect(),
            fallback: FrequencyTable::new(),
            history: RunningContext::new(order),
        })
    }

    /// Counts every symbol of `data` under each of its preceding contexts of
    /// length `0..=order`. Replaces whatever was trained before.
    pub fn train(&mut self, data: &[u8]) {
        self.contexts.iter_mut().for_each(HashMap::clear);
        self.fallback = FrequencyTable::new();
        self.history.clear();

        let mut window = RunningContext::new(self.order);
        for &symbol in data {
            self.fallback.increment(symbol);
            for len in 1..=window.len() {
                self.contexts[len - 1]
                    .entry(window.suffix(len))
                    .or_default()
                    .increment(symbol);
            }
            window.push(symbol);
        }

        let contexts = self.context_count();
        let symbols: usize =
            self.contexts.iter().flat_map(HashMap::values).map(FrequencyTable::len).sum();
        debug!(
            order = self.order,
            bytes = data.len(),
            contexts,
            avg_symbols = symbols as f64 / contexts.max(1) as f64,
            "trained context model"
        );
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn is_trained(&self) -> bool {
        !self.fallback.is_empty()
    }

    /// Contexts of length 1 and above (order-0 is always one table).
    pub fn context_count(&self) -> usize {
        self.contexts.iter().map(HashMap::len).sum()
    }

    /// Table recorded for an exact context, `b""` being the order-0 table.
    pub fn table(&self, context: &[u8]) -> Option<&FrequencyTable> {
        match context.len() {
            0 => Some(&self.fallback).filter(|t| !t.is_empty()),
            len if len <= self.order => self.contexts[len - 1].get(&pack(context)),
            _ => None,
        }
    }

    /// Context length the running context currently resolves to.
    pub fn resolved_len(&self) -> Result<usize> {
        self.resolve().map(|(len, _)| len)
    }

    fn resolve(&self) -> Result<(usize, &FrequencyTable)> {
        for len in (1..=self.history.len()).rev() {
            if let Some(table) = self.contexts[len - 1].get(&self.history.suffix(len)) {
                return Ok((len, table));
            }
        }
        if self.fallback.is_empty() {
            return Err(ModelingError::EmptyModel.into());
        }
        Ok((0, &self.fallback))
    }

    /// Layout:
    /// ```text
    /// "WCM1" order:u8
    /// for len in 1..=order: count:u32 LE, then count × (key: len bytes, table)
    /// order-0 table
    /// ```
    /// Contexts are sorted by key, so equal models serialize to equal bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.context_count() * 8);
        out.extend_from_slice(MAGIC);
        out.push(cast!(u8, self.order));

        for (idx, tables) in self.contexts.iter().enumerate() {
            let len = idx + 1;
            let mut keys: Vec<u64> = tables.keys().copied().collect();
            keys.sort_unstable();

            out.extend_from_slice(&cast!(u32, keys.len()).to_le_bytes());
            for key in keys {
                out.extend_from_slice(&unpack(key, len));
                tables[&key].write_to(&mut out);
            }
        }
        self.fallback.write_to(&mut out);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(bytes, "context model");
        reader.expect_magic(MAGIC)?;
        let order = usize::from(reader.u8()?);
        if order > MAX_ORDER {
            return Err(reader.error(format!("order {order} above maximum {MAX_ORDER}")));
        }

        let mut model = Self::new(order)?;
        for len in 1..=order {
            let count = reader.u32()?;
            let tables = &mut model.contexts[len - 1];
            for _ in 0..count {
                let key = pack(reader.bytes(len)?);
                let table = FrequencyTable::read_from(&mut reader)?;
                if table.is_empty() {
                    return Err(reader.error(format!("empty order-{len} context")));
                }
                if tables.insert(key, table).is_some() {
                    return Err(reader.error(format!("duplicate order-{len} context")));
                }
            }
        }
        model.fallback = FrequencyTable::read_from(&mut reader)?;
        if model.fallback.is_empty() && model.context_count() > 0 {
            return Err(reader.error("contexts without an order-0 table".into()));
        }
        reader.finish()?;
        Ok(model)
    }
}

impl ProbabilitySource for ContextModel {
    fn start_session(&mut self) {
        self.history.clear();
    }

    fn range(&self, symbol: u8) -> Result<SymbolRange> {
        let (context_len, table) = self.resolve()?;
        table
            .range(symbol)
            .ok_or_else(|| ModelingError::UnseenSymbol { symbol, context_len }.into())
    }

    fn total(&self) -> Result<u64> {
        self.resolve().map(|(_, table)| table.total())
    }

    fn symbol_for_offset(&self, offset: u64) -> Result<u8> {
        let (_, table) = self.resolve()?;
        table
            .symbol_for_offset(offset)
            .ok_or_else(|| ModelingError::OffsetOutOfRange { offset, total: table.total() }.into())
    }

    fn advance(&mut self, symbol: u8) {
        self.history.push(symbol);
    }

    fn max_total(&self) -> u64 {
        // every context counts a subset of the positions order-0 counts
        self.fallback.total()
    }
}
