pub mod adaptive_context;
pub mod adaptive_order0;
pub mod context_model;
pub mod frequency_model;
pub mod frequency_table;
pub mod hot_context;
pub(crate) mod wire;

pub use self::{
    adaptive_context::*, adaptive_order0::*, context_model::*, frequency_model::*,
    frequency_table::*, hot_context::*,
};

use crate::error::Result;

/// Cumulative frequency range of one symbol: `[low, high)` inside `[0, total)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymbolRange {
    pub low: u64,
    pub high: u64,
    pub total: u64,
}

impl SymbolRange {
    pub const fn new(low: u64, high: u64, total: u64) -> Self {
        Self { low, high, total }
    }
}

/// Anything the arithmetic coder can draw symbol probabilities from.
///
/// The coder drives a session as: `start_session`, then per symbol any
/// number of `range`/`total`/`symbol_for_offset` queries followed by exactly
/// one `advance`. Queries never change state, so encoder and decoder see the
/// same context at the same symbol index as long as both follow this order.
pub trait ProbabilitySource {
    /// Resets the running state of a fresh encode or decode.
    fn start_session(&mut self);

    /// Range of `symbol` under the current context.
    fn range(&self, symbol: u8) -> Result<SymbolRange>;

    /// Total of the context `range` would resolve to right now.
    fn total(&self) -> Result<u64>;

    /// Decoder side: symbol whose range contains `offset`.
    fn symbol_for_offset(&self, offset: u64) -> Result<u8>;

    /// Moves past `symbol`, called once all queries for it are done.
    fn advance(&mut self, symbol: u8);

    /// Upper bound on any `total` this source can return in a session.
    fn max_total(&self) -> u64;
}
