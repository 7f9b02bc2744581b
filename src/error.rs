use std::io;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can abort a training, coding or (de)serialization call.
///
/// None of these are retried inside the core, a failed encode or decode
/// leaves nothing usable behind.
#[derive(Error, Debug)]
pub enum Error {
    #[error("modeling error: {0}")]
    Modeling(#[from] ModelingError),
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("malformed {what}: {reason}")]
    Format { what: &'static str, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The probability source could not answer a query at any back-off level.
///
/// Encoder and decoder would diverge if we guessed a distribution instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelingError {
    #[error("model has no statistics at any context length")]
    EmptyModel,
    #[error("symbol {symbol:#04x} never follows the order-{context_len} context it resolved to")]
    UnseenSymbol { symbol: u8, context_len: usize },
    #[error("offset {offset} is outside of the cumulative total {total}")]
    OffsetOutOfRange { offset: u64, total: u64 },
    #[error("range [{low}, {high}) is not a non-empty part of [0, {total})")]
    InvalidRange { low: u64, high: u64, total: u64 },
}

impl Error {
    pub fn is_modeling(&self) -> bool {
        matches!(self, Self::Modeling(_))
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    pub(crate) fn format(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Format { what, reason: reason.into() }
    }
}
