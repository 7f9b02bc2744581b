use std::env;

use crate::entropy_coding::{Bounds, DEFAULT_PRECISION};
use crate::error::{Error, Result};
use crate::history::MAX_ORDER;

pub const DEFAULT_ORDER: usize = 5;

/// Knobs of a compression job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Longest context the model conditions on
    pub order: usize,
    /// Coder precision `P`, decoding must use the same value
    pub precision_bits: u32,
    /// Train on at most this many leading bytes
    pub train_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self { order: DEFAULT_ORDER, precision_bits: DEFAULT_PRECISION, train_limit: None }
    }
}

impl Config {
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    pub fn with_precision(mut self, precision_bits: u32) -> Self {
        self.precision_bits = precision_bits;
        self
    }

    pub fn with_train_limit(mut self, limit: usize) -> Self {
        self.train_limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.order > MAX_ORDER {
            return Err(Error::config(format!(
                "order {} above maximum {MAX_ORDER}",
                self.order
            )));
        }
        if self.train_limit == Some(0) {
            return Err(Error::config("train limit of 0 bytes"));
        }
        Bounds::new(self.precision_bits).map(|_| ())
    }

    /// Defaults overridden by `WIKIAC_ORDER`, `WIKIAC_PRECISION` and
    /// `WIKIAC_TRAIN_LIMIT`.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(order) = var("WIKIAC_ORDER") {
            config.order = parse("WIKIAC_ORDER", &order)?;
        }
        if let Some(precision) = var("WIKIAC_PRECISION") {
            config.precision_bits = parse("WIKIAC_PRECISION", &precision)?;
        }
        if let Some(limit) = var("WIKIAC_TRAIN_LIMIT") {
            config.train_limit = Some(parse("WIKIAC_TRAIN_LIMIT", &limit)?);
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{key}={value:?} is not a valid number")))
}
