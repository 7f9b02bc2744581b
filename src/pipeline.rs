//! Train, code and pack, plus the inverse.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::Archive;
use crate::cast;
use crate::config::Config;
use crate::entropy_coding::{decode, encode};
use crate::error::{Error, Result};
use crate::models::ContextModel;

/// A compression job that could not produce an archive.
///
/// Hands the input back untouched so the caller can store it raw or try
/// something else.
#[derive(Error)]
#[error("compression of {} bytes failed: {source}", .input.len())]
pub struct CompressionFailure<'a> {
    pub input: &'a [u8],
    #[source]
    pub source: Error,
}

impl fmt::Debug for CompressionFailure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionFailure")
            .field("input_len", &self.input.len())
            .field("source", &self.source)
            .finish()
    }
}

/// Trains an order-`config.order` model on `data` (or its first
/// `train_limit` bytes) and codes all of `data` with it.
///
/// A modeling error, which with a training prefix means a symbol the model
/// has never seen, is retried one order lower at a time down to order 0.
pub fn compress<'a>(data: &'a [u8], config: &Config) -> Result<Archive, CompressionFailure<'a>> {
    let fail = |source: Error| CompressionFailure { input: data, source };
    config.validate().map_err(fail)?;
    let original_len = u32::try_from(data.len())
        .map_err(|_| fail(Error::config(format!("input of {} bytes exceeds 4GiB", data.len()))))?;

    let training = match config.train_limit {
        Some(limit) => &data[..limit.min(data.len())],
        None => data,
    };

    let mut order = config.order;
    loop {
        match code_with_order(data, training, order, config.precision_bits) {
            Ok(archive) => {
                let archive = Archive { original_len, ..archive };
                info!(
                    order,
                    input = data.len(),
                    model = archive.model.len(),
                    payload = archive.payload.len(),
                    "compressed"
                );
                return Ok(archive);
            }
            Err(err) if err.is_modeling() && order > 0 => {
                warn!(order, %err, "retrying one order lower");
                order -= 1;
            }
            Err(err) => return Err(fail(err)),
        }
    }
}

fn code_with_order(data: &[u8], training: &[u8], order: usize, precision: u32) -> Result<Archive> {
    let mut model = ContextModel::new(order)?;
    model.train(training);
    let payload = encode(data, &mut model, precision)?;
    Ok(Archive { original_len: 0, model: model.to_bytes(), payload })
}

/// Inverse of `compress`; `config.precision_bits` must match the one used
/// to compress, it is not stored in the archive.
pub fn decompress(bytes: &[u8], config: &Config) -> Result<Vec<u8>> {
    config.validate()?;
    let archive = Archive::from_bytes(bytes)?;
    let mut model = ContextModel::from_bytes(&archive.model)?;
    debug!(order = model.order(), contexts = model.context_count(), "model loaded");

    let count = cast!(usize, archive.original_len);
    let data = decode(&archive.payload, &mut model, count, config.precision_bits)?;
    info!(output = data.len(), "decompressed");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::{compress, decompress};
    use crate::config::Config;
    use crate::error::Error;
    use crate::models::ContextModel;

    const TEXT: &[u8] = b"'''Anarchism''' is a [[political philosophy]] and [[movement]] that \
        is sceptical of [[authority]] and rejects all involuntary, coercive forms of \
        [[hierarchy]]. Anarchism calls for the abolition of the [[state]].";

    #[test]
    fn roundtrip() {
        for order in [0, 2, 5] {
            let config = Config::default().with_order(order);
            let archive = compress(TEXT, &config).unwrap();
            assert_eq!(archive.original_len as usize, TEXT.len());
            assert!(archive.payload.len() < TEXT.len());

            let bytes = archive.to_bytes().unwrap();
            assert_eq!(decompress(&bytes, &config).unwrap(), TEXT);
        }
    }

    #[test]
    fn empty_input() {
        let config = Config::default();
        let bytes = compress(b"", &config).unwrap().to_bytes().unwrap();
        assert_eq!(decompress(&bytes, &config).unwrap(), b"");
    }

    #[test]
    fn train_limit_falls_back_to_lower_orders() {
        // no spaces or brackets in the prefix, even order 0 can't code it
        let config = Config::default().with_order(3).with_train_limit(12);
        let failure = compress(TEXT, &config).unwrap_err();
        assert_eq!(failure.input, TEXT);
        assert!(failure.source.is_modeling());

        let prefix = &TEXT[..40];
        let config = Config::default().with_order(4).with_train_limit(prefix.len());
        let data = [prefix, b"political''' is a [[".as_slice()].concat();
        // "political'" only codes once nothing but order 0 is left
        let archive = compress(&data, &config).unwrap();
        let model = ContextModel::from_bytes(&archive.model).unwrap();
        assert_eq!(model.order(), 0);
        assert_eq!(decompress(&archive.to_bytes().unwrap(), &config).unwrap(), data);
    }

    #[test]
    fn invalid_config_returns_input() {
        let config = Config::default().with_precision(4);
        let failure = compress(TEXT, &config).unwrap_err();
        assert!(matches!(failure.source, Error::Configuration(_)));
        assert_eq!(failure.input.len(), TEXT.len());
        assert!(failure.to_string().starts_with("compression of"));
    }

    #[test]
    fn corrupt_archive() {
        let config = Config::default();
        let mut bytes = compress(TEXT, &config).unwrap().to_bytes().unwrap();
        bytes[8] ^= 0xff; // model magic
        assert!(matches!(decompress(&bytes, &config), Err(Error::Format { .. })));
        assert!(decompress(&bytes[..5], &config).is_err());
    }
}
