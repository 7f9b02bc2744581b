use rayon::prelude::*;
use tracing::{debug, info};

use crate::archive::HEADER_LEN;
use crate::entropy_coding::encoded_size;
use crate::error::{Error, Result};
use crate::models::ContextModel;

/// Archive size a given order would produce for some input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderEstimate {
    pub order: usize,
    pub model_bytes: u64,
    pub payload_bytes: u64,
}

impl OrderEstimate {
    pub fn archive_bytes(&self) -> u64 {
        HEADER_LEN as u64 + self.model_bytes + self.payload_bytes
    }
}

/// Trains and codes `data` once per order, each order on its own thread.
/// Nothing is written, payload sizes come from counting bits.
pub fn estimate_orders(
    data: &[u8],
    orders: &[usize],
    precision_bits: u32,
) -> Result<Vec<OrderEstimate>> {
    orders
        .par_iter()
        .map(|&order| -> Result<OrderEstimate> {
            let mut model = ContextModel::new(order)?;
            model.train(data);
            let estimate = OrderEstimate {
                order,
                model_bytes: model.to_bytes().len() as u64,
                payload_bytes: encoded_size(data, &mut model, precision_bits)?,
            };
            debug!(?estimate, "order estimated");
            Ok(estimate)
        })
        .collect()
}

/// Order with the smallest archive, the lowest one on ties.
pub fn select_order(data: &[u8], orders: &[usize], precision_bits: u32) -> Result<OrderEstimate> {
    let best = estimate_orders(data, orders, precision_bits)?
        .into_iter()
        .min_by_key(|e| (e.archive_bytes(), e.order))
        .ok_or_else(|| Error::config("no orders to choose from"))?;
    info!(order = best.order, archive = best.archive_bytes(), "selected order");
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::{estimate_orders, select_order};
    use crate::config::Config;
    use crate::pipeline::compress;

    const TEXT: &[u8] = include_bytes!("search.rs");

    #[test]
    fn estimates_match_real_archives() {
        let estimates = estimate_orders(TEXT, &[0, 1, 3], 32).unwrap();
        assert_eq!(estimates.iter().map(|e| e.order).collect::<Vec<_>>(), [0, 1, 3]);
        for estimate in estimates {
            let config = Config::default().with_order(estimate.order);
            let archive = compress(TEXT, &config).unwrap();
            assert_eq!(estimate.archive_bytes(), archive.encoded_len() as u64);
        }
    }

    #[test]
    fn picks_smallest_archive() {
        let orders = [0, 1, 2, 3, 4];
        let estimates = estimate_orders(TEXT, &orders, 32).unwrap();
        let best = select_order(TEXT, &orders, 32).unwrap();
        assert!(estimates.iter().all(|e| e.archive_bytes() >= best.archive_bytes()));
    }

    #[test]
    fn repeated_byte_needs_no_context() {
        // same single-byte payload at every order, higher orders only add
        // contexts to the model
        let best = select_order(&[b'x'; 64], &[3, 0, 2], 32).unwrap();
        assert_eq!(best.order, 0);
    }

    #[test]
    fn errors() {
        assert!(select_order(TEXT, &[], 32).is_err());
        assert!(select_order(TEXT, &[1, 9], 32).is_err());
        assert!(select_order(TEXT, &[1], 7).is_err());
    }
}
