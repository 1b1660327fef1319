//! Heuristic detection engine for toxic trading flow.
//!
//! Four detectors — sandwich, snipe, arbitrage, wash trade — each a pure
//! function of the block index and the config, dispatched through the
//! closed [`HeuristicKind`] set. The aggregator folds their flags into
//! per-wallet verdicts.

pub mod aggregator;
pub mod arbitrage;
pub mod config;
pub mod sandwich;
pub mod snipe;
pub mod wash;

pub use aggregator::aggregate;
pub use config::{ConfigValidationError, HeuristicConfig};

use rust_decimal::Decimal;
use toxflow_feed::models::{Flag, HeuristicKind};
use toxflow_indexer::{BlockIndex, UnknownTokenError};
use tracing::debug;

/// Run one heuristic over the indexed feed.
///
/// Output is sorted by (block number, first transaction id) so identical
/// input and config always yield identical flag sequences.
pub fn run_heuristic(
    kind: HeuristicKind,
    index: &BlockIndex,
    config: &HeuristicConfig,
) -> Result<Vec<Flag>, UnknownTokenError> {
    let mut flags = match kind {
        HeuristicKind::Sandwich => sandwich::detect(index, config)?,
        HeuristicKind::Snipe => snipe::detect(index, config)?,
        HeuristicKind::Arbitrage => arbitrage::detect(index, config)?,
        HeuristicKind::WashTrade => wash::detect(index, config)?,
    };
    flags.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    debug!("{} detector emitted {} flags", kind, flags.len());
    Ok(flags)
}

/// Run every heuristic in [`HeuristicKind::ALL`] order.
pub fn run_all(
    index: &BlockIndex,
    config: &HeuristicConfig,
) -> Result<Vec<Flag>, UnknownTokenError> {
    let mut flags = Vec::new();
    for kind in HeuristicKind::ALL {
        flags.extend(run_heuristic(kind, index, config)?);
    }
    Ok(flags)
}

/// Clamp a non-negative score contribution to at most 1.
pub(crate) fn unit_cap(value: Decimal) -> Decimal {
    if value > Decimal::ONE {
        Decimal::ONE
    } else {
        value
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use toxflow_feed::models::{Side, TokenPair, Transaction};

    /// Baseline SHIB/USDC trade on uniswap; tests mutate fields as needed.
    pub fn tx(id: &str, block: u64, index: u32, wallet: &str, side: Side) -> Transaction {
        Transaction {
            id: id.to_string(),
            block_number: block,
            block_index: index,
            timestamp: Utc.timestamp_opt(1_700_000_000 + block as i64 * 12, 0).unwrap(),
            wallet: wallet.to_string(),
            pair: TokenPair::new("SHIB", "USDC"),
            exchange: "uniswap".to_string(),
            side,
            amount: Decimal::from(100),
            price: Decimal::from(100),
            gas_price: 30,
            slippage_tolerance: Decimal::new(1, 2),
            contract_origin: false,
        }
    }

    pub fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }
}
