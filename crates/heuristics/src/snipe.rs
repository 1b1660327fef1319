//! Snipe bot detection.
//!
//! Flags buys landing within the first blocks after a token pair's launch
//! (first-seen block). Three signals feed the score: the share of supply a
//! single buy takes, a contract rather than a wallet doing the buying, and
//! a cluster of other buys racing the same window.

use crate::config::HeuristicConfig;
use crate::unit_cap;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use toxflow_feed::models::{Flag, HeuristicKind, Side};
use toxflow_indexer::{BlockIndex, UnknownTokenError};

/// Scan the launch window of every pair for snipe buys.
pub fn detect(
    index: &BlockIndex,
    config: &HeuristicConfig,
) -> Result<Vec<Flag>, UnknownTokenError> {
    let mut flags = Vec::new();

    for pair in index.pairs() {
        let launch = index.launch_block(pair)?;
        let window_end = launch.saturating_add(config.snipe_window_blocks);
        let window = index.pair_transactions_in_range(pair, launch, window_end)?;
        let supply_proxy = index.traded_volume(pair)?;

        let window_buys = window.iter().filter(|tx| tx.side == Side::Buy).count();

        for tx in &window {
            if tx.side != Side::Buy {
                continue;
            }

            let fraction = tx.amount / supply_proxy;
            let other_buys = window_buys - 1;

            let supply_hit = fraction > config.snipe_supply_threshold;
            let cluster_hit = other_buys >= config.cluster_min_count;
            if !supply_hit && !tx.contract_origin && !cluster_hit {
                continue;
            }

            let supply_signal = unit_cap(fraction / config.snipe_supply_threshold);
            let contract_signal = if tx.contract_origin {
                Decimal::ONE
            } else {
                Decimal::ZERO
            };
            let cluster_signal = unit_cap(
                Decimal::from(other_buys as u64) / Decimal::from(config.cluster_min_count as u64),
            );

            let confidence = config.snipe_supply_weight * supply_signal
                + config.snipe_contract_weight * contract_signal
                + config.snipe_cluster_weight * cluster_signal;

            let mut evidence = BTreeMap::new();
            evidence.insert("launch_block".into(), launch.to_string());
            evidence.insert("buy_block".into(), tx.block_number.to_string());
            evidence.insert("supply_fraction".into(), fraction.to_string());
            evidence.insert("contract_origin".into(), tx.contract_origin.to_string());
            evidence.insert("window_other_buys".into(), other_buys.to_string());

            flags.push(Flag {
                kind: HeuristicKind::Snipe,
                block_number: tx.block_number,
                transactions: vec![tx.id.clone()],
                wallets: vec![tx.wallet.clone()],
                confidence,
                evidence,
            });
        }
    }

    Ok(flags)
}
