//! Wash trade detection.
//!
//! A wallet buying and selling the same pair within a few blocks at
//! essentially the same price has manufactured volume without taking
//! price risk. Trades are matched greedily left to right, so each
//! transaction belongs to at most one wash pair.

use crate::config::HeuristicConfig;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use toxflow_feed::models::{Flag, HeuristicKind, TokenPair, Transaction};
use toxflow_indexer::{BlockIndex, UnknownTokenError};

/// Scan every wallet's history for low-risk round trips.
pub fn detect(
    index: &BlockIndex,
    config: &HeuristicConfig,
) -> Result<Vec<Flag>, UnknownTokenError> {
    let mut flags = Vec::new();

    for wallet in index.wallet_addresses() {
        let mut by_pair: BTreeMap<&TokenPair, Vec<&Transaction>> = BTreeMap::new();
        for tx in index.wallet_transactions(wallet) {
            by_pair.entry(&tx.pair).or_default().push(tx);
        }

        for trades in by_pair.values() {
            let mut position = 0;
            while position + 1 < trades.len() {
                let open = trades[position];
                let close = trades[position + 1];
                if let Some(flag) = match_wash_pair(wallet, open, close, config) {
                    flags.push(flag);
                    position += 2;
                } else {
                    position += 1;
                }
            }
        }
    }

    Ok(flags)
}

fn match_wash_pair(
    wallet: &str,
    open: &Transaction,
    close: &Transaction,
    config: &HeuristicConfig,
) -> Option<Flag> {
    if open.side == close.side {
        return None;
    }

    let gap = close.block_number - open.block_number;
    if gap > config.wash_max_block_gap {
        return None;
    }

    let price_delta = (close.price - open.price).abs();
    if price_delta >= config.wash_price_delta_threshold {
        return None;
    }

    // Tighter round trips score higher on both axes.
    let delta_score = Decimal::ONE - price_delta / config.wash_price_delta_threshold;
    let gap_score = if config.wash_max_block_gap == 0 {
        Decimal::ONE
    } else {
        Decimal::ONE - Decimal::from(gap) / Decimal::from(config.wash_max_block_gap)
    };
    let confidence = Decimal::new(3, 1)
        + Decimal::new(35, 2) * delta_score
        + Decimal::new(35, 2) * gap_score;

    let mut evidence = BTreeMap::new();
    evidence.insert("open_tx".into(), open.id.clone());
    evidence.insert("close_tx".into(), close.id.clone());
    evidence.insert("price_delta".into(), price_delta.to_string());
    evidence.insert("block_gap".into(), gap.to_string());

    Some(Flag {
        kind: HeuristicKind::WashTrade,
        block_number: open.block_number,
        transactions: vec![open.id.clone(), close.id.clone()],
        wallets: vec![wallet.to_string()],
        confidence,
        evidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{dec, tx};
    use toxflow_feed::models::Side;

    fn round_trip(gap: u64, close_price: &str) -> BlockIndex {
        let open = tx("0xopen", 100, 0, "0xwasher", Side::Buy);
        let mut close = tx("0xclose", 100 + gap, 0, "0xwasher", Side::Sell);
        close.price = dec(close_price);
        BlockIndex::build(vec![open, close])
    }

    #[test]
    fn flags_a_tight_round_trip() {
        let flags = detect(&round_trip(2, "100.2"), &HeuristicConfig::default()).unwrap();

        assert_eq!(flags.len(), 1);
        let flag = &flags[0];
        assert_eq!(flag.kind, HeuristicKind::WashTrade);
        assert_eq!(flag.transactions, vec!["0xopen", "0xclose"]);
        assert_eq!(flag.evidence["block_gap"], "2");
    }

    #[test]
    fn confidence_grows_as_delta_and_gap_shrink() {
        let config = HeuristicConfig::default();
        let loose = detect(&round_trip(8, "100.9"), &config).unwrap();
        let tight = detect(&round_trip(1, "100.1"), &config).unwrap();
        assert!(tight[0].confidence > loose[0].confidence);
    }

    #[test]
    fn same_sided_trades_are_not_a_round_trip() {
        let first = tx("0xa", 100, 0, "0xwasher", Side::Buy);
        let second = tx("0xb", 101, 0, "0xwasher", Side::Buy);
        let index = BlockIndex::build(vec![first, second]);
        assert!(detect(&index, &HeuristicConfig::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn respects_the_block_gap_limit() {
        let flags = detect(&round_trip(11, "100"), &HeuristicConfig::default()).unwrap();
        assert!(flags.is_empty());
    }

    #[test]
    fn a_real_price_move_is_not_wash_volume() {
        let flags = detect(&round_trip(1, "104"), &HeuristicConfig::default()).unwrap();
        assert!(flags.is_empty());
    }

    #[test]
    fn each_trade_joins_at_most_one_pair() {
        let open = tx("0xa", 100, 0, "0xwasher", Side::Buy);
        let close = tx("0xb", 101, 0, "0xwasher", Side::Sell);
        let reopen = tx("0xc", 102, 0, "0xwasher", Side::Buy);
        let index = BlockIndex::build(vec![open, close, reopen]);

        let flags = detect(&index, &HeuristicConfig::default()).unwrap();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].transactions, vec!["0xa", "0xb"]);
    }
}
