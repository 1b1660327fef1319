//! Cross-exchange arbitrage detection.
//!
//! Inside a short block window, the same pair printing materially
//! different prices on two exchanges is a dislocation someone traded
//! through. Flags every transaction in the window on the cheapest and
//! dearest exchanges.

use crate::config::HeuristicConfig;
use crate::unit_cap;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use toxflow_feed::models::{Flag, HeuristicKind, Transaction};
use toxflow_indexer::{BlockIndex, UnknownTokenError};

/// Scan pair windows for cross-exchange price spreads.
pub fn detect(
    index: &BlockIndex,
    config: &HeuristicConfig,
) -> Result<Vec<Flag>, UnknownTokenError> {
    let mut flags = Vec::new();
    // Overlapping windows can surface the same dislocation twice.
    let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();

    for pair in index.pairs() {
        let mut anchor_blocks: Vec<u64> = index
            .pair_transactions(pair)?
            .iter()
            .map(|tx| tx.block_number)
            .collect();
        anchor_blocks.dedup();

        for anchor in anchor_blocks {
            let window = index.pair_transactions_in_range(
                pair,
                anchor,
                anchor.saturating_add(config.arb_window_blocks),
            )?;

            let Some(spread) = best_cross_exchange_spread(&window) else {
                continue;
            };

            let relative = (spread.dear_price - spread.cheap_price) / spread.cheap_price;
            if relative <= config.arb_price_diff_threshold {
                continue;
            }

            let implicated: Vec<&Transaction> = window
                .iter()
                .copied()
                .filter(|tx| {
                    tx.exchange == spread.cheap_exchange || tx.exchange == spread.dear_exchange
                })
                .collect();

            let tx_ids: Vec<String> = implicated.iter().map(|tx| tx.id.clone()).collect();
            if !seen.insert(tx_ids.clone()) {
                continue;
            }

            let mut wallets: Vec<String> =
                implicated.iter().map(|tx| tx.wallet.clone()).collect();
            wallets.sort();
            wallets.dedup();

            // 0.5 at the threshold, saturating at twice the threshold.
            let confidence = unit_cap(
                relative / config.arb_price_diff_threshold * Decimal::new(5, 1),
            );

            let mut evidence = BTreeMap::new();
            evidence.insert("cheap_exchange".into(), spread.cheap_exchange.clone());
            evidence.insert("dear_exchange".into(), spread.dear_exchange.clone());
            evidence.insert("cheap_price".into(), spread.cheap_price.to_string());
            evidence.insert("dear_price".into(), spread.dear_price.to_string());
            evidence.insert("relative_spread".into(), relative.to_string());
            evidence.insert("window_start".into(), anchor.to_string());
            evidence.insert(
                "window_end".into(),
                anchor.saturating_add(config.arb_window_blocks).to_string(),
            );

            flags.push(Flag {
                kind: HeuristicKind::Arbitrage,
                block_number: implicated[0].block_number,
                transactions: tx_ids,
                wallets,
                confidence,
                evidence,
            });
        }
    }

    Ok(flags)
}

struct Spread {
    cheap_exchange: String,
    cheap_price: Decimal,
    dear_exchange: String,
    dear_price: Decimal,
}

/// Widest price gap between two *distinct* exchanges in the window.
fn best_cross_exchange_spread(window: &[&Transaction]) -> Option<Spread> {
    let mut extremes: BTreeMap<&str, (Decimal, Decimal)> = BTreeMap::new();
    for tx in window {
        let entry = extremes
            .entry(tx.exchange.as_str())
            .or_insert((tx.price, tx.price));
        entry.0 = entry.0.min(tx.price);
        entry.1 = entry.1.max(tx.price);
    }
    if extremes.len() < 2 {
        return None;
    }

    let mut best: Option<Spread> = None;
    for (cheap_exchange, &(cheap_min, _)) in &extremes {
        for (dear_exchange, &(_, dear_max)) in &extremes {
            if cheap_exchange == dear_exchange {
                continue;
            }
            let wider = match &best {
                Some(found) => dear_max - cheap_min > found.dear_price - found.cheap_price,
                None => true,
            };
            if wider {
                best = Some(Spread {
                    cheap_exchange: cheap_exchange.to_string(),
                    cheap_price: cheap_min,
                    dear_exchange: dear_exchange.to_string(),
                    dear_price: dear_max,
                });
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{dec, tx};
    use toxflow_feed::models::Side;

    fn split_market() -> BlockIndex {
        let mut cheap = tx("0xcheap", 50, 0, "0xtrader1", Side::Buy);
        cheap.exchange = "uniswap".to_string();
        cheap.price = dec("100");
        let mut dear = tx("0xdear", 50, 1, "0xtrader2", Side::Sell);
        dear.exchange = "sushiswap".to_string();
        dear.price = dec("105");
        BlockIndex::build(vec![cheap, dear])
    }

    #[test]
    fn flags_both_sides_of_a_five_percent_spread() {
        let config = HeuristicConfig {
            arb_price_diff_threshold: dec("0.03"),
            ..Default::default()
        };
        let flags = detect(&split_market(), &config).unwrap();

        assert_eq!(flags.len(), 1);
        let flag = &flags[0];
        assert_eq!(flag.transactions, vec!["0xcheap", "0xdear"]);
        assert_eq!(flag.wallets, vec!["0xtrader1", "0xtrader2"]);
        assert_eq!(flag.evidence["cheap_exchange"], "uniswap");
        assert_eq!(flag.evidence["dear_exchange"], "sushiswap");
        assert!(flag.confidence > dec("0.5"));
    }

    #[test]
    fn stays_quiet_below_the_threshold() {
        let config = HeuristicConfig {
            arb_price_diff_threshold: dec("0.10"),
            ..Default::default()
        };
        assert!(detect(&split_market(), &config).unwrap().is_empty());
    }

    #[test]
    fn single_exchange_windows_are_not_arbitrage() {
        let mut low = tx("0xa", 50, 0, "0xtrader1", Side::Buy);
        low.price = dec("100");
        let mut high = tx("0xb", 50, 1, "0xtrader2", Side::Sell);
        high.price = dec("110");
        let index = BlockIndex::build(vec![low, high]);

        assert!(detect(&index, &HeuristicConfig::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn overlapping_windows_emit_one_flag() {
        let mut cheap = tx("0xcheap", 50, 0, "0xtrader1", Side::Buy);
        cheap.price = dec("100");
        let mut dear = tx("0xdear", 51, 0, "0xtrader2", Side::Sell);
        dear.exchange = "sushiswap".to_string();
        dear.price = dec("105");
        // A third trade keeps block 51 anchored as its own window.
        let mut tail = tx("0xtail", 51, 1, "0xtrader3", Side::Buy);
        tail.exchange = "sushiswap".to_string();
        tail.price = dec("105");
        let index = BlockIndex::build(vec![cheap, dear, tail]);

        let flags = detect(&index, &HeuristicConfig::default()).unwrap();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].transactions, vec!["0xcheap", "0xdear", "0xtail"]);
    }
}
