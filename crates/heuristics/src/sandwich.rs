//! Sandwich attack detection.
//!
//! A sandwich is a front-run and back-run by one wallet around a victim's
//! trade in the same block and pair: attacker opens, victim trades in the
//! same direction, attacker closes against the victim's price impact.

use crate::config::HeuristicConfig;
use crate::unit_cap;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use toxflow_feed::models::{Flag, HeuristicKind, TokenPair, Transaction};
use toxflow_indexer::{BlockIndex, UnknownTokenError};

/// Scan every block for sandwich patterns.
pub fn detect(
    index: &BlockIndex,
    config: &HeuristicConfig,
) -> Result<Vec<Flag>, UnknownTokenError> {
    let mut flags = Vec::new();

    for block in index.block_numbers().collect::<Vec<_>>() {
        let mut pairs: Vec<&TokenPair> = index
            .block_transactions(block)
            .iter()
            .map(|tx| &tx.pair)
            .collect();
        pairs.sort();
        pairs.dedup();

        for pair in pairs {
            let trades = index.pair_block_transactions(pair, block)?;
            if trades.len() < 3 {
                continue;
            }

            // Exactly one differing-wallet trade between the attacker's
            // two legs, in the pair's intra-block order.
            for window in trades.windows(3) {
                let (front, victim, back) = (window[0], window[1], window[2]);
                if is_sandwich_shape(front, victim, back) {
                    flags.push(build_flag(front, victim, back, config));
                }
            }
        }
    }

    Ok(flags)
}

/// Structural check: same attacker on both legs, opposite leg directions,
/// and a victim trading in the direction the attacker front-ran.
fn is_sandwich_shape(front: &Transaction, victim: &Transaction, back: &Transaction) -> bool {
    if front.wallet != back.wallet {
        return false;
    }

    // Attacker should not be victim
    if front.wallet == victim.wallet {
        return false;
    }

    // Open then close
    if front.side == back.side {
        return false;
    }

    // Victim trades with the front leg, against the back leg
    victim.side == front.side
}

fn build_flag(
    front: &Transaction,
    victim: &Transaction,
    back: &Transaction,
    config: &HeuristicConfig,
) -> Flag {
    // Base 0.5: the shape alone is a coin flip.
    let mut confidence = Decimal::new(5, 1);

    // The attacker typically outbids the victim on both legs; credit the
    // premium of the cheaper leg, scaled against the victim's gas price.
    let attacker_gas = front.gas_price.min(back.gas_price);
    let gas_premium = attacker_gas.saturating_sub(victim.gas_price);
    if gas_premium > 0 {
        let premium_ratio = unit_cap(
            Decimal::from(gas_premium) / Decimal::from(victim.gas_price.max(1)),
        );
        confidence += premium_ratio * Decimal::new(25, 2);
    }

    // Price impact the victim absorbed relative to the attacker's entry.
    let price_impact = ((victim.price - front.price) / front.price).abs();
    if price_impact >= config.min_price_impact_threshold {
        let impact_scale = unit_cap(
            price_impact / (config.min_price_impact_threshold * Decimal::from(4)),
        );
        confidence += impact_scale * Decimal::new(25, 2);
    }

    let mut evidence = BTreeMap::new();
    evidence.insert("front_gas_price".into(), front.gas_price.to_string());
    evidence.insert("victim_gas_price".into(), victim.gas_price.to_string());
    evidence.insert("back_gas_price".into(), back.gas_price.to_string());
    evidence.insert("gas_premium".into(), gas_premium.to_string());
    evidence.insert("price_impact".into(), price_impact.to_string());
    evidence.insert(
        "victim_slippage_tolerance".into(),
        victim.slippage_tolerance.to_string(),
    );
    evidence.insert("victim_wallet".into(), victim.wallet.clone());
    evidence.insert("victim_tx".into(), victim.id.clone());

    Flag {
        kind: HeuristicKind::Sandwich,
        block_number: front.block_number,
        transactions: vec![front.id.clone(), victim.id.clone(), back.id.clone()],
        wallets: vec![front.wallet.clone()],
        confidence: unit_cap(confidence),
        evidence,
    }
}
