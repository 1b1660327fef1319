//! Flag aggregation and wallet scoring.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use toxflow_feed::models::{Flag, Verdict};

/// Fold detector flags into one verdict per implicated wallet.
///
/// The combined score is a probabilistic OR over flag confidences,
/// `1 - Π(1 - confidence)`: independent signals compound instead of
/// saturating on a single weak flag, and corroborating evidence still
/// pushes the score toward 1. Verdicts come back sorted by descending
/// score, then wallet. Empty input yields an empty set, not an error.
pub fn aggregate(flags: &[Flag]) -> Vec<Verdict> {
    let mut by_wallet: BTreeMap<&str, Vec<&Flag>> = BTreeMap::new();
    for flag in flags {
        for wallet in &flag.wallets {
            by_wallet.entry(wallet).or_default().push(flag);
        }
    }

    let mut verdicts: Vec<Verdict> = by_wallet
        .into_iter()
        .map(|(wallet, wallet_flags)| {
            let mut clean_odds = Decimal::ONE;
            for flag in &wallet_flags {
                clean_odds *= Decimal::ONE - flag.confidence;
            }
            Verdict {
                wallet: wallet.to_string(),
                combined_score: Decimal::ONE - clean_odds,
                flags: wallet_flags.into_iter().cloned().collect(),
            }
        })
        .collect();

    verdicts.sort_by(|a, b| {
        b.combined_score
            .cmp(&a.combined_score)
            .then_with(|| a.wallet.cmp(&b.wallet))
    });
    verdicts
}
