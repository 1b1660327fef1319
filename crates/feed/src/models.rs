//! Core data model shared across the pipeline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Trade direction relative to the base token of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// A traded token pair, e.g. `SHIB/USDC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenPair {
    pub base: String,
    pub quote: String,
}

impl TokenPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// A single swap observed in the feed.
///
/// Created once by the loader and never mutated afterwards. `block_index`
/// is the position within the block in feed order; execution order inside
/// a block matters for sandwich detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub block_number: u64,
    pub block_index: u32,
    pub timestamp: DateTime<Utc>,
    pub wallet: String,
    pub pair: TokenPair,
    pub exchange: String,
    pub side: Side,
    /// Base-token amount traded.
    pub amount: Decimal,
    /// Execution price in quote units per base unit.
    pub price: Decimal,
    pub gas_price: u64,
    /// Slippage tolerance the sender signed, as a fraction.
    pub slippage_tolerance: Decimal,
    /// True when the sender is a contract rather than an externally owned wallet.
    pub contract_origin: bool,
}

/// The closed set of detection heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    Sandwich,
    Snipe,
    Arbitrage,
    WashTrade,
}

impl HeuristicKind {
    /// All heuristics, in the order the engine runs them.
    pub const ALL: [HeuristicKind; 4] = [
        HeuristicKind::Sandwich,
        HeuristicKind::Snipe,
        HeuristicKind::Arbitrage,
        HeuristicKind::WashTrade,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HeuristicKind::Sandwich => "sandwich",
            HeuristicKind::Snipe => "snipe",
            HeuristicKind::Arbitrage => "arbitrage",
            HeuristicKind::WashTrade => "wash_trade",
        }
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a single heuristic.
///
/// References transactions by id (non-owning). `wallets` lists the wallets
/// the flag implicates as adversarial; supporting facts that drove the
/// decision go into `evidence` as key/value strings. Flags sort by
/// `(block_number, first transaction id)` for reproducible output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub kind: HeuristicKind,
    pub block_number: u64,
    pub transactions: Vec<String>,
    pub wallets: Vec<String>,
    /// Confidence in [0, 1].
    pub confidence: Decimal,
    pub evidence: BTreeMap<String, String>,
}

impl Flag {
    /// Stable sort key for deterministic detector output.
    pub fn sort_key(&self) -> (u64, &str) {
        let first_tx = self
            .transactions
            .first()
            .map(String::as_str)
            .unwrap_or_default();
        (self.block_number, first_tx)
    }
}

/// Aggregated per-wallet result: the contributing flags plus a combined
/// toxicity score in [0, 1]. Read-only after the aggregator builds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub wallet: String,
    pub combined_score: Decimal,
    pub flags: Vec<Flag>,
}
