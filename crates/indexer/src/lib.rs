//! Block window indexing over a loaded transaction feed.
//!
//! `BlockIndex` consumes the full feed once, then answers block, pair,
//! wallet and sliding-window lookups without rescanning the feed. The
//! index is read-only after `build`, so detector tasks can share it
//! freely without locking.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use toxflow_feed::models::{TokenPair, Transaction};
use tracing::info;

/// Query against a token pair never observed in the feed.
///
/// Heuristics only query pairs they discovered from the index itself, so
/// hitting this mid-run is an internal invariant violation and aborts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("token pair {pair} was never observed in the feed")]
pub struct UnknownTokenError {
    pub pair: TokenPair,
}

/// Read-only index of a transaction feed, built in one pass.
pub struct BlockIndex {
    transactions: Vec<Transaction>,
    blocks: BTreeMap<u64, Vec<usize>>,
    pair_blocks: HashMap<TokenPair, BTreeMap<u64, Vec<usize>>>,
    wallets: BTreeMap<String, Vec<usize>>,
    launch_blocks: HashMap<TokenPair, u64>,
    traded_volumes: HashMap<TokenPair, Decimal>,
}

impl BlockIndex {
    /// Build the index from loader output.
    ///
    /// The feed must already be ordered by (block, intra-block position);
    /// the loader guarantees that. O(n) over the feed.
    pub fn build(transactions: Vec<Transaction>) -> Self {
        let mut blocks: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        let mut pair_blocks: HashMap<TokenPair, BTreeMap<u64, Vec<usize>>> = HashMap::new();
        let mut wallets: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut launch_blocks: HashMap<TokenPair, u64> = HashMap::new();
        let mut traded_volumes: HashMap<TokenPair, Decimal> = HashMap::new();

        for (position, tx) in transactions.iter().enumerate() {
            blocks.entry(tx.block_number).or_default().push(position);
            pair_blocks
                .entry(tx.pair.clone())
                .or_default()
                .entry(tx.block_number)
                .or_default()
                .push(position);
            wallets
                .entry(tx.wallet.clone())
                .or_default()
                .push(position);
            launch_blocks
                .entry(tx.pair.clone())
                .or_insert(tx.block_number);
            *traded_volumes.entry(tx.pair.clone()).or_default() += tx.amount;
        }

        info!(
            "Indexed {} transactions across {} blocks, {} pairs, {} wallets",
            transactions.len(),
            blocks.len(),
            pair_blocks.len(),
            wallets.len()
        );

        Self {
            transactions,
            blocks,
            pair_blocks,
            wallets,
            launch_blocks,
            traded_volumes,
        }
    }

    /// The full feed in loader order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Block numbers that contain at least one transaction, ascending.
    pub fn block_numbers(&self) -> impl Iterator<Item = u64> + '_ {
        self.blocks.keys().copied()
    }

    /// Transactions of one block in intra-block order.
    pub fn block_transactions(&self, block: u64) -> Vec<&Transaction> {
        self.resolve(self.blocks.get(&block).map(Vec::as_slice))
    }

    /// All observed token pairs, sorted for deterministic iteration.
    pub fn pairs(&self) -> Vec<&TokenPair> {
        let mut pairs: Vec<&TokenPair> = self.pair_blocks.keys().collect();
        pairs.sort();
        pairs
    }

    /// Wallet addresses, ascending.
    pub fn wallet_addresses(&self) -> impl Iterator<Item = &str> {
        self.wallets.keys().map(String::as_str)
    }

    /// A wallet's transactions in feed order. Empty for unseen wallets.
    pub fn wallet_transactions(&self, wallet: &str) -> Vec<&Transaction> {
        self.resolve(self.wallets.get(wallet).map(Vec::as_slice))
    }

    /// A pair's transactions in feed order.
    pub fn pair_transactions(&self, pair: &TokenPair) -> Result<Vec<&Transaction>, UnknownTokenError> {
        let by_block = self.pair_entry(pair)?;
        Ok(by_block
            .values()
            .flatten()
            .map(|&position| &self.transactions[position])
            .collect())
    }

    /// A pair's transactions within one block, in intra-block order.
    pub fn pair_block_transactions(
        &self,
        pair: &TokenPair,
        block: u64,
    ) -> Result<Vec<&Transaction>, UnknownTokenError> {
        let by_block = self.pair_entry(pair)?;
        Ok(self.resolve(by_block.get(&block).map(Vec::as_slice)))
    }

    /// A pair's transactions with block in `[start, end]`, in feed order.
    pub fn pair_transactions_in_range(
        &self,
        pair: &TokenPair,
        start: u64,
        end: u64,
    ) -> Result<Vec<&Transaction>, UnknownTokenError> {
        let by_block = self.pair_entry(pair)?;
        Ok(by_block
            .range(start..=end)
            .flat_map(|(_, positions)| positions)
            .map(|&position| &self.transactions[position])
            .collect())
    }

    /// First block the pair was observed in; the token "launch" proxy.
    pub fn launch_block(&self, pair: &TokenPair) -> Result<u64, UnknownTokenError> {
        self.launch_blocks
            .get(pair)
            .copied()
            .ok_or_else(|| UnknownTokenError { pair: pair.clone() })
    }

    /// Total base amount traded for the pair over the whole feed.
    ///
    /// Serves as the deterministic initial-supply proxy for snipe scoring.
    pub fn traded_volume(&self, pair: &TokenPair) -> Result<Decimal, UnknownTokenError> {
        self.traded_volumes
            .get(pair)
            .copied()
            .ok_or_else(|| UnknownTokenError { pair: pair.clone() })
    }

    /// Sliding-window query: every transaction whose block lies within
    /// `[center - width, center + width]`, in feed order.
    ///
    /// Cost is proportional to the window, not the feed, via the block map
    /// range scan.
    pub fn transactions_in_range(&self, center: u64, width: u64) -> Vec<&Transaction> {
        let start = center.saturating_sub(width);
        let end = center.saturating_add(width);
        self.blocks
            .range(start..=end)
            .flat_map(|(_, positions)| positions)
            .map(|&position| &self.transactions[position])
            .collect()
    }

    fn pair_entry(
        &self,
        pair: &TokenPair,
    ) -> Result<&BTreeMap<u64, Vec<usize>>, UnknownTokenError> {
        self.pair_blocks
            .get(pair)
            .ok_or_else(|| UnknownTokenError { pair: pair.clone() })
    }

    fn resolve(&self, positions: Option<&[usize]>) -> Vec<&Transaction> {
        positions
            .map(|positions| {
                positions
                    .iter()
                    .map(|&position| &self.transactions[position])
                    .collect()
            })
            .unwrap_or_default()
    }
}
