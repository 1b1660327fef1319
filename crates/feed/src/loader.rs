//! Transaction feed loading and validation.
//!
//! The on-disk feed format is CSV, one transaction per row, already ordered
//! by block. The loader is the only component that constructs `Transaction`
//! values; every schema violation is fatal and surfaces the failing record.

use crate::models::{Side, TokenPair, Transaction};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Fatal feed schema violations.
#[derive(Debug, Error)]
pub enum MalformedFeedError {
    #[error("failed to read feed: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse feed record: {0}")]
    Parse(#[from] csv::Error),
    #[error("transaction {tx_id}: amount must be positive, got {amount}")]
    NonPositiveAmount { tx_id: String, amount: Decimal },
    #[error("transaction {tx_id}: price must be positive, got {price}")]
    NonPositivePrice { tx_id: String, price: Decimal },
    #[error("transaction {tx_id}: slippage tolerance must not be negative, got {slippage}")]
    InvalidSlippage { tx_id: String, slippage: Decimal },
    #[error(
        "transaction {tx_id}: block {block} follows block {previous}, feed must be block-ordered"
    )]
    NonMonotonicBlock {
        tx_id: String,
        block: u64,
        previous: u64,
    },
    #[error("duplicate transaction id {tx_id}")]
    DuplicateId { tx_id: String },
}

/// One CSV row of the feed fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub tx_id: String,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    pub wallet: String,
    pub base_token: String,
    pub quote_token: String,
    pub exchange: String,
    pub side: Side,
    pub amount: Decimal,
    pub price: Decimal,
    pub gas_price: u64,
    pub slippage_tolerance: Decimal,
    pub contract_origin: bool,
}

impl From<&Transaction> for FeedRecord {
    fn from(tx: &Transaction) -> Self {
        Self {
            tx_id: tx.id.clone(),
            block_number: tx.block_number,
            timestamp: tx.timestamp,
            wallet: tx.wallet.clone(),
            base_token: tx.pair.base.clone(),
            quote_token: tx.pair.quote.clone(),
            exchange: tx.exchange.clone(),
            side: tx.side,
            amount: tx.amount,
            price: tx.price,
            gas_price: tx.gas_price,
            slippage_tolerance: tx.slippage_tolerance,
            contract_origin: tx.contract_origin,
        }
    }
}

/// Load and validate a CSV feed from disk.
///
/// # Arguments
/// * `path` - Path to the feed CSV file
///
/// # Returns
/// Transactions ordered by (block number, intra-block position)
pub fn load_feed<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>, MalformedFeedError> {
    let reader = csv::Reader::from_path(path.as_ref())?;
    let transactions = load_from_reader(reader)?;
    info!(
        "Loaded {} transactions from {:?}",
        transactions.len(),
        path.as_ref()
    );
    Ok(transactions)
}

/// Load and validate a CSV feed from any reader (e.g. an in-memory fixture).
pub fn read_feed<R: io::Read>(source: R) -> Result<Vec<Transaction>, MalformedFeedError> {
    load_from_reader(csv::Reader::from_reader(source))
}

/// Validate an already-parsed record sequence and assign intra-block positions.
pub fn from_records<I>(records: I) -> Result<Vec<Transaction>, MalformedFeedError>
where
    I: IntoIterator<Item = FeedRecord>,
{
    let mut transactions = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut previous_block: Option<u64> = None;
    let mut block_index: u32 = 0;

    for record in records {
        validate_record(&record)?;

        if !seen_ids.insert(record.tx_id.clone()) {
            return Err(MalformedFeedError::DuplicateId { tx_id: record.tx_id });
        }

        match previous_block {
            Some(previous) if record.block_number < previous => {
                return Err(MalformedFeedError::NonMonotonicBlock {
                    tx_id: record.tx_id,
                    block: record.block_number,
                    previous,
                });
            }
            Some(previous) if record.block_number == previous => block_index += 1,
            _ => block_index = 0,
        }
        previous_block = Some(record.block_number);

        transactions.push(Transaction {
            id: record.tx_id,
            block_number: record.block_number,
            block_index,
            timestamp: record.timestamp,
            wallet: record.wallet,
            pair: TokenPair::new(record.base_token, record.quote_token),
            exchange: record.exchange,
            side: record.side,
            amount: record.amount,
            price: record.price,
            gas_price: record.gas_price,
            slippage_tolerance: record.slippage_tolerance,
            contract_origin: record.contract_origin,
        });
    }

    Ok(transactions)
}

/// Re-serialize transactions to CSV. Inverse of `read_feed` on valid feeds.
pub fn write_feed<W: io::Write>(
    transactions: &[Transaction],
    sink: W,
) -> Result<(), MalformedFeedError> {
    let mut writer = csv::Writer::from_writer(sink);
    for tx in transactions {
        writer.serialize(FeedRecord::from(tx))?;
    }
    writer.flush()?;
    Ok(())
}

fn load_from_reader<R: io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<Vec<Transaction>, MalformedFeedError> {
    let records: Vec<FeedRecord> = reader
        .deserialize()
        .collect::<Result<_, csv::Error>>()?;
    from_records(records)
}

fn validate_record(record: &FeedRecord) -> Result<(), MalformedFeedError> {
    if record.amount <= Decimal::ZERO {
        return Err(MalformedFeedError::NonPositiveAmount {
            tx_id: record.tx_id.clone(),
            amount: record.amount,
        });
    }
    if record.price <= Decimal::ZERO {
        return Err(MalformedFeedError::NonPositivePrice {
            tx_id: record.tx_id.clone(),
            price: record.price,
        });
    }
    if record.slippage_tolerance < Decimal::ZERO {
        return Err(MalformedFeedError::InvalidSlippage {
            tx_id: record.tx_id.clone(),
            slippage: record.slippage_tolerance,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn record(tx_id: &str, block: u64, side: Side) -> FeedRecord {
        FeedRecord {
            tx_id: tx_id.to_string(),
            block_number: block,
            timestamp: Utc.timestamp_opt(1_700_000_000 + block as i64 * 12, 0).unwrap(),
            wallet: "0xwallet1".to_string(),
            base_token: "SHIB".to_string(),
            quote_token: "USDC".to_string(),
            exchange: "uniswap".to_string(),
            side,
            amount: dec("100"),
            price: dec("0.25"),
            gas_price: 30,
            slippage_tolerance: dec("0.01"),
            contract_origin: false,
        }
    }

    #[test]
    fn assigns_intra_block_positions_in_feed_order() {
        let transactions = from_records(vec![
            record("0xa", 10, Side::Buy),
            record("0xb", 10, Side::Sell),
            record("0xc", 11, Side::Buy),
            record("0xd", 11, Side::Sell),
            record("0xe", 11, Side::Buy),
        ])
        .unwrap();

        let positions: Vec<(u64, u32)> = transactions
            .iter()
            .map(|tx| (tx.block_number, tx.block_index))
            .collect();
        assert_eq!(positions, vec![(10, 0), (10, 1), (11, 0), (11, 1), (11, 2)]);
    }

    #[test]
    fn rejects_non_monotonic_blocks() {
        let result = from_records(vec![
            record("0xa", 12, Side::Buy),
            record("0xb", 11, Side::Sell),
        ]);
        assert!(matches!(
            result,
            Err(MalformedFeedError::NonMonotonicBlock {
                block: 11,
                previous: 12,
                ..
            })
        ));
    }

    #[test]
    fn rejects_non_positive_amount() {
        let mut bad = record("0xa", 10, Side::Buy);
        bad.amount = dec("-5");
        assert!(matches!(
            from_records(vec![bad]),
            Err(MalformedFeedError::NonPositiveAmount { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_price() {
        let mut bad = record("0xa", 10, Side::Buy);
        bad.price = Decimal::ZERO;
        assert!(matches!(
            from_records(vec![bad]),
            Err(MalformedFeedError::NonPositivePrice { .. })
        ));
    }

    #[test]
    fn rejects_negative_slippage_tolerance() {
        let mut bad = record("0xa", 10, Side::Buy);
        bad.slippage_tolerance = dec("-0.01");
        assert!(matches!(
            from_records(vec![bad]),
            Err(MalformedFeedError::InvalidSlippage { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_transaction_ids() {
        let result = from_records(vec![
            record("0xa", 10, Side::Buy),
            record("0xa", 10, Side::Sell),
        ]);
        assert!(matches!(
            result,
            Err(MalformedFeedError::DuplicateId { .. })
        ));
    }

    #[test]
    fn rejects_missing_fields() {
        let csv = "tx_id,block_number,timestamp\n0xa,10,2023-11-14T00:00:00Z\n";
        assert!(matches!(
            read_feed(csv.as_bytes()),
            Err(MalformedFeedError::Parse(_))
        ));
    }

    #[test]
    fn round_trips_through_csv() {
        let original = from_records(vec![
            record("0xa", 10, Side::Buy),
            record("0xb", 10, Side::Sell),
            record("0xc", 12, Side::Buy),
        ])
        .unwrap();

        let mut buffer = Vec::new();
        write_feed(&original, &mut buffer).unwrap();
        let reloaded = read_feed(buffer.as_slice()).unwrap();

        assert_eq!(original, reloaded);
    }

    #[test]
    fn loads_sample_fixture() {
        let transactions = load_feed("../../data/sample_feed.csv").unwrap();
        assert!(!transactions.is_empty());

        // Already sorted by (block, intra-block order).
        let mut sorted = transactions.clone();
        sorted.sort_by_key(|tx| (tx.block_number, tx.block_index));
        assert_eq!(transactions, sorted);
    }
}
