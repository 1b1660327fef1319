//! Transaction feed layer for the toxic flow detector.
//!
//! Owns the core data model (transactions, flags, verdicts) and the
//! fixture loader that turns CSV feeds into validated, ordered records.

pub mod loader;
pub mod models;

pub use loader::{from_records, load_feed, read_feed, write_feed, FeedRecord, MalformedFeedError};
pub use models::{Flag, HeuristicKind, Side, TokenPair, Transaction, Verdict};
