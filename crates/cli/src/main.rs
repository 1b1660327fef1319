//! CLI application for the toxic flow detector.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use toxflow_feed::load_feed;
use toxflow_feed::models::{Flag, HeuristicKind, Verdict};
use toxflow_heuristics::{aggregate, run_all, run_heuristic, HeuristicConfig};
use toxflow_indexer::BlockIndex;
use toxflow_telemetry::{init_logging, write_report};
use tracing::info;

#[derive(Parser)]
#[command(name = "toxflow")]
#[command(about = "Heuristic toxic-flow detection over a transaction feed")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a feed and emit per-wallet toxicity verdicts
    Analyze {
        /// Feed CSV path
        #[arg(long, default_value = "data/sample_feed.csv")]
        feed: String,

        /// Heuristic threshold overrides (JSON); built-in defaults when omitted
        #[arg(long)]
        config: Option<String>,

        /// Report output path; stdout when omitted
        #[arg(long)]
        output: Option<String>,

        /// Log level
        #[arg(long)]
        log_level: Option<String>,

        /// Emit JSON log lines
        #[arg(long, default_value = "false")]
        json_logs: bool,

        /// Run the detectors one after another instead of in parallel
        #[arg(long, default_value = "false")]
        sequential: bool,
    },
    /// Load and index a feed, logging its statistics
    Validate {
        /// Feed CSV path
        #[arg(long, default_value = "data/sample_feed.csv")]
        feed: String,

        /// Log level
        #[arg(long)]
        log_level: Option<String>,
    },
}

/// Final batch output: every verdict plus run totals. No timestamps, so
/// identical feed and config always produce identical report bytes.
#[derive(Serialize)]
struct Report {
    transaction_count: usize,
    flag_count: usize,
    verdicts: Vec<Verdict>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            feed,
            config,
            output,
            log_level,
            json_logs,
            sequential,
        } => {
            init_logging(log_level.as_deref(), json_logs)?;
            run_analysis(&feed, config.as_deref(), output.as_deref(), sequential).await?;
        }
        Commands::Validate { feed, log_level } => {
            init_logging(log_level.as_deref(), false)?;
            run_validation(&feed)?;
        }
    }

    Ok(())
}

async fn run_analysis(
    feed: &str,
    config_path: Option<&str>,
    output: Option<&str>,
    sequential: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let transactions =
        load_feed(feed).with_context(|| format!("failed to load feed {feed}"))?;
    info!("Loaded {} transactions from {}", transactions.len(), feed);

    let index = Arc::new(BlockIndex::build(transactions));

    let flags = if sequential {
        run_all(&index, &config)?
    } else {
        run_detectors_in_parallel(Arc::clone(&index), config.clone()).await?
    };
    info!("Detectors emitted {} flags", flags.len());

    let verdicts = aggregate(&flags);
    info!("Aggregated {} wallet verdicts", verdicts.len());

    let report = Report {
        transaction_count: index.len(),
        flag_count: flags.len(),
        verdicts,
    };
    write_report(output, &report)?;

    Ok(())
}

/// Run the four detectors as blocking tasks over the shared read-only
/// index. Joining in `HeuristicKind::ALL` order keeps the flag sequence
/// identical to a sequential run.
async fn run_detectors_in_parallel(
    index: Arc<BlockIndex>,
    config: HeuristicConfig,
) -> anyhow::Result<Vec<Flag>> {
    let mut handles = Vec::new();
    for kind in HeuristicKind::ALL {
        let index = Arc::clone(&index);
        let config = config.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            run_heuristic(kind, &index, &config)
        }));
    }

    let mut flags = Vec::new();
    for handle in handles {
        flags.extend(handle.await??);
    }
    Ok(flags)
}

fn run_validation(feed: &str) -> anyhow::Result<()> {
    let transactions =
        load_feed(feed).with_context(|| format!("failed to load feed {feed}"))?;
    let index = BlockIndex::build(transactions);

    info!(
        "Feed OK: {} transactions, {} blocks, {} pairs, {} wallets",
        index.len(),
        index.block_numbers().count(),
        index.pairs().len(),
        index.wallet_addresses().count()
    );

    Ok(())
}

fn load_config(path: Option<&str>) -> anyhow::Result<HeuristicConfig> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {path}"))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse config {path}"))?
        }
        None => HeuristicConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
