//! Report emission.

use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Write a report as pretty-printed JSON.
///
/// Goes to the given path when one is set, otherwise to stdout. Carries
/// no wall-clock fields of its own, so identical payloads serialize to
/// identical bytes.
///
/// # Arguments
/// * `path` - Optional output file; stdout when `None`
/// * `report` - Serializable report payload
pub fn write_report<P: AsRef<Path>, T: Serialize>(
    path: Option<P>,
    report: &T,
) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match path {
        Some(report_path) => {
            let mut file = File::create(&report_path)?;
            writeln!(file, "{}", json)?;
            info!("Wrote report to {:?}", report_path.as_ref());
        }
        None => {
            let stdout = std::io::stdout();
            writeln!(stdout.lock(), "{}", json)?;
        }
    }
    Ok(())
}
