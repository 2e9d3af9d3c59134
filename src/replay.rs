use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use engine::ZoneEngine;
use indicatif::ProgressBar;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One line of a bar file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BarRecord {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// The outcome of replaying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    pub path: PathBuf,
    pub bars: usize,
    pub skipped: usize,
}

/// Parses bar records from either a JSON array or JSON lines.
pub fn parse_bars(contents: &str) -> Result<Vec<BarRecord>> {
    let trimmed = contents.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Failed to parse JSON array of bars");
    }
    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid bar on line {}", index + 1))
        })
        .collect()
}

pub fn load_bars(path: &Path) -> Result<Vec<BarRecord>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read bar file {}", path.display()))?;
    parse_bars(&contents).with_context(|| format!("Failed to load {}", path.display()))
}

/// Feeds `bars` through the engine in file order.
///
/// Malformed bars are logged and skipped; they never stop the replay.
pub fn replay(
    engine: &ZoneEngine,
    path: PathBuf,
    bars: Vec<BarRecord>,
    progress: &ProgressBar,
) -> ReplayReport {
    let mut report = ReplayReport {
        path,
        bars: 0,
        skipped: 0,
    };
    for bar in bars {
        let result = engine.on_bar(
            &bar.symbol,
            bar.timestamp,
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
        );
        match result {
            Ok(()) => report.bars += 1,
            Err(e) => {
                tracing::warn!(
                    symbol = %bar.symbol,
                    timestamp = %bar.timestamp,
                    error = %e,
                    "Skipping bar."
                );
                report.skipped += 1;
            }
        }
        progress.inc(1);
    }
    tracing::info!(
        file = %report.path.display(),
        bars = report.bars,
        skipped = report.skipped,
        "Replay finished."
    );
    report
}
