mod logging;
mod replay;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use configuration::{Config, LogFormat};
use core_types::ZoneSnapshot;
use engine::ZoneEngine;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use publisher::{FeaturePublisher, LogSink};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// The main entry point for the zonefeed application.
#[tokio::main]
async fn main() -> Result<()> {
    // ZONEFEED__* overrides may live in a .env file; it is optional.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = configuration::load_config_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    let _log_guard = logging::init(&config.logging)?;

    match cli.command {
        Commands::Replay(args) => handle_replay(args, config).await,
        Commands::CheckConfig => handle_check_config(&config),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Demand/supply zone detection and breakout scoring over bar data.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides the configured console log format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay bar files through the zone engine and print the resulting snapshots.
    Replay(ReplayArgs),
    /// Load and validate the configuration, then print the effective values.
    CheckConfig,
}

#[derive(Parser)]
struct ReplayArgs {
    /// Bar files (JSON array or JSON lines). Repeat to replay several files concurrently.
    #[arg(long = "file", required = true)]
    files: Vec<PathBuf>,

    /// After the replay, keep publishing features to the log until Ctrl-C.
    #[arg(long)]
    publish: bool,
}

// ==============================================================================
// Replay Command Logic
// ==============================================================================

async fn handle_replay(args: ReplayArgs, config: Config) -> Result<()> {
    let engine = Arc::new(ZoneEngine::new(config.zones.clone())?);

    // Load every file concurrently on the blocking pool.
    let loads = args.files.iter().cloned().map(|path| {
        tokio::task::spawn_blocking(move || {
            let bars = replay::load_bars(&path)?;
            Ok::<_, anyhow::Error>((path, bars))
        })
    });
    let mut loaded = Vec::new();
    for result in join_all(loads).await {
        loaded.push(result.context("Bar loading task panicked")??);
    }

    let total: usize = loaded.iter().map(|(_, bars)| bars.len()).sum();
    let progress_bar = ProgressBar::new(total as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );
    progress_bar.set_message("Replaying bars...");

    // Each file feeds its own symbols; files sharing a symbol interleave under its lock.
    let tasks: Vec<_> = loaded
        .into_iter()
        .map(|(path, bars)| {
            let engine = Arc::clone(&engine);
            let pb_clone = progress_bar.clone();
            tokio::task::spawn_blocking(move || replay::replay(&engine, path, bars, &pb_clone))
        })
        .collect();
    let results = join_all(tasks).await;
    progress_bar.finish_with_message("Replay complete!");

    for result in results {
        match result {
            Ok(report) if report.skipped > 0 => {
                eprintln!(
                    "{}: {} bars replayed, {} skipped",
                    report.path.display(),
                    report.bars,
                    report.skipped
                );
            }
            Ok(_) => {}
            Err(e) => eprintln!("A replay task failed: {}", e),
        }
    }

    let snapshots: Vec<ZoneSnapshot> = engine
        .symbols()
        .iter()
        .map(|symbol| engine.snapshot(symbol))
        .collect();
    println!("{}", snapshot_table(&engine, &snapshots));

    if args.publish {
        run_publisher(engine, config).await?;
    }
    Ok(())
}

/// Runs the feature publisher against a log sink until Ctrl-C.
async fn run_publisher(engine: Arc<ZoneEngine>, config: Config) -> Result<()> {
    let publisher = FeaturePublisher::new(engine, config.publisher, Arc::new(LogSink))?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(publisher.run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown requested.");
    // The publisher may already have stopped on a sink error; its result is reported below.
    let _ = shutdown_tx.send(true);

    let stats = handle.await.context("Publisher task panicked")??;
    println!(
        "Published {} batches over {} samples.",
        stats.batches, stats.samples
    );
    Ok(())
}

fn snapshot_table(engine: &ZoneEngine, snapshots: &[ZoneSnapshot]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Symbol",
        "Price",
        "Zones",
        "Demand",
        "Supply",
        "Dist Demand (ATR)",
        "Dist Supply (ATR)",
        "Breakout",
        "Pressure",
    ]);
    for snapshot in snapshots {
        let band = |zone: &Option<core_types::Zone>| match zone {
            Some(zone) => format!("{:.2}-{:.2} {:?}", zone.low, zone.high, zone.state),
            None => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(&snapshot.symbol),
            Cell::new(snapshot.price.map_or("-".to_string(), |p| p.to_string())),
            Cell::new(engine.zones(&snapshot.symbol).len()),
            Cell::new(band(&snapshot.nearest_demand)),
            Cell::new(band(&snapshot.nearest_supply)),
            Cell::new(distance(snapshot.dist_to_demand_atr)),
            Cell::new(distance(snapshot.dist_to_supply_atr)),
            Cell::new(format!("{:.4}", snapshot.breakout_score)),
            Cell::new(format!("{:.4}", snapshot.pressure)),
        ]);
    }
    table
}

fn distance(value: Decimal) -> String {
    if value == Decimal::MAX {
        "-".to_string()
    } else {
        format!("{:.3}", value)
    }
}

// ==============================================================================
// Check-Config Command Logic
// ==============================================================================

fn handle_check_config(config: &Config) -> Result<()> {
    let zones = &config.zones;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Setting", "Value"]);
    let rows: Vec<(&str, String)> = vec![
        ("zones.pivot_left", zones.pivot_left.to_string()),
        ("zones.pivot_right", zones.pivot_right.to_string()),
        ("zones.atr_period", zones.atr_period.to_string()),
        ("zones.merge_atr_factor", zones.merge_atr_factor.to_string()),
        ("zones.decay_half_life_bars", zones.decay_half_life_bars.to_string()),
        ("zones.min_touch_decay", zones.min_touch_decay.to_string()),
        ("zones.max_zones_per_symbol", zones.max_zones_per_symbol.to_string()),
        ("zones.min_touches_to_keep", zones.min_touches_to_keep.to_string()),
        ("zones.breakout_threshold_atr", zones.breakout_threshold_atr.to_string()),
        ("zones.history_capacity", zones.history_capacity.to_string()),
        (
            "publisher.sample_interval_minutes",
            config.publisher.sample_interval_minutes.to_string(),
        ),
        (
            "publisher.emit_every_samples",
            config.publisher.emit_every_samples.to_string(),
        ),
        (
            "publisher.symbols",
            if config.publisher.symbols.is_empty() {
                "(all)".to_string()
            } else {
                config.publisher.symbols.join(", ")
            },
        ),
        ("logging.level", config.logging.level.clone()),
        ("logging.format", format!("{:?}", config.logging.format)),
        (
            "logging.directory",
            config
                .logging
                .directory
                .as_ref()
                .map_or("-".to_string(), |d| d.display().to_string()),
        ),
    ];
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value]);
    }
    println!("{}", table);

    // Building an engine exercises the component-level checks too.
    ZoneEngine::new(zones.clone())?;
    println!("Configuration is valid.");
    Ok(())
}
