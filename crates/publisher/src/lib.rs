//! # Feature Publisher
//!
//! A long-running service that samples the zone engine on a timer and pushes the
//! resulting features onto a `FeatureSink`.
//!
//! The cadence is two settings: `sample_interval_minutes` between samples and
//! `emit_every_samples`, so with `5` and `3` a batch goes out every fifteen minutes.

pub mod error;
pub mod sink;

pub use error::PublisherError;
pub use sink::{BroadcastSink, FeatureSink, LogSink};

use chrono::Utc;
use configuration::PublisherSettings;
use engine::ZoneEngine;
use events::{BusMessage, FeatureBatch, LogLevel, LogMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

/// Counters reported when the publisher stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    pub samples: u64,
    pub batches: u64,
}

pub struct FeaturePublisher {
    engine: Arc<ZoneEngine>,
    settings: PublisherSettings,
    sink: Arc<dyn FeatureSink>,
}

impl FeaturePublisher {
    /// Creates a publisher. Settings are validated here so a bad cadence fails at startup.
    pub fn new(
        engine: Arc<ZoneEngine>,
        settings: PublisherSettings,
        sink: Arc<dyn FeatureSink>,
    ) -> Result<Self, PublisherError> {
        settings.validate()?;
        Ok(Self {
            engine,
            settings,
            sink,
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.settings.sample_interval_minutes.saturating_mul(60))
    }

    /// The symbols a batch covers: the allow-list, or every symbol the engine knows.
    fn symbols(&self) -> Vec<String> {
        if self.settings.symbols.is_empty() {
            self.engine.symbols()
        } else {
            self.settings.symbols.clone()
        }
    }

    /// Pushes one `Features` message per symbol. Returns how many were sent.
    pub fn publish_once(&self) -> Result<usize, PublisherError> {
        let now = Utc::now();
        let symbols = self.symbols();
        for symbol in &symbols {
            let snapshot = self.engine.snapshot(symbol);
            let batch = FeatureBatch::from_snapshot(&snapshot, now);
            self.sink.publish(BusMessage::Features(batch))?;
        }
        tracing::debug!(symbols = symbols.len(), "Feature batch published.");
        Ok(symbols.len())
    }

    fn notice(&self, message: String) -> Result<(), PublisherError> {
        self.sink.publish(BusMessage::Log(LogMessage {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message,
        }))
    }

    /// Runs until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// The first sample is taken immediately. A closed sink stops the loop with
    /// an error; the engine itself is never affected by publishing failures.
    pub async fn run(
        self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<PublisherStats, PublisherError> {
        let mut interval = time::interval(self.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = PublisherStats::default();

        tracing::info!(
            interval_minutes = self.settings.sample_interval_minutes,
            emit_every = self.settings.emit_every_samples,
            "Feature publisher started."
        );
        self.notice("Feature publisher started".to_string())?;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    stats.samples += 1;
                    if stats.samples % self.settings.emit_every_samples != 0 {
                        continue;
                    }
                    match self.publish_once() {
                        Ok(_) => stats.batches += 1,
                        Err(e) => {
                            tracing::error!(
                                error = %e,
                                "Feature sink failed. Publisher shutting down."
                            );
                            return Err(e);
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(
            samples = stats.samples,
            batches = stats.batches,
            "Feature publisher stopped."
        );
        Ok(stats)
    }
}
