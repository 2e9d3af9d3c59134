use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Zone detection parameters. Every field has a documented default.
    #[serde(default)]
    pub zones: ZoneParams,
    /// Feature publishing cadence. This section is mandatory.
    pub publisher: PublisherSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Config {
    /// Validates every section. Called once by the loader; invalid values fail fast.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.zones.validate()?;
        self.publisher.validate()?;
        Ok(())
    }
}

/// Parameters for zone detection, merging, decay and breakout classification.
///
/// These are fixed for the lifetime of an engine.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZoneParams {
    /// Bars to the left of a pivot candidate.
    pub pivot_left: usize,
    /// Bars to the right of a pivot candidate (the confirmation delay).
    pub pivot_right: usize,
    /// Wilder smoothing period of the average true range.
    pub atr_period: usize,
    /// Zone thickness as a multiple of ATR.
    pub merge_atr_factor: Decimal,
    /// Bars after which an untouched zone's pressure has halved.
    pub decay_half_life_bars: u32,
    /// Pressure added back per bar for each recorded touch.
    pub min_touch_decay: Decimal,
    /// Soft cap on live zones per symbol.
    pub max_zones_per_symbol: usize,
    /// Zones with this many touches or fewer are prune candidates.
    pub min_touches_to_keep: u32,
    /// Distance beyond a band, in ATR, that counts as a breach.
    pub breakout_threshold_atr: Decimal,
    /// Bars retained per symbol.
    pub history_capacity: usize,
}

impl Default for ZoneParams {
    fn default() -> Self {
        Self {
            pivot_left: 3,
            pivot_right: 3,
            atr_period: 14,
            merge_atr_factor: dec!(0.5),
            decay_half_life_bars: 20,
            min_touch_decay: dec!(0.001),
            max_zones_per_symbol: 200,
            min_touches_to_keep: 1,
            breakout_threshold_atr: dec!(0.25),
            history_capacity: 3000,
        }
    }
}

impl ZoneParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pivot_left == 0 || self.pivot_right == 0 {
            return Err(ConfigError::ValidationError(
                "zones.pivot_left and zones.pivot_right must be at least 1".to_string(),
            ));
        }
        if self.atr_period == 0 {
            return Err(ConfigError::ValidationError(
                "zones.atr_period must be at least 1".to_string(),
            ));
        }
        if self.merge_atr_factor <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "zones.merge_atr_factor must be greater than 0".to_string(),
            ));
        }
        if self.decay_half_life_bars == 0 {
            return Err(ConfigError::ValidationError(
                "zones.decay_half_life_bars must be greater than 0".to_string(),
            ));
        }
        if self.min_touch_decay < Decimal::ZERO || self.min_touch_decay >= Decimal::ONE {
            return Err(ConfigError::ValidationError(
                "zones.min_touch_decay must be in [0, 1)".to_string(),
            ));
        }
        if self.max_zones_per_symbol == 0 {
            return Err(ConfigError::ValidationError(
                "zones.max_zones_per_symbol must be at least 1".to_string(),
            ));
        }
        if self.breakout_threshold_atr <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "zones.breakout_threshold_atr must be greater than 0".to_string(),
            ));
        }
        let window = self.pivot_left + self.pivot_right + 1;
        if self.history_capacity < window {
            return Err(ConfigError::ValidationError(format!(
                "zones.history_capacity ({}) must hold at least one pivot window ({})",
                self.history_capacity, window
            )));
        }
        Ok(())
    }
}

/// Controls how often snapshots are pushed onto the feature bus.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PublisherSettings {
    /// Minutes between samples.
    pub sample_interval_minutes: u64,
    /// Publish on every Nth sample.
    pub emit_every_samples: u64,
    /// Restrict publishing to these symbols. Empty means every known symbol.
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl PublisherSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "publisher.sample_interval_minutes must be greater than 0".to_string(),
            ));
        }
        if self.emit_every_samples == 0 {
            return Err(ConfigError::ValidationError(
                "publisher.emit_every_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output format of the console log layer.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration consumed by the binary's subscriber setup.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive such as `info` or `engine=debug,info`.
    pub level: String,
    pub format: LogFormat,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            directory: None,
            file_prefix: "zonefeed.log".to_string(),
        }
    }
}
