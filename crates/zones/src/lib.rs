//! # Zone Library
//!
//! This crate detects and maintains demand/supply zones for a single symbol. It defines a
//! `ZoneDetector` trait and the components that keep a symbol's zone list current.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of locking, feeds
//!   or publishing. It depends only on `core-types`, `analytics` and `configuration`.
//! - **Owned Zones:** A `ZoneBook` exclusively owns its zones. Zones never reference each
//!   other; identity is a per-book sequence number.
//!
//! ## Public API
//!
//! - `ZoneDetector`: the trait every detector implements.
//! - `FractalPivotDetector`: left/right window pivot detection.
//! - `ZoneBook`: merge, cap and nearest-zone queries.
//! - `LifecycleUpdater`: per-bar decay, touch and state transitions.

// Declare all the modules that constitute this crate.
pub mod book;
pub mod error;
pub mod lifecycle;
pub mod pivot;

// Re-export the key components to create a clean, public-facing API.
pub use book::{MergeOutcome, ZoneBook};
pub use error::ZoneError;
pub use lifecycle::LifecycleUpdater;
pub use pivot::FractalPivotDetector;

use analytics::BarHistory;
use chrono::{DateTime, Utc};
use core_types::ZoneSide;
use rust_decimal::Decimal;

/// A freshly detected zone that has not yet been merged into a book.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneCandidate {
    pub side: ZoneSide,
    pub low: Decimal,
    pub high: Decimal,
    pub pressure: Decimal,
    pub touch_count: u32,
    pub detected_at: DateTime<Utc>,
}

impl ZoneCandidate {
    pub fn thickness(&self) -> Decimal {
        self.high - self.low
    }
}

/// The core trait that all zone detectors must implement.
///
/// A detector looks at the bar history after the newest bar has been pushed and
/// returns any zones that bar confirms. The `Send + Sync` bounds allow one detector
/// to be shared by every symbol's state.
pub trait ZoneDetector: Send + Sync {
    /// Evaluates the history for newly confirmed zones.
    ///
    /// # Arguments
    ///
    /// * `history` - The symbol's bars, newest last.
    /// * `atr` - The current smoothed range; may be zero before volatility is known.
    fn detect(&self, history: &BarHistory, atr: Decimal) -> Vec<ZoneCandidate>;
}
