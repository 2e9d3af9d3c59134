//! # Zone Engine
//!
//! The thread-safe, in-memory store of per-symbol zone state. Feed adapters call
//! `on_bar`/`on_tick`; strategy and publishing code calls `snapshot`.
//!
//! ## Architectural Principles
//!
//! - **No cross-symbol contention:** symbols live in a sharded map and each one owns
//!   its own lock. Bars, ticks and snapshots for one symbol serialize through that
//!   lock, so a snapshot never observes a half-updated zone list.
//! - **Synchronous core:** no operation awaits or performs I/O. Lock hold times are
//!   bounded by the zone cap and the lookback windows.
//! - **Best-effort cache:** nothing is persisted. State is created lazily on the
//!   first bar or tick for a symbol and lives for the life of the engine.

pub mod error;
pub mod state;

pub use error::EngineError;
pub use state::SymbolState;

use analytics::BreakoutScorer;
use chrono::{DateTime, Utc};
use configuration::ZoneParams;
use core_types::{Bar, Tick, Zone, ZoneSnapshot};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use zones::{FractalPivotDetector, LifecycleUpdater, ZoneDetector};

/// The central zone engine shared by every feed and reader.
pub struct ZoneEngine {
    params: ZoneParams,
    symbols: DashMap<String, Arc<Mutex<SymbolState>>>,
    detector: Box<dyn ZoneDetector>,
    lifecycle: LifecycleUpdater,
    scorer: BreakoutScorer,
}

impl ZoneEngine {
    /// Creates an engine with the fractal pivot detector.
    ///
    /// The parameters are validated once here and fixed for the engine's lifetime.
    pub fn new(params: ZoneParams) -> Result<Self, EngineError> {
        params.validate()?;
        let detector = FractalPivotDetector::new(&params)?;
        Self::with_detector(params, Box::new(detector))
    }

    /// Creates an engine around a custom detector.
    pub fn with_detector(
        params: ZoneParams,
        detector: Box<dyn ZoneDetector>,
    ) -> Result<Self, EngineError> {
        params.validate()?;
        let lifecycle = LifecycleUpdater::new(&params)?;
        tracing::info!(
            pivot_left = params.pivot_left,
            pivot_right = params.pivot_right,
            atr_period = params.atr_period,
            max_zones = params.max_zones_per_symbol,
            "Zone engine initialized."
        );
        Ok(Self {
            params,
            symbols: DashMap::new(),
            detector,
            lifecycle,
            scorer: BreakoutScorer::new(),
        })
    }

    pub fn params(&self) -> &ZoneParams {
        &self.params
    }

    /// Returns the state handle for `symbol`, creating it on first use.
    ///
    /// The map shard guard is released before the caller locks the state.
    fn state(&self, symbol: &str) -> Arc<Mutex<SymbolState>> {
        if let Some(existing) = self.symbols.get(symbol) {
            return Arc::clone(existing.value());
        }
        let entry = self.symbols.entry(symbol.to_string()).or_insert_with(|| {
            tracing::debug!(symbol, "Tracking new symbol.");
            Arc::new(Mutex::new(SymbolState::new(&self.params)))
        });
        Arc::clone(entry.value())
    }

    fn existing(&self, symbol: &str) -> Option<Arc<Mutex<SymbolState>>> {
        self.symbols.get(symbol).map(|entry| Arc::clone(entry.value()))
    }

    /// Ingests one bar for `symbol`.
    ///
    /// Fails only for a malformed bar (`high < low`, a negative price or a
    /// negative volume); the symbol's state is left untouched in that case.
    #[allow(clippy::too_many_arguments)]
    pub fn on_bar(
        &self,
        symbol: &str,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Result<(), EngineError> {
        let bar = Bar::new(timestamp, open, high, low, close, volume)?;
        self.ingest_bar(symbol, bar);
        Ok(())
    }

    /// Ingests an already validated bar.
    pub fn ingest_bar(&self, symbol: &str, bar: Bar) {
        let state = self.state(symbol);
        let mut state = state.lock();
        state.apply_bar(symbol, bar, self.detector.as_ref(), &self.lifecycle);
    }

    /// Ingests a quote for `symbol`. Fails only for a crossed quote or a
    /// negative price.
    pub fn on_tick(
        &self,
        symbol: &str,
        bid: Decimal,
        ask: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let tick = Tick::new(timestamp, bid, ask)?;
        let state = self.state(symbol);
        state.lock().apply_tick(&tick);
        Ok(())
    }

    /// The current read-model for `symbol`; neutral if the symbol is unknown.
    pub fn snapshot(&self, symbol: &str) -> ZoneSnapshot {
        match self.existing(symbol) {
            Some(state) => state.lock().snapshot(symbol, &self.scorer),
            None => ZoneSnapshot::neutral(symbol),
        }
    }

    /// A copy of the live zones for `symbol`, in insertion order.
    pub fn zones(&self, symbol: &str) -> Vec<Zone> {
        self.existing(symbol)
            .map(|state| state.lock().zones().to_vec())
            .unwrap_or_default()
    }

    /// Every symbol seen so far, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .symbols
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        symbols.sort();
        symbols
    }
}

impl std::fmt::Debug for ZoneEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneEngine")
            .field("params", &self.params)
            .field("symbols", &self.symbols.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_invalid_parameters_at_construction() {
        let params = ZoneParams {
            atr_period: 0,
            ..ZoneParams::default()
        };
        assert!(matches!(
            ZoneEngine::new(params),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn malformed_bar_does_not_create_state() {
        let engine = ZoneEngine::new(ZoneParams::default()).unwrap();
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        let result = engine.on_bar("ES", ts, dec!(10), dec!(9), dec!(11), dec!(10), dec!(1));
        assert!(matches!(result, Err(EngineError::Core(_))));
        let result = engine.on_bar("ES", ts, dec!(-5), dec!(-4), dec!(-6), dec!(-5), dec!(1));
        assert!(matches!(result, Err(EngineError::Core(_))));
        assert!(engine.symbols().is_empty());
    }

    #[test]
    fn crossed_quote_is_rejected() {
        let engine = ZoneEngine::new(ZoneParams::default()).unwrap();
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        assert!(engine.on_tick("ES", dec!(101), dec!(100), ts).is_err());
        assert!(engine.on_tick("ES", dec!(-2), dec!(-1), ts).is_err());
        engine.on_tick("ES", dec!(100), dec!(101), ts).unwrap();
        assert_eq!(engine.symbols(), vec!["ES".to_string()]);
        assert_eq!(engine.snapshot("ES").price, Some(dec!(100.5)));
    }
}
