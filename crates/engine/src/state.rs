use analytics::{BarHistory, BreakoutScorer, SmoothedRange};
use chrono::{DateTime, Utc};
use configuration::ZoneParams;
use core_types::{Bar, Tick, Zone, ZoneSide, ZoneSnapshot};
use rust_decimal::Decimal;
use zones::{LifecycleUpdater, MergeOutcome, ZoneBook, ZoneDetector};

/// Everything the engine knows about one symbol.
///
/// A `SymbolState` is always accessed through its own lock in the engine; the
/// methods here assume exclusive access and never block.
#[derive(Debug)]
pub struct SymbolState {
    atr: SmoothedRange,
    history: BarHistory,
    book: ZoneBook,
    last_price: Option<Decimal>,
    last_time: Option<DateTime<Utc>>,
}

impl SymbolState {
    pub fn new(params: &ZoneParams) -> Self {
        Self {
            atr: SmoothedRange::new(params.atr_period),
            history: BarHistory::new(params.history_capacity),
            book: ZoneBook::new(params),
            last_price: None,
            last_time: None,
        }
    }

    /// Runs the full per-bar pipeline: range estimator, history, detection,
    /// merge and finally the lifecycle pass over every zone.
    pub fn apply_bar(
        &mut self,
        symbol: &str,
        bar: Bar,
        detector: &dyn ZoneDetector,
        lifecycle: &LifecycleUpdater,
    ) {
        let atr = self.atr.update(bar.high, bar.low, bar.close);
        self.last_price = Some(bar.close);
        self.last_time = Some(bar.timestamp);
        self.history.push(bar);

        for candidate in detector.detect(&self.history, atr) {
            let side = candidate.side;
            let (low, high) = (candidate.low, candidate.high);
            match self.book.add_or_merge(candidate) {
                MergeOutcome::Appended(id) => {
                    tracing::debug!(symbol, zone_id = id, ?side, %low, %high, "Zone created.")
                }
                MergeOutcome::Merged(id) => tracing::debug!(
                    symbol,
                    zone_id = id,
                    ?side,
                    %low,
                    %high,
                    "Candidate merged into existing zone."
                ),
            }
        }

        if let Some(bar) = self.history.last() {
            lifecycle.apply(self.book.zones_mut(), bar, atr);
        }
    }

    /// Records the quote midpoint as the latest price. Zones are not touched.
    pub fn apply_tick(&mut self, tick: &Tick) {
        self.last_price = Some(tick.mid());
        self.last_time = Some(tick.timestamp);
    }

    /// Builds the read-model for the latest price.
    ///
    /// The opposing zone is the nearest supply zone above the price when one
    /// exists, otherwise the nearest demand zone below it.
    pub fn snapshot(&self, symbol: &str, scorer: &BreakoutScorer) -> ZoneSnapshot {
        let Some(price) = self.last_price else {
            return ZoneSnapshot::neutral(symbol);
        };
        let atr = self.atr.effective();
        let nearest_demand = self.book.nearest_demand(price);
        let nearest_supply = self.book.nearest_supply(price);

        let dist_to_demand_atr = nearest_demand
            .map(|zone| normalized_gap(price - zone.high, atr))
            .unwrap_or(Decimal::MAX);
        let dist_to_supply_atr = nearest_supply
            .map(|zone| normalized_gap(zone.low - price, atr))
            .unwrap_or(Decimal::MAX);

        let (breakout_score, pressure) = match nearest_supply.or(nearest_demand) {
            Some(zone) => (
                scorer.score_zone(&self.history, atr, price, zone),
                zone.pressure,
            ),
            None => (Decimal::ZERO, Decimal::ZERO),
        };

        ZoneSnapshot {
            symbol: symbol.to_string(),
            timestamp: self.last_time.unwrap_or_default(),
            price: Some(price),
            nearest_demand: nearest_demand.cloned(),
            nearest_supply: nearest_supply.cloned(),
            dist_to_demand_atr,
            dist_to_supply_atr,
            breakout_score,
            pressure,
        }
    }

    pub fn zones(&self) -> &[Zone] {
        self.book.zones()
    }

    pub fn zone_count(&self, side: ZoneSide) -> usize {
        self.book.zones().iter().filter(|zone| zone.side == side).count()
    }

    pub fn bar_count(&self) -> usize {
        self.history.len()
    }

    pub fn last_price(&self) -> Option<Decimal> {
        self.last_price
    }
}

/// A non-negative gap in ATR units; zero once price is inside the zone.
fn normalized_gap(gap: Decimal, atr: Decimal) -> Decimal {
    gap.max(Decimal::ZERO)
        .checked_div(atr)
        .unwrap_or(Decimal::MAX)
}
