use crate::error::ZoneError;
use crate::{ZoneCandidate, ZoneDetector};
use analytics::BarHistory;
use configuration::ZoneParams;
use core_types::{Bar, ZoneSide};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Pressure assigned to a freshly detected zone.
pub const INITIAL_PRESSURE: Decimal = dec!(0.5);

/// Fractal pivot detection over a `left`/`right` bar window.
///
/// The candidate is the bar `right` positions before the newest one. It is a
/// pivot high when no earlier bar in the window has a strictly higher high and
/// no later bar has a higher-or-equal high. The asymmetry means a plateau
/// yields exactly one pivot (its last bar). Pivot lows mirror this.
#[derive(Debug, Clone)]
pub struct FractalPivotDetector {
    left: usize,
    right: usize,
    merge_atr_factor: Decimal,
}

impl FractalPivotDetector {
    /// Creates a new `FractalPivotDetector` from the zone parameters.
    pub fn new(params: &ZoneParams) -> Result<Self, ZoneError> {
        if params.pivot_left == 0 || params.pivot_right == 0 {
            return Err(ZoneError::InvalidParameters(
                "Pivot window sides must be at least one bar".to_string(),
            ));
        }
        if params.merge_atr_factor <= Decimal::ZERO {
            return Err(ZoneError::InvalidParameters(
                "Merge ATR factor must be positive".to_string(),
            ));
        }
        Ok(Self {
            left: params.pivot_left,
            right: params.pivot_right,
            merge_atr_factor: params.merge_atr_factor,
        })
    }

    /// Bars required before the first pivot can be confirmed.
    pub fn window(&self) -> usize {
        self.left + self.right + 1
    }

    fn before<'a>(&self, history: &'a BarHistory, index: usize) -> impl Iterator<Item = &'a Bar> {
        (index - self.left..index).filter_map(move |i| history.get(i))
    }

    fn after<'a>(&self, history: &'a BarHistory, index: usize) -> impl Iterator<Item = &'a Bar> {
        (index + 1..=index + self.right).filter_map(move |i| history.get(i))
    }

    fn is_pivot_high(&self, history: &BarHistory, index: usize, pivot: &Bar) -> bool {
        self.before(history, index).all(|bar| bar.high <= pivot.high)
            && self.after(history, index).all(|bar| bar.high < pivot.high)
    }

    fn is_pivot_low(&self, history: &BarHistory, index: usize, pivot: &Bar) -> bool {
        self.before(history, index).all(|bar| bar.low >= pivot.low)
            && self.after(history, index).all(|bar| bar.low > pivot.low)
    }

    /// Zone thickness for a pivot on `pivot`: `ATR * factor`, with the bar's own
    /// range (at least one) standing in for a non-positive ATR.
    fn thickness(&self, atr: Decimal, pivot: &Bar) -> Decimal {
        let effective_atr = if atr > Decimal::ZERO {
            atr
        } else {
            pivot.range().max(Decimal::ONE)
        };
        effective_atr * self.merge_atr_factor
    }
}

impl ZoneDetector for FractalPivotDetector {
    fn detect(&self, history: &BarHistory, atr: Decimal) -> Vec<ZoneCandidate> {
        let count = history.len();
        if count < self.window() {
            return Vec::new();
        }

        let index = count - 1 - self.right;
        let (Some(pivot), Some(latest)) = (history.get(index), history.last()) else {
            return Vec::new();
        };

        let half = self.thickness(atr, pivot) / Decimal::TWO;
        let mut candidates = Vec::new();

        if self.is_pivot_high(history, index, pivot) {
            tracing::debug!(price = %pivot.high, at = %pivot.timestamp, "Pivot high confirmed.");
            candidates.push(ZoneCandidate {
                side: ZoneSide::Supply,
                low: pivot.high - half,
                high: pivot.high + half,
                pressure: INITIAL_PRESSURE,
                touch_count: 1,
                detected_at: latest.timestamp,
            });
        }
        if self.is_pivot_low(history, index, pivot) {
            tracing::debug!(price = %pivot.low, at = %pivot.timestamp, "Pivot low confirmed.");
            candidates.push(ZoneCandidate {
                side: ZoneSide::Demand,
                low: pivot.low - half,
                high: pivot.low + half,
                pressure: INITIAL_PRESSURE,
                touch_count: 1,
                detected_at: latest.timestamp,
            });
        }

        candidates
    }
}
