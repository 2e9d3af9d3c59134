use crate::history::BarHistory;
use core_types::{Zone, ZoneSide};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

/// Bars of lookback for momentum.
pub const MOMENTUM_LOOKBACK: usize = 20;
/// Bars of lookback for the baseline true range.
pub const VOLATILITY_LOOKBACK: usize = 50;

const NEUTRAL_MOMENTUM: Decimal = dec!(0.5);
// Far beyond logistic saturation; keeps the weighted sum inside Decimal range.
const MOMENTUM_CAP: Decimal = dec!(1000000);
const MAX_DISTANCE_ATR: Decimal = dec!(3);
const MAX_TOUCHES: u32 = 5;

const MOMENTUM_WEIGHT: Decimal = dec!(1.5);
const CALM_WEIGHT: Decimal = dec!(0.8);
const TOUCH_WEIGHT: Decimal = dec!(0.5);
const DISTANCE_WEIGHT: Decimal = dec!(1.0);
const BIAS: Decimal = dec!(0.5);

/// The four inputs of the breakout score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    /// Price change toward the zone over the lookback, in ATR units.
    pub momentum: Decimal,
    /// Current ATR over the baseline true range, clamped to `[0.5, 2]`.
    pub volatility_ratio: Decimal,
    /// `min(5, touches) / 5`.
    pub touch_factor: Decimal,
    /// Gap between price and the zone edge in ATR units, clamped to `[0, 3]`.
    pub distance: Decimal,
}

/// A stateless calculator for the probability-like breakout score of an opposing zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct BreakoutScorer;

impl BreakoutScorer {
    pub fn new() -> Self {
        Self
    }

    /// Scores `zone` as the nearest opposing zone for `price`.
    ///
    /// Momentum is measured toward the zone: upward for a supply zone,
    /// downward for a demand zone.
    pub fn score_zone(
        &self,
        history: &BarHistory,
        atr: Decimal,
        price: Decimal,
        zone: &Zone,
    ) -> Decimal {
        let inputs = self.inputs(history, atr, price, zone);
        let score = self.score(&inputs);
        tracing::trace!(
            zone_id = zone.id,
            side = ?zone.side,
            momentum = %inputs.momentum,
            volatility_ratio = %inputs.volatility_ratio,
            touch_factor = %inputs.touch_factor,
            distance = %inputs.distance,
            score = %score,
            "Breakout score computed."
        );
        score
    }

    /// Collects the score inputs for `zone`.
    pub fn inputs(
        &self,
        history: &BarHistory,
        atr: Decimal,
        price: Decimal,
        zone: &Zone,
    ) -> ScoreInputs {
        let atr = effective(atr);
        let momentum = match self.momentum(history, atr) {
            None => NEUTRAL_MOMENTUM,
            Some(raw) => match zone.side {
                ZoneSide::Supply => raw,
                ZoneSide::Demand => -raw,
            },
        };
        ScoreInputs {
            momentum,
            volatility_ratio: self.volatility_ratio(history, atr),
            touch_factor: self.touch_factor(zone),
            distance: self.normalized_distance(price, zone, atr),
        }
    }

    /// `(close_now - close_k) / atr` with `k = min(20, bars - 1)`.
    ///
    /// Returns `None` when fewer than three bars are available.
    pub fn momentum(&self, history: &BarHistory, atr: Decimal) -> Option<Decimal> {
        if history.len() < 3 {
            return None;
        }
        let lookback = MOMENTUM_LOOKBACK.min(history.len() - 1);
        let now = history.last()?.close;
        let then = history.back(lookback)?.close;
        let momentum = (now - then)
            .checked_div(effective(atr))
            .unwrap_or(if now >= then { MOMENTUM_CAP } else { -MOMENTUM_CAP });
        Some(momentum.clamp(-MOMENTUM_CAP, MOMENTUM_CAP))
    }

    /// Current ATR relative to a plain average of true ranges over up to 50 bars.
    ///
    /// Defaults to one with fewer than two bars or a non-positive baseline.
    pub fn volatility_ratio(&self, history: &BarHistory, atr: Decimal) -> Decimal {
        let len = history.len();
        let lookback = VOLATILITY_LOOKBACK.min(len.saturating_sub(1));
        if lookback == 0 {
            return Decimal::ONE;
        }

        let mut total = Decimal::ZERO;
        let mut count = 0u32;
        for index in (len - lookback)..len {
            if let (Some(prev), Some(bar)) = (history.get(index - 1), history.get(index)) {
                let true_range = bar
                    .range()
                    .max((bar.high - prev.close).abs())
                    .max((bar.low - prev.close).abs());
                total += true_range;
                count += 1;
            }
        }
        if count == 0 {
            return Decimal::ONE;
        }
        let baseline = total / Decimal::from(count);
        if baseline <= Decimal::ZERO {
            return Decimal::ONE;
        }
        effective(atr)
            .checked_div(baseline)
            .unwrap_or(dec!(2.0))
            .clamp(dec!(0.5), dec!(2.0))
    }

    pub fn touch_factor(&self, zone: &Zone) -> Decimal {
        Decimal::from(zone.touch_count.min(MAX_TOUCHES)) / Decimal::from(MAX_TOUCHES)
    }

    /// Gap between `price` and the zone's near edge, in ATR units.
    pub fn normalized_distance(&self, price: Decimal, zone: &Zone, atr: Decimal) -> Decimal {
        let gap = match zone.side {
            ZoneSide::Supply => zone.low - price,
            ZoneSide::Demand => price - zone.high,
        };
        gap.abs()
            .checked_div(effective(atr))
            .unwrap_or(MAX_DISTANCE_ATR)
            .clamp(Decimal::ZERO, MAX_DISTANCE_ATR)
    }

    /// `logistic(1.5 m + 0.8 / v + 0.5 t - d - 0.5)`, clamped to `[0, 1]`.
    pub fn score(&self, inputs: &ScoreInputs) -> Decimal {
        let volatility_ratio = if inputs.volatility_ratio > Decimal::ZERO {
            inputs.volatility_ratio
        } else {
            Decimal::ONE
        };
        let linear = inputs.momentum * MOMENTUM_WEIGHT
            + CALM_WEIGHT / volatility_ratio
            + inputs.touch_factor * TOUCH_WEIGHT
            - inputs.distance * DISTANCE_WEIGHT
            - BIAS;
        // The exponential is the only place this crate leaves Decimal.
        let z = linear.to_f64().unwrap_or(0.0);
        let probability = 1.0 / (1.0 + (-z).exp());
        Decimal::from_f64(probability)
            .unwrap_or(Decimal::ZERO)
            .clamp(Decimal::ZERO, Decimal::ONE)
    }
}

fn effective(atr: Decimal) -> Decimal {
    if atr > Decimal::ZERO { atr } else { Decimal::ONE }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use core_types::{Bar, ZoneState};
    use proptest::prelude::*;

    fn bar(index: i64, high: Decimal, low: Decimal, close: Decimal) -> Bar {
        let timestamp = Utc.timestamp_opt(index * 60, 0).unwrap();
        Bar::new(timestamp, close, high, low, close, Decimal::ONE).unwrap()
    }

    fn history_of_closes(closes: &[Decimal]) -> BarHistory {
        let mut history = BarHistory::new(100);
        for (i, close) in closes.iter().enumerate() {
            history.push(bar(i as i64, *close + dec!(0.5), *close - dec!(0.5), *close));
        }
        history
    }

    fn zone(side: ZoneSide, low: Decimal, high: Decimal, touches: u32) -> Zone {
        Zone {
            id: 1,
            side,
            low,
            high,
            pressure: dec!(0.5),
            touch_count: touches,
            last_touched: DateTime::<Utc>::default(),
            state: ZoneState::Test,
        }
    }

    #[test]
    fn momentum_is_neutral_with_short_history() {
        let scorer = BreakoutScorer::new();
        let history = history_of_closes(&[dec!(100), dec!(101)]);
        assert_eq!(scorer.momentum(&history, dec!(1)), None);

        let supply = zone(ZoneSide::Supply, dec!(110), dec!(111), 1);
        let inputs = scorer.inputs(&history, dec!(1), dec!(101), &supply);
        assert_eq!(inputs.momentum, dec!(0.5));

        let single = history_of_closes(&[dec!(100)]);
        assert_eq!(scorer.volatility_ratio(&single, dec!(3)), dec!(1));
    }

    #[test]
    fn momentum_uses_up_to_twenty_bars_of_lookback() {
        let scorer = BreakoutScorer::new();
        let closes: Vec<Decimal> = (0..30).map(|i| Decimal::from(100 + i)).collect();
        let history = history_of_closes(&closes);
        // 129 - 109 over an ATR of 2.
        assert_eq!(scorer.momentum(&history, dec!(2)), Some(dec!(10)));
    }

    #[test]
    fn momentum_points_toward_the_opposing_zone() {
        let scorer = BreakoutScorer::new();
        let history = history_of_closes(&[dec!(100), dec!(101), dec!(102), dec!(103)]);
        let supply = zone(ZoneSide::Supply, dec!(110), dec!(111), 1);
        let demand = zone(ZoneSide::Demand, dec!(90), dec!(91), 1);
        let up = scorer.inputs(&history, dec!(1), dec!(103), &supply).momentum;
        let down = scorer.inputs(&history, dec!(1), dec!(103), &demand).momentum;
        assert_eq!(up, dec!(3));
        assert_eq!(down, dec!(-3));
    }

    #[test]
    fn volatility_ratio_is_clamped() {
        let scorer = BreakoutScorer::new();
        let history = history_of_closes(&[dec!(100), dec!(100), dec!(100), dec!(100)]);
        // Baseline true range is 1.
        assert_eq!(scorer.volatility_ratio(&history, dec!(10)), dec!(2));
        assert_eq!(scorer.volatility_ratio(&history, dec!(0.1)), dec!(0.5));
        assert_eq!(scorer.volatility_ratio(&history, dec!(1.5)), dec!(1.5));
    }

    #[test]
    fn distance_and_touch_factor_are_bounded() {
        let scorer = BreakoutScorer::new();
        let supply = zone(ZoneSide::Supply, dec!(110), dec!(111), 9);
        assert_eq!(scorer.normalized_distance(dec!(100), &supply, dec!(2)), dec!(3));
        assert_eq!(scorer.normalized_distance(dec!(108), &supply, dec!(2)), dec!(1));
        assert_eq!(scorer.touch_factor(&supply), dec!(1));
        let demand = zone(ZoneSide::Demand, dec!(90), dec!(91), 2);
        assert_eq!(scorer.touch_factor(&demand), dec!(0.4));
        assert_eq!(scorer.normalized_distance(dec!(92), &demand, dec!(0)), dec!(1));
    }

    #[test]
    fn score_matches_the_logistic_formula() {
        let scorer = BreakoutScorer::new();
        let inputs = ScoreInputs {
            momentum: dec!(0),
            volatility_ratio: dec!(1),
            touch_factor: dec!(0.2),
            distance: dec!(0.4),
        };
        // 0.8 + 0.1 - 0.4 - 0.5 = 0 -> logistic(0) = 0.5
        assert_eq!(scorer.score(&inputs), dec!(0.5));
    }

    proptest! {
        #[test]
        fn score_is_monotonic_in_momentum(
            m1 in -1000i64..1000,
            delta in 0i64..1000,
            vr in 50i64..=200,
            touches in 0u32..10,
            dist in 0i64..=300,
        ) {
            let scorer = BreakoutScorer::new();
            let base = ScoreInputs {
                momentum: Decimal::new(m1, 2),
                volatility_ratio: Decimal::new(vr, 2),
                touch_factor: Decimal::from(touches.min(5)) / dec!(5),
                distance: Decimal::new(dist, 2),
            };
            let higher = ScoreInputs { momentum: Decimal::new(m1 + delta, 2), ..base };
            let low = scorer.score(&base);
            let high = scorer.score(&higher);
            prop_assert!(high >= low);
            prop_assert!(low >= Decimal::ZERO && high <= Decimal::ONE);
        }
    }
}
