use crate::error::ZoneError;
use configuration::ZoneParams;
use core_types::{Bar, Zone, ZoneSide, ZoneState};
use rust_decimal::prelude::*;

/// Per-bar maintenance of a symbol's zones: pressure decay, touches and state.
#[derive(Debug, Clone)]
pub struct LifecycleUpdater {
    /// `exp(-ln 2 / half_life)`, so untouched pressure halves every half-life.
    decay_factor: Decimal,
    min_touch_decay: Decimal,
    breakout_threshold_atr: Decimal,
}

impl LifecycleUpdater {
    /// Creates a new `LifecycleUpdater` from the zone parameters.
    pub fn new(params: &ZoneParams) -> Result<Self, ZoneError> {
        if params.decay_half_life_bars == 0 {
            return Err(ZoneError::InvalidParameters(
                "Decay half-life must be at least one bar".to_string(),
            ));
        }
        if params.breakout_threshold_atr <= Decimal::ZERO {
            return Err(ZoneError::InvalidParameters(
                "Breakout threshold must be positive".to_string(),
            ));
        }

        // Transcendental math stays in f64 and is converted once at the boundary.
        let factor = (-std::f64::consts::LN_2 / f64::from(params.decay_half_life_bars)).exp();
        let decay_factor = Decimal::from_f64(factor).ok_or_else(|| {
            ZoneError::InvalidParameters(format!("Decay factor {} is not representable", factor))
        })?;

        Ok(Self {
            decay_factor,
            min_touch_decay: params.min_touch_decay,
            breakout_threshold_atr: params.breakout_threshold_atr,
        })
    }

    pub fn decay_factor(&self) -> Decimal {
        self.decay_factor
    }

    /// Applies one bar to every zone. Returns how many zones changed state.
    ///
    /// For each zone, in order:
    /// 1. `pressure = clamp(pressure * decay + min_touch_decay * touches, 0, 1)`.
    /// 2. A close inside the band is a touch: touches increment and the state is `Test`.
    /// 3. Otherwise a close more than `atr * threshold` beyond the band is a breach:
    ///    `Breakout` when it goes through the zone (up through supply, down through
    ///    demand), `Retest` when it moves away on the other side.
    ///
    /// `Invalidated` zones still decay but are never moved out of that state.
    pub fn apply(&self, zones: &mut [Zone], bar: &Bar, atr: Decimal) -> usize {
        let atr = if atr > Decimal::ZERO { atr } else { Decimal::ONE };
        let threshold = atr * self.breakout_threshold_atr;
        let close = bar.close;
        let mut transitions = 0;

        for zone in zones.iter_mut() {
            zone.pressure = (zone.pressure * self.decay_factor
                + self.min_touch_decay * Decimal::from(zone.touch_count))
            .clamp(Decimal::ZERO, Decimal::ONE);

            if zone.state == ZoneState::Invalidated {
                continue;
            }

            let next = if zone.contains(close) {
                zone.touch_count = zone.touch_count.saturating_add(1);
                zone.last_touched = bar.timestamp;
                ZoneState::Test
            } else if close > zone.high + threshold {
                match zone.side {
                    ZoneSide::Supply => ZoneState::Breakout,
                    ZoneSide::Demand => ZoneState::Retest,
                }
            } else if close < zone.low - threshold {
                match zone.side {
                    ZoneSide::Demand => ZoneState::Breakout,
                    ZoneSide::Supply => ZoneState::Retest,
                }
            } else {
                zone.state
            };

            if next != zone.state {
                tracing::debug!(
                    zone_id = zone.id,
                    side = ?zone.side,
                    from = ?zone.state,
                    to = ?next,
                    close = %close,
                    "Zone state transition."
                );
                zone.state = next;
                transitions += 1;
            }
        }

        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn bar_closing_at(minute: i64, close: Decimal) -> Bar {
        Bar::new(
            Utc.timestamp_opt(minute * 60, 0).unwrap(),
            close,
            close + dec!(0.25),
            close - dec!(0.25),
            close,
            Decimal::ONE,
        )
        .unwrap()
    }

    fn zone(side: ZoneSide, low: Decimal, high: Decimal) -> Zone {
        Zone {
            id: 1,
            side,
            low,
            high,
            pressure: dec!(0.5),
            touch_count: 1,
            last_touched: DateTime::<Utc>::default(),
            state: ZoneState::Test,
        }
    }

    fn updater(min_touch_decay: Decimal) -> LifecycleUpdater {
        LifecycleUpdater::new(&ZoneParams {
            min_touch_decay,
            ..ZoneParams::default()
        })
        .unwrap()
    }

    #[test]
    fn pressure_halves_after_one_half_life() {
        let updater = updater(Decimal::ZERO);
        let mut zones = vec![zone(ZoneSide::Supply, dec!(104.5), dec!(105.5))];
        for minute in 0..20 {
            // Close between the band and the breach threshold: no touch.
            updater.apply(&mut zones, &bar_closing_at(minute, dec!(105.6)), dec!(1));
        }
        let pressure = zones[0].pressure;
        assert!((pressure - dec!(0.25)).abs() < dec!(0.000001), "pressure {pressure}");
        assert_eq!(zones[0].touch_count, 1);
    }

    #[test]
    fn touches_slow_the_decay() {
        let updater = updater(dec!(0.001));
        let mut untouched = vec![zone(ZoneSide::Supply, dec!(104.5), dec!(105.5))];
        updater.apply(&mut untouched, &bar_closing_at(0, dec!(105.6)), dec!(1));
        let expected = dec!(0.5) * updater.decay_factor() + dec!(0.001);
        assert_eq!(untouched[0].pressure, expected);
    }

    #[test]
    fn close_inside_band_is_a_touch() {
        let updater = updater(dec!(0.001));
        let mut zones = vec![zone(ZoneSide::Demand, dec!(99), dec!(100))];
        zones[0].state = ZoneState::Breakout;
        let bar = bar_closing_at(3, dec!(99.5));
        updater.apply(&mut zones, &bar, dec!(1));
        assert_eq!(zones[0].touch_count, 2);
        assert_eq!(zones[0].last_touched, bar.timestamp);
        assert_eq!(zones[0].state, ZoneState::Test);
    }

    #[test]
    fn breach_through_the_zone_is_a_breakout() {
        let updater = updater(dec!(0.001));
        let mut zones = vec![
            zone(ZoneSide::Supply, dec!(104.5), dec!(105.5)),
            zone(ZoneSide::Demand, dec!(94.5), dec!(95.5)),
        ];
        let changed = updater.apply(&mut zones, &bar_closing_at(0, dec!(110)), dec!(2));
        assert_eq!(changed, 2);
        assert_eq!(zones[0].state, ZoneState::Breakout);
        assert_eq!(zones[1].state, ZoneState::Retest);

        updater.apply(&mut zones, &bar_closing_at(1, dec!(90)), dec!(2));
        assert_eq!(zones[0].state, ZoneState::Retest);
        assert_eq!(zones[1].state, ZoneState::Breakout);
    }

    #[test]
    fn small_excursions_keep_the_state() {
        let updater = updater(dec!(0.001));
        let mut zones = vec![zone(ZoneSide::Supply, dec!(104.5), dec!(105.5))];
        // Threshold is 2 * 0.25 = 0.5 above the band.
        let changed = updater.apply(&mut zones, &bar_closing_at(0, dec!(106)), dec!(2));
        assert_eq!(changed, 0);
        assert_eq!(zones[0].state, ZoneState::Test);
    }

    #[test]
    fn invalidated_zones_stay_invalidated() {
        let updater = updater(dec!(0.001));
        let mut zones = vec![zone(ZoneSide::Supply, dec!(104.5), dec!(105.5))];
        zones[0].state = ZoneState::Invalidated;
        updater.apply(&mut zones, &bar_closing_at(0, dec!(105)), dec!(1));
        assert_eq!(zones[0].state, ZoneState::Invalidated);
        assert_eq!(zones[0].touch_count, 1);
    }

    proptest! {
        #[test]
        fn pressure_stays_in_unit_interval(
            start in 0i64..=100,
            touches in 0u32..5_000,
            closes in proptest::collection::vec(9_000i64..11_000, 1..80),
        ) {
            let updater = updater(dec!(0.001));
            let mut z = zone(ZoneSide::Demand, dec!(99), dec!(101));
            z.pressure = Decimal::new(start, 2);
            z.touch_count = touches;
            let mut zones = vec![z];
            for (minute, close) in closes.into_iter().enumerate() {
                let bar = bar_closing_at(minute as i64, Decimal::new(close, 2));
                updater.apply(&mut zones, &bar, dec!(1));
                prop_assert!(zones[0].pressure >= Decimal::ZERO);
                prop_assert!(zones[0].pressure <= Decimal::ONE);
                prop_assert!(zones[0].low <= zones[0].high);
            }
        }
    }
}
