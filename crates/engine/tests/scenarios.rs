use chrono::{DateTime, TimeZone, Utc};
use configuration::ZoneParams;
use core_types::{ZoneSide, ZoneSnapshot, ZoneState};
use engine::ZoneEngine;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn at(minute: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + minute * 60, 0).unwrap()
}

fn engine() -> ZoneEngine {
    ZoneEngine::new(ZoneParams::default()).unwrap()
}

/// Bars with the given highs, each one point tall and closing mid-range.
fn feed_highs(engine: &ZoneEngine, symbol: &str, highs: &[i64]) {
    for (i, high) in highs.iter().enumerate() {
        let high = Decimal::from(*high);
        let close = high - dec!(0.5);
        engine
            .on_bar(symbol, at(i as i64), close, high, high - dec!(1), close, dec!(100))
            .unwrap();
    }
}

#[test]
fn three_flat_bars_create_no_zones() {
    let engine = engine();
    for i in 0..3 {
        engine
            .on_bar("ES", at(i), dec!(100), dec!(100), dec!(100), dec!(100), dec!(1))
            .unwrap();
    }
    assert!(engine.zones("ES").is_empty());

    let snapshot = engine.snapshot("ES");
    assert_eq!(snapshot.dist_to_demand_atr, Decimal::MAX);
    assert_eq!(snapshot.dist_to_supply_atr, Decimal::MAX);
    assert_eq!(snapshot.breakout_score, Decimal::ZERO);
}

#[test]
fn extreme_ranges_are_processed_without_overflow() {
    let engine = engine();
    let huge = Decimal::from_i128_with_scale(10i128.pow(28), 0);
    for i in 0..3 {
        engine
            .on_bar("X", at(i), huge, huge, Decimal::ZERO, huge, dec!(1))
            .unwrap();
    }
    let snapshot = engine.snapshot("X");
    assert_eq!(snapshot.price, Some(huge));
    assert_eq!(snapshot.breakout_score, Decimal::ZERO);
}

#[test]
fn single_swing_high_creates_one_supply_zone() {
    let engine = engine();
    feed_highs(&engine, "ES", &[100, 101, 102, 105, 101, 100, 99]);

    let zones = engine.zones("ES");
    assert_eq!(zones.len(), 1);
    let zone = &zones[0];
    assert_eq!(zone.side, ZoneSide::Supply);
    assert_eq!(zone.center(), dec!(105));
    assert!(zone.low < dec!(105) && zone.high > dec!(105));
    assert_eq!(zone.touch_count, 1);
}

#[test]
fn close_far_above_supply_is_a_breakout() {
    let engine = engine();
    feed_highs(&engine, "ES", &[100, 101, 102, 105, 101, 100, 99]);
    engine
        .on_bar("ES", at(7), dec!(99), dec!(110.5), dec!(98.5), dec!(110), dec!(100))
        .unwrap();

    let zones = engine.zones("ES");
    let supply: Vec<_> = zones.iter().filter(|z| z.side == ZoneSide::Supply).collect();
    assert_eq!(supply.len(), 1);
    assert_eq!(supply[0].state, ZoneState::Breakout);
}

#[test]
fn unknown_symbol_gets_a_neutral_snapshot() {
    let engine = engine();
    feed_highs(&engine, "ES", &[100, 101, 102, 105, 101, 100, 99]);

    let snapshot = engine.snapshot("UNKNOWN");
    assert_eq!(snapshot, ZoneSnapshot::neutral("UNKNOWN"));
    assert_eq!(snapshot.dist_to_demand_atr, Decimal::MAX);
    assert_eq!(snapshot.dist_to_supply_atr, Decimal::MAX);
    assert_eq!(snapshot.breakout_score, Decimal::ZERO);
    assert_eq!(snapshot.pressure, Decimal::ZERO);
    assert!(snapshot.nearest_demand.is_none());
    assert!(snapshot.nearest_supply.is_none());
    assert!(engine.zones("UNKNOWN").is_empty());
}

#[test]
fn repeated_snapshots_are_identical() {
    let engine = engine();
    feed_highs(&engine, "ES", &[100, 101, 102, 105, 101, 100, 99, 98, 97]);

    let first = engine.snapshot("ES");
    let second = engine.snapshot("ES");
    assert_eq!(first, second);
    assert!(first.nearest_supply.is_some());
}

#[test]
fn ticks_reprice_the_snapshot_between_bars() {
    let engine = engine();
    feed_highs(&engine, "ES", &[100, 101, 102, 105, 101, 100, 99]);
    let before = engine.snapshot("ES");

    // Mid of 103.9/104.1 is 104, closer to the supply zone than the last close.
    engine.on_tick("ES", dec!(103.9), dec!(104.1), at(7)).unwrap();
    let after = engine.snapshot("ES");

    assert_eq!(after.price, Some(dec!(104)));
    assert_eq!(after.timestamp, at(7));
    assert!(after.dist_to_supply_atr < before.dist_to_supply_atr);
    assert_eq!(after.nearest_supply, before.nearest_supply);
}

#[test]
fn swing_low_supplies_demand_below_price() {
    let engine = engine();
    let lows = [100, 99, 98, 95, 99, 100, 101];
    for (i, low) in lows.iter().enumerate() {
        let low = Decimal::from(*low);
        let close = low + dec!(0.5);
        engine
            .on_bar("NQ", at(i as i64), close, low + dec!(1), low, close, dec!(100))
            .unwrap();
    }

    let snapshot = engine.snapshot("NQ");
    let demand = snapshot.nearest_demand.clone().unwrap();
    assert_eq!(demand.side, ZoneSide::Demand);
    assert_eq!(demand.center(), dec!(95));
    assert!(snapshot.nearest_supply.is_none());
    // With no supply above, the demand zone is the opposing zone.
    assert_eq!(snapshot.pressure, demand.pressure);
    assert!(snapshot.breakout_score > Decimal::ZERO);
    assert!(snapshot.dist_to_demand_atr > Decimal::ZERO);
    assert_eq!(snapshot.dist_to_supply_atr, Decimal::MAX);
}
