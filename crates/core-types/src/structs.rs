use crate::enums::{ZoneSide, ZoneState};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One sampling interval of market data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    /// Creates a validated bar.
    ///
    /// A bar is rejected when any price or the volume is negative, or when its
    /// range is inverted (`high < low`). Open and close are not forced into the
    /// range since some feeds report closes marginally outside the printed
    /// high/low.
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Result<Self, CoreError> {
        for (name, price) in [("open", open), ("high", high), ("low", low), ("close", close)] {
            ensure_non_negative("bar", name, price)?;
        }
        if high < low {
            return Err(CoreError::InvalidInput(
                "bar".to_string(),
                format!("high {} is below low {}", high, low),
            ));
        }
        if volume.is_sign_negative() && !volume.is_zero() {
            return Err(CoreError::InvalidInput(
                "bar".to_string(),
                format!("volume {} is negative", volume),
            ));
        }
        Ok(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// High minus low.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }
}

/// A top-of-book quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub bid: Decimal,
    pub ask: Decimal,
}

impl Tick {
    /// Creates a validated tick. Negative prices and a crossed quote
    /// (`bid > ask`) are rejected.
    pub fn new(timestamp: DateTime<Utc>, bid: Decimal, ask: Decimal) -> Result<Self, CoreError> {
        ensure_non_negative("tick", "bid", bid)?;
        ensure_non_negative("tick", "ask", ask)?;
        if bid > ask {
            return Err(CoreError::InvalidInput(
                "tick".to_string(),
                format!("bid {} is above ask {}", bid, ask),
            ));
        }
        Ok(Self { timestamp, bid, ask })
    }

    /// Midpoint of the quote.
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}

fn ensure_non_negative(record: &str, name: &str, price: Decimal) -> Result<(), CoreError> {
    if price < Decimal::ZERO {
        return Err(CoreError::InvalidInput(
            record.to_string(),
            format!("{} {} is negative", name, price),
        ));
    }
    Ok(())
}

/// A detected demand or supply price band.
///
/// Zones are owned exclusively by their symbol's zone book. The `id` is unique
/// within a symbol and survives merges (the existing zone absorbs the candidate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: u64,
    pub side: ZoneSide,
    pub low: Decimal,
    pub high: Decimal,
    /// Strength in `[0, 1]`.
    pub pressure: Decimal,
    pub touch_count: u32,
    pub last_touched: DateTime<Utc>,
    pub state: ZoneState,
}

impl Zone {
    /// Width of the band.
    pub fn thickness(&self) -> Decimal {
        self.high - self.low
    }

    pub fn center(&self) -> Decimal {
        (self.low + self.high) / Decimal::TWO
    }

    /// True when `price` lies inside the band, edges included.
    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.low && price <= self.high
    }
}

/// Feature names exported to the feature bus.
pub const FEATURE_DIST_TO_DEMAND: &str = "zone.dist_to_demand_atr";
pub const FEATURE_DIST_TO_SUPPLY: &str = "zone.dist_to_supply_atr";
pub const FEATURE_BREAKOUT_SCORE: &str = "zone.breakout_score";
pub const FEATURE_PRESSURE: &str = "zone.pressure";

/// Immutable read-model of a symbol's zones relative to the current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    /// Last observed price; `None` before any bar or tick.
    pub price: Option<Decimal>,
    pub nearest_demand: Option<Zone>,
    pub nearest_supply: Option<Zone>,
    /// Distance to the nearest demand zone in ATR units (`Decimal::MAX` if none).
    pub dist_to_demand_atr: Decimal,
    /// Distance to the nearest supply zone in ATR units (`Decimal::MAX` if none).
    pub dist_to_supply_atr: Decimal,
    /// Breakout probability for the nearest opposing zone, in `[0, 1]`.
    pub breakout_score: Decimal,
    /// Pressure of the nearest opposing zone.
    pub pressure: Decimal,
}

impl ZoneSnapshot {
    /// The snapshot returned for a symbol with no data.
    pub fn neutral(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            timestamp: DateTime::<Utc>::default(),
            price: None,
            nearest_demand: None,
            nearest_supply: None,
            dist_to_demand_atr: Decimal::MAX,
            dist_to_supply_atr: Decimal::MAX,
            breakout_score: Decimal::ZERO,
            pressure: Decimal::ZERO,
        }
    }

    /// The named scalar facts published for this snapshot.
    pub fn features(&self) -> [(&'static str, Decimal); 4] {
        [
            (FEATURE_DIST_TO_DEMAND, self.dist_to_demand_atr),
            (FEATURE_DIST_TO_SUPPLY, self.dist_to_supply_atr),
            (FEATURE_BREAKOUT_SCORE, self.breakout_score),
            (FEATURE_PRESSURE, self.pressure),
        ]
    }
}
