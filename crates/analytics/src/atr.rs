use rust_decimal::Decimal;

/// A recursive average true range using Wilder smoothing.
///
/// The first update seeds the average with the bar's high-low range. Every
/// later update blends in the true range:
/// `atr = (atr * (N - 1) + tr) / N`, computed as `atr + (tr - atr) / N` so the
/// intermediate never leaves the range spanned by `atr` and `tr`.
#[derive(Debug, Clone)]
pub struct SmoothedRange {
    period: Decimal,
    value: Decimal,
    prev_close: Option<Decimal>,
}

impl SmoothedRange {
    /// Creates a new estimator. A period of zero is clamped to one.
    pub fn new(period: usize) -> Self {
        Self {
            period: Decimal::from(period.max(1)),
            value: Decimal::ZERO,
            prev_close: None,
        }
    }

    /// Feeds one bar and returns the updated average.
    pub fn update(&mut self, high: Decimal, low: Decimal, close: Decimal) -> Decimal {
        let range = high - low;
        self.value = match self.prev_close {
            None => range,
            Some(prev_close) => {
                let true_range = range
                    .max((high - prev_close).abs())
                    .max((low - prev_close).abs());
                self.value + (true_range - self.value) / self.period
            }
        };
        self.prev_close = Some(close);
        self.value
    }

    /// The raw smoothed value, zero before the first update.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// The value used as a divisor: falls back to one when non-positive.
    pub fn effective(&self) -> Decimal {
        if self.value > Decimal::ZERO {
            self.value
        } else {
            Decimal::ONE
        }
    }

    pub fn is_seeded(&self) -> bool {
        self.prev_close.is_some()
    }
}
