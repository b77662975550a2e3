#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_types::{Direction, MarketData, PriceBar, PriceSeries, Signal, StrategyId};
use strategies::{Strategy, StrategyError};

pub fn ts(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
}

pub fn bar(day: i64, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
    PriceBar {
        timestamp: ts(day),
        open,
        high,
        low,
        close,
        volume: 1_000.0,
    }
}

/// Bars whose open, high, low and close are all `close`.
pub fn flat_series(symbol: &str, closes: &[f64]) -> PriceSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, c)| bar(i as i64, *c, *c, *c, *c))
        .collect();
    PriceSeries::new(symbol, bars).unwrap()
}

/// Emits a fixed sequence of directions, one per bar, then stays flat.
pub struct Scripted {
    pub script: Vec<Direction>,
}

impl Scripted {
    /// `Long` on every bar in `from..to`, flat elsewhere.
    pub fn long_between(from: usize, to: usize, len: usize) -> Self {
        Self {
            script: (0..len)
                .map(|i| if (from..to).contains(&i) { Direction::Long } else { Direction::Flat })
                .collect(),
        }
    }
}

impl Strategy for Scripted {
    fn id(&self) -> StrategyId {
        StrategyId::Momentum
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn min_lookback(&self) -> usize {
        1
    }

    fn generate_signals(&self, data: &MarketData<'_>) -> Result<Vec<Signal>, StrategyError> {
        Ok(data
            .prices
            .bars()
            .iter()
            .enumerate()
            .map(|(i, b)| Signal::new(b.timestamp, self.script.get(i).copied().unwrap_or_default(), 1.0))
            .collect())
    }
}
