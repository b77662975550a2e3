use crate::enums::Direction;
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// True when every price and the volume are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }

    /// A bar that repeats `close` for every price, used to forward-fill bad data.
    pub fn flat(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }
}

/// An immutable, time-ordered series of bars for one symbol.
///
/// Construction enforces strictly increasing timestamps, so a `PriceSeries`
/// never contains duplicates or out-of-order bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, CoreError> {
        let symbol = symbol.into();
        if let Some(pair) = bars.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(CoreError::Unordered {
                symbol,
                timestamp: pair[1].timestamp,
            });
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    /// Fails with `CoreError::Alignment` unless both series share exactly the
    /// same timestamps.
    pub fn ensure_aligned(&self, other: &PriceSeries) -> Result<(), CoreError> {
        let misaligned = |reason: String| CoreError::Alignment {
            left: self.symbol.clone(),
            right: other.symbol.clone(),
            reason,
        };

        if self.len() != other.len() {
            return Err(misaligned(format!(
                "lengths differ ({} vs {})",
                self.len(),
                other.len()
            )));
        }
        if let Some((a, b)) = self
            .bars
            .iter()
            .zip(other.bars.iter())
            .find(|(a, b)| a.timestamp != b.timestamp)
        {
            return Err(misaligned(format!(
                "timestamp {} does not match {}",
                a.timestamp, b.timestamp
            )));
        }
        Ok(())
    }
}

/// Everything a strategy or the engine reads for one run: the traded series
/// and, for pairs strategies, the benchmark (hedge) series.
#[derive(Debug, Clone, Copy)]
pub struct MarketData<'a> {
    pub prices: &'a PriceSeries,
    pub benchmark: Option<&'a PriceSeries>,
}

impl<'a> MarketData<'a> {
    pub fn new(prices: &'a PriceSeries) -> Self {
        Self {
            prices,
            benchmark: None,
        }
    }

    pub fn with_benchmark(prices: &'a PriceSeries, benchmark: &'a PriceSeries) -> Self {
        Self {
            prices,
            benchmark: Some(benchmark),
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// A strategy's decision for one bar.
///
/// `hedge_ratio` is set by pairs strategies: a `Long` signal then means long
/// the asset and short `hedge_ratio` units of the benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    /// Conviction in `[0, 1]`.
    pub strength: f64,
    pub hedge_ratio: Option<f64>,
}

impl Signal {
    pub fn flat(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            direction: Direction::Flat,
            strength: 0.0,
            hedge_ratio: None,
        }
    }

    pub fn new(timestamp: DateTime<Utc>, direction: Direction, strength: f64) -> Self {
        Self {
            timestamp,
            direction,
            strength: if direction.is_flat() {
                0.0
            } else {
                strength.clamp(0.0, 1.0)
            },
            hedge_ratio: None,
        }
    }

    pub fn hedged(mut self, hedge_ratio: f64) -> Self {
        self.hedge_ratio = Some(hedge_ratio);
        self
    }
}

/// The benchmark leg of a pairs position, held opposite to the asset leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgeLeg {
    pub ratio: f64,
    pub entry_price: f64,
}

/// The single active position of a strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: Direction,
    pub entry_timestamp: DateTime<Utc>,
    pub entry_price: f64,
    /// Units of the asset; always positive for an open position.
    pub size: f64,
    /// Number of bar closes the position has been held through.
    pub hold_count: usize,
    pub hedge: Option<HedgeLeg>,
    /// Fee paid when the position was opened.
    pub entry_fee: f64,
}

impl Position {
    /// Mark-to-market value of the position, given the current prices.
    ///
    /// Long: `size * price`. Short: `-size * price`. The hedge leg is valued
    /// with the opposite sign.
    pub fn market_value(&self, price: f64, benchmark_price: Option<f64>) -> f64 {
        let asset = self.side.sign() * self.size * price;
        let hedge = match (self.hedge, benchmark_price) {
            (Some(leg), Some(bench)) => -self.side.sign() * self.size * leg.ratio * bench,
            _ => 0.0,
        };
        asset + hedge
    }

    /// Gross notional of both legs at the given prices.
    pub fn notional(&self, price: f64, benchmark_price: Option<f64>) -> f64 {
        let hedge = match (self.hedge, benchmark_price) {
            (Some(leg), Some(bench)) => (self.size * leg.ratio * bench).abs(),
            _ => 0.0,
        };
        self.size * price + hedge
    }

    /// Price P&L (before fees) if closed at the given prices.
    pub fn unrealized_pnl(&self, price: f64, benchmark_price: Option<f64>) -> f64 {
        let asset = self.side.sign() * self.size * (price - self.entry_price);
        let hedge = match (self.hedge, benchmark_price) {
            (Some(leg), Some(bench)) => {
                -self.side.sign() * self.size * leg.ratio * (bench - leg.entry_price)
            }
            _ => 0.0,
        };
        asset + hedge
    }
}

/// A closed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_timestamp: DateTime<Utc>,
    pub exit_timestamp: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub side: Direction,
    pub size: f64,
    /// Net of entry and exit fees, including the hedge leg when present.
    pub pnl: f64,
    pub fees: f64,
    pub hedge_ratio: Option<f64>,
    pub bars_held: usize,
}

/// The complete, immutable outcome of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSeries {
    pub run_id: Uuid,
    pub strategy: String,
    pub symbol: String,
    pub initial_capital: f64,
    pub timestamps: Vec<DateTime<Utc>>,
    pub equity: Vec<f64>,
    /// One-bar returns of the equity curve; the first entry is zero.
    pub strategy_returns: Vec<f64>,
    /// `equity / initial_capital - 1` per bar.
    pub cumulative_returns: Vec<f64>,
    /// Buy-and-hold cumulative return of the traded asset per bar.
    pub market_returns: Vec<f64>,
    /// Side held at each bar's close.
    pub positions: Vec<Direction>,
    pub trades: Vec<Trade>,
    /// Position still open after the final bar, if any.
    pub open_position: Option<Position>,
    /// Bars whose non-finite values were replaced by the previous close.
    pub skipped_bars: Vec<DateTime<Utc>>,
    pub total_fees: f64,
}

impl ResultSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn final_equity(&self) -> f64 {
        self.equity.last().copied().unwrap_or(self.initial_capital)
    }

    /// Total P&L including the open position marked at the last close.
    pub fn total_pnl(&self) -> f64 {
        self.final_equity() - self.initial_capital
    }

    /// Strategy returns paired with their timestamps, skipping the first bar
    /// which has no prior equity to compare against.
    pub fn returns_by_timestamp(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.strategy_returns.iter().copied())
            .skip(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bar(day: i64, close: f64) -> PriceBar {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day);
        PriceBar::flat(ts, close)
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let err = PriceSeries::new("AAA", vec![bar(0, 1.0), bar(0, 2.0)]).unwrap_err();
        assert!(matches!(err, CoreError::Unordered { .. }));
    }

    #[test]
    fn alignment_reports_first_mismatch() {
        let a = PriceSeries::new("AAA", vec![bar(0, 1.0), bar(1, 1.0)]).unwrap();
        let b = PriceSeries::new("BBB", vec![bar(0, 1.0), bar(2, 1.0)]).unwrap();
        assert!(matches!(a.ensure_aligned(&b), Err(CoreError::Alignment { .. })));
        assert!(a.ensure_aligned(&a.clone()).is_ok());
    }

    #[test]
    fn short_position_gains_when_price_falls() {
        let position = Position {
            side: Direction::Short,
            entry_timestamp: bar(0, 0.0).timestamp,
            entry_price: 100.0,
            size: 2.0,
            hold_count: 0,
            hedge: None,
            entry_fee: 0.0,
        };
        assert_eq!(position.unrealized_pnl(90.0, None), 20.0);
        assert_eq!(position.market_value(90.0, None), -180.0);
    }

    #[test]
    fn hedged_position_nets_both_legs() {
        let position = Position {
            side: Direction::Long,
            entry_timestamp: bar(0, 0.0).timestamp,
            entry_price: 100.0,
            size: 1.0,
            hold_count: 0,
            hedge: Some(HedgeLeg {
                ratio: 2.0,
                entry_price: 50.0,
            }),
            entry_fee: 0.0,
        };
        // Both legs move by the same hedged amount, so the spread is unchanged.
        assert!(position.unrealized_pnl(110.0, Some(55.0)).abs() < 1e-12);
        assert_eq!(position.notional(100.0, Some(50.0)), 200.0);
    }

    #[test]
    fn flat_signals_have_zero_strength() {
        let signal = Signal::new(bar(0, 0.0).timestamp, Direction::Flat, 0.8);
        assert_eq!(signal.strength, 0.0);
        let signal = Signal::new(bar(0, 0.0).timestamp, Direction::Long, 3.0);
        assert_eq!(signal.strength, 1.0);
    }
}
