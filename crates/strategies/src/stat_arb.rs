//! Pairs trading on the spread between an asset and its benchmark.
//!
//! Every bar, the trailing `lookback_period` closes of both series are taken
//! from a sliding buffer and assessed from scratch:
//!
//! 1. hedge ratio = OLS slope of asset on benchmark,
//! 2. spread = asset - ratio * benchmark over the window,
//! 3. ADF p-value of the spread (cointegration),
//! 4. half-life of the spread,
//! 5. z-score of the latest spread against the window.
//!
//! A `PairTrader` then turns the sequence of assessments into positions,
//! evaluating exits before entries.

use crate::error::StrategyError;
use crate::Strategy;
use chrono::{DateTime, Utc};
use configuration::StatArbParams;
use core_types::{Direction, MarketData, Signal, StrategyId};
use serde::{Deserialize, Serialize};
use statistics::{
    SlidingWindow, StatsError, adf_test, estimate_half_life, hedge_ratio, mean, sample_std,
    zscore_of_last,
};
use tracing::debug;

/// Diagnostics of one rolling window. Never carried between runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgePairState {
    pub timestamp: DateTime<Utc>,
    pub hedge_ratio: f64,
    /// Spread at the window's last bar.
    pub spread: f64,
    pub spread_mean: f64,
    pub spread_std: f64,
    /// Estimated AR(1) coefficient of spread changes on lagged spread.
    pub mean_reversion_speed: Option<f64>,
    pub half_life: Option<f64>,
    pub cointegration_pvalue: Option<f64>,
    pub zscore: Option<f64>,
}

impl HedgePairState {
    /// Assesses one window of aligned closes.
    pub fn assess(
        timestamp: DateTime<Utc>,
        asset: &[f64],
        benchmark: &[f64],
    ) -> Result<Self, StatsError> {
        let ratio = hedge_ratio(asset, benchmark)?;
        let spread: Vec<f64> = asset
            .iter()
            .zip(benchmark)
            .map(|(a, b)| a - ratio * b)
            .collect();

        let reversion = estimate_half_life(&spread).ok();
        let cointegration_pvalue = match adf_test(&spread, None) {
            Ok(result) => Some(result.p_value),
            Err(e) => {
                debug!(%timestamp, error = %e, "ADF test failed for window");
                None
            }
        };

        Ok(Self {
            timestamp,
            hedge_ratio: ratio,
            spread: spread.last().copied().unwrap_or_default(),
            spread_mean: mean(&spread).unwrap_or_default(),
            spread_std: sample_std(&spread).unwrap_or_default(),
            mean_reversion_speed: reversion.map(|r| r.lambda),
            half_life: reversion.and_then(|r| r.half_life),
            cointegration_pvalue,
            zscore: zscore_of_last(&spread),
        })
    }

    /// True when the window passes both the cointegration and the half-life
    /// checks and has a defined z-score.
    pub fn is_tradeable(&self, params: &StatArbParams) -> bool {
        let cointegrated = self
            .cointegration_pvalue
            .is_some_and(|p| p <= params.confidence_level);
        let reverting = self.half_life.is_some_and(|h| h >= params.min_half_life);
        cointegrated && reverting && self.zscore.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenPair {
    side: Direction,
    hedge_ratio: f64,
    bars_held: usize,
}

/// Position state machine for one pairs run.
#[derive(Debug, Clone)]
pub struct PairTrader {
    params: StatArbParams,
    open: Option<OpenPair>,
}

impl PairTrader {
    pub fn new(params: StatArbParams) -> Self {
        Self { params, open: None }
    }

    pub fn position(&self) -> Direction {
        self.open.map(|p| p.side).unwrap_or_default()
    }

    /// Consumes the assessment of the window ending at `timestamp` and returns
    /// the target position for that bar.
    pub fn step(&mut self, timestamp: DateTime<Utc>, state: Option<&HedgePairState>) -> Signal {
        // --- 1. EXITS ---
        if let Some(open) = self.open.as_mut() {
            open.bars_held += 1;

            let exit_reason = match state {
                None => Some("window could not be assessed"),
                Some(s) if !s.is_tradeable(&self.params) => Some("pair failed re-validation"),
                Some(s) if s.zscore.is_some_and(|z| z.abs() <= self.params.exit_zscore) => {
                    Some("spread reverted")
                }
                Some(_) if open.bars_held >= self.params.max_position_hold => Some("time stop"),
                Some(_) => None,
            };

            if let Some(reason) = exit_reason {
                debug!(%timestamp, side = %open.side, bars_held = open.bars_held, reason, "Pair exit");
                self.open = None;
                // Flat for at least one bar after an exit.
                return Signal::flat(timestamp);
            }

            let (side, ratio) = (open.side, open.hedge_ratio);
            let z = state.and_then(|s| s.zscore).unwrap_or_default();
            return Signal::new(timestamp, side, self.strength(z)).hedged(ratio);
        }

        // --- 2. ENTRIES ---
        let Some(state) = state.filter(|s| s.is_tradeable(&self.params)) else {
            return Signal::flat(timestamp);
        };
        let Some(z) = state.zscore else {
            return Signal::flat(timestamp);
        };

        let side = if z >= self.params.entry_zscore {
            Direction::Short
        } else if z <= -self.params.entry_zscore {
            Direction::Long
        } else {
            return Signal::flat(timestamp);
        };

        debug!(
            %timestamp,
            %side,
            z,
            hedge_ratio = state.hedge_ratio,
            half_life = ?state.half_life,
            p_value = ?state.cointegration_pvalue,
            "Pair entry"
        );
        self.open = Some(OpenPair {
            side,
            hedge_ratio: state.hedge_ratio,
            bars_held: 0,
        });
        Signal::new(timestamp, side, self.strength(z)).hedged(state.hedge_ratio)
    }

    fn strength(&self, z: f64) -> f64 {
        (z.abs() / self.params.entry_zscore).min(1.0)
    }
}

/// Statistical arbitrage on an asset/benchmark pair.
///
/// A `Long` signal is long the spread: long the asset and short
/// `hedge_ratio` units of the benchmark. `Short` is the reverse.
#[derive(Debug, Clone)]
pub struct StatisticalArbitrage {
    params: StatArbParams,
}

impl StatisticalArbitrage {
    pub fn new(params: StatArbParams) -> Result<Self, StrategyError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &StatArbParams {
        &self.params
    }

    /// Per-bar window diagnostics; `None` until the first full window and for
    /// windows whose regression is degenerate.
    pub fn analyze(&self, data: &MarketData<'_>) -> Result<Vec<Option<HedgePairState>>, StrategyError> {
        let benchmark = data
            .benchmark
            .ok_or_else(|| StrategyError::MissingBenchmark(self.name().to_string()))?;
        data.prices
            .ensure_aligned(benchmark)
            .map_err(StrategyError::Alignment)?;

        let lookback = self.params.lookback_period;
        let mut asset_window = SlidingWindow::new(lookback);
        let mut benchmark_window = SlidingWindow::new(lookback);
        let mut states = Vec::with_capacity(data.len());

        for (bar, bench) in data.prices.bars().iter().zip(benchmark.bars()) {
            asset_window.push(bar.close);
            benchmark_window.push(bench.close);
            if !asset_window.is_full() {
                states.push(None);
                continue;
            }

            let state = HedgePairState::assess(
                bar.timestamp,
                asset_window.as_slice(),
                benchmark_window.as_slice(),
            );
            match state {
                Ok(state) => states.push(Some(state)),
                Err(e) => {
                    debug!(timestamp = %bar.timestamp, error = %e, "Window skipped");
                    states.push(None);
                }
            }
        }

        Ok(states)
    }
}

impl Strategy for StatisticalArbitrage {
    fn id(&self) -> StrategyId {
        StrategyId::StatisticalArbitrage
    }

    fn min_lookback(&self) -> usize {
        self.params.lookback_period + 1
    }

    fn requires_benchmark(&self) -> bool {
        true
    }

    fn generate_signals(&self, data: &MarketData<'_>) -> Result<Vec<Signal>, StrategyError> {
        let states = self.analyze(data)?;
        let mut trader = PairTrader::new(self.params);

        Ok(data
            .prices
            .bars()
            .iter()
            .zip(&states)
            .map(|(bar, state)| trader.step(bar.timestamp, state.as_ref()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use core_types::{PriceBar, PriceSeries};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn ts(i: usize) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
    }

    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PriceBar::flat(ts(i), *c))
            .collect();
        PriceSeries::new(symbol, bars).unwrap()
    }

    fn random_walk(rng: &mut StdRng, n: usize, start: f64) -> Vec<f64> {
        let mut level = start;
        (0..n)
            .map(|_| {
                level += rng.gen_range(-1.0..1.0);
                level
            })
            .collect()
    }

    fn params(lookback_period: usize) -> StatArbParams {
        StatArbParams {
            lookback_period,
            entry_zscore: 2.0,
            exit_zscore: 0.5,
            max_position_hold: 20,
            min_half_life: 1.0,
            confidence_level: 0.05,
        }
    }

    fn state(z: f64, p_value: f64) -> HedgePairState {
        HedgePairState {
            timestamp: ts(0),
            hedge_ratio: 1.5,
            spread: 0.0,
            spread_mean: 0.0,
            spread_std: 1.0,
            mean_reversion_speed: Some(-0.1),
            half_life: Some(6.9),
            cointegration_pvalue: Some(p_value),
            zscore: Some(z),
        }
    }

    #[test]
    fn hedge_ratio_converges_with_longer_lookback() {
        let mut rng = StdRng::seed_from_u64(2024);
        let benchmark = random_walk(&mut rng, 600, 100.0);
        let asset: Vec<f64> = benchmark
            .iter()
            .map(|b| 2.0 * b + rng.gen_range(-1.0..1.0))
            .collect();
        let (a, b) = (series("A", &asset), series("B", &benchmark));
        let data = MarketData::with_benchmark(&a, &b);

        let mean_error = |lookback: usize| {
            let states = StatisticalArbitrage::new(params(lookback))
                .unwrap()
                .analyze(&data)
                .unwrap();
            let errors: Vec<f64> = states
                .iter()
                .flatten()
                .map(|s| (s.hedge_ratio - 2.0).abs())
                .collect();
            errors.iter().sum::<f64>() / errors.len() as f64
        };

        let short = mean_error(20);
        let long = mean_error(250);
        assert!(long < short, "short = {}, long = {}", short, long);
        assert!(long < 0.05, "long-window error = {}", long);
    }

    #[test]
    fn no_entry_when_cointegration_fails() {
        let mut trader = PairTrader::new(params(60));
        let signal = trader.step(ts(0), Some(&state(5.0, 0.9)));
        assert_eq!(signal.direction, Direction::Flat);
        assert_eq!(trader.position(), Direction::Flat);
    }

    #[test]
    fn random_walk_spread_never_enters() {
        let mut rng = StdRng::seed_from_u64(99);
        let benchmark = random_walk(&mut rng, 500, 100.0);
        let drift = random_walk(&mut rng, 500, 0.0);
        let asset: Vec<f64> = benchmark.iter().zip(&drift).map(|(b, d)| b + 3.0 * d).collect();
        let (a, b) = (series("A", &asset), series("B", &benchmark));
        let data = MarketData::with_benchmark(&a, &b);

        let mut p = params(60);
        p.confidence_level = 1e-9;
        let strategy = StatisticalArbitrage::new(p).unwrap();

        let stretched = strategy
            .analyze(&data)
            .unwrap()
            .iter()
            .flatten()
            .filter(|s| s.zscore.is_some_and(|z| z.abs() >= p.entry_zscore))
            .count();
        assert!(stretched > 0);

        let signals = strategy.generate_signals(&data).unwrap();
        assert!(signals.iter().all(|s| s.direction == Direction::Flat));
    }

    #[test]
    fn enters_short_spread_and_exits_on_reversion() {
        let mut trader = PairTrader::new(params(60));
        let entry = trader.step(ts(0), Some(&state(2.5, 0.01)));
        assert_eq!(entry.direction, Direction::Short);
        assert_eq!(entry.hedge_ratio, Some(1.5));

        let held = trader.step(ts(1), Some(&state(1.2, 0.01)));
        assert_eq!(held.direction, Direction::Short);

        // Exit bar stays flat even though the spread is stretched the other way.
        let mut reverted = state(0.3, 0.01);
        reverted.zscore = Some(-0.3);
        assert_eq!(trader.step(ts(2), Some(&reverted)).direction, Direction::Flat);
    }

    #[test]
    fn no_flip_on_exit_bar() {
        let mut p = params(60);
        p.exit_zscore = 0.5;
        let mut trader = PairTrader::new(p);
        trader.step(ts(0), Some(&state(3.0, 0.01)));
        // Re-validation fails while z is deep on the other side.
        let signal = trader.step(ts(1), Some(&state(-3.0, 0.5)));
        assert_eq!(signal.direction, Direction::Flat);
        let next = trader.step(ts(2), Some(&state(-3.0, 0.01)));
        assert_eq!(next.direction, Direction::Long);
    }

    #[test]
    fn time_stop_closes_after_max_hold() {
        let mut p = params(60);
        p.max_position_hold = 3;
        let mut trader = PairTrader::new(p);
        trader.step(ts(0), Some(&state(-2.5, 0.01)));
        assert_eq!(trader.step(ts(1), Some(&state(-2.5, 0.01))).direction, Direction::Long);
        assert_eq!(trader.step(ts(2), Some(&state(-2.5, 0.01))).direction, Direction::Long);
        assert_eq!(trader.step(ts(3), Some(&state(-2.5, 0.01))).direction, Direction::Flat);
    }

    #[test]
    fn cointegrated_pair_trades_without_flipping() {
        let mut rng = StdRng::seed_from_u64(5);
        let benchmark = random_walk(&mut rng, 600, 100.0);
        let mut s = 0.0;
        let asset: Vec<f64> = benchmark
            .iter()
            .map(|b| {
                s = 0.8 * s + rng.gen_range(-1.0..1.0);
                10.0 + 1.5 * b + s
            })
            .collect();
        let (a, b) = (series("A", &asset), series("B", &benchmark));
        let strategy = StatisticalArbitrage::new(params(120)).unwrap();
        let signals = strategy
            .generate_signals(&MarketData::with_benchmark(&a, &b))
            .unwrap();

        assert_eq!(signals.len(), 600);
        assert!(signals[..119].iter().all(|s| s.direction == Direction::Flat));
        assert!(signals.iter().any(|s| !s.direction.is_flat()));
        assert!(signals
            .iter()
            .filter(|s| !s.direction.is_flat())
            .all(|s| s.hedge_ratio.is_some()));
        assert!(signals
            .windows(2)
            .all(|w| w[0].direction.is_flat() || w[1].direction != w[0].direction.opposite()));
    }

    #[test]
    fn requires_aligned_benchmark() {
        let strategy = StatisticalArbitrage::new(params(20)).unwrap();
        let a = series("A", &[1.0; 30]);
        assert!(matches!(
            strategy.generate_signals(&MarketData::new(&a)),
            Err(StrategyError::MissingBenchmark(_))
        ));

        let b = series("B", &[1.0; 29]);
        assert!(matches!(
            strategy.generate_signals(&MarketData::with_benchmark(&a, &b)),
            Err(StrategyError::Alignment(_))
        ));
    }
}
