use crate::cancellation::CancellationToken;
use crate::error::BacktestError;
use crate::instrumentation::{RunContext, RunInstrumentation, TracingInstrumentation};
use crate::portfolio::{Portfolio, Quote};
use chrono::{DateTime, Utc};
use configuration::BacktestSettings;
use core_types::{Direction, MarketData, PriceBar, PriceSeries, ResultSeries, Signal};
use std::sync::Arc;
use std::time::Instant;
use strategies::Strategy;
use tracing::{debug, info_span, warn};
use uuid::Uuid;

/// The main backtesting engine.
///
/// A `Backtester` holds only configuration and shared observers; every call to
/// `run` builds its own portfolio, so one engine can drive many runs at once.
#[derive(Clone)]
pub struct Backtester {
    settings: BacktestSettings,
    instrumentation: Arc<dyn RunInstrumentation>,
    cancellation: CancellationToken,
}

/// Bars after cleaning, plus the timestamps that had to be forward-filled.
struct PreparedData {
    prices: PriceSeries,
    benchmark: Option<PriceSeries>,
    skipped: Vec<DateTime<Utc>>,
}

impl Backtester {
    pub fn new(settings: BacktestSettings) -> Result<Self, BacktestError> {
        settings.validate()?;
        Ok(Self {
            settings,
            instrumentation: Arc::new(TracingInstrumentation),
            cancellation: CancellationToken::new(),
        })
    }

    pub fn with_instrumentation(mut self, instrumentation: Arc<dyn RunInstrumentation>) -> Self {
        self.instrumentation = instrumentation;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn settings(&self) -> &BacktestSettings {
        &self.settings
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Simulates `strategy` over `data` and returns the complete result.
    ///
    /// On error no partial result is produced.
    pub fn run(&self, strategy: &dyn Strategy, data: &MarketData<'_>) -> Result<ResultSeries, BacktestError> {
        let context = RunContext {
            run_id: Uuid::new_v4(),
            strategy: strategy.name(),
            symbol: data.prices.symbol().to_string(),
            bars: data.len(),
        };
        let span = info_span!("backtest", strategy = context.strategy, run_id = %context.run_id);
        let _enter = span.enter();

        self.instrumentation.run_started(&context);
        let started = Instant::now();
        let result = self.simulate(strategy, data, &context);
        self.instrumentation
            .run_finished(&context, started.elapsed(), result.as_ref().map(|_| ()));
        result
    }

    fn simulate(
        &self,
        strategy: &dyn Strategy,
        data: &MarketData<'_>,
        context: &RunContext,
    ) -> Result<ResultSeries, BacktestError> {
        // --- 1. INPUT CONTRACTS ---
        let required = strategy.min_lookback().max(1);
        if data.len() < required {
            return Err(BacktestError::InsufficientData {
                required,
                available: data.len(),
            });
        }
        if strategy.requires_benchmark() {
            let benchmark = data
                .benchmark
                .ok_or_else(|| strategies::StrategyError::MissingBenchmark(strategy.name().to_string()))?;
            data.prices
                .ensure_aligned(benchmark)
                .map_err(BacktestError::Alignment)?;
        }

        let prepared = self.prepare(data, strategy.requires_benchmark(), context)?;
        let market = match &prepared.benchmark {
            Some(benchmark) => MarketData::with_benchmark(&prepared.prices, benchmark),
            None => MarketData::new(&prepared.prices),
        };

        // --- 2. SIGNALS ---
        let signals = strategy.generate_signals(&market)?;
        validate_signals(&signals, &prepared.prices)?;

        // --- 3. BAR LOOP ---
        let bars = prepared.prices.bars();
        let benchmark_bars = prepared.benchmark.as_ref().map(|b| b.bars());
        let last = bars.len() - 1;

        let mut portfolio = Portfolio::new(self.settings.initial_capital, self.settings.transaction_cost);
        let mut blocked_side: Option<Direction> = None;
        let mut pending: Option<&Signal> = None;

        let mut equity = Vec::with_capacity(bars.len());
        let mut positions = Vec::with_capacity(bars.len());

        for (t, bar) in bars.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                return Err(BacktestError::Cancelled { completed_bars: t });
            }
            let bench = benchmark_bars.map(|b| b[t]);
            let at_open = Quote {
                timestamp: bar.timestamp,
                price: bar.open,
                benchmark: bench.map(|b| b.open),
            };
            let closing_out = self.settings.close_open_position_at_end && t == last;

            // Time-based exit at the open.
            if let (Some(max_hold), Some(position)) = (self.settings.max_hold_bars, portfolio.position.as_ref()) {
                if position.hold_count >= max_hold {
                    let side = position.side;
                    portfolio.close(at_open, "time exit");
                    blocked_side = Some(side);
                }
            }

            // Signal from the previous bar executes at this bar's open.
            if let Some(signal) = pending.take() {
                if blocked_side.is_some_and(|side| side != signal.direction) {
                    blocked_side = None;
                }
                let target = if blocked_side == Some(signal.direction) {
                    Direction::Flat
                } else {
                    signal.direction
                };
                self.execute_signal(strategy, &mut portfolio, signal, target, at_open, !closing_out);
            }

            // Intra-bar protective exits for positions carried into this bar.
            if let Some(side) = self.check_stops(&mut portfolio, bar, bench) {
                blocked_side = Some(side);
            }

            let at_close = Quote {
                timestamp: bar.timestamp,
                price: bar.close,
                benchmark: bench.map(|b| b.close),
            };
            if closing_out {
                portfolio.close(at_close, "end of data");
            }

            equity.push(portfolio.equity(at_close.price, at_close.benchmark));
            positions.push(portfolio.side());

            if let Some(position) = portfolio.position.as_mut() {
                position.hold_count += 1;
            }
            pending = Some(&signals[t]);
        }

        // --- 4. RESULT ---
        let initial = self.settings.initial_capital;
        let closes = prepared.prices.closes();
        let first_close = closes[0];
        let strategy_returns = std::iter::once(0.0)
            .chain(equity.windows(2).map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 }))
            .collect();
        let cumulative_returns = equity.iter().map(|e| e / initial - 1.0).collect();
        let market_returns = closes.iter().map(|c| c / first_close - 1.0).collect();

        debug!(
            trades = portfolio.trades.len(),
            final_equity = equity.last().copied().unwrap_or(initial),
            "Simulation complete"
        );

        Ok(ResultSeries {
            run_id: context.run_id,
            strategy: context.strategy.to_string(),
            symbol: context.symbol.clone(),
            initial_capital: initial,
            timestamps: prepared.prices.timestamps(),
            equity,
            strategy_returns,
            cumulative_returns,
            market_returns,
            positions,
            trades: portfolio.trades,
            open_position: portfolio.position,
            skipped_bars: prepared.skipped,
            total_fees: portfolio.total_fees,
        })
    }

    /// Moves the portfolio towards `target`. A same-side signal is a no-op; an
    /// opposite one closes and re-opens at the same price.
    fn execute_signal(
        &self,
        strategy: &dyn Strategy,
        portfolio: &mut Portfolio,
        signal: &Signal,
        target: Direction,
        quote: Quote,
        allow_entry: bool,
    ) {
        let current = portfolio.side();
        if current == target {
            return;
        }
        if !current.is_flat() {
            portfolio.close(quote, "signal");
        }
        if target.is_flat() || !allow_entry {
            return;
        }

        let fraction = strategy
            .size_fraction(signal, self.settings.position_fraction)
            .unwrap_or(self.settings.position_fraction);
        if !(fraction > 0.0) {
            debug!(timestamp = %quote.timestamp, fraction, "Zero sizing, entry skipped");
            return;
        }
        let notional = portfolio.equity(quote.price, quote.benchmark) * fraction;
        portfolio.open(target, quote, notional, signal.hedge_ratio);
    }

    /// Applies stop-loss and take-profit to a single-leg position opened on an
    /// earlier bar. Returns the side that was stopped out, if any.
    fn check_stops(&self, portfolio: &mut Portfolio, bar: &PriceBar, bench: Option<PriceBar>) -> Option<Direction> {
        let position = portfolio.position.as_ref()?;
        if position.hedge.is_some() || position.entry_timestamp >= bar.timestamp {
            return None;
        }

        let side = position.side;
        let sign = side.sign();
        let entry = position.entry_price;
        let stop = self.settings.stop_loss_pct.map(|pct| entry * (1.0 - sign * pct));
        let target = self.settings.take_profit_pct.map(|pct| entry * (1.0 + sign * pct));

        // Adverse and favourable extremes of the bar for this side.
        let (worst, best) = match side {
            Direction::Long => (bar.low, bar.high),
            _ => (bar.high, bar.low),
        };
        let adverse = |level: f64, price: f64| sign * (price - level) <= 0.0;
        let favourable = |level: f64, price: f64| sign * (price - level) >= 0.0;

        // The stop is checked first: when both levels fall inside one bar the
        // loss is assumed to have come first. A bar that opens through a level
        // fills at the open.
        let (price, reason) = if let Some(stop) = stop.filter(|s| adverse(*s, worst)) {
            (if adverse(stop, bar.open) { bar.open } else { stop }, "stop loss")
        } else if let Some(target) = target.filter(|t| favourable(*t, best)) {
            (if favourable(target, bar.open) { bar.open } else { target }, "take profit")
        } else {
            return None;
        };

        portfolio.close(
            Quote {
                timestamp: bar.timestamp,
                price,
                benchmark: bench.map(|b| b.close),
            },
            reason,
        );
        Some(side)
    }

    /// Checks gaps and forward-fills non-finite bars from the previous close.
    fn prepare(
        &self,
        data: &MarketData<'_>,
        with_benchmark: bool,
        context: &RunContext,
    ) -> Result<PreparedData, BacktestError> {
        let max_gap = self.settings.max_gap;
        for pair in data.prices.bars().windows(2) {
            let gap = (pair[1].timestamp - pair[0].timestamp).to_std().unwrap_or_default();
            if gap > max_gap {
                return Err(BacktestError::DataGap {
                    symbol: data.prices.symbol().to_string(),
                    at: pair[1].timestamp,
                    reason: format!(
                        "{:?} since the previous bar exceeds the maximum gap of {:?}",
                        gap, max_gap
                    ),
                });
            }
        }

        let mut skipped = Vec::new();
        let prices = self.forward_fill(data.prices, &mut skipped, context)?;
        let benchmark = match data.benchmark.filter(|_| with_benchmark) {
            Some(series) => Some(self.forward_fill(series, &mut skipped, context)?),
            None => None,
        };
        skipped.sort();
        skipped.dedup();

        Ok(PreparedData {
            prices,
            benchmark,
            skipped,
        })
    }

    fn forward_fill(
        &self,
        series: &PriceSeries,
        skipped: &mut Vec<DateTime<Utc>>,
        context: &RunContext,
    ) -> Result<PriceSeries, BacktestError> {
        let mut bars = Vec::with_capacity(series.len());
        let mut previous_close: Option<f64> = None;

        for bar in series.bars() {
            if bar.is_finite() {
                previous_close = Some(bar.close);
                bars.push(*bar);
                continue;
            }
            let Some(close) = previous_close else {
                return Err(BacktestError::DataGap {
                    symbol: series.symbol().to_string(),
                    at: bar.timestamp,
                    reason: "leading bar has non-finite values and nothing to forward-fill from".to_string(),
                });
            };
            warn!(symbol = series.symbol(), timestamp = %bar.timestamp, "Non-finite bar skipped, previous close carried forward");
            self.instrumentation.bar_skipped(context, bar.timestamp);
            skipped.push(bar.timestamp);
            bars.push(PriceBar::flat(bar.timestamp, close));
        }

        Ok(PriceSeries::new(series.symbol(), bars)?)
    }
}

/// One signal per bar, stamped with that bar's timestamp.
fn validate_signals(signals: &[Signal], prices: &PriceSeries) -> Result<(), BacktestError> {
    if signals.len() != prices.len() {
        return Err(BacktestError::InvalidSignals(format!(
            "expected {} signals, got {}",
            prices.len(),
            signals.len()
        )));
    }
    if let Some((signal, bar)) = signals
        .iter()
        .zip(prices.bars())
        .find(|(s, b)| s.timestamp != b.timestamp)
    {
        return Err(BacktestError::InvalidSignals(format!(
            "signal at {} does not match bar at {}",
            signal.timestamp, bar.timestamp
        )));
    }
    Ok(())
}
