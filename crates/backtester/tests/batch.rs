mod common;

use backtester::{
    BacktestError, Backtester, RunContext, RunInstrumentation, run_backtests,
};
use common::{Scripted, flat_series, ts};
use configuration::options::WINDOW;
use configuration::{BacktestSettings, Config, StrategyConfig, Strategies};
use core_types::{MarketData, PriceBar, PriceSeries, StrategyId};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strategies::{Strategy, StrategyError, create_strategy};

#[derive(Default)]
struct Counting {
    started: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl RunInstrumentation for Counting {
    fn run_started(&self, _run: &RunContext) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn bar_skipped(&self, _run: &RunContext, _timestamp: chrono::DateTime<chrono::Utc>) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    fn run_finished(&self, _run: &RunContext, _elapsed: Duration, outcome: Result<(), &BacktestError>) {
        if outcome.is_err() {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn rising(len: usize) -> PriceSeries {
    let closes: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
    flat_series("UP", &closes)
}

#[test]
fn failing_run_does_not_affect_siblings() {
    let prices = rising(120);
    let defaults = Strategies::default();
    let strategies: Vec<Box<dyn Strategy>> = vec![
        create_strategy(StrategyId::Momentum, &defaults).unwrap(),
        create_strategy(StrategyId::StatisticalArbitrage, &defaults).unwrap(),
        create_strategy(StrategyId::MeanReversion, &defaults).unwrap(),
    ];
    let settings = BacktestSettings {
        workers: 2,
        ..BacktestSettings::default()
    };

    let outcome = Backtester::new(settings)
        .unwrap()
        .run_all(&strategies, &MarketData::new(&prices))
        .unwrap();

    assert_eq!(outcome.runs.len(), 3);
    assert!(outcome.runs[0].result.is_ok());
    assert!(matches!(
        outcome.runs[1].result,
        Err(BacktestError::Strategy(StrategyError::MissingBenchmark(_)))
    ));
    assert!(outcome.runs[2].result.is_ok());
    assert_eq!(outcome.successes().count(), 2);

    let err = outcome.into_results().unwrap_err();
    assert_eq!(err.failures.len(), 1);
    assert!(err.failures[0].0.starts_with("statistical_arbitrage"));
}

#[test]
fn results_keep_submission_order_and_ownership() {
    let prices = rising(60);
    let strategies: Vec<Box<dyn Strategy>> = (0..8)
        .map(|i| Box::new(Scripted::long_between(i, 60, 60)) as Box<dyn Strategy>)
        .collect();

    let results = Backtester::new(BacktestSettings::default())
        .unwrap()
        .run_all(&strategies, &MarketData::new(&prices))
        .unwrap()
        .into_results()
        .unwrap();

    assert_eq!(results.len(), 8);
    for (i, result) in results.iter().enumerate() {
        let entry = result.open_position.as_ref().unwrap().entry_timestamp;
        assert_eq!(entry, ts(i as i64 + 1));
    }
    // Every run has its own identity.
    assert!(results.windows(2).all(|w| w[0].run_id != w[1].run_id));
}

#[test]
fn instrumentation_sees_every_run() {
    let mut bars: Vec<PriceBar> = rising(40).bars().to_vec();
    bars[10].close = f64::NAN;
    let prices = PriceSeries::new("UP", bars).unwrap();
    let counting = Arc::new(Counting::default());
    let strategies: Vec<Box<dyn Strategy>> = vec![
        Box::new(Scripted::long_between(0, 40, 40)),
        Box::new(Scripted::long_between(5, 40, 40)),
    ];

    let outcome = Backtester::new(BacktestSettings::default())
        .unwrap()
        .with_instrumentation(counting.clone())
        .run_all(&strategies, &MarketData::new(&prices))
        .unwrap();

    assert!(outcome.is_complete_success());
    assert_eq!(counting.started.load(Ordering::SeqCst), 2);
    assert_eq!(counting.skipped.load(Ordering::SeqCst), 2);
    assert_eq!(counting.failed.load(Ordering::SeqCst), 0);
}

#[test]
fn invalid_configuration_is_reported_in_place() {
    let prices = rising(80);
    let configs = vec![
        StrategyConfig::new(StrategyId::Momentum),
        StrategyConfig::new(StrategyId::MeanReversion).with_option(WINDOW, 0.0),
        StrategyConfig::new(StrategyId::Momentum).with_option(WINDOW, 10.0),
    ];

    let outcome = run_backtests(&MarketData::new(&prices), &configs, &Config::default()).unwrap();

    assert_eq!(outcome.runs.len(), 3);
    assert!(outcome.runs[0].result.is_ok());
    assert!(matches!(outcome.runs[1].result, Err(BacktestError::Strategy(_))));
    assert_eq!(outcome.runs[1].label, "mean_reversion");
    assert!(outcome.runs[2].result.is_ok());
}
