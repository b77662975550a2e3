mod progress;
mod provider;
mod summary;

use analytics::{AnalyticsEngine, PerformanceReport};
use anyhow::Context;
use backtester::{BacktestJob, Backtester, BatchOutcome};
use clap::{Parser, Subcommand};
use configuration::{Config, LogFormat, StrategyConfig, load_config_from};
use core_types::{MarketData, PriceSeries, ResultSeries, StrategyId};
use optimizer::{PortfolioOptimizer, ReturnsMatrix};
use progress::ProgressInstrumentation;
use provider::JsonFileProvider;
use risk::{RiskEngine, RiskReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strategies::{Strategy, strategy_from_config};

/// The main entry point for the Quantlab backtesting application.
fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; it only supplies overrides.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = load_config_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    let _guard = configuration::init_tracing(&config.logging)?;

    match cli.command {
        Commands::Backtest(args) => handle_backtest(args, &config),
        Commands::Optimize(args) => handle_optimize(args, &config),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Backtesting and statistical analytics for systematic trading strategies.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides the configured console log format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest strategies on one asset and report performance and risk.
    Backtest(BacktestArgs),
    /// Backtest strategies on several assets and optimise portfolio weights.
    Optimize(OptimizeArgs),
}

#[derive(Parser)]
struct BacktestArgs {
    /// JSON price file of the traded asset; the file stem is the symbol.
    #[arg(long)]
    prices: PathBuf,

    /// JSON price file of the benchmark, required for statistical arbitrage.
    #[arg(long)]
    benchmark: Option<PathBuf>,

    /// Strategies to run (defaults to every strategy the inputs support).
    #[arg(long = "strategy")]
    strategies: Vec<StrategyId>,

    /// Confidence level of the risk report, overriding the configuration.
    #[arg(long)]
    confidence_level: Option<f64>,

    /// Writes results and reports as JSON to this path.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Parser)]
struct OptimizeArgs {
    /// JSON price files, one per asset.
    #[arg(long = "prices", required = true)]
    prices: Vec<PathBuf>,

    /// JSON price file of the benchmark, required for statistical arbitrage.
    #[arg(long)]
    benchmark: Option<PathBuf>,

    #[arg(long = "strategy")]
    strategies: Vec<StrategyId>,

    /// Writes the optimal portfolio as JSON to this path.
    #[arg(long)]
    output: Option<PathBuf>,
}

// ==============================================================================
// Backtest Command
// ==============================================================================

#[derive(Serialize)]
struct RunReport<'a> {
    result: &'a ResultSeries,
    performance: PerformanceReport,
    risk: RiskReport,
}

fn handle_backtest(args: BacktestArgs, config: &Config) -> anyhow::Result<()> {
    let prices = JsonFileProvider::load_file(&args.prices)?;
    let benchmark = args
        .benchmark
        .as_deref()
        .map(JsonFileProvider::load_file)
        .transpose()?;
    let data = market_data(&prices, benchmark.as_ref());

    let selected = select_strategies(&args.strategies, benchmark.is_some());
    let outcome = run_batch(&[data], &selected, config)?;

    let analytics = AnalyticsEngine::new(config.risk.periods_per_year, config.risk.risk_free_rate)?;
    let mut risk_settings = config.risk.clone();
    if let Some(level) = args.confidence_level {
        risk_settings.confidence_level = level;
    }
    let risk_engine = RiskEngine::new(risk_settings)?;

    let reports = outcome
        .successes()
        .map(|result| -> anyhow::Result<RunReport<'_>> {
            Ok(RunReport {
                result,
                performance: analytics.calculate(result)?,
                risk: risk_engine.report(result)?,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let rows: Vec<_> = reports.iter().map(|r| (&r.performance, &r.risk)).collect();
    println!("{}", summary::performance_table(&rows));
    print_failures(&outcome);

    if let Some(path) = &args.output {
        write_json(path, &reports)?;
    }
    Ok(())
}

// ==============================================================================
// Optimize Command
// ==============================================================================

fn handle_optimize(args: OptimizeArgs, config: &Config) -> anyhow::Result<()> {
    let assets = args
        .prices
        .iter()
        .map(|p| JsonFileProvider::load_file(p))
        .collect::<Result<Vec<_>, _>>()?;
    let benchmark = args
        .benchmark
        .as_deref()
        .map(JsonFileProvider::load_file)
        .transpose()?;

    let data: Vec<MarketData<'_>> = assets
        .iter()
        .map(|a| market_data(a, benchmark.as_ref()))
        .collect();
    let selected = select_strategies(&args.strategies, benchmark.is_some());
    let outcome = run_batch(&data, &selected, config)?;
    print_failures(&outcome);

    let results: Vec<ResultSeries> = outcome.successes().cloned().collect();
    let returns = ReturnsMatrix::from_results(&results)?;
    let portfolio = PortfolioOptimizer::new(config.optimizer.clone())?.optimize(&returns)?;

    println!("{}", summary::portfolio_table(&portfolio));
    if let Some(path) = &args.output {
        write_json(path, &portfolio)?;
    }
    Ok(())
}

// ==============================================================================
// Helpers
// ==============================================================================

fn market_data<'a>(prices: &'a PriceSeries, benchmark: Option<&'a PriceSeries>) -> MarketData<'a> {
    match benchmark {
        Some(benchmark) => MarketData::with_benchmark(prices, benchmark),
        None => MarketData::new(prices),
    }
}

fn select_strategies(requested: &[StrategyId], has_benchmark: bool) -> Vec<StrategyConfig> {
    if !requested.is_empty() {
        return requested.iter().copied().map(StrategyConfig::new).collect();
    }
    StrategyId::ALL
        .iter()
        .copied()
        .filter(|id| has_benchmark || *id != StrategyId::StatisticalArbitrage)
        .map(StrategyConfig::new)
        .collect()
}

/// Runs every selected strategy on every data set concurrently.
fn run_batch(
    data: &[MarketData<'_>],
    selected: &[StrategyConfig],
    config: &Config,
) -> anyhow::Result<BatchOutcome> {
    let strategies = selected
        .iter()
        .map(|s| strategy_from_config(s, &config.strategies))
        .collect::<Result<Vec<Box<dyn Strategy>>, _>>()?;

    let jobs: Vec<BacktestJob<'_>> = data
        .iter()
        .flat_map(|d| strategies.iter().map(move |s| BacktestJob::new(s.as_ref(), *d)))
        .collect();

    let progress = Arc::new(ProgressInstrumentation::new(jobs.len())?);
    let outcome = Backtester::new(config.backtest.clone())?
        .with_instrumentation(progress.clone())
        .run_jobs(&jobs)?;
    progress.finish();
    Ok(outcome)
}

fn print_failures(outcome: &BatchOutcome) {
    for (label, error) in outcome.failures() {
        eprintln!("Run {label} failed: {error}");
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)?;
    tracing::info!(path = %path.display(), "Wrote JSON output");
    Ok(())
}
