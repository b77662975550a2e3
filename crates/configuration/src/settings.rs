use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backtest: BacktestSettings,
    #[serde(default)]
    pub risk: RiskSettings,
    #[serde(default)]
    pub optimizer: OptimizerSettings,
    #[serde(default)]
    pub strategies: Strategies,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Config {
    /// Validates every section, failing on the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backtest.validate()?;
        self.risk.validate()?;
        self.optimizer.validate()?;
        self.strategies.momentum.validate()?;
        self.strategies.mean_reversion.validate()?;
        self.strategies.statistical_arbitrage.validate()?;
        Ok(())
    }
}

/// Contains parameters for the backtesting and simulation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    /// The starting capital of every run.
    pub initial_capital: f64,
    /// Cost charged on every fill as a fraction of traded notional.
    /// 0.001 corresponds to 0.1%.
    pub transaction_cost: f64,
    /// Fraction of equity committed to a new position unless the strategy sizes it.
    pub position_fraction: f64,
    /// Close a position when price moves this fraction against the entry.
    pub stop_loss_pct: Option<f64>,
    /// Close a position when price moves this fraction in favour of the entry.
    pub take_profit_pct: Option<f64>,
    /// Close a position at the open after it has been held this many bars.
    pub max_hold_bars: Option<usize>,
    /// The largest tolerated distance between consecutive bars.
    #[serde(with = "humantime_serde")]
    pub max_gap: Duration,
    /// Close any open position at the final bar's close.
    pub close_open_position_at_end: bool,
    /// Worker threads for concurrent runs. Zero uses every available core.
    pub workers: usize,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            transaction_cost: 0.0,
            position_fraction: 1.0,
            stop_loss_pct: None,
            take_profit_pct: None,
            max_hold_bars: None,
            max_gap: Duration::from_secs(5 * 24 * 60 * 60),
            close_open_position_at_end: false,
            workers: 0,
        }
    }
}

impl BacktestSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(ConfigError::invalid("initial_capital", "must be positive"));
        }
        if !(0.0..1.0).contains(&self.transaction_cost) {
            return Err(ConfigError::invalid("transaction_cost", "must be in [0, 1)"));
        }
        if !(self.position_fraction > 0.0 && self.position_fraction <= 1.0) {
            return Err(ConfigError::invalid("position_fraction", "must be in (0, 1]"));
        }
        for (field, value) in [
            ("stop_loss_pct", self.stop_loss_pct),
            ("take_profit_pct", self.take_profit_pct),
        ] {
            if let Some(pct) = value {
                if !(pct > 0.0 && pct < 1.0) {
                    return Err(ConfigError::invalid(field, "must be in (0, 1)"));
                }
            }
        }
        if self.max_hold_bars == Some(0) {
            return Err(ConfigError::invalid("max_hold_bars", "must be at least 1"));
        }
        if self.max_gap.is_zero() {
            return Err(ConfigError::invalid("max_gap", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Contains parameters for the risk engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSettings {
    /// 0.95 evaluates the worst 5% of returns.
    pub confidence_level: f64,
    /// Fraction of the largest losses treated as the EVT tail.
    pub evt_tail_fraction: f64,
    /// Below this many tail exceedances the EVT estimate is undefined.
    pub evt_min_exceedances: usize,
    /// Used to annualise Sharpe and Sortino ratios.
    pub periods_per_year: f64,
    /// Annual risk-free rate used by the Sortino ratio.
    pub risk_free_rate: f64,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            evt_tail_fraction: 0.10,
            evt_min_exceedances: 10,
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
        }
    }
}

impl RiskSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("confidence_level", self.confidence_level)?;
        check_probability("evt_tail_fraction", self.evt_tail_fraction)?;
        if self.evt_min_exceedances < 3 {
            return Err(ConfigError::invalid("evt_min_exceedances", "must be at least 3"));
        }
        if !(self.periods_per_year > 0.0) {
            return Err(ConfigError::invalid("periods_per_year", "must be positive"));
        }
        Ok(())
    }
}

/// Contains parameters for the portfolio optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Annual risk-free rate subtracted from the expected return.
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
    pub max_iterations: usize,
    /// Stop when the Sharpe ratio improves by less than this between iterations.
    pub tolerance: f64,
    pub constraints: PortfolioConstraints,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            periods_per_year: 252.0,
            max_iterations: 1_000,
            tolerance: 1e-10,
            constraints: PortfolioConstraints::default(),
        }
    }
}

impl OptimizerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.periods_per_year > 0.0) {
            return Err(ConfigError::invalid("periods_per_year", "must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid("max_iterations", "must be at least 1"));
        }
        if !(self.tolerance > 0.0) {
            return Err(ConfigError::invalid("tolerance", "must be positive"));
        }
        self.constraints.validate()
    }
}

/// The constraint set applied to portfolio weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioConstraints {
    /// Per-asset cap.
    pub max_weight: f64,
    /// Per-asset floor.
    pub min_weight: f64,
    /// Weights sum to exactly one. Otherwise they sum to at most one.
    pub fully_invested: bool,
    /// Weights are never negative.
    pub long_only: bool,
}

impl Default for PortfolioConstraints {
    fn default() -> Self {
        Self {
            max_weight: 1.0,
            min_weight: 0.0,
            fully_invested: true,
            long_only: true,
        }
    }
}

impl PortfolioConstraints {
    /// Checks the constraints are well formed. Whether they can be met for a
    /// given number of assets is decided by the optimizer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_weight.is_finite() || self.max_weight <= 0.0 {
            return Err(ConfigError::invalid("max_weight", "must be positive"));
        }
        if !self.min_weight.is_finite() {
            return Err(ConfigError::invalid("min_weight", "must be finite"));
        }
        Ok(())
    }

    /// The effective per-asset floor once `long_only` is applied.
    pub fn lower_bound(&self) -> f64 {
        if self.long_only {
            self.min_weight.max(0.0)
        } else {
            self.min_weight
        }
    }
}

/// Contains the parameter sets for all available strategies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Strategies {
    #[serde(default)]
    pub momentum: MomentumParams,
    #[serde(default)]
    pub mean_reversion: MeanReversionParams,
    #[serde(default)]
    pub statistical_arbitrage: StatArbParams,
}

/// Parameters for the Momentum strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumParams {
    /// Bars in the trailing return.
    pub window: usize,
    /// Scale position size by signal strength instead of a fixed fraction.
    pub volatility_scaled: bool,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            window: 20,
            volatility_scaled: false,
        }
    }
}

impl MomentumParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_window("window", self.window)
    }
}

/// Parameters for the adaptive z-score Mean Reversion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanReversionParams {
    pub window: usize,
    /// Base z-score threshold before volatility scaling.
    pub threshold: f64,
}

impl Default for MeanReversionParams {
    fn default() -> Self {
        Self {
            window: 20,
            threshold: 0.05,
        }
    }
}

impl MeanReversionParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_window("window", self.window)?;
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(ConfigError::invalid("threshold", "must be positive"));
        }
        Ok(())
    }
}

/// Parameters for the pairs-trading Statistical Arbitrage strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatArbParams {
    /// Bars in the rolling regression window.
    pub lookback_period: usize,
    pub entry_zscore: f64,
    pub exit_zscore: f64,
    /// Bars after which an open position is closed regardless of the spread.
    pub max_position_hold: usize,
    /// Spreads reverting faster than this many bars are not traded.
    pub min_half_life: f64,
    /// Largest ADF p-value at which the pair counts as cointegrated.
    pub confidence_level: f64,
}

impl Default for StatArbParams {
    fn default() -> Self {
        Self {
            lookback_period: 60,
            entry_zscore: 2.0,
            exit_zscore: 0.5,
            max_position_hold: 20,
            min_half_life: 5.0,
            confidence_level: 0.05,
        }
    }
}

/// Fewer observations than this leave the ADF regression without degrees of freedom.
pub const MIN_STAT_ARB_LOOKBACK: usize = 20;

impl StatArbParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback_period < MIN_STAT_ARB_LOOKBACK {
            return Err(ConfigError::invalid(
                "lookback_period",
                format!("must be at least {}", MIN_STAT_ARB_LOOKBACK),
            ));
        }
        if !(self.exit_zscore.is_finite() && self.exit_zscore >= 0.0) {
            return Err(ConfigError::invalid("exit_zscore", "must be non-negative"));
        }
        if !(self.entry_zscore.is_finite() && self.entry_zscore > self.exit_zscore) {
            return Err(ConfigError::invalid(
                "entry_zscore",
                "must be greater than exit_zscore",
            ));
        }
        if self.max_position_hold == 0 {
            return Err(ConfigError::invalid("max_position_hold", "must be at least 1"));
        }
        if !(self.min_half_life.is_finite() && self.min_half_life >= 0.0) {
            return Err(ConfigError::invalid("min_half_life", "must be non-negative"));
        }
        check_probability("confidence_level", self.confidence_level)
    }
}

/// Output format of the console log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

/// Contains parameters for tracing output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    pub format: LogFormat,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Full,
            directory: None,
            file_prefix: "quantlab.log".to_string(),
        }
    }
}

fn check_window(field: &str, window: usize) -> Result<(), ConfigError> {
    if window < 2 {
        return Err(ConfigError::invalid(field, "must be at least 2"));
    }
    Ok(())
}

fn check_probability(field: &str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0 && value < 1.0) {
        return Err(ConfigError::invalid(field, "must be strictly between 0 and 1"));
    }
    Ok(())
}
