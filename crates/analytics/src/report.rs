use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A comprehensive, standardized report of a strategy's performance.
///
/// Metrics that are undefined for the given run (no trades, zero volatility,
/// no drawdown) are `None` and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    // I. Core Profitability Metrics
    /// Final equity minus initial capital, open position marked at the last close.
    pub total_net_profit: f64,
    /// Sum of closed-trade P&L, net of fees.
    pub realized_profit: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: Option<f64>, // Option<> because it is infinite if GrossLoss is 0
    pub total_return_pct: f64,
    pub annualized_return_pct: Option<f64>,
    /// Buy-and-hold return of the traded asset over the same bars.
    pub market_return_pct: f64,
    pub total_fees: f64,

    // II. Risk and Drawdown
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub annualized_volatility_pct: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub calmar_ratio: Option<f64>, // Option<> for cases with no drawdown

    // III. Trade-Level Statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: Option<f64>, // Option<> for cases with 0 trades
    pub average_win: f64,
    pub average_loss: f64,
    pub payoff_ratio: Option<f64>, // Option<> because avg_loss can be 0

    // IV. Time-Based Metrics
    /// Share of bars that ended with an open position.
    pub exposure_pct: f64,
    pub average_holding_bars: Option<f64>,
    #[serde(with = "humantime_serde")]
    pub average_holding_period: Option<Duration>,
}

impl PerformanceReport {
    /// Creates a new, zeroed-out PerformanceReport.
    pub fn new() -> Self {
        Self {
            total_net_profit: 0.0,
            realized_profit: 0.0,
            gross_profit: 0.0,
            gross_loss: 0.0,
            profit_factor: None,
            total_return_pct: 0.0,
            annualized_return_pct: None,
            market_return_pct: 0.0,
            total_fees: 0.0,
            max_drawdown: 0.0,
            max_drawdown_pct: 0.0,
            annualized_volatility_pct: None,
            sharpe_ratio: None,
            sortino_ratio: None,
            calmar_ratio: None,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate_pct: None,
            average_win: 0.0,
            average_loss: 0.0,
            payoff_ratio: None,
            exposure_pct: 0.0,
            average_holding_bars: None,
            average_holding_period: None,
        }
    }
}

impl Default for PerformanceReport {
    fn default() -> Self {
        Self::new()
    }
}
