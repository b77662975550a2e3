use crate::error::AnalyticsError;
use crate::report::PerformanceReport;
use core_types::{ResultSeries, Trade};
use statistics::{sample_std, sharpe_ratio, sortino_ratio};
use std::time::Duration;

/// A stateless calculator for deriving performance metrics from a backtest.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsEngine {
    periods_per_year: f64,
    /// Annual risk-free rate, converted to a per-period rate internally.
    risk_free_rate: f64,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self {
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
        }
    }
}

impl AnalyticsEngine {
    pub fn new(periods_per_year: f64, risk_free_rate: f64) -> Result<Self, AnalyticsError> {
        if !(periods_per_year.is_finite() && periods_per_year > 0.0) {
            return Err(AnalyticsError::InvalidParameter(
                "periods_per_year",
                format!("must be positive, got {}", periods_per_year),
            ));
        }
        if !risk_free_rate.is_finite() {
            return Err(AnalyticsError::InvalidParameter(
                "risk_free_rate",
                "must be finite".to_string(),
            ));
        }
        Ok(Self {
            periods_per_year,
            risk_free_rate,
        })
    }

    /// The main entry point for calculating performance metrics.
    pub fn calculate(&self, result: &ResultSeries) -> Result<PerformanceReport, AnalyticsError> {
        if result.is_empty() {
            return Err(AnalyticsError::NotEnoughData(
                "result series has no bars".to_string(),
            ));
        }
        if result.equity.len() != result.len() || result.strategy_returns.len() != result.len() {
            return Err(AnalyticsError::InconsistentSeries(format!(
                "{} timestamps, {} equity points, {} returns",
                result.len(),
                result.equity.len(),
                result.strategy_returns.len()
            )));
        }

        let mut report = PerformanceReport::new();
        self.calculate_profitability(result, &mut report);
        self.calculate_trade_statistics(&result.trades, &mut report);
        self.calculate_drawdown(&result.equity, &mut report);
        self.calculate_ratios(result, &mut report);
        self.calculate_time_metrics(result, &mut report);

        tracing::debug!(
            strategy = %result.strategy,
            net_profit = report.total_net_profit,
            sharpe = ?report.sharpe_ratio,
            "Performance report calculated"
        );
        Ok(report)
    }

    fn calculate_profitability(&self, result: &ResultSeries, report: &mut PerformanceReport) {
        let initial = result.initial_capital;
        report.total_net_profit = result.total_pnl();
        report.total_fees = result.total_fees;
        if initial > 0.0 {
            report.total_return_pct = report.total_net_profit / initial * 100.0;
        }
        report.market_return_pct = result.market_returns.last().copied().unwrap_or_default() * 100.0;

        // Compound growth over the number of return periods observed.
        let periods = result.len().saturating_sub(1) as f64;
        let growth = result.final_equity() / initial;
        if periods > 0.0 && growth > 0.0 && initial > 0.0 {
            let years = periods / self.periods_per_year;
            report.annualized_return_pct = Some((growth.powf(1.0 / years) - 1.0) * 100.0);
        }
    }

    fn calculate_trade_statistics(&self, trades: &[Trade], report: &mut PerformanceReport) {
        report.total_trades = trades.len();

        for trade in trades {
            report.realized_profit += trade.pnl;
            if trade.pnl > 0.0 {
                report.gross_profit += trade.pnl;
                report.winning_trades += 1;
            } else {
                report.gross_loss += trade.pnl.abs();
                report.losing_trades += 1;
            }
        }

        // --- Ratios ---
        if report.gross_loss > 0.0 {
            report.profit_factor = Some(report.gross_profit / report.gross_loss);
        }
        if report.total_trades > 0 {
            report.win_rate_pct =
                Some(report.winning_trades as f64 / report.total_trades as f64 * 100.0);
        }
        if report.winning_trades > 0 {
            report.average_win = report.gross_profit / report.winning_trades as f64;
        }
        if report.losing_trades > 0 {
            report.average_loss = report.gross_loss / report.losing_trades as f64;
            if report.average_loss > 0.0 {
                report.payoff_ratio = Some(report.average_win / report.average_loss);
            }
        }
    }

    /// Largest peak-to-trough decline of the equity curve.
    fn calculate_drawdown(&self, equity: &[f64], report: &mut PerformanceReport) {
        let Some(&first) = equity.first() else {
            return;
        };
        let mut peak = first;
        for &value in equity {
            peak = peak.max(value);
            let drawdown = peak - value;
            if drawdown > report.max_drawdown {
                report.max_drawdown = drawdown;
                if peak > 0.0 {
                    report.max_drawdown_pct = drawdown / peak * 100.0;
                }
            }
        }
    }

    /// Sharpe, Sortino, volatility and Calmar from per-bar strategy returns.
    fn calculate_ratios(&self, result: &ResultSeries, report: &mut PerformanceReport) {
        if report.max_drawdown_pct > 0.0 {
            report.calmar_ratio = report
                .annualized_return_pct
                .map(|r| r / report.max_drawdown_pct);
        }

        // The first bar has no prior equity and carries no return.
        let returns: Vec<f64> = result.returns_by_timestamp().map(|(_, r)| r).collect();
        report.annualized_volatility_pct = sample_std(&returns)
            .filter(|s| *s > 0.0)
            .map(|s| s * self.periods_per_year.sqrt() * 100.0);
        report.sharpe_ratio = sharpe_ratio(&returns, self.risk_free_rate, self.periods_per_year);
        report.sortino_ratio = sortino_ratio(&returns, self.risk_free_rate, self.periods_per_year);
    }

    fn calculate_time_metrics(&self, result: &ResultSeries, report: &mut PerformanceReport) {
        let in_market = result.positions.iter().filter(|p| !p.is_flat()).count();
        report.exposure_pct = in_market as f64 / result.len() as f64 * 100.0;

        let trades = &result.trades;
        if trades.is_empty() {
            return;
        }
        let bars: usize = trades.iter().map(|t| t.bars_held).sum();
        report.average_holding_bars = Some(bars as f64 / trades.len() as f64);

        let total_secs: i64 = trades
            .iter()
            .map(|t| (t.exit_timestamp - t.entry_timestamp).num_seconds())
            .sum();
        let avg_secs = total_secs / trades.len() as i64;
        report.average_holding_period = u64::try_from(avg_secs).ok().map(Duration::from_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use core_types::Direction;
    use uuid::Uuid;

    fn ts(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + ChronoDuration::days(day)
    }

    fn result_from_equity(equity: &[f64], trades: Vec<Trade>) -> ResultSeries {
        let initial = equity[0];
        let strategy_returns = std::iter::once(0.0)
            .chain(equity.windows(2).map(|w| w[1] / w[0] - 1.0))
            .collect();
        ResultSeries {
            run_id: Uuid::new_v4(),
            strategy: "test".to_string(),
            symbol: "AAA".to_string(),
            initial_capital: initial,
            timestamps: (0..equity.len() as i64).map(ts).collect(),
            equity: equity.to_vec(),
            strategy_returns,
            cumulative_returns: equity.iter().map(|e| e / initial - 1.0).collect(),
            market_returns: vec![0.0; equity.len()],
            positions: vec![Direction::Long; equity.len()],
            trades,
            open_position: None,
            skipped_bars: Vec::new(),
            total_fees: 0.0,
        }
    }

    fn trade(pnl: f64, entry: i64, exit: i64) -> Trade {
        Trade {
            entry_timestamp: ts(entry),
            exit_timestamp: ts(exit),
            entry_price: 100.0,
            exit_price: 100.0,
            side: Direction::Long,
            size: 1.0,
            pnl,
            fees: 0.0,
            hedge_ratio: None,
            bars_held: (exit - entry) as usize,
        }
    }

    #[test]
    fn trade_statistics() {
        let trades = vec![trade(300.0, 0, 2), trade(-100.0, 2, 4), trade(100.0, 4, 8)];
        let result = result_from_equity(&[1_000.0, 1_100.0, 1_050.0, 1_200.0, 1_300.0], trades);
        let report = AnalyticsEngine::default().calculate(&result).unwrap();

        assert_eq!(report.total_trades, 3);
        assert_eq!(report.winning_trades, 2);
        assert_eq!(report.profit_factor, Some(4.0));
        assert!((report.win_rate_pct.unwrap() - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.payoff_ratio, Some(2.0));
        assert_eq!(report.average_holding_bars, Some(8.0 / 3.0));
        assert!((report.total_return_pct - 30.0).abs() < 1e-9);
    }

    #[test]
    fn drawdown_is_measured_from_the_running_peak() {
        let result = result_from_equity(&[100.0, 120.0, 90.0, 110.0, 130.0], Vec::new());
        let report = AnalyticsEngine::default().calculate(&result).unwrap();
        assert!((report.max_drawdown - 30.0).abs() < 1e-9);
        assert!((report.max_drawdown_pct - 25.0).abs() < 1e-9);
        assert!(report.calmar_ratio.is_some());
    }

    #[test]
    fn flat_equity_leaves_ratios_undefined() {
        let result = result_from_equity(&[100.0; 10], Vec::new());
        let report = AnalyticsEngine::default().calculate(&result).unwrap();
        assert_eq!(report.sharpe_ratio, None);
        assert_eq!(report.sortino_ratio, None);
        assert_eq!(report.calmar_ratio, None);
        assert_eq!(report.win_rate_pct, None);
        assert_eq!(report.average_holding_period, None);
    }

    #[test]
    fn sharpe_is_annualized() {
        let equity: Vec<f64> = (0..50)
            .scan(100.0, |e, i| {
                *e *= [1.03, 0.99, 1.01, 0.98][i % 4];
                Some(*e)
            })
            .collect();
        let result = result_from_equity(&equity, Vec::new());
        let daily = AnalyticsEngine::new(1.0, 0.0).unwrap().calculate(&result).unwrap();
        let annual = AnalyticsEngine::default().calculate(&result).unwrap();
        let ratio = annual.sharpe_ratio.unwrap() / daily.sharpe_ratio.unwrap();
        assert!((ratio - 252.0_f64.sqrt()).abs() < 1e-9);
        assert!(annual.sortino_ratio.unwrap() > 0.0);
    }

    #[test]
    fn empty_series_is_an_error() {
        let mut result = result_from_equity(&[100.0], Vec::new());
        result.timestamps.clear();
        result.equity.clear();
        result.strategy_returns.clear();
        assert!(AnalyticsEngine::default().calculate(&result).is_err());
    }
}
