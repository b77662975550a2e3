use crate::drawdown::{DrawdownMetrics, drawdown_metrics};
use crate::error::RiskError;
use crate::factors::{FactorExposures, FactorSeries, factor_exposures};
use crate::report::RiskReport;
use crate::tail::{EvtParams, TailRiskMetrics, tail_risk};
use chrono::{DateTime, Utc};
use configuration::RiskSettings;
use core_types::ResultSeries;
use statistics::{sharpe_ratio, sortino_ratio};

/// Computes tail, drawdown and factor risk of a completed backtest.
///
/// The engine is stateless; the same instance may be shared across threads and
/// reused for any number of results.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    settings: RiskSettings,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self {
            settings: RiskSettings::default(),
        }
    }
}

impl RiskEngine {
    pub fn new(settings: RiskSettings) -> Result<Self, RiskError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &RiskSettings {
        &self.settings
    }

    /// Historical, parametric, conditional and EVT value-at-risk at
    /// `confidence_level`, all expressed as returns.
    pub fn calculate_tail_risk_metrics(
        &self,
        returns: &[f64],
        confidence_level: f64,
    ) -> Result<TailRiskMetrics, RiskError> {
        tail_risk(
            returns,
            confidence_level,
            EvtParams {
                tail_fraction: self.settings.evt_tail_fraction,
                min_exceedances: self.settings.evt_min_exceedances,
            },
        )
    }

    pub fn calculate_drawdown_metrics(
        &self,
        timestamps: &[DateTime<Utc>],
        equity: &[f64],
    ) -> Result<DrawdownMetrics, RiskError> {
        drawdown_metrics(timestamps, equity)
    }

    pub fn calculate_factor_exposures(
        &self,
        returns: &[(DateTime<Utc>, f64)],
        factors: &[FactorSeries],
    ) -> Result<FactorExposures, RiskError> {
        factor_exposures(returns, factors)
    }

    /// Builds the full report at the configured confidence level.
    pub fn report(&self, result: &ResultSeries) -> Result<RiskReport, RiskError> {
        self.report_at(result, self.settings.confidence_level, &[])
    }

    /// Builds the full report, regressing the strategy on `factors` when any
    /// are given.
    pub fn report_at(
        &self,
        result: &ResultSeries,
        confidence_level: f64,
        factors: &[FactorSeries],
    ) -> Result<RiskReport, RiskError> {
        if result.strategy_returns.len() != result.len() {
            return Err(RiskError::LengthMismatch {
                timestamps: result.len(),
                values: result.strategy_returns.len(),
            });
        }

        let dated_returns: Vec<(DateTime<Utc>, f64)> = result.returns_by_timestamp().collect();
        let returns: Vec<f64> = dated_returns.iter().map(|(_, r)| *r).collect();

        let tail = self.calculate_tail_risk_metrics(&returns, confidence_level)?;
        let drawdown = self.calculate_drawdown_metrics(&result.timestamps, &result.equity)?;
        let factor_exposures = if factors.is_empty() {
            None
        } else {
            Some(self.calculate_factor_exposures(&dated_returns, factors)?)
        };

        let ppy = self.settings.periods_per_year;
        let rf = self.settings.risk_free_rate;
        let report = RiskReport {
            strategy: result.strategy.clone(),
            symbol: result.symbol.clone(),
            sharpe_ratio: sharpe_ratio(&returns, rf, ppy),
            sortino_ratio: sortino_ratio(&returns, rf, ppy),
            tail,
            drawdown,
            factor_exposures,
        };

        tracing::info!(
            strategy = %report.strategy,
            symbol = %report.symbol,
            historical_var = ?report.tail.historical_var,
            max_drawdown = report.drawdown.max_drawdown,
            "Risk report computed"
        );
        Ok(report)
    }
}
