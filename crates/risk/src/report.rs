use crate::drawdown::DrawdownMetrics;
use crate::factors::FactorExposures;
use crate::tail::TailRiskMetrics;
use serde::{Deserialize, Serialize};

/// Risk profile of one backtest run. Undefined metrics serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub strategy: String,
    pub symbol: String,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub tail: TailRiskMetrics,
    pub drawdown: DrawdownMetrics,
    pub factor_exposures: Option<FactorExposures>,
}
