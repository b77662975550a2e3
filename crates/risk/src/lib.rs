//! # Quantlab Risk
//!
//! Post-trade risk measurement of a completed [`ResultSeries`].
//!
//! ## Architectural Principles
//!
//! - **Soft failures are values, not errors.** Zero-variance returns, too few
//!   tail exceedances or a degenerate GPD fit leave the affected metric `None`
//!   and the rest of the report intact. Only malformed input (mismatched
//!   lengths, non-positive equity, an out-of-range confidence level) is an
//!   `Err`.
//! - **Returns, not losses.** Every VaR figure is a return at the lower tail,
//!   so `-0.02` reads as "a 2% loss".
//!
//! ## Public API
//!
//! - [`RiskEngine`]: configured from [`configuration::RiskSettings`].
//! - [`compute_risk_report`]: one-shot report at a given confidence level.

pub mod drawdown;
pub mod engine;
pub mod error;
pub mod factors;
pub mod report;
pub mod tail;

pub use drawdown::{DrawdownMetrics, drawdown_series};
pub use engine::RiskEngine;
pub use error::RiskError;
pub use factors::{FactorExposure, FactorExposures, FactorSeries};
pub use report::RiskReport;
pub use tail::{GpdFit, TailRiskMetrics, fit_gpd_pwm};

use configuration::RiskSettings;
use core_types::ResultSeries;

/// Computes the risk report of `result` with default settings at
/// `confidence_level`.
pub fn compute_risk_report(
    result: &ResultSeries,
    confidence_level: f64,
) -> Result<RiskReport, RiskError> {
    let engine = RiskEngine::new(RiskSettings {
        confidence_level,
        ..RiskSettings::default()
    })
    .map_err(|_| RiskError::InvalidConfidenceLevel(confidence_level))?;
    engine.report(result)
}
