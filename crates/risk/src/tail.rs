//! Value-at-Risk estimators over a per-period return series.
//!
//! Every estimate is expressed as a return, so a loss is negative. An estimate
//! that cannot be formed from the data (zero variance, too few tail
//! exceedances, a degenerate GPD fit) is `None` rather than an error.

use crate::error::RiskError;
use serde::{Deserialize, Serialize};
use statistics::{mean, quantile, sample_std};
use statrs::distribution::{ContinuousCDF, Normal};

/// Below this magnitude the GPD shape is treated as zero (exponential tail).
const GPD_SHAPE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailRiskMetrics {
    pub confidence_level: f64,
    pub observations: usize,
    /// Empirical quantile at `1 - confidence_level`.
    pub historical_var: Option<f64>,
    /// Normal-distribution quantile at `1 - confidence_level`.
    pub parametric_var: Option<f64>,
    /// Mean of the returns at or below `historical_var`.
    pub conditional_var: Option<f64>,
    /// Peaks-over-threshold quantile from a generalized Pareto fit.
    pub evt_var: Option<f64>,
}

impl TailRiskMetrics {
    fn undefined(confidence_level: f64, observations: usize) -> Self {
        Self {
            confidence_level,
            observations,
            historical_var: None,
            parametric_var: None,
            conditional_var: None,
            evt_var: None,
        }
    }
}

/// Shape and scale of a generalized Pareto distribution fitted to exceedances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpdFit {
    pub shape: f64,
    pub scale: f64,
}

/// Parameters of the peaks-over-threshold estimator.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EvtParams {
    pub tail_fraction: f64,
    pub min_exceedances: usize,
}

pub(crate) fn tail_risk(
    returns: &[f64],
    confidence_level: f64,
    evt: EvtParams,
) -> Result<TailRiskMetrics, RiskError> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(RiskError::InvalidConfidenceLevel(confidence_level));
    }
    if returns.len() < 2 {
        tracing::warn!(
            observations = returns.len(),
            "Too few returns for tail risk; all estimates undefined"
        );
        return Ok(TailRiskMetrics::undefined(confidence_level, returns.len()));
    }

    let tail_probability = 1.0 - confidence_level;
    let historical = quantile(returns, tail_probability)?;

    let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= historical).collect();
    let conditional = mean(&tail);

    Ok(TailRiskMetrics {
        confidence_level,
        observations: returns.len(),
        historical_var: Some(historical),
        parametric_var: parametric_var(returns, tail_probability),
        conditional_var: conditional,
        evt_var: evt_var(returns, tail_probability, evt)?,
    })
}

fn parametric_var(returns: &[f64], tail_probability: f64) -> Option<f64> {
    let std = sample_std(returns).filter(|s| *s > 0.0)?;
    let z = Normal::new(0.0, 1.0).ok()?.inverse_cdf(tail_probability);
    Some(mean(returns)? + z * std)
}

/// Peaks over threshold on the loss distribution `-r`.
fn evt_var(
    returns: &[f64],
    tail_probability: f64,
    params: EvtParams,
) -> Result<Option<f64>, RiskError> {
    let losses: Vec<f64> = returns.iter().map(|r| -r).collect();
    let threshold = quantile(&losses, 1.0 - params.tail_fraction)?;

    let exceedances: Vec<f64> = losses
        .iter()
        .filter(|l| **l > threshold)
        .map(|l| l - threshold)
        .collect();
    if exceedances.len() < params.min_exceedances {
        tracing::debug!(
            exceedances = exceedances.len(),
            required = params.min_exceedances,
            "Too few tail exceedances for an EVT estimate"
        );
        return Ok(None);
    }

    let Some(fit) = fit_gpd_pwm(&exceedances) else {
        tracing::warn!("Degenerate GPD fit; EVT estimate undefined");
        return Ok(None);
    };

    // P(L > x) = (n_u / n) * (1 + shape * (x - u) / scale)^(-1 / shape)
    let ratio = losses.len() as f64 / exceedances.len() as f64 * tail_probability;
    let loss_quantile = if fit.shape.abs() < GPD_SHAPE_EPSILON {
        threshold - fit.scale * ratio.ln()
    } else {
        threshold + fit.scale / fit.shape * (ratio.powf(-fit.shape) - 1.0)
    };

    Ok(loss_quantile.is_finite().then_some(-loss_quantile))
}

/// Fits a generalized Pareto distribution by probability-weighted moments
/// (Hosking & Wallis, 1987).
pub fn fit_gpd_pwm(exceedances: &[f64]) -> Option<GpdFit> {
    if exceedances.len() < 2 {
        return None;
    }
    let mut sorted = exceedances.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let a0 = mean(&sorted)?;
    let a1 = sorted
        .iter()
        .enumerate()
        .map(|(i, y)| {
            let plotting_position = (i as f64 + 1.0 - 0.35) / n;
            (1.0 - plotting_position) * y
        })
        .sum::<f64>()
        / n;

    let denominator = a0 - 2.0 * a1;
    if !(denominator > 0.0) {
        return None;
    }
    let fit = GpdFit {
        shape: 2.0 - a0 / denominator,
        scale: 2.0 * a0 * a1 / denominator,
    };
    (fit.scale > 0.0 && fit.shape.is_finite()).then_some(fit)
}
