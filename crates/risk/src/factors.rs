use crate::error::RiskError;
use chrono::{DateTime, Utc};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const PSEUDO_INVERSE_EPSILON: f64 = 1e-12;

/// A named factor return series, such as a market index or a style factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorSeries {
    pub name: String,
    pub returns: Vec<(DateTime<Utc>, f64)>,
}

impl FactorSeries {
    pub fn new(name: impl Into<String>, returns: Vec<(DateTime<Utc>, f64)>) -> Self {
        Self {
            name: name.into(),
            returns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorExposure {
    pub factor: String,
    pub beta: f64,
}

/// Linear exposure of strategy returns to a set of factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorExposures {
    /// Intercept of the regression, per period.
    pub alpha: Option<f64>,
    /// One entry per factor in input order; empty when undefined.
    pub exposures: Vec<FactorExposure>,
    /// Floored at zero. `None` when undefined or the returns are constant.
    pub r_squared: Option<f64>,
    /// Timestamps common to the strategy and every factor.
    pub observations: usize,
}

impl FactorExposures {
    fn undefined(observations: usize) -> Self {
        Self {
            alpha: None,
            exposures: Vec::new(),
            r_squared: None,
            observations,
        }
    }
}

/// Regresses `returns` on the factors with an intercept, using only timestamps
/// present in every series.
pub(crate) fn factor_exposures(
    returns: &[(DateTime<Utc>, f64)],
    factors: &[FactorSeries],
) -> Result<FactorExposures, RiskError> {
    // --- 1. Align on common timestamps ---
    let lookups: Vec<HashMap<DateTime<Utc>, f64>> = factors
        .iter()
        .map(|f| f.returns.iter().copied().collect())
        .collect();

    let mut y = Vec::new();
    let mut rows: Vec<f64> = Vec::new();
    for (timestamp, value) in returns {
        let row: Option<Vec<f64>> = lookups.iter().map(|l| l.get(timestamp).copied()).collect();
        if let Some(row) = row {
            y.push(*value);
            rows.push(1.0);
            rows.extend(row);
        }
    }

    let n = y.len();
    if factors.is_empty() || n < 2 {
        tracing::debug!(observations = n, "Too few common observations for factor exposures");
        return Ok(FactorExposures::undefined(n));
    }
    if y.iter().chain(rows.iter()).any(|v| !v.is_finite()) {
        return Err(RiskError::Calculation(statistics::StatsError::NonFinite));
    }

    // --- 2. Least squares through the pseudo-inverse ---
    let x = DMatrix::from_row_slice(n, factors.len() + 1, &rows);
    let y = DVector::from_vec(y);
    let pinv = x
        .clone()
        .pseudo_inverse(PSEUDO_INVERSE_EPSILON)
        .map_err(|e| RiskError::Calculation(statistics::StatsError::Singular(e.to_string())))?;
    let beta = &pinv * &y;

    // --- 3. Goodness of fit ---
    let residuals = &y - &x * &beta;
    let y_mean = y.mean();
    let total: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let r_squared = (total > 0.0).then(|| (1.0 - residuals.norm_squared() / total).max(0.0));

    Ok(FactorExposures {
        alpha: Some(beta[0]),
        exposures: factors
            .iter()
            .enumerate()
            .map(|(i, f)| FactorExposure {
                factor: f.name.clone(),
                beta: beta[i + 1],
            })
            .collect(),
        r_squared,
        observations: n,
    })
}
