//! Ordinary least squares via normal equations.

use crate::error::StatsError;
use nalgebra::{DMatrix, DVector};

/// Result of a simple regression `y = intercept + slope * x`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
    pub residuals: Vec<f64>,
    pub r_squared: f64,
}

/// Result of a regression with an arbitrary design matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipleFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    pub nobs: usize,
}

impl MultipleFit {
    /// t-statistic of coefficient `index`. `None` when its standard error is zero.
    pub fn t_value(&self, index: usize) -> Option<f64> {
        let se = *self.std_errors.get(index)?;
        if se > 0.0 && se.is_finite() {
            Some(self.coefficients[index] / se)
        } else {
            None
        }
    }

    /// Gaussian log-likelihood of the fit.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    /// Akaike information criterion: `-2 llf + 2 k`.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.coefficients.len() as f64
    }
}

/// Regresses `y` on `x` with an intercept.
pub fn ols(x: &[f64], y: &[f64]) -> Result<LinearFit, StatsError> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    let n = x.len();
    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { x[i] });
    let fit = ols_multiple(&design, y)?;

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let r_squared = if tss > 0.0 { 1.0 - fit.ssr / tss } else { 1.0 };

    Ok(LinearFit {
        intercept: fit.coefficients[0],
        slope: fit.coefficients[1],
        residuals: fit.residuals,
        r_squared,
    })
}

/// Hedge ratio of `asset` against `benchmark`: the slope of regressing the
/// asset's prices on the benchmark's prices.
pub fn hedge_ratio(asset: &[f64], benchmark: &[f64]) -> Result<f64, StatsError> {
    Ok(ols(benchmark, asset)?.slope)
}

/// Solves `y = X b` by least squares, returning coefficients with their
/// classical standard errors.
pub fn ols_multiple(design: &DMatrix<f64>, y: &[f64]) -> Result<MultipleFit, StatsError> {
    let (n, k) = design.shape();
    if n != y.len() {
        return Err(StatsError::LengthMismatch {
            left: n,
            right: y.len(),
        });
    }
    if n <= k {
        return Err(StatsError::InsufficientData {
            required: k + 1,
            available: n,
        });
    }
    if design.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite);
    }

    let y_vec = DVector::from_column_slice(y);
    let xtx = design.transpose() * design;
    let xty = design.transpose() * &y_vec;

    let xtx_inv = xtx
        .try_inverse()
        .ok_or_else(|| StatsError::Singular(format!("X'X is not invertible ({}x{})", k, k)))?;
    let beta = &xtx_inv * xty;

    let residuals = &y_vec - design * &beta;
    let ssr = residuals.norm_squared();
    let sigma2 = ssr / (n - k) as f64;
    let std_errors = (0..k)
        .map(|i| (sigma2 * xtx_inv[(i, i)]).max(0.0).sqrt())
        .collect();

    Ok(MultipleFit {
        coefficients: beta.iter().copied().collect(),
        std_errors,
        residuals: residuals.iter().copied().collect(),
        ssr,
        nobs: n,
    })
}
