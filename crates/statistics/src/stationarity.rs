//! Augmented Dickey-Fuller unit-root test (constant, no trend).
//!
//! The regression is `Δy_t = α + γ y_{t-1} + Σ δ_i Δy_{t-i} + ε_t`; the test
//! statistic is the t-value of `γ`. The number of lagged differences is chosen
//! by AIC between zero and `maxlag`, with every candidate fitted on the same
//! sample, and the winning lag is then refitted on all rows available to it.
//! P-values follow MacKinnon's (1994) response-surface approximation.

use crate::error::StatsError;
use crate::regression::{MultipleFit, ols_multiple};
use nalgebra::DMatrix;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::trace;

/// Shortest series the test accepts.
pub const MIN_ADF_OBSERVATIONS: usize = 8;

// MacKinnon (1994) surface for a single series with a constant term.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    /// Lagged differences in the selected regression.
    pub used_lag: usize,
    /// Observations in the selected regression.
    pub nobs: usize,
}

/// Runs the test with `maxlag = ⌊(n - 1)^(1/3)⌋` unless `max_lag` is given.
pub fn adf_test(series: &[f64], max_lag: Option<usize>) -> Result<AdfResult, StatsError> {
    let n = series.len();
    if n < MIN_ADF_OBSERVATIONS {
        return Err(StatsError::InsufficientData {
            required: MIN_ADF_OBSERVATIONS,
            available: n,
        });
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite);
    }

    let default_lag = ((n - 1) as f64).powf(1.0 / 3.0) as usize;
    let maxlag = max_lag.unwrap_or(default_lag).min(n / 2 - 2);
    let diff: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // --- 1. LAG SELECTION ON A COMMON SAMPLE ---
    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=maxlag {
        let fit = match fit_adf_regression(series, &diff, lag, maxlag) {
            Ok(fit) => fit,
            Err(StatsError::Singular(_)) => continue,
            Err(e) => return Err(e),
        };
        let aic = fit.aic();
        trace!(lag, aic, "ADF candidate");
        if best.is_none_or(|(_, best_aic)| aic < best_aic) {
            best = Some((lag, aic));
        }
    }
    let (used_lag, _) = best.ok_or_else(|| {
        StatsError::Singular("no ADF regression could be fitted".to_string())
    })?;

    // --- 2. REFIT THE CHOSEN LAG ON ITS FULL SAMPLE ---
    let fit = fit_adf_regression(series, &diff, used_lag, used_lag)?;
    let statistic = fit
        .t_value(1)
        .ok_or_else(|| StatsError::Singular("level coefficient has zero standard error".to_string()))?;

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        used_lag,
        nobs: fit.nobs,
    })
}

/// Fits the ADF regression with `lag` lagged differences using rows from
/// `start` (which must be at least `lag`).
fn fit_adf_regression(
    series: &[f64],
    diff: &[f64],
    lag: usize,
    start: usize,
) -> Result<MultipleFit, StatsError> {
    let rows = diff.len().saturating_sub(start);
    let cols = 2 + lag;
    let design = DMatrix::from_fn(rows, cols, |r, c| {
        let t = start + r;
        match c {
            0 => 1.0,
            1 => series[t],
            i => diff[t - (i - 1)],
        }
    });
    ols_multiple(&design, &diff[start..])
}

/// Approximate p-value of an ADF statistic (constant, one series).
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic.is_nan() {
        return 1.0;
    }
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let poly = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.cdf(poly),
        Err(_) => 1.0,
    }
}

/// Evaluates `c0 + c1 x + c2 x² + ...`.
fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn p_value_matches_critical_values() {
        // Asymptotic 5% and 1% critical values with a constant.
        assert!((mackinnon_p_value(-2.86) - 0.05).abs() < 0.002);
        assert!((mackinnon_p_value(-3.43) - 0.01).abs() < 0.002);
        assert_eq!(mackinnon_p_value(3.0), 1.0);
        assert_eq!(mackinnon_p_value(-25.0), 0.0);
        assert!(mackinnon_p_value(0.0) > 0.9);
    }

    #[test]
    fn p_value_is_continuous_across_the_surface_switch() {
        let below = mackinnon_p_value(TAU_STAR - 0.001);
        let above = mackinnon_p_value(TAU_STAR + 0.001);
        assert!((below - above).abs() < 0.01, "p({}) = {below}, p({}) = {above}", TAU_STAR - 0.001, TAU_STAR + 0.001);
        assert!((below - 0.478).abs() < 0.005);
    }

    #[test]
    fn large_p_branch_matches_reference_values() {
        assert!((mackinnon_p_value(-1.0) - 0.753).abs() < 0.003);
        assert!((mackinnon_p_value(0.0) - 0.9585).abs() < 0.002);
        assert!(mackinnon_p_value(-1.5) < mackinnon_p_value(-1.0));
    }

    #[test]
    fn stationary_ar1_rejects_unit_root() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut x = 0.0;
        let series: Vec<f64> = (0..500)
            .map(|_| {
                x = 0.5 * x + rng.gen_range(-1.0..1.0);
                x
            })
            .collect();
        let result = adf_test(&series, None).unwrap();
        assert!(result.p_value < 0.01, "p = {}", result.p_value);
        assert!(result.used_lag <= 7);
    }

    #[test]
    fn explosive_series_does_not_reject() {
        let mut rng = StdRng::seed_from_u64(3);
        let series: Vec<f64> = (0..200)
            .map(|t| 10.0 * 1.02_f64.powi(t) + rng.gen_range(-0.5..0.5))
            .collect();
        let result = adf_test(&series, None).unwrap();
        assert!(result.p_value > 0.5, "p = {}", result.p_value);
    }

    #[test]
    fn short_or_dirty_input_is_rejected() {
        assert!(matches!(
            adf_test(&[1.0, 2.0, 3.0], None),
            Err(StatsError::InsufficientData { .. })
        ));
        let mut series: Vec<f64> = (0..50).map(f64::from).collect();
        series[10] = f64::NAN;
        assert_eq!(adf_test(&series, None), Err(StatsError::NonFinite));
    }
}
