//! Annualised risk-adjusted return ratios over a per-period return series.

use crate::descriptive::{mean, sample_std};

/// `(mean - rf) / std * sqrt(periods_per_year)`.
///
/// `risk_free_rate` is annual and converted to a per-period rate. `None` when
/// fewer than two returns exist or the returns have zero variance.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> Option<f64> {
    let excess = mean(returns)? - risk_free_rate / periods_per_year;
    let std = sample_std(returns).filter(|s| *s > 0.0)?;
    Some(excess / std * periods_per_year.sqrt())
}

/// Like [`sharpe_ratio`] but divides by the standard deviation of the negative
/// returns only. `None` with fewer than two losing periods.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> Option<f64> {
    let excess = mean(returns)? - risk_free_rate / periods_per_year;
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_std = sample_std(&downside).filter(|s| *s > 0.0)?;
    Some(excess / downside_std * periods_per_year.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_returns_have_no_sharpe() {
        assert_eq!(sharpe_ratio(&[0.25; 20], 0.0, 252.0), None);
        assert_eq!(sharpe_ratio(&[0.01], 0.0, 252.0), None);
    }

    #[test]
    fn sharpe_matches_hand_computation() {
        let returns = [0.01, -0.01, 0.02, 0.0];
        // mean 0.005, sample variance 0.0005 / 3
        let expected = 0.005 / (0.0005_f64 / 3.0).sqrt();
        assert!((sharpe_ratio(&returns, 0.0, 1.0).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn sortino_needs_two_losses() {
        assert_eq!(sortino_ratio(&[0.01, -0.01, 0.02], 0.0, 252.0), None);
        let returns = [0.03, -0.01, 0.02, -0.02];
        assert!(sortino_ratio(&returns, 0.0, 252.0).unwrap() > 0.0);
    }

    #[test]
    fn risk_free_rate_is_deannualised() {
        let returns = [0.01, 0.03, 0.02, 0.0];
        let with_rf = sharpe_ratio(&returns, 2.52, 252.0).unwrap();
        let without = sharpe_ratio(&returns, 0.0, 252.0).unwrap();
        assert!(with_rf < without);
    }
}
