use crate::error::StatsError;
use crate::regression::ols;

/// Speed of mean reversion estimated from `Δs_t = α + λ s_{t-1} + ε_t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfLife {
    pub lambda: f64,
    /// `-ln 2 / λ` in bars; `None` when `λ >= 0` (no mean reversion).
    pub half_life: Option<f64>,
}

impl HalfLife {
    pub fn is_mean_reverting(&self) -> bool {
        self.half_life.is_some()
    }
}

pub fn estimate_half_life(spread: &[f64]) -> Result<HalfLife, StatsError> {
    if spread.len() < 3 {
        return Err(StatsError::InsufficientData {
            required: 3,
            available: spread.len(),
        });
    }
    let lagged = &spread[..spread.len() - 1];
    let delta: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();
    let lambda = ols(lagged, &delta)?.slope;

    let half_life = (lambda < 0.0).then(|| -std::f64::consts::LN_2 / lambda);
    Ok(HalfLife { lambda, half_life })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn ar1_half_life_is_close_to_theory() {
        // s_t = 0.9 s_{t-1} + e  =>  λ ≈ -0.1, half-life ≈ 6.9 bars.
        let mut rng = StdRng::seed_from_u64(11);
        let mut s = 0.0;
        let spread: Vec<f64> = (0..5000)
            .map(|_| {
                s = 0.9 * s + rng.gen_range(-1.0..1.0);
                s
            })
            .collect();
        let estimate = estimate_half_life(&spread).unwrap();
        assert!((estimate.lambda + 0.1).abs() < 0.03, "λ = {}", estimate.lambda);
        let hl = estimate.half_life.unwrap();
        assert!(hl > 4.5 && hl < 11.0, "half-life = {}", hl);
    }

    #[test]
    fn trending_spread_has_no_half_life() {
        let spread: Vec<f64> = (0..50).map(|t| 1.05_f64.powi(t)).collect();
        let estimate = estimate_half_life(&spread).unwrap();
        assert!(estimate.lambda > 0.0);
        assert!(!estimate.is_mean_reverting());
    }
}
