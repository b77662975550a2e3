//! Euclidean projection onto the box-constrained simplex.

use crate::error::OptimizerError;

const BISECTION_STEPS: usize = 200;
const FEASIBILITY_SLACK: f64 = 1e-12;

/// Per-asset bounds plus the budget constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightBounds {
    pub lower: f64,
    pub upper: f64,
    /// Σw = 1 when set, Σw ≤ 1 otherwise.
    pub fully_invested: bool,
}

impl WeightBounds {
    /// Fails when no weight vector of `n_assets` entries fits the bounds.
    pub fn check_feasible(&self, n_assets: usize) -> Result<(), OptimizerError> {
        let n = n_assets as f64;
        if self.lower > self.upper {
            return Err(OptimizerError::InfeasibleConstraints(format!(
                "floor {} exceeds cap {}",
                self.lower, self.upper
            )));
        }
        if n * self.lower > 1.0 + FEASIBILITY_SLACK {
            return Err(OptimizerError::InfeasibleConstraints(format!(
                "{} assets at a floor of {} need more than the full budget",
                n_assets, self.lower
            )));
        }
        if self.fully_invested && n * self.upper < 1.0 - FEASIBILITY_SLACK {
            return Err(OptimizerError::InfeasibleConstraints(format!(
                "{} assets capped at {} cannot be fully invested",
                n_assets, self.upper
            )));
        }
        Ok(())
    }

    /// Closest feasible point to `v`. Assumes [`check_feasible`](Self::check_feasible) passed.
    pub fn project(&self, v: &[f64]) -> Vec<f64> {
        let clamped: Vec<f64> = v.iter().map(|x| x.clamp(self.lower, self.upper)).collect();
        if !self.fully_invested && clamped.iter().sum::<f64>() <= 1.0 {
            return clamped;
        }

        // Σ clamp(v_i - τ) is non-increasing in τ; bisect for the budget.
        let shifted_sum =
            |tau: f64| -> f64 { v.iter().map(|x| (x - tau).clamp(self.lower, self.upper)).sum() };
        let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = v.iter().copied().fold(f64::INFINITY, f64::min);
        let mut low = min - self.upper;
        let mut high = max - self.lower;
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (low + high);
            if shifted_sum(mid) > 1.0 {
                low = mid;
            } else {
                high = mid;
            }
        }
        let tau = 0.5 * (low + high);
        v.iter().map(|x| (x - tau).clamp(self.lower, self.upper)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLEX: WeightBounds = WeightBounds {
        lower: 0.0,
        upper: 1.0,
        fully_invested: true,
    };

    #[test]
    fn projection_onto_simplex() {
        let w = SIMPLEX.project(&[0.5, 0.5, 0.5]);
        for x in &w {
            assert!((x - 1.0 / 3.0).abs() < 1e-12);
        }
        let w = SIMPLEX.project(&[2.0, 0.0]);
        assert!((w[0] - 1.0).abs() < 1e-12 && w[1].abs() < 1e-12);
    }

    #[test]
    fn caps_are_respected() {
        let bounds = WeightBounds {
            upper: 0.6,
            ..SIMPLEX
        };
        let w = bounds.project(&[2.0 / 3.0, 1.0 / 3.0]);
        assert!((w[0] - 0.6).abs() < 1e-12);
        assert!((w[1] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn partial_investment_keeps_small_vectors() {
        let bounds = WeightBounds {
            fully_invested: false,
            ..SIMPLEX
        };
        assert_eq!(bounds.project(&[0.2, -0.1]), vec![0.2, 0.0]);
        let w = bounds.project(&[0.9, 0.9]);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn infeasible_bounds_are_detected() {
        let floor = WeightBounds {
            lower: 0.4,
            ..SIMPLEX
        };
        assert!(floor.check_feasible(3).is_err());
        assert!(floor.check_feasible(2).is_ok());

        let cap = WeightBounds {
            upper: 0.2,
            ..SIMPLEX
        };
        assert!(cap.check_feasible(4).is_err());
        assert!(cap.check_feasible(5).is_ok());
    }
}
