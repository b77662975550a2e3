use crate::error::OptimizerError;
use crate::projection::WeightBounds;
use crate::returns::ReturnsMatrix;
use configuration::{OptimizerSettings, PortfolioConstraints};
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A Cholesky pivot this small relative to its variance marks a linearly
/// dependent asset.
const PIVOT_TOLERANCE: f64 = 1e-10;
const MIN_STEP: f64 = 1e-14;

/// The weights that maximise the Sharpe ratio, with annualised metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalPortfolio {
    pub assets: Vec<String>,
    pub weights: Vec<f64>,
    /// Annualised, including the uninvested remainder at the risk-free rate.
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Per-period moments of the returns matrix.
struct Moments {
    /// Mean return in excess of the per-period risk-free rate.
    excess: DVector<f64>,
    covariance: DMatrix<f64>,
    cholesky: Cholesky<f64, Dyn>,
}

impl Moments {
    fn portfolio(&self, weights: &DVector<f64>) -> (f64, f64) {
        let excess = self.excess.dot(weights);
        let variance = (&self.covariance * weights).dot(weights);
        (excess, variance.max(0.0).sqrt())
    }

    /// Per-period Sharpe ratio; `None` for a zero-risk portfolio.
    fn sharpe(&self, weights: &DVector<f64>) -> Option<f64> {
        let (excess, vol) = self.portfolio(weights);
        (vol > 0.0).then(|| excess / vol)
    }

    /// ∇S = μₑ/σ - (wᵀμₑ) Σw / σ³
    fn gradient(&self, weights: &DVector<f64>) -> Option<DVector<f64>> {
        let (excess, vol) = self.portfolio(weights);
        if vol <= 0.0 {
            return None;
        }
        let sigma_w = &self.covariance * weights;
        Some(&self.excess / vol - sigma_w * (excess / vol.powi(3)))
    }
}

struct Climb {
    weights: DVector<f64>,
    sharpe: f64,
    iterations: usize,
    converged: bool,
}

/// Constrained maximum-Sharpe portfolio search.
#[derive(Debug, Clone)]
pub struct PortfolioOptimizer {
    settings: OptimizerSettings,
}

impl PortfolioOptimizer {
    pub fn new(settings: OptimizerSettings) -> Result<Self, OptimizerError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    pub fn optimize(&self, returns: &ReturnsMatrix) -> Result<OptimalPortfolio, OptimizerError> {
        let n = returns.n_assets();
        let bounds = bounds_for(&self.settings.constraints);
        bounds.check_feasible(n)?;

        let moments = self.moments(returns)?;

        // --- 1. Starting points ---
        let mut starts = vec![DVector::from_element(n, 1.0 / n as f64)];
        starts.push(tangency(&moments));
        starts.extend((0..n).map(|i| {
            let mut corner = DVector::zeros(n);
            corner[i] = 1.0;
            corner
        }));

        // --- 2. Climb from every start in parallel ---
        let best = starts
            .into_par_iter()
            .filter_map(|start| self.climb(&moments, &bounds, start))
            .max_by(|a, b| a.sharpe.total_cmp(&b.sharpe))
            .ok_or_else(|| {
                OptimizerError::SingularCovariance(
                    "every feasible starting portfolio has zero risk".to_string(),
                )
            })?;

        // --- 3. Annualise ---
        let ppy = self.settings.periods_per_year;
        let rf_period = self.settings.risk_free_rate / ppy;
        let (excess, vol) = moments.portfolio(&best.weights);
        // Any uninvested remainder earns the risk-free rate.
        let period_return = excess + rf_period;

        let portfolio = OptimalPortfolio {
            assets: returns.assets().to_vec(),
            weights: best.weights.iter().copied().collect(),
            expected_return: period_return * ppy,
            volatility: vol * ppy.sqrt(),
            sharpe_ratio: best.sharpe * ppy.sqrt(),
            iterations: best.iterations,
            converged: best.converged,
        };
        tracing::info!(
            assets = n,
            sharpe = portfolio.sharpe_ratio,
            iterations = portfolio.iterations,
            converged = portfolio.converged,
            "Portfolio optimised"
        );
        Ok(portfolio)
    }

    fn moments(&self, returns: &ReturnsMatrix) -> Result<Moments, OptimizerError> {
        let n = returns.n_assets();
        let observations = returns.n_observations();
        if observations <= n {
            return Err(OptimizerError::SingularCovariance(format!(
                "{observations} observations cannot identify {n} assets"
            )));
        }

        let covariance = returns.covariance()?;
        let cholesky = Cholesky::new(covariance.clone()).ok_or_else(|| {
            OptimizerError::SingularCovariance("Cholesky factorisation failed".to_string())
        })?;
        let l = cholesky.l();
        if let Some(i) = (0..n).find(|&i| l[(i, i)].powi(2) <= PIVOT_TOLERANCE * covariance[(i, i)]) {
            return Err(OptimizerError::SingularCovariance(format!(
                "asset '{}' is a linear combination of the others",
                returns.assets()[i]
            )));
        }

        let rf_period = self.settings.risk_free_rate / self.settings.periods_per_year;
        let excess = returns.mean_returns().add_scalar(-rf_period);
        Ok(Moments {
            excess,
            covariance,
            cholesky,
        })
    }

    /// Projected gradient ascent with a backtracking step.
    fn climb(&self, moments: &Moments, bounds: &WeightBounds, start: DVector<f64>) -> Option<Climb> {
        let mut weights = project(bounds, &start);
        let mut sharpe = moments.sharpe(&weights)?;
        let mut step = 1.0;

        for iteration in 1..=self.settings.max_iterations {
            let gradient = moments.gradient(&weights)?;
            let accepted = loop {
                let candidate = project(bounds, &(&weights + &gradient * step));
                match moments.sharpe(&candidate) {
                    Some(value) if value > sharpe => break Some((candidate, value)),
                    _ if step < MIN_STEP => break None,
                    _ => step *= 0.5,
                }
            };

            let Some((candidate, value)) = accepted else {
                return Some(Climb { weights, sharpe, iterations: iteration, converged: true });
            };
            let improvement = value - sharpe;
            weights = candidate;
            sharpe = value;
            step *= 2.0;
            if improvement < self.settings.tolerance {
                return Some(Climb { weights, sharpe, iterations: iteration, converged: true });
            }
        }

        tracing::debug!(sharpe, "Gradient ascent hit the iteration limit");
        Some(Climb {
            weights,
            sharpe,
            iterations: self.settings.max_iterations,
            converged: false,
        })
    }
}

fn bounds_for(constraints: &PortfolioConstraints) -> WeightBounds {
    WeightBounds {
        lower: constraints.lower_bound(),
        upper: constraints.max_weight,
        fully_invested: constraints.fully_invested,
    }
}

fn project(bounds: &WeightBounds, weights: &DVector<f64>) -> DVector<f64> {
    DVector::from_vec(bounds.project(weights.as_slice()))
}

/// Σ⁻¹μₑ scaled to a unit budget, the unconstrained optimum.
fn tangency(moments: &Moments) -> DVector<f64> {
    let raw = moments.cholesky.solve(&moments.excess);
    let total: f64 = raw.iter().sum();
    let scale = if total.abs() > f64::EPSILON {
        total
    } else {
        raw.iter().map(|w| w.abs()).sum::<f64>().max(f64::EPSILON)
    };
    raw / scale
}

/// Maximum-Sharpe weights under `constraints`.
pub fn optimize_sharpe(
    returns: &ReturnsMatrix,
    risk_free_rate: f64,
    constraints: PortfolioConstraints,
) -> Result<Vec<f64>, OptimizerError> {
    Ok(optimize_portfolio(returns, risk_free_rate, constraints)?.weights)
}

/// Like [`optimize_sharpe`] but also reports annualised portfolio metrics.
pub fn optimize_portfolio(
    returns: &ReturnsMatrix,
    risk_free_rate: f64,
    constraints: PortfolioConstraints,
) -> Result<OptimalPortfolio, OptimizerError> {
    PortfolioOptimizer::new(OptimizerSettings {
        risk_free_rate,
        constraints,
        ..OptimizerSettings::default()
    })?
    .optimize(returns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn dates(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n as i64).map(|d| start + chrono::Duration::days(d)).collect()
    }

    fn matrix(columns: Vec<Vec<f64>>) -> ReturnsMatrix {
        let assets = (0..columns.len()).map(|i| format!("asset{i}")).collect();
        let n = columns[0].len();
        ReturnsMatrix::from_columns(assets, dates(n), columns).unwrap()
    }

    /// Two uncorrelated assets with equal variance and means 2:1.
    fn orthogonal_pair() -> ReturnsMatrix {
        let x = [1.0, -1.0, 1.0, -1.0];
        let y = [1.0, 1.0, -1.0, -1.0];
        let a = (0..40).map(|i| 0.002 + 0.01 * x[i % 4]).collect();
        let b = (0..40).map(|i| 0.001 + 0.01 * y[i % 4]).collect();
        matrix(vec![a, b])
    }

    fn random_assets(n_assets: usize, seed: u64) -> ReturnsMatrix {
        let mut rng = StdRng::seed_from_u64(seed);
        let columns = (0..n_assets)
            .map(|i| {
                let drift = 0.0002 * (i as f64 + 1.0);
                (0..500).map(|_| drift + rng.gen_range(-0.02..0.02)).collect()
            })
            .collect();
        matrix(columns)
    }

    #[test]
    fn tangency_portfolio_is_recovered() {
        let weights = optimize_sharpe(&orthogonal_pair(), 0.0, PortfolioConstraints::default()).unwrap();
        assert!((weights[0] - 2.0 / 3.0).abs() < 1e-6, "{weights:?}");
        assert!((weights[1] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn cap_binds_at_the_boundary() {
        let constraints = PortfolioConstraints {
            max_weight: 0.6,
            ..PortfolioConstraints::default()
        };
        let weights = optimize_sharpe(&orthogonal_pair(), 0.0, constraints).unwrap();
        assert!((weights[0] - 0.6).abs() < 1e-6, "{weights:?}");
        assert!((weights[1] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn weights_sum_to_one_within_bounds() {
        for seed in 0..5 {
            let constraints = PortfolioConstraints {
                max_weight: 0.4,
                min_weight: 0.05,
                ..PortfolioConstraints::default()
            };
            let portfolio = optimize_portfolio(&random_assets(5, seed), 0.02, constraints).unwrap();
            let total: f64 = portfolio.weights.iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "seed {seed}: {total}");
            assert!(portfolio.weights.iter().all(|w| (0.05 - 1e-9..=0.4 + 1e-9).contains(w)));
            assert!(portfolio.volatility > 0.0);
        }
    }

    #[test]
    fn optimum_beats_equal_weight() {
        let returns = random_assets(4, 9);
        let portfolio = optimize_portfolio(&returns, 0.0, PortfolioConstraints::default()).unwrap();
        let optimizer = PortfolioOptimizer::new(OptimizerSettings {
            risk_free_rate: 0.0,
            ..OptimizerSettings::default()
        })
        .unwrap();
        let moments = optimizer.moments(&returns).unwrap();
        let equal = moments.sharpe(&DVector::from_element(4, 0.25)).unwrap() * 252.0_f64.sqrt();
        assert!(portfolio.sharpe_ratio >= equal - 1e-12);
    }

    #[test]
    fn floors_above_the_budget_are_infeasible() {
        let constraints = PortfolioConstraints {
            min_weight: 0.4,
            ..PortfolioConstraints::default()
        };
        assert!(matches!(
            optimize_sharpe(&random_assets(3, 1), 0.0, constraints),
            Err(OptimizerError::InfeasibleConstraints(_))
        ));
    }

    #[test]
    fn duplicated_asset_is_singular() {
        let mut rng = StdRng::seed_from_u64(8);
        let column: Vec<f64> = (0..100).map(|_| rng.gen_range(-0.01..0.01)).collect();
        let doubled: Vec<f64> = column.iter().map(|r| 2.0 * r).collect();
        assert!(matches!(
            optimize_sharpe(&matrix(vec![column, doubled]), 0.0, PortfolioConstraints::default()),
            Err(OptimizerError::SingularCovariance(_))
        ));
    }

    #[test]
    fn short_sample_is_singular() {
        let returns = matrix(vec![vec![0.01, -0.02, 0.0], vec![0.0, 0.01, 0.02], vec![0.03, 0.0, -0.01]]);
        assert!(matches!(
            optimize_sharpe(&returns, 0.0, PortfolioConstraints::default()),
            Err(OptimizerError::SingularCovariance(_))
        ));
    }
}
