//! # Quantlab Optimizer
//!
//! Constrained maximum-Sharpe portfolio construction over a [`ReturnsMatrix`].
//!
//! ## Architectural Principles
//!
//! - **Feasibility first.** Constraint sets that no weight vector satisfies are
//!   rejected before any numerical work with
//!   [`OptimizerError::InfeasibleConstraints`].
//! - **The covariance must be invertible.** A sample that cannot identify every
//!   asset (too short, or with linearly dependent columns) fails with
//!   [`OptimizerError::SingularCovariance`] instead of producing arbitrary weights.
//! - **Deterministic multi-start.** Projected gradient ascent runs from the
//!   equal-weight portfolio, the projected tangency portfolio and every
//!   single-asset corner in parallel; the best result wins.
//!
//! ## Public API
//!
//! - [`optimize_sharpe`]: weights only.
//! - [`optimize_portfolio`]: weights plus annualised return, volatility and Sharpe.
//! - [`PortfolioOptimizer`]: the configured engine behind both.

pub mod error;
pub mod projection;
pub mod returns;
pub mod sharpe;

pub use error::OptimizerError;
pub use projection::WeightBounds;
pub use returns::ReturnsMatrix;
pub use sharpe::{OptimalPortfolio, PortfolioOptimizer, optimize_portfolio, optimize_sharpe};
