use crate::error::OptimizerError;
use chrono::{DateTime, Utc};
use core_types::ResultSeries;
use nalgebra::{DMatrix, DVector};
use std::collections::{BTreeSet, HashMap};

/// Per-period returns of several assets on a common timeline.
///
/// Rows are observations in timestamp order, columns are assets.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnsMatrix {
    assets: Vec<String>,
    timestamps: Vec<DateTime<Utc>>,
    data: DMatrix<f64>,
}

impl ReturnsMatrix {
    /// Builds the matrix from one return column per asset.
    pub fn from_columns(
        assets: Vec<String>,
        timestamps: Vec<DateTime<Utc>>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, OptimizerError> {
        if assets.is_empty() || assets.len() != columns.len() {
            return Err(OptimizerError::InvalidReturns(format!(
                "{} asset names for {} return columns",
                assets.len(),
                columns.len()
            )));
        }
        if let Some(column) = columns.iter().find(|c| c.len() != timestamps.len()) {
            return Err(OptimizerError::InvalidReturns(format!(
                "column of {} returns against {} timestamps",
                column.len(),
                timestamps.len()
            )));
        }
        if columns.iter().flatten().any(|r| !r.is_finite()) {
            return Err(OptimizerError::InvalidReturns(
                "returns contain non-finite values".to_string(),
            ));
        }

        let data = DMatrix::from_fn(timestamps.len(), assets.len(), |row, col| columns[col][row]);
        Ok(Self {
            assets,
            timestamps,
            data,
        })
    }

    /// Aligns dated return series on the timestamps they all share.
    pub fn from_series(series: &[(String, Vec<(DateTime<Utc>, f64)>)]) -> Result<Self, OptimizerError> {
        let lookups: Vec<HashMap<DateTime<Utc>, f64>> = series
            .iter()
            .map(|(_, returns)| returns.iter().copied().collect())
            .collect();

        let timestamps: Vec<DateTime<Utc>> = series
            .first()
            .map(|(_, returns)| {
                returns
                    .iter()
                    .map(|(t, _)| *t)
                    .filter(|t| lookups.iter().all(|l| l.contains_key(t)))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .unwrap_or_default();

        let columns = lookups
            .iter()
            .map(|l| timestamps.iter().filter_map(|t| l.get(t).copied()).collect())
            .collect();
        let assets = series.iter().map(|(name, _)| name.clone()).collect();
        Self::from_columns(assets, timestamps, columns)
    }

    /// One asset per backtest, named `strategy:symbol`.
    pub fn from_results(results: &[ResultSeries]) -> Result<Self, OptimizerError> {
        let series: Vec<(String, Vec<(DateTime<Utc>, f64)>)> = results
            .iter()
            .map(|r| {
                (
                    format!("{}:{}", r.strategy, r.symbol),
                    r.returns_by_timestamp().collect(),
                )
            })
            .collect();
        Self::from_series(&series)
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn n_assets(&self) -> usize {
        self.data.ncols()
    }

    pub fn n_observations(&self) -> usize {
        self.data.nrows()
    }

    /// Mean return of each asset.
    pub fn mean_returns(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.n_assets(),
            self.data.column_iter().map(|c| c.mean()),
        )
    }

    /// Sample covariance (`n - 1` denominator).
    pub fn covariance(&self) -> Result<DMatrix<f64>, OptimizerError> {
        let n = self.n_observations();
        if n < 2 {
            return Err(OptimizerError::InsufficientData {
                required: 2,
                available: n,
            });
        }
        let means = self.mean_returns();
        let centered = DMatrix::from_fn(n, self.n_assets(), |row, col| {
            self.data[(row, col)] - means[col]
        });
        Ok(centered.transpose() * &centered / (n - 1) as f64)
    }
}
