//! Column-wise z-score standardization.
//!
//! Used by both the PCA integrator (per-level standardization within the
//! fitting window) and the Lasso estimator (feature scaling before
//! coordinate descent).
//!
//! # Formula
//!
//! For each column j of an `[n_samples, n_features]` matrix:
//!
//! ```text
//! mean[j] = (1/n) × Σ x[i,j]
//! std[j]  = sqrt((1/n) × Σ (x[i,j] - mean[j])²)
//! z[i,j]  = (x[i,j] - mean[j]) / std[j]
//! ```
//!
//! Population statistics (divide by n) are used throughout. A column whose
//! std falls below the configured floor is *degenerate*: callers decide
//! whether to drop it (PCA) or pin its coefficient at zero (Lasso). Its
//! standardized values are defined as 0 rather than dividing by ~0.
//!
//! # Example
//!
//! ```
//! use cross_impact::preprocessing::ColumnStandardizer;
//! use ndarray::array;
//!
//! let x = array![[1.0, 5.0], [3.0, 5.0]];
//! let scaler = ColumnStandardizer::fit(&x, 1e-12);
//! assert_eq!(scaler.means().to_vec(), vec![2.0, 5.0]);
//! assert!(scaler.is_degenerate(1));
//!
//! let z = scaler.transform(&x);
//! assert_eq!(z[[0, 0]], -1.0);
//! assert_eq!(z[[0, 1]], 0.0);
//! ```

use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Per-column mean and standard deviation fitted on a window.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStandardizer {
    means: Array1<f64>,
    stds: Array1<f64>,
    min_std: f64,
}

impl ColumnStandardizer {
    /// Fit on the rows of `x`.
    ///
    /// An empty matrix yields zero means and zero stds (every column
    /// degenerate).
    pub fn fit(x: &Array2<f64>, min_std: f64) -> Self {
        let n_features = x.ncols();
        if x.nrows() == 0 {
            return Self {
                means: Array1::zeros(n_features),
                stds: Array1::zeros(n_features),
                min_std,
            };
        }

        let means = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let stds = x.std_axis(Axis(0), 0.0);

        Self {
            means,
            stds,
            min_std,
        }
    }

    /// Fitted means.
    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    /// Fitted population standard deviations.
    pub fn stds(&self) -> &Array1<f64> {
        &self.stds
    }

    /// Whether column `j` has (near) zero variance.
    #[inline]
    pub fn is_degenerate(&self, j: usize) -> bool {
        !(self.stds[j] >= self.min_std) || !self.stds[j].is_finite()
    }

    /// Indices of columns with usable variance.
    pub fn informative_columns(&self) -> Vec<usize> {
        (0..self.stds.len())
            .filter(|&j| !self.is_degenerate(j))
            .collect()
    }

    /// Standardize one row.
    pub fn transform_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        Array1::from_iter(row.iter().enumerate().map(|(j, &v)| self.standardize(j, v)))
    }

    /// Standardize every row of `x`.
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut z = x.clone();
        for ((_, j), v) in z.indexed_iter_mut() {
            *v = self.standardize(j, *v);
        }
        z
    }

    #[inline]
    fn standardize(&self, j: usize, value: f64) -> f64 {
        if self.is_degenerate(j) {
            0.0
        } else {
            (value - self.means[j]) / self.stds[j]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_statistics() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0], [4.0, 10.0]];
        let scaler = ColumnStandardizer::fit(&x, 1e-12);

        assert!((scaler.means()[0] - 2.5).abs() < 1e-12);
        // Population variance of 1..4 is 1.25
        assert!((scaler.stds()[0] - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(scaler.informative_columns(), vec![0]);
    }

    #[test]
    fn test_transform_zero_mean_unit_variance() {
        let x = array![[1.0], [2.0], [6.0], [7.0]];
        let scaler = ColumnStandardizer::fit(&x, 1e-12);
        let z = scaler.transform(&x);

        let mean = z.column(0).sum() / 4.0;
        let var = z.column(0).iter().map(|v| v * v).sum::<f64>() / 4.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_matrix_is_degenerate() {
        let x = Array2::<f64>::zeros((0, 3));
        let scaler = ColumnStandardizer::fit(&x, 1e-12);
        assert!(scaler.informative_columns().is_empty());
    }

    #[test]
    fn test_transform_row_matches_matrix() {
        let x = array![[1.0, 4.0], [3.0, 8.0]];
        let scaler = ColumnStandardizer::fit(&x, 1e-12);
        let z = scaler.transform(&x);
        let row = scaler.transform_row(x.row(1));
        assert_eq!(row, z.row(1).to_owned());
    }
}
