//! L1-penalised least squares by cyclic coordinate descent.
//!
//! Minimises
//!
//! ```text
//!     1/(2n) ‖y − Xβ − b‖² + α ‖β‖₁
//! ```
//!
//! Features are z-scored (population moments) and the label is centred
//! before the descent, so every coordinate update is a plain soft threshold:
//!
//! ```text
//!     β_j ← S( z_jᵀ r / n + β_j , α )        S(v, α) = sign(v)·max(|v| − α, 0)
//! ```
//!
//! Coefficients are mapped back to raw feature units afterwards and the
//! intercept is recovered from the column means. Zero-variance columns get
//! a coefficient of exactly zero.
//!
//! At `α ≥ alpha_max(X, y)` the all-zero vector is optimal and the solver
//! returns it without iterating.

use crate::error::{CrossImpactError, Result};
use crate::preprocessing::ColumnStandardizer;
use ndarray::{Array1, Array2, ArrayView1};

/// Columns with a population std below this are treated as constant.
pub const DEGENERATE_FEATURE_STD: f64 = 1e-12;

/// A fitted Lasso model in raw feature units.
#[derive(Debug, Clone, PartialEq)]
pub struct LassoFit {
    /// Penalty the model was fitted with
    pub alpha: f64,

    /// Coefficient per feature column
    pub coefficients: Array1<f64>,

    pub intercept: f64,

    /// Full coordinate sweeps performed
    pub iterations: usize,

    /// Whether the largest coordinate change fell below tolerance
    pub converged: bool,
}

impl LassoFit {
    /// Predict one row.
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.intercept + row.dot(&self.coefficients)
    }

    /// Predict every row of `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.coefficients) + self.intercept
    }

    /// Number of non-zero coefficients.
    pub fn support_size(&self) -> usize {
        self.coefficients.iter().filter(|c| **c != 0.0).count()
    }
}

/// Coordinate-descent Lasso solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LassoSolver {
    /// Maximum full sweeps over the coordinates
    pub max_iter: usize,

    /// Stop when the largest coefficient change in a sweep is below this
    /// (standardised units)
    pub tol: f64,
}

impl Default for LassoSolver {
    fn default() -> Self {
        Self {
            max_iter: 10_000,
            tol: 1e-6,
        }
    }
}

impl LassoSolver {
    pub fn new(max_iter: usize, tol: f64) -> Self {
        Self { max_iter, tol }
    }

    /// Fit at a single penalty.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<LassoFit> {
        let mut fits = self.fit_path(x, y, &[alpha])?;
        fits.pop()
            .ok_or_else(|| CrossImpactError::generic("empty regularisation path"))
    }

    /// Fit a sequence of penalties, warm-starting each from the previous.
    ///
    /// Results are returned in the order of `alphas`. Warm starts follow
    /// that order, so a descending grid is the efficient one.
    ///
    /// # Errors
    ///
    /// - `InsufficientData` for an empty `x`
    /// - `InvalidConfig` for a negative or non-finite alpha, or mismatched
    ///   shapes
    /// - `NonFiniteSeries` when `x` or `y` contains NaN/inf
    pub fn fit_path(&self, x: &Array2<f64>, y: &Array1<f64>, alphas: &[f64]) -> Result<Vec<LassoFit>> {
        let problem = Standardized::new(x, y)?;

        if let Some(bad) = alphas.iter().find(|a| !a.is_finite() || **a < 0.0) {
            return Err(CrossImpactError::config(format!("invalid alpha {bad}")));
        }

        let mut beta = Array1::<f64>::zeros(problem.z.ncols());
        let mut out = Vec::with_capacity(alphas.len());
        for &alpha in alphas {
            let (iterations, converged) = self.descend(&problem, alpha, &mut beta);
            if !converged {
                log::debug!(
                    "lasso at alpha {alpha:.3e} stopped after {iterations} sweeps without converging"
                );
            }
            out.push(problem.to_raw(&beta, alpha, iterations, converged));
        }
        Ok(out)
    }

    fn descend(&self, problem: &Standardized, alpha: f64, beta: &mut Array1<f64>) -> (usize, bool) {
        let n = problem.z.nrows() as f64;

        if alpha >= problem.alpha_max {
            beta.fill(0.0);
            return (0, true);
        }

        let mut residual = &problem.yc - &problem.z.dot(&*beta);

        for sweep in 1..=self.max_iter {
            let mut max_delta = 0.0_f64;
            for &j in &problem.active {
                let column = problem.z.column(j);
                let old = beta[j];
                let rho = column.dot(&residual) / n + old;
                let new = soft_threshold(rho, alpha);
                let delta = new - old;
                if delta != 0.0 {
                    residual.scaled_add(-delta, &column);
                    beta[j] = new;
                    max_delta = max_delta.max(delta.abs());
                }
            }
            if max_delta <= self.tol {
                return (sweep, true);
            }
        }
        (self.max_iter, false)
    }
}

/// Smallest penalty at which every coefficient is zero.
///
/// `max_j |z_jᵀ (y − ȳ)| / n` over the z-scored columns of `x`.
pub fn alpha_max(x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
    Ok(Standardized::new(x, y)?.alpha_max)
}

fn soft_threshold(value: f64, alpha: f64) -> f64 {
    if value > alpha {
        value - alpha
    } else if value < -alpha {
        value + alpha
    } else {
        0.0
    }
}

/// Z-scored features and centred label with their moments.
struct Standardized {
    scaler: ColumnStandardizer,
    z: Array2<f64>,
    yc: Array1<f64>,
    y_mean: f64,
    active: Vec<usize>,
    alpha_max: f64,
}

impl Standardized {
    fn new(x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        let (n, p) = x.dim();
        if n == 0 {
            return Err(CrossImpactError::InsufficientData {
                context: "lasso fit".to_string(),
                available: 0,
                required: 1,
            });
        }
        if y.len() != n {
            return Err(CrossImpactError::config(format!(
                "design has {n} rows but label has {}",
                y.len()
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(CrossImpactError::NonFiniteSeries(
                "lasso input contains NaN or infinite values".to_string(),
            ));
        }

        let scaler = ColumnStandardizer::fit(x, DEGENERATE_FEATURE_STD);
        let z = scaler.transform(x);
        let y_mean = y.mean().unwrap_or(0.0);
        let yc = y.mapv(|v| v - y_mean);
        let active = scaler.informative_columns();

        let correlations = z.t().dot(&yc) / n as f64;
        let alpha_max = active
            .iter()
            .map(|&j| correlations[j].abs())
            .fold(0.0_f64, f64::max);

        if active.len() < p {
            log::debug!("lasso: {} of {p} columns are constant", p - active.len());
        }

        Ok(Self {
            scaler,
            z,
            yc,
            y_mean,
            active,
            alpha_max,
        })
    }

    fn to_raw(&self, beta: &Array1<f64>, alpha: f64, iterations: usize, converged: bool) -> LassoFit {
        let stds = self.scaler.stds();
        let coefficients: Array1<f64> = beta
            .iter()
            .enumerate()
            .map(|(j, &b)| {
                if b == 0.0 || self.scaler.is_degenerate(j) {
                    0.0
                } else {
                    b / stds[j]
                }
            })
            .collect();
        let intercept = self.y_mean - coefficients.dot(self.scaler.means());

        LassoFit {
            alpha,
            coefficients,
            intercept,
            iterations,
            converged,
        }
    }
}

/// Coefficient of determination of `predicted` against `actual`.
///
/// `None` when `actual` has zero variance.
pub fn r_squared(actual: &Array1<f64>, predicted: &Array1<f64>) -> Option<f64> {
    let mean = actual.mean()?;
    let total: f64 = actual.iter().map(|v| (v - mean).powi(2)).sum();
    if total <= 0.0 {
        return None;
    }
    let residual: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Some(1.0 - residual / total)
}
