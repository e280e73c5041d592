//! Penalty selection by time-ordered cross-validation.
//!
//! Rows of a design matrix are in label-time order. Folds are contiguous
//! blocks of that order and are never shuffled; each block is held out in
//! turn while the model is fitted on the remaining rows. The candidate
//! penalty with the lowest mean held-out score wins.
//!
//! Scoring is pluggable through [`ScoringStrategy`]; lower is better.

use crate::error::{CrossImpactError, Result};
use crate::estimator::lasso::LassoSolver;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::Range;

// ============================================================================
// Scoring
// ============================================================================

/// Held-out error metric. Lower is better.
pub trait ScoringStrategy: Debug + Send + Sync {
    /// Short identifier used in logs and metadata.
    fn name(&self) -> &'static str;

    /// Score predictions against held-out labels.
    fn score(&self, actual: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64;
}

/// Mean squared error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeanSquaredError;

impl ScoringStrategy for MeanSquaredError {
    fn name(&self) -> &'static str {
        "mse"
    }

    fn score(&self, actual: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
        let n = actual.len().max(1) as f64;
        actual
            .iter()
            .zip(predicted.iter())
            .map(|(a, p)| (a - p).powi(2))
            .sum::<f64>()
            / n
    }
}

/// Mean absolute error; less sensitive to the occasional return jump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeanAbsoluteError;

impl ScoringStrategy for MeanAbsoluteError {
    fn name(&self) -> &'static str {
        "mae"
    }

    fn score(&self, actual: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
        let n = actual.len().max(1) as f64;
        actual
            .iter()
            .zip(predicted.iter())
            .map(|(a, p)| (a - p).abs())
            .sum::<f64>()
            / n
    }
}

/// Serializable choice of built-in scoring strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringKind {
    #[default]
    MeanSquaredError,
    MeanAbsoluteError,
}

impl ScoringKind {
    pub fn strategy(&self) -> Box<dyn ScoringStrategy> {
        match self {
            ScoringKind::MeanSquaredError => Box::new(MeanSquaredError),
            ScoringKind::MeanAbsoluteError => Box::new(MeanAbsoluteError),
        }
    }
}

// ============================================================================
// Alpha grid
// ============================================================================

/// Candidate penalties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaGrid {
    /// `n_alphas` log-spaced values from `alpha_max` down to `eps · alpha_max`
    Auto { n_alphas: usize, eps: f64 },

    /// Fixed values, used as given
    Explicit(Vec<f64>),
}

impl Default for AlphaGrid {
    fn default() -> Self {
        AlphaGrid::Auto {
            n_alphas: 100,
            eps: 1e-3,
        }
    }
}

impl AlphaGrid {
    /// Check the grid definition.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            AlphaGrid::Auto { n_alphas, eps } => {
                if *n_alphas == 0 {
                    return Err("alpha grid n_alphas must be at least 1".to_string());
                }
                if !(eps.is_finite() && *eps > 0.0 && *eps < 1.0) {
                    return Err(format!("alpha grid eps must be in (0, 1), got {eps}"));
                }
            }
            AlphaGrid::Explicit(values) => {
                if values.is_empty() {
                    return Err("explicit alpha grid is empty".to_string());
                }
                if let Some(bad) = values.iter().find(|a| !a.is_finite() || **a < 0.0) {
                    return Err(format!("alpha values must be finite and non-negative, got {bad}"));
                }
            }
        }
        Ok(())
    }

    /// Whether the grid can only ever produce one candidate.
    pub fn is_single(&self) -> bool {
        match self {
            AlphaGrid::Auto { n_alphas, .. } => *n_alphas == 1,
            AlphaGrid::Explicit(values) => values.len() == 1,
        }
    }

    /// Concrete penalties for a problem with the given `alpha_max`, descending.
    pub fn resolve(&self, alpha_max: f64) -> Vec<f64> {
        let mut alphas = match self {
            AlphaGrid::Auto { n_alphas, eps } => {
                if alpha_max <= 0.0 {
                    vec![0.0]
                } else if *n_alphas == 1 {
                    vec![alpha_max]
                } else {
                    let log_max = alpha_max.ln();
                    let log_min = (alpha_max * eps).ln();
                    let step = (log_max - log_min) / (*n_alphas - 1) as f64;
                    (0..*n_alphas)
                        .map(|i| (log_max - step * i as f64).exp())
                        .collect()
                }
            }
            AlphaGrid::Explicit(values) => values.clone(),
        };
        alphas.sort_by(|a, b| b.total_cmp(a));
        alphas.dedup();
        alphas
    }
}

// ============================================================================
// Folds
// ============================================================================

/// Contiguous, unshuffled K-fold split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSeriesKFold {
    pub n_splits: usize,
}

impl TimeSeriesKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    /// Held-out row ranges for `n` rows, in order.
    ///
    /// The first `n % k` folds get one extra row. Uses `min(n_splits, n)`
    /// folds so that no fold is empty.
    pub fn test_ranges(&self, n: usize) -> Vec<Range<usize>> {
        let k = self.n_splits.min(n);
        if k == 0 {
            return Vec::new();
        }
        let base = n / k;
        let extra = n % k;
        let mut start = 0;
        (0..k)
            .map(|i| {
                let size = base + usize::from(i < extra);
                let range = start..start + size;
                start += size;
                range
            })
            .collect()
    }
}

// ============================================================================
// Cross-validation
// ============================================================================

/// Outcome of penalty selection.
#[derive(Debug, Clone, PartialEq)]
pub struct CvResult {
    /// Candidate penalties, descending
    pub alphas: Vec<f64>,

    /// Mean held-out score per candidate
    pub mean_scores: Vec<f64>,

    pub best_alpha: f64,

    /// Mean held-out score of `best_alpha`
    pub best_score: f64,

    /// Folds actually used
    pub folds: usize,
}

/// Score every candidate penalty over time-ordered folds.
///
/// Ties go to the larger (sparser) penalty.
///
/// # Errors
///
/// `InsufficientData` when fewer than 2 folds can be formed or a training
/// block is empty; solver errors are propagated.
pub fn cross_validate(
    solver: &LassoSolver,
    x: &Array2<f64>,
    y: &Array1<f64>,
    alphas: &[f64],
    folds: TimeSeriesKFold,
    scoring: &dyn ScoringStrategy,
) -> Result<CvResult> {
    let n = x.nrows();
    let ranges = folds.test_ranges(n);
    if ranges.len() < 2 {
        return Err(CrossImpactError::InsufficientData {
            context: "cross-validation folds".to_string(),
            available: ranges.len(),
            required: 2,
        });
    }
    if alphas.is_empty() {
        return Err(CrossImpactError::config("no candidate alphas"));
    }

    let mut totals = vec![0.0_f64; alphas.len()];

    for test in &ranges {
        let train: Vec<usize> = (0..n).filter(|i| !test.contains(i)).collect();
        let test_rows: Vec<usize> = test.clone().collect();

        let x_train = x.select(Axis(0), &train);
        let y_train = y.select(Axis(0), &train);
        let x_test = x.select(Axis(0), &test_rows);
        let y_test = y.select(Axis(0), &test_rows);

        let path = solver.fit_path(&x_train, &y_train, alphas)?;
        for (total, fit) in totals.iter_mut().zip(path.iter()) {
            let predicted = fit.predict(&x_test);
            *total += scoring.score(y_test.view(), predicted.view());
        }
    }

    let folds_used = ranges.len();
    let mean_scores: Vec<f64> = totals.iter().map(|t| t / folds_used as f64).collect();

    let mut best = 0;
    for (i, score) in mean_scores.iter().enumerate() {
        if *score < mean_scores[best] {
            best = i;
        }
    }

    log::debug!(
        "cv ({}, {folds_used} folds): best alpha {:.3e} score {:.6e} over {} candidates",
        scoring.name(),
        alphas[best],
        mean_scores[best],
        alphas.len()
    );

    Ok(CvResult {
        alphas: alphas.to_vec(),
        best_alpha: alphas[best],
        best_score: mean_scores[best],
        mean_scores,
        folds: folds_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn test_fold_ranges() {
        let folds = TimeSeriesKFold::new(3);
        assert_eq!(folds.test_ranges(10), vec![0..4, 4..7, 7..10]);
        assert_eq!(folds.test_ranges(2), vec![0..1, 1..2]);
        assert!(folds.test_ranges(0).is_empty());
    }

    #[test]
    fn test_scores() {
        let a = array![1.0, 2.0, 3.0];
        let p = array![1.0, 4.0, 2.0];
        assert!((MeanSquaredError.score(a.view(), p.view()) - 5.0 / 3.0).abs() < 1e-12);
        assert!((MeanAbsoluteError.score(a.view(), p.view()) - 1.0).abs() < 1e-12);
        assert_eq!(ScoringKind::default().strategy().name(), "mse");
    }

    #[test]
    fn test_auto_grid() {
        let grid = AlphaGrid::Auto {
            n_alphas: 3,
            eps: 0.01,
        };
        let alphas = grid.resolve(2.0);
        assert_eq!(alphas.len(), 3);
        assert!((alphas[0] - 2.0).abs() < 1e-12);
        assert!((alphas[1] - 0.2).abs() < 1e-12);
        assert!((alphas[2] - 0.02).abs() < 1e-12);
        assert_eq!(grid.resolve(0.0), vec![0.0]);
    }

    #[test]
    fn test_explicit_grid_sorted_descending() {
        let grid = AlphaGrid::Explicit(vec![0.1, 1.0, 0.1, 0.01]);
        assert_eq!(grid.resolve(5.0), vec![1.0, 0.1, 0.01]);
        assert!(AlphaGrid::Explicit(vec![0.5]).is_single());
    }

    #[test]
    fn test_grid_validation() {
        assert!(AlphaGrid::default().validate().is_ok());
        assert!(AlphaGrid::Explicit(vec![]).validate().is_err());
        assert!(AlphaGrid::Explicit(vec![-0.1]).validate().is_err());
        assert!(AlphaGrid::Explicit(vec![f64::NAN]).validate().is_err());
        assert!(AlphaGrid::Auto { n_alphas: 0, eps: 0.1 }.validate().is_err());
        assert!(AlphaGrid::Auto { n_alphas: 5, eps: 1.5 }.validate().is_err());
    }

    #[test]
    fn test_cv_prefers_small_alpha_for_strong_signal() {
        let mut rng = StdRng::seed_from_u64(42);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let n = 200;
        let x = Array2::from_shape_fn((n, 2), |_| normal.sample(&mut rng));
        let y = Array1::from_shape_fn(n, |i| 2.0 * x[[i, 0]] + 0.1 * normal.sample(&mut rng));

        let alphas = vec![10.0, 1.0, 0.001];
        let cv = cross_validate(
            &LassoSolver::default(),
            &x,
            &y,
            &alphas,
            TimeSeriesKFold::new(5),
            &MeanSquaredError,
        )
        .unwrap();

        assert_eq!(cv.folds, 5);
        assert_eq!(cv.best_alpha, 0.001);
        assert!(cv.mean_scores[0] > cv.mean_scores[2]);
    }

    #[test]
    fn test_cv_needs_two_folds() {
        let x = array![[1.0]];
        let y = array![1.0];
        let err = cross_validate(
            &LassoSolver::default(),
            &x,
            &y,
            &[0.1, 0.01],
            TimeSeriesKFold::new(5),
            &MeanSquaredError,
        );
        assert!(matches!(err, Err(CrossImpactError::InsufficientData { .. })));
    }
}
