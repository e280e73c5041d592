//! Cross-impact coefficients for every (horizon, target) pair.
//!
//! For target `i` and horizon `h` the regression is
//!
//! ```text
//!     r_i(t) = b + Σ_j β_{i,j,h} · OFI_j(t − h) + ε
//! ```
//!
//! with one Lasso fit per pair. `β_{i,i,h}` is the self-impact and
//! `Σ_{j≠i} |β_{i,j,h}|` the aggregate cross-impact on `i`.
//!
//! A pair with too few rows, or whose fit fails numerically, becomes
//! [`FitOutcome::Skipped`] with the reason; the other pairs are unaffected.

use crate::design::{AlignedPanel, DesignColumn, DesignMatrix, DesignMatrixBuilder};
use crate::error::{CrossImpactError, Result};
use crate::estimator::lasso::{alpha_max, r_squared, LassoSolver};
use crate::estimator::selection::{
    cross_validate, AlphaGrid, ScoringKind, ScoringStrategy, TimeSeriesKFold,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Regression settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionConfig {
    /// Time-ordered folds for penalty selection
    pub cv_folds: usize,

    /// Coordinate-descent sweep limit
    pub max_iter: usize,

    /// Coordinate-descent tolerance (standardised units)
    pub tol: f64,

    /// A fit needs at least `min_rows_per_feature × n_features` rows
    pub min_rows_per_feature: usize,

    /// Held-out error metric
    #[serde(default)]
    pub scoring: ScoringKind,

    /// Candidate penalties
    #[serde(default)]
    pub alpha_grid: AlphaGrid,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            cv_folds: 5,
            max_iter: 10_000,
            tol: 1e-6,
            min_rows_per_feature: 5,
            scoring: ScoringKind::default(),
            alpha_grid: AlphaGrid::default(),
        }
    }
}

impl RegressionConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.alpha_grid.validate()?;
        if self.cv_folds < 2 {
            return Err(format!("cv_folds must be at least 2, got {}", self.cv_folds));
        }
        if self.max_iter == 0 {
            return Err("max_iter must be at least 1".to_string());
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(format!("tol must be finite and positive, got {}", self.tol));
        }
        if self.min_rows_per_feature == 0 {
            return Err("min_rows_per_feature must be at least 1".to_string());
        }
        Ok(())
    }
}

/// A successful fit for one (horizon, target).
#[derive(Debug, Clone, PartialEq)]
pub struct CrossImpactFit {
    pub horizon: usize,
    pub target: String,

    /// Feature columns, in coefficient order
    pub columns: Vec<DesignColumn>,

    /// Coefficient per column, raw OFI units
    pub coefficients: Vec<f64>,

    pub intercept: f64,

    /// Selected penalty
    pub alpha: f64,

    /// In-sample R² (`None` for a constant label)
    pub r_squared: Option<f64>,

    /// Mean held-out score of the selected penalty (`None` without CV)
    pub cv_score: Option<f64>,

    pub n_rows: usize,
    pub converged: bool,
}

impl CrossImpactFit {
    /// Coefficient on `source`'s OFI, if it was a feature.
    pub fn coefficient(&self, source: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c.source == source)
            .map(|idx| self.coefficients[idx])
    }

    /// `β_{i,i}`; zero when the target had no OFI column.
    pub fn self_impact(&self) -> f64 {
        self.coefficient(&self.target).unwrap_or(0.0)
    }

    /// `Σ_{j≠i} |β_{i,j}|`.
    pub fn cross_impact(&self) -> f64 {
        self.columns
            .iter()
            .zip(self.coefficients.iter())
            .filter(|(c, _)| c.source != self.target)
            .map(|(_, b)| b.abs())
            .sum()
    }
}

/// Result for one (horizon, target).
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    Fitted(CrossImpactFit),
    Skipped {
        horizon: usize,
        target: String,
        reason: CrossImpactError,
    },
}

impl FitOutcome {
    pub fn target(&self) -> &str {
        match self {
            FitOutcome::Fitted(fit) => &fit.target,
            FitOutcome::Skipped { target, .. } => target,
        }
    }

    pub fn horizon(&self) -> usize {
        match self {
            FitOutcome::Fitted(fit) => fit.horizon,
            FitOutcome::Skipped { horizon, .. } => *horizon,
        }
    }

    pub fn fitted(&self) -> Option<&CrossImpactFit> {
        match self {
            FitOutcome::Fitted(fit) => Some(fit),
            FitOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, FitOutcome::Skipped { .. })
    }
}

/// All targets at one horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientMatrix {
    pub horizon: usize,

    /// Feature instruments, sorted
    pub sources: Vec<String>,

    /// Outcome per target instrument
    pub outcomes: BTreeMap<String, FitOutcome>,
}

impl CoefficientMatrix {
    /// `β_{target, source}` at this horizon.
    pub fn coefficient(&self, target: &str, source: &str) -> Option<f64> {
        self.outcomes.get(target)?.fitted()?.coefficient(source)
    }

    pub fn fit(&self, target: &str) -> Option<&CrossImpactFit> {
        self.outcomes.get(target)?.fitted()
    }

    /// Fitted targets in symbol order.
    pub fn fitted(&self) -> impl Iterator<Item = &CrossImpactFit> {
        self.outcomes.values().filter_map(FitOutcome::fitted)
    }
}

/// One line of the coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRow {
    pub horizon: usize,
    pub target: String,
    pub source: String,
    pub coefficient: f64,
}

/// One line of the self- vs cross-impact scatter table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterRow {
    pub horizon: usize,
    pub symbol: String,
    pub self_impact: f64,
    pub cross_impact: f64,
}

/// Coefficient matrices for every configured horizon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossImpactModel {
    pub matrices: BTreeMap<usize, CoefficientMatrix>,
}

impl CrossImpactModel {
    /// Horizons in ascending order.
    pub fn horizons(&self) -> Vec<usize> {
        self.matrices.keys().copied().collect()
    }

    pub fn matrix(&self, horizon: usize) -> Option<&CoefficientMatrix> {
        self.matrices.get(&horizon)
    }

    pub fn coefficient(&self, horizon: usize, target: &str, source: &str) -> Option<f64> {
        self.matrices.get(&horizon)?.coefficient(target, source)
    }

    /// Every outcome, horizons ascending then targets by symbol.
    pub fn outcomes(&self) -> impl Iterator<Item = &FitOutcome> {
        self.matrices.values().flat_map(|m| m.outcomes.values())
    }

    /// Outcomes that were skipped.
    pub fn skipped(&self) -> Vec<&FitOutcome> {
        self.outcomes().filter(|o| o.is_skipped()).collect()
    }

    /// Long-format table `(horizon, target, source, coefficient)` over
    /// fitted pairs.
    pub fn coefficient_table(&self) -> Vec<CoefficientRow> {
        self.matrices
            .values()
            .flat_map(|m| m.fitted())
            .flat_map(|fit| {
                fit.columns
                    .iter()
                    .zip(fit.coefficients.iter())
                    .map(move |(column, &coefficient)| CoefficientRow {
                        horizon: fit.horizon,
                        target: fit.target.clone(),
                        source: column.source.clone(),
                        coefficient,
                    })
            })
            .collect()
    }

    /// `(horizon, symbol, self_impact, cross_impact)` per fitted pair.
    pub fn scatter_table(&self) -> Vec<ScatterRow> {
        self.matrices
            .values()
            .flat_map(|m| m.fitted())
            .map(|fit| ScatterRow {
                horizon: fit.horizon,
                symbol: fit.target.clone(),
                self_impact: fit.self_impact(),
                cross_impact: fit.cross_impact(),
            })
            .collect()
    }
}

/// Fits cross-impact regressions.
#[derive(Debug)]
pub struct CrossImpactEstimator {
    config: RegressionConfig,
    scoring: Box<dyn ScoringStrategy>,
}

impl CrossImpactEstimator {
    /// Estimator with the scoring strategy named in `config`.
    pub fn new(config: RegressionConfig) -> Self {
        let scoring = config.scoring.strategy();
        Self { config, scoring }
    }

    /// Estimator with a custom scoring strategy.
    pub fn with_scoring(config: RegressionConfig, scoring: Box<dyn ScoringStrategy>) -> Self {
        Self { config, scoring }
    }

    pub fn config(&self) -> &RegressionConfig {
        &self.config
    }

    fn solver(&self) -> LassoSolver {
        LassoSolver::new(self.config.max_iter, self.config.tol)
    }

    /// Fit one single-horizon design matrix.
    ///
    /// Data and numerical problems become `Ok(FitOutcome::Skipped)`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a multi-lag matrix or an invalid configuration.
    pub fn fit_design(&self, design: &DesignMatrix) -> Result<FitOutcome> {
        let horizon = design.horizon().ok_or_else(|| {
            CrossImpactError::config(format!(
                "{}: cross-impact fits need a single-horizon design matrix",
                design.target
            ))
        })?;

        match self.try_fit(design, horizon) {
            Ok(fit) => {
                log::debug!(
                    "fit {} h={horizon}: {} rows, alpha {:.3e}, R² {:?}",
                    fit.target,
                    fit.n_rows,
                    fit.alpha,
                    fit.r_squared
                );
                Ok(FitOutcome::Fitted(fit))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(reason) => {
                log::warn!("skipping fit {} h={horizon}: {reason}", design.target);
                Ok(FitOutcome::Skipped {
                    horizon,
                    target: design.target.clone(),
                    reason,
                })
            }
        }
    }

    fn try_fit(&self, design: &DesignMatrix, horizon: usize) -> Result<CrossImpactFit> {
        let required = self.config.min_rows_per_feature * design.n_features();
        if design.n_rows() < required {
            return Err(CrossImpactError::InsufficientData {
                context: format!("{} at horizon {horizon}", design.target),
                available: design.n_rows(),
                required,
            });
        }

        let solver = self.solver();
        let alphas = self.config.alpha_grid.resolve(alpha_max(&design.x, &design.y)?);

        let (alpha, cv_score) = match alphas.as_slice() {
            [single] => (*single, None),
            _ => {
                let cv = cross_validate(
                    &solver,
                    &design.x,
                    &design.y,
                    &alphas,
                    TimeSeriesKFold::new(self.config.cv_folds),
                    self.scoring.as_ref(),
                )?;
                (cv.best_alpha, Some(cv.best_score))
            }
        };

        let lasso = solver.fit(&design.x, &design.y, alpha)?;
        let predicted = lasso.predict(&design.x);

        Ok(CrossImpactFit {
            horizon,
            target: design.target.clone(),
            columns: design.columns.clone(),
            coefficients: lasso.coefficients.to_vec(),
            intercept: lasso.intercept,
            alpha,
            r_squared: r_squared(&design.y, &predicted),
            cv_score,
            n_rows: design.n_rows(),
            converged: lasso.converged,
        })
    }

    /// Build and fit every (horizon, target) of `panel`.
    ///
    /// Each design matrix is checked for look-ahead before it is fitted.
    /// A panel without OFI sources yields a model where every pair is
    /// skipped.
    pub fn fit_panel(&self, panel: &AlignedPanel, horizons: &[usize]) -> Result<CrossImpactModel> {
        let builder = DesignMatrixBuilder::new();
        if panel.sources().is_empty() && !panel.targets().is_empty() {
            log::warn!(
                "no instrument has a defined integrated OFI; all {} targets are skipped",
                panel.targets().len()
            );
        }
        let pairs: Vec<(usize, &String)> = horizons
            .iter()
            .flat_map(|&h| panel.targets().iter().map(move |t| (h, t)))
            .collect();

        let fit_pair = |&(h, target): &(usize, &String)| -> Result<FitOutcome> {
            let design = match builder.build(panel, h, target) {
                Ok(design) => design,
                Err(e) if e.is_fatal() => return Err(e),
                Err(reason) => {
                    log::debug!("skipping fit {target} h={h}: {reason}");
                    return Ok(FitOutcome::Skipped {
                        horizon: h,
                        target: target.clone(),
                        reason,
                    });
                }
            };
            design.verify_no_leakage()?;
            self.fit_design(&design)
        };

        #[cfg(feature = "parallel")]
        let outcomes: Vec<FitOutcome> = pairs.par_iter().map(fit_pair).collect::<Result<_>>()?;
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<FitOutcome> = pairs.iter().map(fit_pair).collect::<Result<_>>()?;

        let mut model = CrossImpactModel::default();
        for &h in horizons {
            model.matrices.entry(h).or_insert_with(|| CoefficientMatrix {
                horizon: h,
                sources: panel.sources().to_vec(),
                outcomes: BTreeMap::new(),
            });
        }
        for outcome in outcomes {
            if let Some(matrix) = model.matrices.get_mut(&outcome.horizon()) {
                matrix.outcomes.insert(outcome.target().to_string(), outcome);
            }
        }

        let skipped = model.skipped().len();
        log::info!(
            "fitted {} of {} (horizon, target) pairs",
            pairs.len() - skipped,
            pairs.len()
        );

        Ok(model)
    }
}
