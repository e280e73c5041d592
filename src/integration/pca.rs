//! PCA integration of multi-level OFI.
//!
//! Reduces the `[time, levels]` OFI matrix of one instrument to a single
//! integrated OFI series through its first principal component.
//!
//! # Algorithm
//!
//! 1. Drop rows where OFI is not computable (first row, invalid rows).
//! 2. Standardize each column within the fitting window (population z-score).
//! 3. Drop columns with (near) zero variance. A constant level would give a
//!    zero row/column in the covariance matrix.
//! 4. Covariance of the standardized columns, symmetric eigen-decomposition.
//! 5. Leading eigenvector `w₁`, oriented so that the loading on the first
//!    retained column (level 0 when present) is positive.
//! 6. Weights `w₁ / ‖w₁‖₁`, so integrated OFI is a weighted average of
//!    standardized level OFIs and stays comparable across instruments.
//!
//! ```text
//! ofi_I(t) = Σ_k  w₁[k] / ‖w₁‖₁ × (ofi_k(t) - μ_k) / σ_k
//! ```
//!
//! # Fit / Apply
//!
//! [`PcaIntegrator::fit`] returns a [`PcaProjector`] (standardization
//! parameters and weights) plus [`PcaDiagnostics`]. [`PcaProjector::apply`]
//! projects any level-OFI series with the same layout. Neither step keeps
//! state between fits.
//!
//! # Example
//!
//! ```ignore
//! use cross_impact::integration::{PcaConfig, PcaIntegrator};
//!
//! let integrator = PcaIntegrator::new(PcaConfig::default());
//! let (projector, diagnostics) = integrator.fit(&level_ofi)?;
//! println!("PC1 explains {:.1}%", diagnostics.explained_variance_ratio * 100.0);
//! let integrated = projector.apply(&level_ofi)?;
//! ```

use super::IntegratedOfiSeries;
use crate::error::{CrossImpactError, Result};
use crate::features::{LevelFlow, LevelOfiSeries};
use crate::preprocessing::ColumnStandardizer;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Columns fed to the PCA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PcaInputMode {
    /// One column per level: `bid flow - ask flow`
    #[default]
    Combined,

    /// Two columns per level: `bid flow` and `-ask flow`
    SplitSides,
}

impl PcaInputMode {
    /// Number of PCA columns for `levels` book levels.
    pub fn column_count(&self, levels: usize) -> usize {
        match self {
            PcaInputMode::Combined => levels,
            PcaInputMode::SplitSides => 2 * levels,
        }
    }

    /// Human-readable column labels.
    pub fn column_labels(&self, levels: usize) -> Vec<String> {
        match self {
            PcaInputMode::Combined => (0..levels).map(|l| format!("ofi_{l:02}")).collect(),
            PcaInputMode::SplitSides => (0..levels)
                .flat_map(|l| [format!("bid_flow_{l:02}"), format!("ask_flow_{l:02}")])
                .collect(),
        }
    }

    /// Build one PCA row from the level flows of one snapshot.
    ///
    /// Ask flow is negated in split mode so every column reads "buy
    /// pressure positive".
    fn row(&self, flows: &[LevelFlow]) -> Vec<f64> {
        match self {
            PcaInputMode::Combined => flows.iter().map(LevelFlow::ofi).collect(),
            PcaInputMode::SplitSides => flows.iter().flat_map(|f| [f.bid, -f.ask]).collect(),
        }
    }
}

/// PCA integration configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaConfig {
    /// Explained variance ratio of PC1 below which a warning is raised
    pub variance_warning_threshold: f64,

    /// Minimum usable rows to fit
    pub min_observations: usize,

    /// Standard deviation below which a column is dropped
    pub degenerate_std: f64,

    /// Column layout
    #[serde(default)]
    pub input_mode: PcaInputMode,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            variance_warning_threshold: 0.5,
            min_observations: 3,
            degenerate_std: 1e-12,
            input_mode: PcaInputMode::Combined,
        }
    }
}

impl PcaConfig {
    /// Validate PCA configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.variance_warning_threshold) {
            return Err(format!(
                "variance_warning_threshold must be in [0, 1], got {}",
                self.variance_warning_threshold
            ));
        }
        if self.min_observations < 2 {
            return Err("min_observations must be >= 2".to_string());
        }
        if !(self.degenerate_std.is_finite() && self.degenerate_std >= 0.0) {
            return Err("degenerate_std must be finite and >= 0".to_string());
        }
        Ok(())
    }
}

/// Fit-time diagnostics, kept for reproducibility and validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaDiagnostics {
    /// Instrument identifier
    pub symbol: String,

    /// Rows used in the fit
    pub observations: usize,

    /// λ₁ / Σλ over the retained columns
    pub explained_variance_ratio: f64,

    /// Eigenvalues of the standardized covariance, descending
    pub eigenvalues: Vec<f64>,

    /// Unit-L2 PC1 loadings per input column (0 for dropped columns)
    pub loadings: Vec<f64>,

    /// Unit-L1 projection weights per input column (0 for dropped columns)
    pub weights: Vec<f64>,

    /// Labels of every input column
    pub column_labels: Vec<String>,

    /// Columns used in the fit
    pub retained_columns: Vec<usize>,

    /// Columns dropped for zero variance
    pub dropped_columns: Vec<usize>,

    /// Whether the explained variance fell below the warning threshold
    pub low_explained_variance: bool,
}

/// Fitted projection from level OFI to integrated OFI.
#[derive(Debug, Clone, PartialEq)]
pub struct PcaProjector {
    levels: usize,
    mode: PcaInputMode,
    retained: Vec<usize>,
    means: Vec<f64>,
    stds: Vec<f64>,
    weights: Vec<f64>,
}

impl PcaProjector {
    /// Weights over the retained columns.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Retained column indices.
    pub fn retained_columns(&self) -> &[usize] {
        &self.retained
    }

    /// Integrated OFI for one snapshot's level flows.
    ///
    /// `None` when `flows` lacks a level the projector was fitted on.
    pub fn project(&self, flows: &[LevelFlow]) -> Option<f64> {
        let row = self.mode.row(flows);
        self.retained
            .iter()
            .enumerate()
            .map(|(k, &col)| {
                row.get(col)
                    .map(|&v| self.weights[k] * (v - self.means[k]) / self.stds[k])
            })
            .sum()
    }

    /// Project every defined row of `series`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the series has a different level count than the
    /// fit.
    pub fn apply(&self, series: &LevelOfiSeries) -> Result<IntegratedOfiSeries> {
        if series.levels != self.levels {
            return Err(CrossImpactError::config(format!(
                "projector fitted on {} levels, series {} has {}",
                self.levels, series.symbol, series.levels
            )));
        }

        let values = series
            .flows
            .iter()
            .map(|row| row.as_ref().and_then(|flows| self.project(flows)))
            .collect();

        Ok(IntegratedOfiSeries {
            symbol: series.symbol.clone(),
            timestamps: series.timestamps.clone(),
            values,
            provenance: series.provenance.clone(),
        })
    }
}

/// Fits PCA projectors.
#[derive(Debug, Clone, Default)]
pub struct PcaIntegrator {
    config: PcaConfig,
}

impl PcaIntegrator {
    pub fn new(config: PcaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PcaConfig {
        &self.config
    }

    /// Fit on the defined rows of `series`.
    ///
    /// # Errors
    ///
    /// - `InsufficientData` with fewer than `min_observations` usable rows
    /// - `NumericalDegeneracy` when every column has zero variance
    pub fn fit(&self, series: &LevelOfiSeries) -> Result<(PcaProjector, PcaDiagnostics)> {
        let mode = self.config.input_mode;
        let n_columns = mode.column_count(series.levels);

        let rows: Vec<Vec<f64>> = series
            .flows
            .iter()
            .flatten()
            .map(|flows| mode.row(flows))
            .collect();

        if rows.len() < self.config.min_observations {
            return Err(CrossImpactError::InsufficientData {
                context: format!("PCA fit for {}", series.symbol),
                available: rows.len(),
                required: self.config.min_observations,
            });
        }

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let n = flat.len() / n_columns.max(1);
        let x = Array2::from_shape_vec((n, n_columns), flat)
            .map_err(|e| CrossImpactError::generic(format!("PCA matrix shape: {e}")))?;

        let scaler = ColumnStandardizer::fit(&x, self.config.degenerate_std);
        let retained = scaler.informative_columns();
        let dropped: Vec<usize> = (0..n_columns).filter(|c| !retained.contains(c)).collect();

        if retained.is_empty() {
            return Err(CrossImpactError::NumericalDegeneracy(format!(
                "{}: every OFI column has zero variance",
                series.symbol
            )));
        }
        if !dropped.is_empty() {
            log::warn!(
                "{}: dropping zero-variance OFI columns {:?} before PCA",
                series.symbol,
                dropped
            );
        }

        // Standardized retained columns and their covariance (= correlation)
        let z = scaler.transform(&x).select(ndarray::Axis(1), &retained);
        let cov = z.t().dot(&z) / n as f64;
        let r = retained.len();
        let cov = DMatrix::from_fn(r, r, |i, j| cov[[i, j]]);

        let eigen = SymmetricEigen::new(cov);
        let (lead, lead_value) = eigen
            .eigenvalues
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best });

        let mut eigenvalues: Vec<f64> = eigen.eigenvalues.iter().map(|v| v.max(0.0)).collect();
        eigenvalues.sort_by(|a, b| b.total_cmp(a));
        let total: f64 = eigenvalues.iter().sum();
        let explained_variance_ratio = if total > 0.0 {
            lead_value.max(0.0) / total
        } else {
            0.0
        };

        let mut loadings: Vec<f64> = eigen.eigenvectors.column(lead).iter().copied().collect();
        if let Some(first) = loadings.iter().find(|l| l.abs() > 1e-12) {
            if *first < 0.0 {
                loadings.iter_mut().for_each(|l| *l = -*l);
            }
        }

        let l1: f64 = loadings.iter().map(|l| l.abs()).sum();
        if !(l1 > 0.0 && l1.is_finite()) {
            return Err(CrossImpactError::NumericalDegeneracy(format!(
                "{}: PC1 loadings have zero norm",
                series.symbol
            )));
        }
        let weights: Vec<f64> = loadings.iter().map(|l| l / l1).collect();

        let low_explained_variance = explained_variance_ratio < self.config.variance_warning_threshold;
        if low_explained_variance {
            log::warn!(
                "{}: PC1 explains {:.1}% of OFI variance (threshold {:.1}%)",
                series.symbol,
                explained_variance_ratio * 100.0,
                self.config.variance_warning_threshold * 100.0
            );
        } else {
            log::debug!(
                "{}: PC1 explains {:.1}% of OFI variance over {} rows",
                series.symbol,
                explained_variance_ratio * 100.0,
                n
            );
        }

        let mut full_loadings = vec![0.0; n_columns];
        let mut full_weights = vec![0.0; n_columns];
        for (k, &col) in retained.iter().enumerate() {
            full_loadings[col] = loadings[k];
            full_weights[col] = weights[k];
        }

        let projector = PcaProjector {
            levels: series.levels,
            mode,
            means: retained.iter().map(|&c| scaler.means()[c]).collect(),
            stds: retained.iter().map(|&c| scaler.stds()[c]).collect(),
            retained: retained.clone(),
            weights,
        };

        let diagnostics = PcaDiagnostics {
            symbol: series.symbol.clone(),
            observations: n,
            explained_variance_ratio,
            eigenvalues,
            loadings: full_loadings,
            weights: full_weights,
            column_labels: mode.column_labels(series.levels),
            retained_columns: retained,
            dropped_columns: dropped,
            low_explained_variance,
        };

        Ok((projector, diagnostics))
    }

    /// Fit on `series` and project it.
    pub fn fit_transform(
        &self,
        series: &LevelOfiSeries,
    ) -> Result<(IntegratedOfiSeries, PcaDiagnostics)> {
        let (projector, diagnostics) = self.fit(series)?;
        Ok((projector.apply(series)?, diagnostics))
    }
}
