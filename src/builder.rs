//! Fluent builder for pipeline configuration.
//!
//! # Quick Start
//!
//! ```ignore
//! use cross_impact::PipelineBuilder;
//!
//! // Defaults: 5 levels, horizons {0, 1, 5}, automatic alpha grid, 5 folds
//! let pipeline = PipelineBuilder::new().build()?;
//!
//! let output = pipeline.process_path("data/snapshots.csv")?;
//! ```
//!
//! # Common Configurations
//!
//! ## One-second clock, lags up to ten seconds
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .levels(10)
//!     .resample_ns(1_000_000_000)
//!     .horizons(&[0, 1, 2, 5, 10])
//!     .build()?;
//! ```
//!
//! ## Fixed penalty (no cross-validation)
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .alphas(vec![1e-4])
//!     .build()?;
//! ```

use crate::config::{ExperimentMetadata, PipelineConfig};
use crate::error::Result;
use crate::estimator::{AlphaGrid, RegressionConfig, ScoringKind};
use crate::integration::{PcaConfig, PcaInputMode};
use crate::pipeline::CrossImpactPipeline;
use crate::snapshot::DuplicatePolicy;

/// Fluent builder for [`PipelineConfig`] and [`CrossImpactPipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Create a new pipeline builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    // =========================================================================
    // Book and timing
    // =========================================================================

    /// Number of book levels to read and use.
    pub fn levels(mut self, levels: usize) -> Self {
        self.config.levels = levels;
        self
    }

    /// Lags in grid steps; 0 is the contemporaneous fit.
    pub fn horizons(mut self, horizons: &[usize]) -> Self {
        self.config.horizons = horizons.to_vec();
        self
    }

    /// Resample every symbol onto buckets of `interval_ns` (default one second).
    pub fn resample_ns(mut self, interval_ns: i64) -> Self {
        self.config.resample_interval_ns = Some(interval_ns);
        self
    }

    /// Use snapshot timestamps as they are.
    pub fn raw_timestamps(mut self) -> Self {
        self.config.resample_interval_ns = None;
        self
    }

    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = policy;
        self
    }

    // =========================================================================
    // PCA
    // =========================================================================

    pub fn pca_config(mut self, config: PcaConfig) -> Self {
        self.config.pca = config;
        self
    }

    /// Feed PCA bid and ask flow as separate columns.
    pub fn split_sides(mut self) -> Self {
        self.config.pca.input_mode = PcaInputMode::SplitSides;
        self
    }

    pub fn variance_warning_threshold(mut self, threshold: f64) -> Self {
        self.config.pca.variance_warning_threshold = threshold;
        self
    }

    // =========================================================================
    // Regression
    // =========================================================================

    pub fn regression_config(mut self, config: RegressionConfig) -> Self {
        self.config.regression = config;
        self
    }

    /// Use a fixed list of candidate penalties.
    pub fn alphas(mut self, alphas: Vec<f64>) -> Self {
        self.config.regression.alpha_grid = AlphaGrid::Explicit(alphas);
        self
    }

    /// Use `n_alphas` log-spaced penalties down to `eps · alpha_max`.
    pub fn auto_alphas(mut self, n_alphas: usize, eps: f64) -> Self {
        self.config.regression.alpha_grid = AlphaGrid::Auto { n_alphas, eps };
        self
    }

    pub fn cv_folds(mut self, folds: usize) -> Self {
        self.config.regression.cv_folds = folds;
        self
    }

    pub fn scoring(mut self, scoring: ScoringKind) -> Self {
        self.config.regression.scoring = scoring;
        self
    }

    pub fn min_rows_per_feature(mut self, rows: usize) -> Self {
        self.config.regression.min_rows_per_feature = rows;
        self
    }

    /// Coordinate-descent limits.
    pub fn solver(mut self, max_iter: usize, tol: f64) -> Self {
        self.config.regression.max_iter = max_iter;
        self.config.regression.tol = tol;
        self
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Set experiment metadata.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let builder = PipelineBuilder::new()
    ///     .experiment("nasdaq100_1s", "Top-of-universe, 1s clock");
    /// ```
    pub fn experiment(mut self, name: &str, description: &str) -> Self {
        let mut metadata = ExperimentMetadata::new(name);
        metadata.description = Some(description.to_string());
        self.config.metadata = Some(metadata);
        self
    }

    /// Set experiment metadata with full control.
    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.config.metadata = Some(metadata);
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Build and validate the configuration.
    pub fn build_config(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build the pipeline.
    pub fn build(self) -> Result<CrossImpactPipeline> {
        CrossImpactPipeline::from_config(self.build_config()?)
    }

    /// Get a summary of the current configuration.
    pub fn summary(&self) -> String {
        let c = &self.config;
        let alpha_desc = match &c.regression.alpha_grid {
            AlphaGrid::Auto { n_alphas, eps } => format!("auto ({n_alphas} values, eps {eps})"),
            AlphaGrid::Explicit(values) => format!("explicit {values:?}"),
        };
        let resample_desc = c
            .resample_interval_ns
            .map_or_else(|| "raw timestamps".to_string(), |ns| format!("{ns} ns"));

        format!(
            "PipelineBuilder Summary:\n\
             - Levels: {}\n\
             - Horizons: {:?}\n\
             - Resampling: {}\n\
             - PCA input: {:?}\n\
             - Alpha grid: {}\n\
             - CV folds: {} ({:?})",
            c.levels,
            c.horizons,
            resample_desc,
            c.pca.input_mode,
            alpha_desc,
            c.regression.cv_folds,
            c.regression.scoring,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrossImpactError;

    #[test]
    fn test_builder_default() {
        let config = PipelineBuilder::new().build_config().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_builder_settings() {
        let config = PipelineBuilder::new()
            .levels(10)
            .horizons(&[0, 2, 4])
            .resample_ns(1_000_000_000)
            .split_sides()
            .alphas(vec![0.1, 0.01])
            .cv_folds(3)
            .scoring(ScoringKind::MeanAbsoluteError)
            .min_rows_per_feature(2)
            .solver(500, 1e-8)
            .duplicate_policy(DuplicatePolicy::KeepFirst)
            .build_config()
            .unwrap();

        assert_eq!(config.levels, 10);
        assert_eq!(config.horizons, vec![0, 2, 4]);
        assert_eq!(config.resample_interval_ns, Some(1_000_000_000));
        assert_eq!(config.pca.input_mode, PcaInputMode::SplitSides);
        assert_eq!(config.regression.alpha_grid, AlphaGrid::Explicit(vec![0.1, 0.01]));
        assert_eq!(config.regression.cv_folds, 3);
        assert_eq!(config.regression.max_iter, 500);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::KeepFirst);
    }

    #[test]
    fn test_raw_timestamps() {
        let config = PipelineBuilder::new().raw_timestamps().build_config().unwrap();
        assert_eq!(config.resample_interval_ns, None);
        assert!(PipelineBuilder::new()
            .raw_timestamps()
            .summary()
            .contains("Resampling: raw timestamps"));
    }

    #[test]
    fn test_builder_rejects_invalid() {
        let err = PipelineBuilder::new().cv_folds(1).build().unwrap_err();
        assert!(matches!(err, CrossImpactError::InvalidConfig(_)));

        assert!(PipelineBuilder::new().horizons(&[]).build().is_err());
        assert!(PipelineBuilder::new().alphas(vec![]).build().is_err());
    }

    #[test]
    fn test_experiment_metadata() {
        let config = PipelineBuilder::new()
            .experiment("run1", "first run")
            .build_config()
            .unwrap();
        let metadata = config.metadata.unwrap();
        assert_eq!(metadata.name, "run1");
        assert!(metadata.created_at.is_some());
    }

    #[test]
    fn test_summary() {
        let summary = PipelineBuilder::new().levels(3).summary();
        assert!(summary.contains("Levels: 3"));
        assert!(summary.contains("auto"));
    }
}
