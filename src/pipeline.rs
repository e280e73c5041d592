//! End-to-end cross-impact pipeline.
//!
//! Connects every stage for a whole universe of instruments:
//! - Per-symbol split with duplicate-timestamp resolution
//! - Optional time-bucket resampling
//! - Data-quality validation
//! - Multi-level OFI → PCA integrated OFI
//! - Log returns
//! - Aligned panel → design matrices → Lasso fits per (horizon, target)
//!
//! # Architecture
//!
//! ```text
//! SnapshotTable ─> by_symbol ─┬─> [resample] ─> validate ─> level OFI ─> PCA ─> IntegratedOfiSeries ─┐
//!                             │                                                                     ├─> AlignedPanel ─> CrossImpactModel
//!                             └─────────────────────────────────────────────> log returns ──────────┘
//! ```
//!
//! # Isolation
//!
//! A symbol whose PCA cannot be fitted, or whose returns are never
//! defined, gets [`StageOutcome::Undefined`] for that stage and simply
//! drops out of the panel as a source or target. A (horizon, target) pair
//! with too few rows becomes a skipped fit. Only configuration and schema
//! problems abort [`CrossImpactPipeline::process`].
//!
//! # Example
//!
//! ```ignore
//! use cross_impact::prelude::*;
//!
//! let pipeline = PipelineBuilder::new()
//!     .levels(5)
//!     .horizons(&[0, 1, 5])
//!     .build()?;
//!
//! let output = pipeline.process_path("snapshots.csv")?;
//! for row in output.model.scatter_table() {
//!     println!("{} h={}: self {:.3} cross {:.3}", row.symbol, row.horizon, row.self_impact, row.cross_impact);
//! }
//! ```

use crate::config::PipelineConfig;
use crate::design::AlignedPanel;
use crate::error::{CrossImpactError, Result};
use crate::estimator::{CrossImpactEstimator, CrossImpactModel, ScoringStrategy};
use crate::features::{compute_level_ofi, compute_log_returns, LevelOfiSeries, ReturnSeries};
use crate::integration::{IntegratedOfiSeries, PcaDiagnostics, PcaIntegrator, PcaProjector};
use crate::loader::SnapshotCsvLoader;
use crate::preprocessing::resample_snapshots;
use crate::snapshot::{Snapshot, SnapshotTable};
use crate::validation::{SnapshotValidator, ValidationResult};
use std::path::Path;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Result of one stage for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Defined(T),
    /// The stage could not produce a value; the reason is kept
    Undefined(CrossImpactError),
}

impl<T> StageOutcome<T> {
    pub fn defined(&self) -> Option<&T> {
        match self {
            StageOutcome::Defined(value) => Some(value),
            StageOutcome::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, StageOutcome::Defined(_))
    }

    /// Reason the stage is undefined.
    pub fn reason(&self) -> Option<&CrossImpactError> {
        match self {
            StageOutcome::Defined(_) => None,
            StageOutcome::Undefined(e) => Some(e),
        }
    }
}

impl<T> From<Result<T>> for StageOutcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => StageOutcome::Defined(value),
            Err(e) => StageOutcome::Undefined(e),
        }
    }
}

/// Fitted PCA and the integrated series it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Integration {
    pub projector: PcaProjector,
    pub diagnostics: PcaDiagnostics,
    pub series: IntegratedOfiSeries,
}

/// Every per-instrument stage output.
#[derive(Debug, Clone)]
pub struct InstrumentOutput {
    pub symbol: String,

    /// Rows after duplicate resolution and resampling
    pub rows: usize,

    /// Data-quality report for those rows
    pub validation: ValidationResult,

    pub level_ofi: LevelOfiSeries,

    pub integration: StageOutcome<Integration>,

    pub returns: StageOutcome<ReturnSeries>,
}

impl InstrumentOutput {
    pub fn integrated(&self) -> Option<&IntegratedOfiSeries> {
        self.integration.defined().map(|i| &i.series)
    }
}

/// Output of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Per-instrument outputs, sorted by symbol
    pub instruments: Vec<InstrumentOutput>,

    /// Integrated OFI and returns on the common grid
    pub panel: AlignedPanel,

    /// Coefficient matrices per horizon
    pub model: CrossImpactModel,
}

impl PipelineOutput {
    pub fn instrument(&self, symbol: &str) -> Option<&InstrumentOutput> {
        self.instruments.iter().find(|i| i.symbol == symbol)
    }

    /// Symbols with at least one undefined stage, and the first reason.
    pub fn undefined_instruments(&self) -> Vec<(&str, &CrossImpactError)> {
        self.instruments
            .iter()
            .filter_map(|i| {
                let reason = i.integration.reason().or_else(|| i.returns.reason())?;
                Some((i.symbol.as_str(), reason))
            })
            .collect()
    }
}

/// Runs the full cross-impact computation.
#[derive(Debug)]
pub struct CrossImpactPipeline {
    config: PipelineConfig,
    integrator: PcaIntegrator,
    estimator: CrossImpactEstimator,
    validator: SnapshotValidator,
}

impl CrossImpactPipeline {
    /// Create a pipeline from a validated configuration.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the configuration fails validation.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            integrator: PcaIntegrator::new(config.pca.clone()),
            estimator: CrossImpactEstimator::new(config.regression.clone()),
            validator: SnapshotValidator::default(),
            config,
        })
    }

    /// Replace the held-out scoring strategy.
    pub fn with_scoring(mut self, scoring: Box<dyn ScoringStrategy>) -> Self {
        self.estimator = CrossImpactEstimator::with_scoring(self.config.regression.clone(), scoring);
        self
    }

    /// Replace the snapshot validator.
    pub fn with_validator(mut self, validator: SnapshotValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load a snapshot CSV and process it.
    pub fn process_path<P: AsRef<Path>>(&self, path: P) -> Result<PipelineOutput> {
        let table = SnapshotCsvLoader::new(self.config.levels).load_path(path)?;
        self.process(&table)
    }

    /// Process an in-memory snapshot table.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the table carries fewer levels than configured;
    /// otherwise only fatal errors from the estimator.
    pub fn process(&self, table: &SnapshotTable) -> Result<PipelineOutput> {
        if table.levels() < self.config.levels {
            return Err(CrossImpactError::config(format!(
                "table has {} levels, configuration needs {}",
                table.levels(),
                self.config.levels
            )));
        }

        let groups: Vec<(String, Vec<Snapshot>)> = table
            .by_symbol(self.config.duplicate_policy)
            .into_iter()
            .collect();
        log::info!(
            "processing {} snapshots across {} symbols",
            table.len(),
            groups.len()
        );

        #[cfg(feature = "parallel")]
        let instruments: Vec<InstrumentOutput> = groups
            .par_iter()
            .map(|(symbol, rows)| self.process_instrument(symbol, rows))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let instruments: Vec<InstrumentOutput> = groups
            .iter()
            .map(|(symbol, rows)| self.process_instrument(symbol, rows))
            .collect();

        let integrated: Vec<IntegratedOfiSeries> = instruments
            .iter()
            .filter_map(|i| i.integrated().cloned())
            .collect();
        let returns: Vec<ReturnSeries> = instruments
            .iter()
            .filter_map(|i| i.returns.defined().cloned())
            .collect();

        for instrument in &instruments {
            if let Some(reason) = instrument.integration.reason() {
                log::warn!("{}: integrated OFI undefined: {reason}", instrument.symbol);
            }
            if let Some(reason) = instrument.returns.reason() {
                log::warn!("{}: returns undefined: {reason}", instrument.symbol);
            }
        }

        let panel = AlignedPanel::new(&integrated, &returns)?;
        log::info!(
            "panel: {} grid steps, {} sources, {} targets",
            panel.len(),
            panel.sources().len(),
            panel.targets().len()
        );
        if !panel.sources().is_empty() && panel.complete_source_rows() == 0 {
            match self.config.resample_interval_ns {
                None => log::warn!(
                    "no timestamp where every source has OFI; instruments never share \
                     timestamps, set resample_interval_ns to put them on a common clock"
                ),
                Some(interval) => log::warn!(
                    "no {interval} ns bucket where every source has OFI; every fit will be skipped"
                ),
            }
        }

        let model = self
            .estimator
            .fit_panel(&panel, &self.config.sorted_horizons())?;

        Ok(PipelineOutput {
            instruments,
            panel,
            model,
        })
    }

    /// Stages 1-3 for one symbol. Never fails; problems become undefined outcomes.
    pub fn process_instrument(&self, symbol: &str, rows: &[Snapshot]) -> InstrumentOutput {
        let levels = self.config.levels;
        let resampled;
        let rows = match self.config.resample_interval_ns {
            Some(interval) => {
                resampled = resample_snapshots(rows, interval, levels);
                resampled.as_slice()
            }
            None => rows,
        };

        let validation = self.validator.validate_symbol(rows, levels);
        if !validation.is_valid() {
            for message in validation.warnings().iter().chain(validation.errors().iter()) {
                log::warn!("{symbol}: {message}");
            }
        }

        let level_ofi = compute_level_ofi(symbol, rows, levels);

        let integration = self.integrate(&level_ofi).into();

        let return_series = compute_log_returns(symbol, rows);
        let returns = if return_series.defined_count() == 0 {
            StageOutcome::Undefined(CrossImpactError::NonFiniteSeries(format!(
                "{symbol}: no defined log return in {} rows",
                rows.len()
            )))
        } else {
            StageOutcome::Defined(return_series)
        };

        InstrumentOutput {
            symbol: symbol.to_string(),
            rows: rows.len(),
            validation,
            level_ofi,
            integration,
            returns,
        }
    }

    fn integrate(&self, level_ofi: &LevelOfiSeries) -> Result<Integration> {
        let (projector, diagnostics) = self.integrator.fit(level_ofi)?;
        let series = projector.apply(level_ofi)?;
        Ok(Integration {
            projector,
            diagnostics,
            series,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{AlphaGrid, RegressionConfig};
    use crate::snapshot::BookLevel;

    fn config() -> PipelineConfig {
        PipelineConfig {
            levels: 2,
            horizons: vec![0, 1],
            resample_interval_ns: None,
            regression: RegressionConfig {
                min_rows_per_feature: 1,
                alpha_grid: AlphaGrid::Explicit(vec![1e-6]),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Book whose level-0 bid size walks with `i` and level-1 with `i²`.
    fn rows(symbol: &str, n: usize) -> Vec<Snapshot> {
        (0..n)
            .map(|i| {
                let x = i as f64;
                let px = 100.0 + 0.01 * ((i * 7) % 5) as f64;
                Snapshot::new(
                    symbol,
                    i as i64 * 1_000,
                    vec![
                        BookLevel::new(px, px + 0.02, 10.0 + (x * 3.0) % 7.0, 12.0 + (x * 5.0) % 3.0),
                        BookLevel::new(px - 0.01, px + 0.03, 20.0 + (x * x) % 11.0, 15.0),
                    ],
                )
            })
            .collect()
    }

    #[test]
    fn test_from_config_validates() {
        let mut bad = config();
        bad.horizons.clear();
        assert!(matches!(
            CrossImpactPipeline::from_config(bad),
            Err(CrossImpactError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_too_few_levels_in_table() {
        let table = SnapshotTable::new(
            vec![Snapshot::new("A", 0, vec![BookLevel::new(1.0, 1.1, 1.0, 1.0)])],
            1,
        )
        .unwrap();
        let pipeline = CrossImpactPipeline::from_config(config()).unwrap();
        assert!(pipeline.process(&table).is_err());
    }

    #[test]
    fn test_bad_instrument_is_isolated() {
        let mut all = rows("GOOD", 40);
        all.extend(rows("OTHER", 40));
        // Only one valid row: no level OFI, so PCA is undefined
        let mut bad = rows("BAD", 40);
        for row in bad.iter_mut().skip(1) {
            row.levels[0].ask_px = f64::NAN;
        }
        all.extend(bad);

        let table = SnapshotTable::new(all, 2).unwrap();
        let output = CrossImpactPipeline::from_config(config())
            .unwrap()
            .process(&table)
            .unwrap();

        let bad = output.instrument("BAD").unwrap();
        assert!(!bad.integration.is_defined());
        assert!(!bad.returns.is_defined());
        assert_eq!(output.undefined_instruments().len(), 1);

        assert_eq!(output.panel.sources(), &["GOOD".to_string(), "OTHER".to_string()]);
        let matrix = output.model.matrix(1).unwrap();
        assert!(matrix.fit("GOOD").is_some());
        assert!(matrix.fit("OTHER").is_some());
        assert!(matrix.fit("BAD").is_none());
    }

    #[test]
    fn test_resampling_applied() {
        let mut cfg = config();
        cfg.resample_interval_ns = Some(2_000);
        let pipeline = CrossImpactPipeline::from_config(cfg).unwrap();
        let out = pipeline.process_instrument("A", &rows("A", 10));
        assert_eq!(out.rows, 5);
        assert_eq!(out.level_ofi.len(), 5);
    }

    #[test]
    fn test_stage_outcome_from_result() {
        let ok: StageOutcome<i32> = Ok(1).into();
        assert_eq!(ok.defined(), Some(&1));
        let err: StageOutcome<i32> = Err(CrossImpactError::generic("x")).into();
        assert!(err.reason().is_some());
    }
}
