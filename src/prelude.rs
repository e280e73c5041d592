//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use cross_impact::prelude::*;
//!
//! let config = PipelineConfig::default();
//! let pipeline = CrossImpactPipeline::from_config(config)?;
//! let output = pipeline.process_path("snapshots.csv")?;
//! ```
//!
//! # What's Included
//!
//! ## Core Pipeline
//! - [`CrossImpactPipeline`] - Main processing pipeline
//! - [`PipelineBuilder`] - Fluent configuration
//! - [`PipelineConfig`] - Pipeline configuration
//! - [`PipelineOutput`] - Pipeline output container
//!
//! ## Stages
//! - [`compute_level_ofi`], [`compute_log_returns`] - Per-instrument series
//! - [`PcaIntegrator`] - Integrated OFI
//! - [`DesignMatrixBuilder`] - Lagged design matrices
//! - [`CrossImpactEstimator`] - Lasso fits per (horizon, target)
//!
//! ## Results
//! - [`CrossImpactModel`] - Coefficient matrices per horizon
//! - [`FitOutcome`] - Fitted or skipped
//! - [`ResultExporter`] - CSV / NumPy / JSON output

// Core pipeline
pub use crate::builder::PipelineBuilder;
pub use crate::config::{ExperimentMetadata, PipelineConfig};
pub use crate::pipeline::{CrossImpactPipeline, InstrumentOutput, PipelineOutput, StageOutcome};

// Input
pub use crate::loader::SnapshotCsvLoader;
pub use crate::snapshot::{BookLevel, DuplicatePolicy, Snapshot, SnapshotTable};

// Stages
pub use crate::design::{AlignedPanel, DesignMatrix, DesignMatrixBuilder};
pub use crate::estimator::{
    AlphaGrid, CrossImpactEstimator, MeanAbsoluteError, MeanSquaredError, RegressionConfig,
    ScoringKind, ScoringStrategy,
};
pub use crate::features::{compute_level_ofi, compute_log_returns, LevelOfiSeries, ReturnSeries};
pub use crate::integration::{IntegratedOfiSeries, PcaConfig, PcaInputMode, PcaIntegrator};

// Results
pub use crate::estimator::{CoefficientMatrix, CoefficientRow, CrossImpactModel, FitOutcome, ScatterRow};
pub use crate::export::ResultExporter;

// Errors
pub use crate::error::{CrossImpactError, Result};
