//! Cross-Impact
//!
//! Cross-impact of order flow imbalance (OFI) from limit order book snapshots.
//!
//! # Overview
//!
//! This library estimates how order flow in one instrument relates to, and
//! predicts, log returns of other instruments:
//!
//! - **Multi-level OFI**: bid minus ask flow per book level (Cont et al.)
//! - **Integrated OFI**: first principal component of the level OFIs
//! - **Log returns**: from top-of-book mid-prices
//! - **Design matrices**: OFI of every instrument at lag `h` against each
//!   instrument's return, without look-ahead
//! - **Sparse estimation**: Lasso per (horizon, target) with time-ordered
//!   cross-validation of the penalty
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Cross-Impact                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  snapshot/      - Book snapshots, input schema, duplicates      │
//! │  loader/        - CSV input                                     │
//! │  preprocessing/ - Resampling and column standardization         │
//! │  features/      - Level OFI and log returns                     │
//! │  integration/   - PCA integrated OFI                            │
//! │  design/        - Aligned panel and lagged design matrices      │
//! │  estimator/     - Lasso, alpha selection, coefficient matrices  │
//! │  pipeline/      - End-to-end run with per-instrument isolation  │
//! │  export/        - CSV / NumPy / JSON results                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cross_impact::prelude::*;
//!
//! let pipeline = PipelineBuilder::new()
//!     .levels(5)
//!     .resample_ns(1_000_000_000)
//!     .horizons(&[0, 1, 5])
//!     .build()?;
//!
//! let output = pipeline.process_path("snapshots.csv")?;
//! ResultExporter::new("out").export(&output, pipeline.config())?;
//! ```

pub mod builder;
pub mod config;
pub mod design;
pub mod error;
pub mod estimator;
pub mod export;
pub mod features;
pub mod integration;
pub mod loader;
pub mod pipeline;
pub mod prelude;
pub mod preprocessing;
pub mod snapshot;
pub mod validation;

// Re-exports - Errors
pub use error::{CrossImpactError, Result};

// Re-exports - Config
pub use builder::PipelineBuilder;
pub use config::{ExperimentMetadata, PipelineConfig};

// Re-exports - Input
pub use loader::SnapshotCsvLoader;
pub use snapshot::{BookLevel, DuplicatePolicy, Snapshot, SnapshotTable};

// Re-exports - Features
pub use features::{
    compute_level_ofi, compute_log_returns, LevelFlow, LevelOfiSeries, ReturnSeries,
    SeriesProvenance,
};
pub use integration::{
    IntegratedOfiSeries, PcaConfig, PcaDiagnostics, PcaInputMode, PcaIntegrator, PcaProjector,
};

// Re-exports - Design and estimation
pub use design::{AlignedPanel, DesignMatrix, DesignMatrixBuilder};
pub use estimator::{
    AlphaGrid, CoefficientMatrix, CrossImpactEstimator, CrossImpactModel, FitOutcome,
    RegressionConfig, ScoringStrategy,
};

// Re-exports - Validation
pub use validation::{
    validate_timestamps, Severity, SnapshotValidator, ValidationConfig, ValidationIssue,
    ValidationResult,
};

// Re-exports - Pipeline and export
pub use export::{ExportMetadata, ResultExporter};
pub use pipeline::{CrossImpactPipeline, PipelineOutput, StageOutcome};
