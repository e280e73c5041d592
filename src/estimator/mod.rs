//! Sparse cross-impact estimation.
//!
//! - [`lasso`]: coordinate-descent Lasso on z-scored features
//! - [`selection`]: alpha grids, time-ordered folds, pluggable scoring
//! - [`cross_impact`]: one fit per (horizon, target), collected into a
//!   [`CrossImpactModel`]
//!
//! # Example
//!
//! ```ignore
//! use cross_impact::estimator::{CrossImpactEstimator, RegressionConfig};
//!
//! let estimator = CrossImpactEstimator::new(RegressionConfig::default());
//! let model = estimator.fit_panel(&panel, &[0, 1, 5])?;
//! for row in model.coefficient_table() {
//!     println!("{} <- {} @ {}: {:.4}", row.target, row.source, row.horizon, row.coefficient);
//! }
//! ```

pub mod cross_impact;
pub mod lasso;
pub mod selection;

pub use cross_impact::{
    CoefficientMatrix, CoefficientRow, CrossImpactEstimator, CrossImpactFit, CrossImpactModel,
    FitOutcome, RegressionConfig, ScatterRow,
};
pub use lasso::{alpha_max, r_squared, LassoFit, LassoSolver};
pub use selection::{
    cross_validate, AlphaGrid, CvResult, MeanAbsoluteError, MeanSquaredError, ScoringKind,
    ScoringStrategy, TimeSeriesKFold,
};
