//! Preprocessing applied around the core stages.
//!
//! - **Resampling**: put every symbol on the same fixed clock
//!   - Last price / summed size per time bucket
//!
//! - **Normalization**: scale matrices column-wise
//!   - Population z-score with a degenerate-variance floor
//!
//! # Example
//!
//! ```ignore
//! use cross_impact::preprocessing::{resample_snapshots, ColumnStandardizer};
//!
//! let one_second = resample_snapshots(&rows, 1_000_000_000, 5);
//! let scaler = ColumnStandardizer::fit(&matrix, 1e-12);
//! let z = scaler.transform(&matrix);
//! ```

pub mod normalization;
pub mod resample;

pub use normalization::ColumnStandardizer;
pub use resample::resample_snapshots;
