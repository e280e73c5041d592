//! Leak-free design matrices for cross-impact regression.
//!
//! # Pipeline
//!
//! ```text
//! IntegratedOfiSeries ─┐
//!                      ├─> AlignedPanel (union time grid) ─> DesignMatrixBuilder
//! ReturnSeries ────────┘                                        │
//!                                              DesignMatrix per (horizon, target)
//! ```
//!
//! Lags are counted in grid steps. Feature values at lag `h` come from
//! `h` steps before the label; a row exists only when every value in it is
//! defined.

pub mod matrix;
pub mod panel;

pub use matrix::{DesignColumn, DesignMatrix, DesignMatrixBuilder, RowStamp};
pub use panel::AlignedPanel;
