//! Per-instrument series computed from order book snapshots.
//!
//! - `order_flow`: multi-level Order Flow Imbalance (Cont et al., 2014)
//! - `returns`: log mid-price returns
//!
//! Both modules are pure functions of a symbol's time-ordered snapshots and
//! produce one value per snapshot, with `None` marking rows whose value is
//! not computable (first row, invalid input). Downstream stages distinguish
//! "no signal" (a defined zero) from "not yet computable" (`None`).
//!
//! # Usage
//!
//! ```ignore
//! use cross_impact::features::{order_flow::compute_level_ofi, returns::compute_log_returns};
//!
//! let ofi = compute_level_ofi("AAPL", &rows, 5);
//! let returns = compute_log_returns("AAPL", &rows);
//! ```

pub mod order_flow;
pub mod returns;

pub use order_flow::{compute_level_ofi, LevelFlow, LevelOfiSeries};
pub use returns::{compute_log_returns, reconstruct_prices, ReturnSeries};

use serde::{Deserialize, Serialize};

/// Which input rows produced a derived series.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeriesProvenance {
    /// Instrument identifier
    pub symbol: String,

    /// First input timestamp (ns)
    pub first_ts: Option<i64>,

    /// Last input timestamp (ns)
    pub last_ts: Option<i64>,

    /// Input rows consumed
    pub rows: usize,

    /// Input rows rejected as invalid
    pub invalid_rows: usize,
}

impl SeriesProvenance {
    /// Build from the consumed timestamps.
    pub fn from_timestamps(
        symbol: &str,
        timestamps: impl Iterator<Item = i64>,
        invalid_rows: usize,
    ) -> Self {
        let mut provenance = Self {
            symbol: symbol.to_string(),
            invalid_rows,
            ..Default::default()
        };
        for ts in timestamps {
            provenance.first_ts = Some(provenance.first_ts.map_or(ts, |f| f.min(ts)));
            provenance.last_ts = Some(provenance.last_ts.map_or(ts, |l| l.max(ts)));
            provenance.rows += 1;
        }
        provenance
    }
}
