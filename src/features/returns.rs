//! Log mid-price returns.
//!
//! ```text
//! mid_t = (bid_px_00 + ask_px_00) / 2
//! r_t   = ln(mid_t / mid_{t-1})
//! ```
//!
//! Returns use the same alignment convention as level OFI: one value per
//! snapshot, `None` for the first row. A return is also `None` whenever
//! either mid-price is missing, non-finite or non-positive, so no `inf` or
//! `NaN` ever reaches the regression.

use super::SeriesProvenance;
use crate::snapshot::Snapshot;

/// Mid-price and log-return series of one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    /// Instrument identifier
    pub symbol: String,

    /// Snapshot timestamps
    pub timestamps: Vec<i64>,

    /// Mid-prices (`None` where the best level is unusable)
    pub mid_prices: Vec<Option<f64>>,

    /// Log returns (`None` where not computable)
    pub returns: Vec<Option<f64>>,

    /// Input range and row counts that produced the series
    pub provenance: SeriesProvenance,
}

impl ReturnSeries {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Number of defined returns.
    pub fn defined_count(&self) -> usize {
        self.returns.iter().filter(|r| r.is_some()).count()
    }
}

/// Log return between two mid-prices, `None` unless both are usable.
#[inline]
pub fn log_return(prev_mid: Option<f64>, mid: Option<f64>) -> Option<f64> {
    let (prev, curr) = (prev_mid?, mid?);
    if !(prev.is_finite() && curr.is_finite() && prev > 0.0 && curr > 0.0) {
        return None;
    }
    let r = (curr / prev).ln();
    r.is_finite().then_some(r)
}

/// Compute mid-prices and log returns for one symbol.
///
/// `snapshots` must be the symbol's rows ordered by timestamp.
pub fn compute_log_returns(symbol: &str, snapshots: &[Snapshot]) -> ReturnSeries {
    let mid_prices: Vec<Option<f64>> = snapshots.iter().map(Snapshot::mid_price).collect();
    let invalid_rows = mid_prices.iter().filter(|m| m.is_none()).count();

    let returns: Vec<Option<f64>> = std::iter::once(None)
        .chain(mid_prices.windows(2).map(|w| log_return(w[0], w[1])))
        .take(mid_prices.len())
        .collect();

    if invalid_rows > 0 {
        log::warn!("{symbol}: {invalid_rows} rows without a usable mid-price");
    }

    ReturnSeries {
        symbol: symbol.to_string(),
        timestamps: snapshots.iter().map(|s| s.ts_event).collect(),
        mid_prices,
        returns,
        provenance: SeriesProvenance::from_timestamps(
            symbol,
            snapshots.iter().map(|s| s.ts_event),
            invalid_rows,
        ),
    }
}

/// Rebuild a price path from an initial price and log returns.
///
/// Missing returns leave the price unchanged.
pub fn reconstruct_prices(initial: f64, returns: &[Option<f64>]) -> Vec<f64> {
    returns
        .iter()
        .scan(initial, |price, r| {
            if let Some(r) = r {
                *price *= r.exp();
            }
            Some(*price)
        })
        .collect()
}
