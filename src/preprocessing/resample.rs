//! Time-bucket resampling of order book snapshots.
//!
//! Raw snapshot feeds emit one row per book update, so different symbols
//! rarely share timestamps. Resampling every symbol onto the same fixed
//! clock (e.g. 1 second) gives the design matrix a common time grid where
//! one grid step is one sampling interval.
//!
//! # Aggregation Rules
//!
//! Within each `[start, start + interval)` bucket of one symbol:
//!
//! | Field | Rule |
//! |-------|------|
//! | `bid_px_ℓℓ`, `ask_px_ℓℓ` | last finite value |
//! | `bid_sz_ℓℓ`, `ask_sz_ℓℓ` | sum of finite values |
//! | `ts_event` | bucket start |
//!
//! A price or size with no finite value in its bucket stays `NaN`, so the
//! resampled row is still rejected downstream. Buckets without any row
//! are not emitted.
//!
//! # Example
//!
//! ```
//! use cross_impact::preprocessing::resample_snapshots;
//! use cross_impact::snapshot::{BookLevel, Snapshot};
//!
//! let rows = vec![
//!     Snapshot::new("A", 100, vec![BookLevel::new(10.0, 10.2, 1.0, 2.0)]),
//!     Snapshot::new("A", 900, vec![BookLevel::new(10.1, 10.2, 3.0, 4.0)]),
//!     Snapshot::new("A", 1_200, vec![BookLevel::new(10.1, 10.3, 5.0, 6.0)]),
//! ];
//! let out = resample_snapshots(&rows, 1_000, 1);
//! assert_eq!(out.len(), 2);
//! assert_eq!(out[0].ts_event, 0);
//! assert_eq!(out[0].levels[0], BookLevel::new(10.1, 10.2, 4.0, 6.0));
//! ```

use crate::snapshot::{BookLevel, Snapshot};

/// Resample one symbol's time-ordered rows onto buckets of `interval_ns`.
///
/// `interval_ns` must be positive; configuration validation guarantees it.
pub fn resample_snapshots(rows: &[Snapshot], interval_ns: i64, levels: usize) -> Vec<Snapshot> {
    let mut out: Vec<Snapshot> = Vec::new();
    let mut current: Option<(i64, BucketState)> = None;

    for row in rows {
        let bucket = row.ts_event.div_euclid(interval_ns) * interval_ns;
        match current.as_mut() {
            Some((start, state)) if *start == bucket => state.absorb(row),
            _ => {
                if let Some((start, state)) = current.take() {
                    out.push(state.finish(&row.symbol, start));
                }
                let mut state = BucketState::new(levels);
                state.absorb(row);
                current = Some((bucket, state));
            }
        }
    }

    if let (Some((start, state)), Some(last)) = (current, rows.last()) {
        out.push(state.finish(&last.symbol, start));
    }

    out
}

/// Accumulator for one bucket.
struct BucketState {
    levels: Vec<BookLevel>,
}

impl BucketState {
    fn new(levels: usize) -> Self {
        Self {
            levels: vec![BookLevel::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN); levels],
        }
    }

    fn absorb(&mut self, row: &Snapshot) {
        for (acc, level) in self.levels.iter_mut().zip(row.levels.iter()) {
            if level.bid_px.is_finite() {
                acc.bid_px = level.bid_px;
            }
            if level.ask_px.is_finite() {
                acc.ask_px = level.ask_px;
            }
            add_finite(&mut acc.bid_sz, level.bid_sz);
            add_finite(&mut acc.ask_sz, level.ask_sz);
        }
    }

    fn finish(self, symbol: &str, start: i64) -> Snapshot {
        Snapshot::new(symbol, start, self.levels)
    }
}

fn add_finite(acc: &mut f64, value: f64) {
    if value.is_finite() {
        *acc = if acc.is_nan() { value } else { *acc + value };
    }
}
