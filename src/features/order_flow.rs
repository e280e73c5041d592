//! Multi-Level Order Flow Imbalance
//!
//! Implements level-wise OFI from "The Price Impact of Order Book Events"
//! (Cont et al., 2014), extended to every tracked book level.
//!
//! # Formula
//!
//! For consecutive valid snapshots (n-1, n) at level k:
//!
//! ```text
//! bid flow:  P^b_n > P^b_{n-1}  →  +q^b_n
//!            P^b_n = P^b_{n-1}  →  q^b_n - q^b_{n-1}
//!            P^b_n < P^b_{n-1}  →  -q^b_{n-1}
//!
//! ask flow:  P^a_n < P^a_{n-1}  →  +q^a_n
//!            P^a_n = P^a_{n-1}  →  q^a_n - q^a_{n-1}
//!            P^a_n > P^a_{n-1}  →  -q^a_{n-1}
//!
//! OFI_k = bid flow - ask flow
//! ```
//!
//! Buy pressure (bid strengthening relative to ask) is positive.
//!
//! # Missing Values
//!
//! The first valid row of a symbol has no predecessor and yields `None`.
//! Rows with a non-finite or negative price/size are excluded: they yield
//! `None` and the next valid row is compared against the last valid row,
//! so a corrupted row never produces a jump.
//!
//! # Example
//!
//! ```
//! use cross_impact::features::order_flow::compute_level_ofi;
//! use cross_impact::snapshot::{BookLevel, Snapshot};
//!
//! let rows = vec![
//!     Snapshot::new("AAPL", 0, vec![BookLevel::new(100.0, 100.1, 10.0, 10.0)]),
//!     Snapshot::new("AAPL", 1, vec![BookLevel::new(100.0, 100.1, 15.0, 10.0)]),
//! ];
//! let series = compute_level_ofi("AAPL", &rows, 1);
//! assert_eq!(series.ofi_at(0), None);
//! assert_eq!(series.ofi_at(1), Some(vec![5.0]));
//! ```

use super::SeriesProvenance;
use crate::snapshot::{BookLevel, Snapshot};
use serde::{Deserialize, Serialize};

/// Bid and ask flow of one level between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelFlow {
    /// Bid-side flow (positive when bid depth is added or the bid improves)
    pub bid: f64,

    /// Ask-side flow (positive when ask depth is added or the ask improves)
    pub ask: f64,
}

impl LevelFlow {
    /// Level OFI = bid flow - ask flow.
    #[inline]
    pub fn ofi(&self) -> f64 {
        self.bid - self.ask
    }
}

/// Level-OFI series of one symbol, aligned 1:1 with its snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelOfiSeries {
    /// Instrument identifier
    pub symbol: String,

    /// Number of levels per row
    pub levels: usize,

    /// Snapshot timestamps
    pub timestamps: Vec<i64>,

    /// Per-row flows; `None` where OFI is not computable
    pub flows: Vec<Option<Vec<LevelFlow>>>,

    /// Input range and row counts that produced the series
    pub provenance: SeriesProvenance,
}

impl LevelOfiSeries {
    fn empty(symbol: &str, levels: usize, provenance: SeriesProvenance) -> Self {
        Self {
            symbol: symbol.to_string(),
            levels,
            timestamps: Vec::new(),
            flows: Vec::new(),
            provenance,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Level OFI values at `row`.
    pub fn ofi_at(&self, row: usize) -> Option<Vec<f64>> {
        self.flows
            .get(row)?
            .as_ref()
            .map(|flows| flows.iter().map(LevelFlow::ofi).collect())
    }

    /// OFI series for one level.
    pub fn level_series(&self, level: usize) -> Vec<Option<f64>> {
        self.flows
            .iter()
            .map(|row| row.as_ref().and_then(|f| f.get(level)).map(LevelFlow::ofi))
            .collect()
    }

    /// Number of rows with a defined value.
    pub fn defined_count(&self) -> usize {
        self.flows.iter().filter(|f| f.is_some()).count()
    }

    /// Sum of OFI across levels per row.
    pub fn total_ofi(&self) -> Vec<Option<f64>> {
        self.flows
            .iter()
            .map(|row| row.as_ref().map(|f| f.iter().map(LevelFlow::ofi).sum()))
            .collect()
    }
}

/// Bid-side flow between two states of one level.
#[inline]
fn bid_flow(prev: &BookLevel, curr: &BookLevel) -> f64 {
    if prev.bid_px == 0.0 && curr.bid_px == 0.0 {
        // Empty level on both sides
        return 0.0;
    }
    if curr.bid_px > prev.bid_px {
        curr.bid_sz
    } else if curr.bid_px < prev.bid_px {
        -prev.bid_sz
    } else {
        curr.bid_sz - prev.bid_sz
    }
}

/// Ask-side flow between two states of one level.
#[inline]
fn ask_flow(prev: &BookLevel, curr: &BookLevel) -> f64 {
    if prev.ask_px == 0.0 && curr.ask_px == 0.0 {
        return 0.0;
    }
    // A zero price is an empty level: its appearance improves the ask,
    // its disappearance worsens it.
    let improved = (prev.ask_px == 0.0 && curr.ask_px > 0.0)
        || (curr.ask_px > 0.0 && curr.ask_px < prev.ask_px);
    let worsened = (curr.ask_px == 0.0 && prev.ask_px > 0.0) || curr.ask_px > prev.ask_px;

    if improved {
        curr.ask_sz
    } else if worsened {
        -prev.ask_sz
    } else {
        curr.ask_sz - prev.ask_sz
    }
}

/// Flows at the first `levels` levels between two valid snapshots.
pub fn level_flows(prev: &Snapshot, curr: &Snapshot, levels: usize) -> Vec<LevelFlow> {
    prev.levels
        .iter()
        .zip(curr.levels.iter())
        .take(levels)
        .map(|(p, c)| LevelFlow {
            bid: bid_flow(p, c),
            ask: ask_flow(p, c),
        })
        .collect()
}

/// Compute the level-OFI series of one symbol.
///
/// `snapshots` must be the symbol's rows ordered by timestamp. The scan is
/// a left fold whose only state is the last valid snapshot.
///
/// Returns an empty series when fewer than 2 rows are valid.
pub fn compute_level_ofi(symbol: &str, snapshots: &[Snapshot], levels: usize) -> LevelOfiSeries {
    let invalid_rows = snapshots.iter().filter(|s| !s.is_valid(levels)).count();
    let provenance = SeriesProvenance::from_timestamps(
        symbol,
        snapshots.iter().map(|s| s.ts_event),
        invalid_rows,
    );

    if snapshots.len() - invalid_rows < 2 {
        log::warn!(
            "{symbol}: {} valid snapshots, OFI series is empty",
            snapshots.len() - invalid_rows
        );
        return LevelOfiSeries::empty(symbol, levels, provenance);
    }
    if invalid_rows > 0 {
        log::warn!("{symbol}: {invalid_rows} invalid snapshots excluded from OFI deltas");
    }

    let flows = snapshots
        .iter()
        .scan(None::<&Snapshot>, |last_valid, snapshot| {
            if !snapshot.is_valid(levels) {
                return Some(None);
            }
            let flow = last_valid.map(|prev| level_flows(prev, snapshot, levels));
            *last_valid = Some(snapshot);
            Some(flow)
        })
        .collect();

    LevelOfiSeries {
        symbol: symbol.to_string(),
        levels,
        timestamps: snapshots.iter().map(|s| s.ts_event).collect(),
        flows,
        provenance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_level(ts: i64, bid_px: f64, ask_px: f64, bid_sz: f64, ask_sz: f64) -> Snapshot {
        Snapshot::new("X", ts, vec![BookLevel::new(bid_px, ask_px, bid_sz, ask_sz)])
    }

    fn multi_level(ts: i64, bid_sizes: &[f64], ask_sizes: &[f64]) -> Snapshot {
        let levels = bid_sizes
            .iter()
            .zip(ask_sizes)
            .enumerate()
            .map(|(i, (&b, &a))| BookLevel::new(100.0 - i as f64 * 0.01, 100.01 + i as f64 * 0.01, b, a))
            .collect();
        Snapshot::new("X", ts, levels)
    }

    #[test]
    fn test_constant_book_has_zero_ofi() {
        let rows: Vec<Snapshot> = (0..5)
            .map(|t| multi_level(t, &[100.0, 200.0, 300.0], &[150.0, 250.0, 350.0]))
            .collect();
        let series = compute_level_ofi("X", &rows, 3);

        assert_eq!(series.len(), 5);
        assert_eq!(series.ofi_at(0), None);
        for row in 1..5 {
            assert_eq!(series.ofi_at(row), Some(vec![0.0, 0.0, 0.0]));
        }
    }

    #[test]
    fn test_bid_cases() {
        // Unchanged price: size delta
        let rows = vec![one_level(0, 100.0, 101.0, 10.0, 10.0), one_level(1, 100.0, 101.0, 25.0, 10.0)];
        assert_eq!(compute_level_ofi("X", &rows, 1).ofi_at(1), Some(vec![15.0]));

        // Price up: current size
        let rows = vec![one_level(0, 100.0, 101.0, 10.0, 10.0), one_level(1, 100.5, 101.0, 4.0, 10.0)];
        assert_eq!(compute_level_ofi("X", &rows, 1).ofi_at(1), Some(vec![4.0]));

        // Price down: minus previous size
        let rows = vec![one_level(0, 100.0, 101.0, 10.0, 10.0), one_level(1, 99.5, 101.0, 4.0, 10.0)];
        assert_eq!(compute_level_ofi("X", &rows, 1).ofi_at(1), Some(vec![-10.0]));
    }

    #[test]
    fn test_ask_cases() {
        // Ask size added at same price: sell pressure, negative OFI
        let rows = vec![one_level(0, 100.0, 101.0, 10.0, 10.0), one_level(1, 100.0, 101.0, 10.0, 30.0)];
        assert_eq!(compute_level_ofi("X", &rows, 1).ofi_at(1), Some(vec![-20.0]));

        // Ask price down: current ask size counts against OFI
        let rows = vec![one_level(0, 100.0, 101.0, 10.0, 10.0), one_level(1, 100.0, 100.5, 10.0, 7.0)];
        assert_eq!(compute_level_ofi("X", &rows, 1).ofi_at(1), Some(vec![-7.0]));

        // Ask price up: previous ask size removed, buy pressure
        let rows = vec![one_level(0, 100.0, 101.0, 10.0, 10.0), one_level(1, 100.0, 101.5, 10.0, 7.0)];
        assert_eq!(compute_level_ofi("X", &rows, 1).ofi_at(1), Some(vec![10.0]));
    }

    #[test]
    fn test_per_level_independence() {
        let rows = vec![
            multi_level(0, &[100.0, 200.0, 300.0], &[100.0, 200.0, 300.0]),
            multi_level(1, &[200.0, 200.0, 300.0], &[100.0, 200.0, 250.0]),
        ];
        let series = compute_level_ofi("X", &rows, 3);
        assert_eq!(series.ofi_at(1), Some(vec![100.0, 0.0, 50.0]));
        assert_eq!(series.total_ofi()[1], Some(150.0));
        assert_eq!(series.level_series(2), vec![None, Some(50.0)]);
    }

    #[test]
    fn test_invalid_row_is_skipped_and_state_carried() {
        let rows = vec![
            one_level(0, 100.0, 101.0, 10.0, 10.0),
            one_level(1, 100.0, f64::NAN, 10.0, 10.0),
            one_level(2, 100.0, 101.0, 12.0, 10.0),
        ];
        let series = compute_level_ofi("X", &rows, 1);

        assert_eq!(series.len(), 3);
        assert_eq!(series.ofi_at(1), None);
        // Compared against row 0, not the corrupted row 1
        assert_eq!(series.ofi_at(2), Some(vec![2.0]));
        assert_eq!(series.provenance.invalid_rows, 1);
        assert!(series
            .flows
            .iter()
            .flatten()
            .flatten()
            .all(|f| f.bid.is_finite() && f.ask.is_finite()));
    }

    #[test]
    fn test_fewer_than_two_valid_rows_is_empty() {
        let rows = vec![
            one_level(0, 100.0, 101.0, 10.0, 10.0),
            one_level(1, f64::NAN, 101.0, 10.0, 10.0),
        ];
        let series = compute_level_ofi("X", &rows, 1);
        assert!(series.is_empty());
        assert_eq!(series.provenance.rows, 2);

        assert!(compute_level_ofi("X", &[], 1).is_empty());
    }

    #[test]
    fn test_empty_level_transitions() {
        let prev = BookLevel::new(0.0, 0.0, 0.0, 0.0);
        let curr = BookLevel::new(99.0, 101.0, 5.0, 7.0);

        // Level appears on both sides
        assert_eq!(bid_flow(&prev, &curr), 5.0);
        assert_eq!(ask_flow(&prev, &curr), 7.0);

        // Level disappears on both sides
        assert_eq!(bid_flow(&curr, &prev), -5.0);
        assert_eq!(ask_flow(&curr, &prev), -7.0);

        // Stays empty
        assert_eq!(bid_flow(&prev, &prev), 0.0);
        assert_eq!(ask_flow(&prev, &prev), 0.0);
    }
}
