//! Order book snapshot types and the input schema.
//!
//! A [`Snapshot`] is one row of the input table: a symbol, an event
//! timestamp and `L` book levels. [`SnapshotTable`] holds the rows of every
//! symbol and splits them into per-symbol, time-ordered sequences.
//!
//! # Column Naming
//!
//! Level columns use a two-digit level suffix:
//!
//! | Level | Columns |
//! |-------|---------|
//! | 0 | `bid_px_00`, `ask_px_00`, `bid_sz_00`, `ask_sz_00` |
//! | 1 | `bid_px_01`, `ask_px_01`, `bid_sz_01`, `ask_sz_01` |
//!
//! # Duplicate Timestamps
//!
//! Rows are stably sorted by `ts_event` within a symbol. Rows sharing a
//! timestamp are resolved by [`DuplicatePolicy`]; `KeepLast` is the default
//! since the last message at a timestamp describes the book as it stood
//! when that timestamp closed.

use crate::error::{CrossImpactError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column holding the instrument identifier.
pub const SYMBOL_COLUMN: &str = "symbol";

/// Column holding the event timestamp.
pub const TIMESTAMP_COLUMN: &str = "ts_event";

/// Per-level column prefixes, in the order they are stored in [`BookLevel`].
pub const LEVEL_COLUMN_PREFIXES: [&str; 4] = ["bid_px", "ask_px", "bid_sz", "ask_sz"];

/// Column name for a level field, e.g. `level_column("bid_px", 3) == "bid_px_03"`.
pub fn level_column(prefix: &str, level: usize) -> String {
    format!("{prefix}_{level:02}")
}

/// All columns required for a table with `levels` book levels.
pub fn required_columns(levels: usize) -> Vec<String> {
    let mut columns = vec![SYMBOL_COLUMN.to_string(), TIMESTAMP_COLUMN.to_string()];
    for level in 0..levels {
        for prefix in LEVEL_COLUMN_PREFIXES {
            columns.push(level_column(prefix, level));
        }
    }
    columns
}

/// One level of the book.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BookLevel {
    pub bid_px: f64,
    pub ask_px: f64,
    pub bid_sz: f64,
    pub ask_sz: f64,
}

impl BookLevel {
    pub fn new(bid_px: f64, ask_px: f64, bid_sz: f64, ask_sz: f64) -> Self {
        Self {
            bid_px,
            ask_px,
            bid_sz,
            ask_sz,
        }
    }

    /// All four fields finite and non-negative.
    #[inline]
    pub fn is_valid(&self) -> bool {
        [self.bid_px, self.ask_px, self.bid_sz, self.ask_sz]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// One row of the input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Instrument identifier
    pub symbol: String,

    /// Event timestamp (nanoseconds since the Unix epoch)
    pub ts_event: i64,

    /// Book levels, best first
    pub levels: Vec<BookLevel>,
}

impl Snapshot {
    pub fn new(symbol: impl Into<String>, ts_event: i64, levels: Vec<BookLevel>) -> Self {
        Self {
            symbol: symbol.into(),
            ts_event,
            levels,
        }
    }

    /// Whether the first `levels` levels are all valid.
    ///
    /// A snapshot with fewer than `levels` levels is never valid.
    #[inline]
    pub fn is_valid(&self, levels: usize) -> bool {
        self.levels.len() >= levels && self.levels[..levels].iter().all(BookLevel::is_valid)
    }

    /// Mid-price from the best level, `None` when it is missing, non-finite
    /// or not strictly positive.
    #[inline]
    pub fn mid_price(&self) -> Option<f64> {
        let best = self.levels.first()?;
        let mid = (best.bid_px + best.ask_px) / 2.0;
        (mid.is_finite() && mid > 0.0).then_some(mid)
    }
}

/// Resolution of rows sharing a timestamp within one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Keep the first row (in input order) at each timestamp
    KeepFirst,

    /// Keep the last row (in input order) at each timestamp
    #[default]
    KeepLast,

    /// Keep every row; consecutive rows may share a timestamp
    KeepAll,
}

/// The input table for a run.
#[derive(Debug, Clone)]
pub struct SnapshotTable {
    snapshots: Vec<Snapshot>,
    levels: usize,
}

impl SnapshotTable {
    /// Create a table with `levels` book levels.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `levels` is zero or any row carries fewer levels
    /// than declared (level count inconsistent with the available columns).
    pub fn new(snapshots: Vec<Snapshot>, levels: usize) -> Result<Self> {
        if levels == 0 {
            return Err(CrossImpactError::config("levels must be > 0"));
        }
        if let Some(short) = snapshots.iter().find(|s| s.levels.len() < levels) {
            return Err(CrossImpactError::config(format!(
                "snapshot for {} at {} has {} levels, table declares {}",
                short.symbol,
                short.ts_event,
                short.levels.len(),
                levels
            )));
        }
        Ok(Self { snapshots, levels })
    }

    /// Number of book levels per row.
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// All rows in input order.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Distinct symbols, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.snapshots.iter().map(|s| s.symbol.clone()).collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    /// Split into per-symbol sequences ordered by timestamp.
    ///
    /// The sort is stable, so rows with equal timestamps keep their input
    /// order before `policy` is applied.
    pub fn by_symbol(&self, policy: DuplicatePolicy) -> BTreeMap<String, Vec<Snapshot>> {
        let mut groups: BTreeMap<String, Vec<Snapshot>> = BTreeMap::new();
        for snapshot in &self.snapshots {
            groups
                .entry(snapshot.symbol.clone())
                .or_default()
                .push(snapshot.clone());
        }

        for (symbol, rows) in groups.iter_mut() {
            rows.sort_by_key(|s| s.ts_event);
            let before = rows.len();
            *rows = resolve_duplicates(std::mem::take(rows), policy);
            let dropped = before - rows.len();
            if dropped > 0 {
                log::warn!(
                    "{symbol}: {dropped} rows with duplicate timestamps dropped ({policy:?})"
                );
            }
        }

        groups
    }
}

/// Apply `policy` to a timestamp-sorted sequence.
pub fn resolve_duplicates(rows: Vec<Snapshot>, policy: DuplicatePolicy) -> Vec<Snapshot> {
    match policy {
        DuplicatePolicy::KeepAll => rows,
        DuplicatePolicy::KeepFirst => {
            let mut out: Vec<Snapshot> = Vec::with_capacity(rows.len());
            for row in rows {
                if out.last().map_or(true, |last| last.ts_event != row.ts_event) {
                    out.push(row);
                }
            }
            out
        }
        DuplicatePolicy::KeepLast => {
            let mut out: Vec<Snapshot> = Vec::with_capacity(rows.len());
            for row in rows {
                match out.last_mut() {
                    Some(last) if last.ts_event == row.ts_event => *last = row,
                    _ => out.push(row),
                }
            }
            out
        }
    }
}
