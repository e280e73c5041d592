//! CSV loader for order book snapshot tables.
//!
//! Reads the wide snapshot format (`symbol`, `ts_event`, then four columns
//! per level) into a [`SnapshotTable`]. Extra columns are ignored.
//!
//! - A missing required column aborts the load with `MissingColumns`.
//! - `ts_event` is either integer nanoseconds since the epoch or an
//!   RFC 3339 datetime; anything else is a `Parse` error.
//! - Empty or unparseable price/size cells become `NaN`. The row is kept
//!   and later treated as an invalid snapshot.

use crate::error::{CrossImpactError, Result};
use crate::snapshot::{
    level_column, required_columns, BookLevel, Snapshot, SnapshotTable, LEVEL_COLUMN_PREFIXES,
    SYMBOL_COLUMN, TIMESTAMP_COLUMN,
};
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::Path;

/// Loads snapshot CSV files for a fixed number of levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotCsvLoader {
    levels: usize,
}

/// Column positions resolved from the header.
struct ColumnIndex {
    symbol: usize,
    ts_event: usize,
    /// `[level][bid_px, ask_px, bid_sz, ask_sz]`
    levels: Vec<[usize; 4]>,
}

impl SnapshotCsvLoader {
    pub fn new(levels: usize) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Load a CSV file.
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<SnapshotTable> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| CrossImpactError::Io(format!("{}: {e}", path.display())))?;
        let table = self.load_reader(file)?;
        log::info!(
            "loaded {} snapshots for {} symbols from {}",
            table.len(),
            table.symbols().len(),
            path.display()
        );
        Ok(table)
    }

    /// Load CSV from any reader (header row required).
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<SnapshotTable> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let index = self.resolve_columns(&headers)?;

        let mut snapshots = Vec::new();
        let mut record = StringRecord::new();
        let mut row = 0usize;
        let mut nan_cells = 0usize;

        while reader.read_record(&mut record)? {
            row += 1;
            let symbol = record.get(index.symbol).unwrap_or_default().to_string();
            let raw_ts = record.get(index.ts_event).unwrap_or_default();
            let ts_event = parse_timestamp(raw_ts).ok_or_else(|| CrossImpactError::Parse {
                row,
                column: TIMESTAMP_COLUMN.to_string(),
                value: raw_ts.to_string(),
            })?;

            let levels: Vec<BookLevel> = index
                .levels
                .iter()
                .map(|cols| {
                    let [bid_px, ask_px, bid_sz, ask_sz] =
                        cols.map(|c| parse_number(record.get(c).unwrap_or_default()));
                    BookLevel::new(bid_px, ask_px, bid_sz, ask_sz)
                })
                .collect();
            nan_cells += levels
                .iter()
                .flat_map(|l| [l.bid_px, l.ask_px, l.bid_sz, l.ask_sz])
                .filter(|v| v.is_nan())
                .count();

            snapshots.push(Snapshot::new(symbol, ts_event, levels));
        }

        if nan_cells > 0 {
            log::warn!("{nan_cells} empty or unparseable numeric cells read as NaN");
        }

        SnapshotTable::new(snapshots, self.levels)
    }

    fn resolve_columns(&self, headers: &StringRecord) -> Result<ColumnIndex> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<String> = required_columns(self.levels)
            .into_iter()
            .filter(|c| position(c).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(CrossImpactError::MissingColumns(missing));
        }

        let lookup = |name: &str| {
            position(name).ok_or_else(|| CrossImpactError::MissingColumns(vec![name.to_string()]))
        };

        let mut levels = Vec::with_capacity(self.levels);
        for level in 0..self.levels {
            let mut cols = [0usize; 4];
            for (slot, prefix) in cols.iter_mut().zip(LEVEL_COLUMN_PREFIXES) {
                *slot = lookup(&level_column(prefix, level))?;
            }
            levels.push(cols);
        }

        Ok(ColumnIndex {
            symbol: lookup(SYMBOL_COLUMN)?,
            ts_event: lookup(TIMESTAMP_COLUMN)?,
            levels,
        })
    }
}

/// Integer nanoseconds or RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    if let Ok(ns) = raw.parse::<i64>() {
        return Some(ns);
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .and_then(|dt| dt.timestamp_nanos_opt())
}

fn parse_number(raw: &str) -> f64 {
    raw.parse::<f64>().unwrap_or(f64::NAN)
}
