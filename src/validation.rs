//! Snapshot Validation Module
//!
//! Data-quality checks run on each symbol's snapshots before OFI is
//! computed. Nothing here rejects data: invalid rows are already excluded
//! by the OFI and return calculators. The checks make the reasons visible
//! in logs and in the run output.
//!
//! # Validation Categories
//!
//! 1. **Value Sanity**: NaN/Inf and negative prices or sizes
//! 2. **Book Consistency**: Crossed quotes, locked quotes, price ordering
//! 3. **Spread**: Unusually wide top-of-book spread
//! 4. **Timestamp Ordering**: Monotonic timestamps, gap detection
//!
//! # Usage
//!
//! ```ignore
//! use cross_impact::validation::SnapshotValidator;
//!
//! let result = SnapshotValidator::default().validate_symbol(&rows, 5);
//! for warning in result.warnings() {
//!     log::warn!("{warning}");
//! }
//! ```

use crate::snapshot::{BookLevel, Snapshot};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One failed check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub check: &'static str,
    pub severity: Severity,
    pub message: String,
}

/// Failed checks for one symbol. Empty when everything passed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    fn push(&mut self, check: &'static str, severity: Severity, message: String) {
        self.issues.push(ValidationIssue {
            check,
            severity,
            message,
        });
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Warnings as `"check: message"`.
    pub fn warnings(&self) -> Vec<String> {
        self.formatted(Severity::Warning)
    }

    /// Errors as `"check: message"`.
    pub fn errors(&self) -> Vec<String> {
        self.formatted(Severity::Error)
    }

    fn formatted(&self, severity: Severity) -> Vec<String> {
        self.issues
            .iter()
            .filter(|i| i.severity == severity)
            .map(|i| format!("{}: {}", i.check, i.message))
            .collect()
    }

    fn merge(&mut self, other: ValidationResult) {
        self.issues.extend(other.issues);
    }
}

/// Thresholds for snapshot validation.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Maximum allowed top-of-book spread in basis points
    pub max_spread_bps: f64,

    /// Largest gap between consecutive timestamps before a warning (ns)
    pub max_gap_ns: i64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_spread_bps: 1000.0,      // 10% max spread
            max_gap_ns: 60_000_000_000,  // 1 minute
        }
    }
}

/// Rows failing each check.
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    non_finite: usize,
    negative: usize,
    crossed: usize,
    locked: usize,
    misordered: usize,
    wide_spread: usize,
}

/// Validator for snapshot rows.
#[derive(Debug, Clone, Default)]
pub struct SnapshotValidator {
    config: ValidationConfig,
}

impl SnapshotValidator {
    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a symbol's rows over their first `levels` levels, plus
    /// timestamp ordering.
    pub fn validate_symbol(&self, rows: &[Snapshot], levels: usize) -> ValidationResult {
        let mut total = Tally::default();
        for row in rows {
            self.tally(row, levels, &mut total);
        }

        let mut result = ValidationResult::default();
        let n = rows.len();
        let mut report = |check, count: usize, what: &str, severity| {
            if count > 0 {
                result.push(check, severity, format!("{count} of {n} rows {what}"));
            }
        };
        report("non_finite_values", total.non_finite, "have NaN/Inf or missing levels", Severity::Warning);
        report("negative_values", total.negative, "have negative prices or sizes", Severity::Error);
        report("crossed_quotes", total.crossed, "have bid > ask", Severity::Error);
        report("locked_quotes", total.locked, "have bid == ask", Severity::Warning);
        report("price_ordering", total.misordered, "have misordered levels", Severity::Error);
        report("spread", total.wide_spread, "exceed the spread limit", Severity::Warning);

        let timestamps: Vec<i64> = rows.iter().map(|r| r.ts_event).collect();
        result.merge(validate_timestamps(&timestamps, self.config.max_gap_ns));
        result
    }

    /// Add one row's failures to `tally`; each check counts a row once.
    fn tally(&self, snapshot: &Snapshot, levels: usize, tally: &mut Tally) {
        let book: Vec<&BookLevel> = snapshot.levels.iter().take(levels).collect();

        let values = |l: &BookLevel| [l.bid_px, l.ask_px, l.bid_sz, l.ask_sz];
        let non_finite = snapshot.levels.len() < levels
            || book.iter().any(|l| values(*l).iter().any(|v| !v.is_finite()));
        let negative = book.iter().any(|l| values(*l).iter().any(|v| *v < 0.0));
        tally.non_finite += usize::from(non_finite);
        tally.negative += usize::from(negative);

        if let Some(best) = book.first() {
            let (bid, ask) = (best.bid_px, best.ask_px);
            if bid.is_finite() && ask.is_finite() && bid > 0.0 && ask > 0.0 {
                tally.crossed += usize::from(bid > ask);
                tally.locked += usize::from(bid == ask);

                let spread_bps = (ask - bid) / ((bid + ask) / 2.0) * 10_000.0;
                tally.wide_spread += usize::from(spread_bps > self.config.max_spread_bps);
            }
        }

        // Zero prices mark empty levels and are skipped
        let misordered = book.windows(2).any(|w| {
            let (inner, outer) = (w[0], w[1]);
            (outer.bid_px > 0.0 && inner.bid_px > 0.0 && outer.bid_px > inner.bid_px)
                || (outer.ask_px > 0.0 && inner.ask_px > 0.0 && outer.ask_px < inner.ask_px)
        });
        tally.misordered += usize::from(misordered);
    }
}

/// Validate a sequence of timestamps for monotonicity and gaps.
pub fn validate_timestamps(timestamps: &[i64], max_gap_ns: i64) -> ValidationResult {
    let mut result = ValidationResult::default();

    if timestamps.is_empty() {
        result.push("timestamps", Severity::Warning, "No timestamps to validate".to_string());
        return result;
    }

    if let Some(i) = timestamps.windows(2).position(|w| w[1] < w[0]) {
        result.push(
            "timestamp_ordering",
            Severity::Error,
            format!(
                "Non-monotonic timestamp at index {}: {} < {}",
                i + 1,
                timestamps[i + 1],
                timestamps[i]
            ),
        );
    }

    let max_gap = timestamps
        .windows(2)
        .map(|w| w[1] - w[0])
        .max()
        .unwrap_or(0);
    if max_gap > max_gap_ns {
        result.push(
            "timestamp_gaps",
            Severity::Warning,
            format!("Max timestamp gap: {:.2} seconds", max_gap as f64 / 1e9),
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(bid: f64, ask: f64) -> Snapshot {
        Snapshot::new(
            "AAPL",
            0,
            vec![
                BookLevel::new(bid, ask, 100.0, 120.0),
                BookLevel::new(bid - 0.01, ask + 0.01, 200.0, 180.0),
            ],
        )
    }

    fn check_one(snapshot: Snapshot, levels: usize) -> ValidationResult {
        SnapshotValidator::default().validate_symbol(&[snapshot], levels)
    }

    #[test]
    fn test_valid_snapshot() {
        let result = check_one(book(100.0, 100.02), 2);
        assert!(result.is_valid(), "{:?}", result.issues());
    }

    #[test]
    fn test_crossed_quotes() {
        let result = check_one(book(100.05, 100.0), 2);
        assert!(result.has_errors());
        assert!(result.errors().iter().any(|e| e.starts_with("crossed_quotes")));
    }

    #[test]
    fn test_locked_quotes() {
        let result = check_one(book(100.0, 100.0), 2);
        assert!(result.has_warnings());
        assert!(!result.has_errors());
    }

    #[test]
    fn test_non_finite_and_negative() {
        let mut snap = book(100.0, 100.02);
        snap.levels[1].ask_px = f64::NAN;
        snap.levels[0].bid_sz = -1.0;
        let result = check_one(snap, 2);
        assert!(result.warnings().iter().any(|w| w.starts_with("non_finite_values")));
        assert!(result.errors().iter().any(|e| e.starts_with("negative_values")));
    }

    #[test]
    fn test_missing_levels_counted() {
        let snap = Snapshot::new("A", 0, vec![BookLevel::new(1.0, 1.1, 1.0, 1.0)]);
        let result = check_one(snap, 3);
        assert_eq!(result.issues()[0].check, "non_finite_values");
    }

    #[test]
    fn test_price_ordering_invalid_bids() {
        let mut snap = book(100.0, 100.02);
        snap.levels[1].bid_px = 100.01;
        let result = check_one(snap, 2);
        assert!(result.errors().iter().any(|e| e.starts_with("price_ordering")));
    }

    #[test]
    fn test_wide_spread() {
        let result = check_one(book(90.0, 110.0), 2);
        assert!(result.warnings().iter().any(|w| w.starts_with("spread")));

        let lenient = SnapshotValidator::with_config(ValidationConfig {
            max_spread_bps: 5000.0,
            ..ValidationConfig::default()
        });
        assert!(lenient.validate_symbol(&[book(90.0, 110.0)], 2).is_valid());
    }

    #[test]
    fn test_validate_symbol_counts_rows() {
        let mut rows = vec![book(100.0, 100.02), book(100.05, 100.0), book(100.05, 100.0)];
        rows[1].ts_event = 1;
        rows[2].ts_event = 2;
        let result = SnapshotValidator::default().validate_symbol(&rows, 2);
        assert!(result.errors().iter().any(|e| e.contains("2 of 3 rows")));
    }

    #[test]
    fn test_validate_timestamps_monotonic() {
        assert!(validate_timestamps(&[1, 2, 3], 60_000_000_000).is_valid());
    }

    #[test]
    fn test_validate_timestamps_non_monotonic() {
        let result = validate_timestamps(&[1, 3, 2], 60_000_000_000);
        assert!(result.errors()[0].contains("index 2"));
    }

    #[test]
    fn test_validate_timestamps_gap() {
        let result = validate_timestamps(&[0, 120_000_000_000], 60_000_000_000);
        assert!(result.has_warnings());
        assert!(!result.has_errors());
    }
}
