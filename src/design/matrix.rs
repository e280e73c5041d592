//! Horizon-lagged design matrices.
//!
//! For target instrument `i` and lag `h`, row `k` of the grid pairs
//!
//! ```text
//!     label    r_i(t_k)
//!     features OFI_j(t_{k-h})   for every source j
//! ```
//!
//! A row is emitted only when the label and every feature are defined
//! (inner join). Rows are never filled, carried forward, or imputed.
//!
//! # No Look-Ahead
//!
//! For `h > 0` every feature timestamp is strictly earlier than its label
//! timestamp. For `h = 0` they are equal (contemporaneous impact). Each row
//! records the grid indices it was built from so that
//! [`DesignMatrix::verify_no_leakage`] can re-check this after the fact.
//!
//! Multi-lag matrices place `OFI_j(t_{k-h})` for several lags side by side;
//! every column carries its own lag and the check applies per column.

use crate::design::AlignedPanel;
use crate::error::{CrossImpactError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// One feature column: integrated OFI of `source` lagged by `lag` steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignColumn {
    pub source: String,
    pub lag: usize,
}

impl DesignColumn {
    /// Column label, e.g. `"AAPL_lag3"`.
    pub fn label(&self) -> String {
        format!("{}_lag{}", self.source, self.lag)
    }
}

/// Grid provenance of one design row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowStamp {
    /// Grid index of the label
    pub label_index: usize,

    /// Timestamp of the label
    pub label_ts: i64,

    /// Timestamp of each feature value, in column order
    pub feature_ts: Vec<i64>,
}

/// Regression-ready table for one target.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    /// Target instrument
    pub target: String,

    /// Feature columns, sources sorted by symbol within each lag
    pub columns: Vec<DesignColumn>,

    /// Provenance of each row, ascending in label time
    pub rows: Vec<RowStamp>,

    /// Features, shape `(rows, columns)`
    pub x: Array2<f64>,

    /// Labels, length `rows`
    pub y: Array1<f64>,
}

impl DesignMatrix {
    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of feature columns.
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The lag shared by every column, if there is exactly one.
    pub fn horizon(&self) -> Option<usize> {
        let first = self.columns.first()?.lag;
        self.columns.iter().all(|c| c.lag == first).then_some(first)
    }

    /// Source symbols of the columns, in column order.
    pub fn sources(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.source.as_str()).collect()
    }

    /// Check that no feature comes from the label's future.
    ///
    /// # Errors
    ///
    /// `Generic` naming the first offending row and column.
    pub fn verify_no_leakage(&self) -> Result<()> {
        for (r, stamp) in self.rows.iter().enumerate() {
            if stamp.feature_ts.len() != self.columns.len() {
                return Err(CrossImpactError::generic(format!(
                    "row {r}: {} feature timestamps for {} columns",
                    stamp.feature_ts.len(),
                    self.columns.len()
                )));
            }
            for (column, &ts) in self.columns.iter().zip(stamp.feature_ts.iter()) {
                let ok = if column.lag == 0 {
                    ts == stamp.label_ts
                } else {
                    ts < stamp.label_ts
                };
                if !ok {
                    return Err(CrossImpactError::generic(format!(
                        "look-ahead in {} row {r}: feature {} at {ts}, label at {}",
                        self.target,
                        column.label(),
                        stamp.label_ts
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Builds [`DesignMatrix`] tables from an [`AlignedPanel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DesignMatrixBuilder;

impl DesignMatrixBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Single-horizon table: `r_target(t)` against `OFI_j(t-h)` for all sources.
    pub fn build(&self, panel: &AlignedPanel, horizon: usize, target: &str) -> Result<DesignMatrix> {
        self.build_with_lags(panel, target, &[horizon])
    }

    /// Multi-lag table with one column per (lag, source) pair.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for an unknown target or an empty or duplicated lag
    /// list. `InsufficientData` for a panel without OFI sources.
    pub fn build_with_lags(
        &self,
        panel: &AlignedPanel,
        target: &str,
        lags: &[usize],
    ) -> Result<DesignMatrix> {
        let labels = panel.returns(target).ok_or_else(|| {
            CrossImpactError::config(format!("{target} has no return series in the panel"))
        })?;
        if lags.is_empty() {
            return Err(CrossImpactError::config("at least one lag is required"));
        }
        let mut sorted = lags.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != lags.len() {
            return Err(CrossImpactError::config(format!("duplicate lags in {lags:?}")));
        }
        if panel.sources().is_empty() {
            return Err(CrossImpactError::InsufficientData {
                context: format!("{target}: OFI sources in panel"),
                available: 0,
                required: 1,
            });
        }

        let columns: Vec<DesignColumn> = lags
            .iter()
            .flat_map(|&lag| {
                panel.sources().iter().map(move |s| DesignColumn {
                    source: s.clone(),
                    lag,
                })
            })
            .collect();
        let source_values = panel.ofi_columns();
        let n_sources = source_values.len();
        let grid = panel.timestamps();
        let max_lag = sorted.last().copied().unwrap_or(0);

        let mut rows = Vec::new();
        let mut flat = Vec::new();
        let mut y = Vec::new();

        for k in max_lag..grid.len() {
            let Some(label) = labels[k] else {
                continue;
            };

            let mut features = Vec::with_capacity(columns.len());
            let mut feature_ts = Vec::with_capacity(columns.len());
            for (c, column) in columns.iter().enumerate() {
                let source_k = k - column.lag;
                match source_values[c % n_sources][source_k] {
                    Some(v) => {
                        features.push(v);
                        feature_ts.push(grid[source_k]);
                    }
                    None => break,
                }
            }
            if features.len() != columns.len() {
                continue;
            }

            flat.extend(features);
            y.push(label);
            rows.push(RowStamp {
                label_index: k,
                label_ts: grid[k],
                feature_ts,
            });
        }

        let x = Array2::from_shape_vec((rows.len(), columns.len()), flat)
            .map_err(|e| CrossImpactError::generic(e.to_string()))?;

        log::debug!(
            "design matrix {target} lags {lags:?}: {} rows x {} columns from {} grid steps",
            rows.len(),
            columns.len(),
            grid.len()
        );

        Ok(DesignMatrix {
            target: target.to_string(),
            columns,
            rows,
            x,
            y: Array1::from(y),
        })
    }

    /// One single-horizon table per (horizon, target), horizons outermost.
    pub fn build_all(
        &self,
        panel: &AlignedPanel,
        horizons: &[usize],
    ) -> Result<Vec<DesignMatrix>> {
        let mut out = Vec::with_capacity(horizons.len() * panel.targets().len());
        for &h in horizons {
            for target in panel.targets() {
                out.push(self.build(panel, h, target)?);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{ReturnSeries, SeriesProvenance};
    use crate::integration::IntegratedOfiSeries;

    fn returns(symbol: &str, ts: Vec<i64>, values: Vec<Option<f64>>) -> ReturnSeries {
        ReturnSeries {
            symbol: symbol.to_string(),
            mid_prices: vec![Some(1.0); ts.len()],
            timestamps: ts,
            returns: values,
            provenance: SeriesProvenance::default(),
        }
    }

    fn two_symbol_panel() -> AlignedPanel {
        let ts = vec![0, 1, 2, 3, 4];
        let ofi = vec![
            IntegratedOfiSeries::new(
                "A",
                ts.clone(),
                vec![None, Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            ),
            IntegratedOfiSeries::new(
                "B",
                ts.clone(),
                vec![None, Some(10.0), None, Some(30.0), Some(40.0)],
            ),
        ];
        let rets = vec![
            returns("A", ts.clone(), vec![None, Some(0.1), Some(0.2), Some(0.3), Some(0.4)]),
            returns("B", ts, vec![None, Some(1.0), Some(2.0), Some(3.0), None]),
        ];
        AlignedPanel::new(&ofi, &rets).unwrap()
    }

    #[test]
    fn test_contemporaneous_inner_join() {
        let panel = two_symbol_panel();
        let m = DesignMatrixBuilder::new().build(&panel, 0, "A").unwrap();

        // Row 2 dropped: B's OFI missing
        assert_eq!(m.n_rows(), 3);
        assert_eq!(m.rows.iter().map(|r| r.label_ts).collect::<Vec<_>>(), vec![1, 3, 4]);
        assert_eq!(m.x.row(1).to_vec(), vec![3.0, 30.0]);
        assert_eq!(m.y.to_vec(), vec![0.1, 0.3, 0.4]);
        assert_eq!(m.horizon(), Some(0));
        m.verify_no_leakage().unwrap();
    }

    #[test]
    fn test_lagged_rows_use_past_features() {
        let panel = two_symbol_panel();
        let m = DesignMatrixBuilder::new().build(&panel, 1, "A").unwrap();

        // k=2 uses k-1=1 (A=1, B=10); k=3 uses k-1=2 (B missing); k=4 uses 3
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.x.row(0).to_vec(), vec![1.0, 10.0]);
        assert_eq!(m.y[0], 0.2);
        assert_eq!(m.x.row(1).to_vec(), vec![3.0, 30.0]);
        assert_eq!(m.y[1], 0.4);

        for row in &m.rows {
            assert!(row.feature_ts.iter().all(|&ts| ts < row.label_ts));
        }
        m.verify_no_leakage().unwrap();
    }

    #[test]
    fn test_missing_label_excluded() {
        let panel = two_symbol_panel();
        let m = DesignMatrixBuilder::new().build(&panel, 0, "B").unwrap();
        // Label missing at 4, B's OFI missing at 2
        assert_eq!(m.rows.iter().map(|r| r.label_ts).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_horizon_beyond_series() {
        let panel = two_symbol_panel();
        let m = DesignMatrixBuilder::new().build(&panel, 10, "A").unwrap();
        assert!(m.is_empty());
        assert_eq!(m.x.dim(), (0, 2));
    }

    #[test]
    fn test_multi_lag_columns() {
        let panel = two_symbol_panel();
        let m = DesignMatrixBuilder::new()
            .build_with_lags(&panel, "A", &[0, 1])
            .unwrap();

        let labels: Vec<String> = m.columns.iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["A_lag0", "B_lag0", "A_lag1", "B_lag1"]);
        assert_eq!(m.horizon(), None);
        // Only k=4 has all four values defined
        assert_eq!(m.n_rows(), 1);
        assert_eq!(m.x.row(0).to_vec(), vec![4.0, 40.0, 3.0, 30.0]);
        m.verify_no_leakage().unwrap();
    }

    #[test]
    fn test_tampered_row_is_flagged() {
        let panel = two_symbol_panel();
        let mut m = DesignMatrixBuilder::new().build(&panel, 1, "A").unwrap();
        m.rows[0].feature_ts[1] = m.rows[0].label_ts;
        assert!(m.verify_no_leakage().is_err());
    }

    #[test]
    fn test_unknown_target_and_bad_lags() {
        let panel = two_symbol_panel();
        let builder = DesignMatrixBuilder::new();
        assert!(builder.build(&panel, 0, "ZZZ").is_err());
        assert!(builder.build_with_lags(&panel, "A", &[]).is_err());
        assert!(builder.build_with_lags(&panel, "A", &[1, 1]).is_err());
    }

    #[test]
    fn test_no_sources_is_not_fatal() {
        let ts = vec![0, 1, 2];
        let rets = vec![returns("A", ts, vec![None, Some(0.1), Some(0.2)])];
        let panel = AlignedPanel::new(&[], &rets).unwrap();

        let err = DesignMatrixBuilder::new().build(&panel, 0, "A").unwrap_err();
        assert!(matches!(err, CrossImpactError::InsufficientData { available: 0, .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_build_all_order() {
        let panel = two_symbol_panel();
        let all = DesignMatrixBuilder::new().build_all(&panel, &[0, 2]).unwrap();
        let keys: Vec<(Option<usize>, &str)> =
            all.iter().map(|m| (m.horizon(), m.target.as_str())).collect();
        assert_eq!(
            keys,
            vec![(Some(0), "A"), (Some(0), "B"), (Some(2), "A"), (Some(2), "B")]
        );
    }
}
