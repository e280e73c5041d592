//! Common time grid across instruments.
//!
//! Each instrument's integrated OFI and returns live on its own snapshot
//! timestamps. [`AlignedPanel`] places all of them on the sorted union of
//! timestamps; one grid step is one sampling step. A symbol without a row
//! at a grid timestamp has `None` there, which the design matrix builder
//! treats exactly like a value that is not computable.
//!
//! With resampled input every symbol shares the same clock and the grid is
//! that clock. With raw input the grid interleaves symbols and a lag of `h`
//! means `h` grid steps, not `h` rows of one symbol.

use crate::error::{CrossImpactError, Result};
use crate::features::ReturnSeries;
use crate::integration::IntegratedOfiSeries;
use std::collections::BTreeMap;

/// Integrated OFI and returns of every instrument on one time grid.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPanel {
    timestamps: Vec<i64>,
    sources: Vec<String>,
    targets: Vec<String>,
    ofi: Vec<Vec<Option<f64>>>,
    returns: Vec<Vec<Option<f64>>>,
}

impl AlignedPanel {
    /// Align `ofi` (feature sources) and `returns` (label targets).
    ///
    /// Sources and targets are sorted by symbol. A symbol may be a target
    /// without being a source (its OFI could not be integrated) and vice
    /// versa.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if a symbol appears twice in either input.
    pub fn new(ofi: &[IntegratedOfiSeries], returns: &[ReturnSeries]) -> Result<Self> {
        let mut grid: Vec<i64> = ofi
            .iter()
            .flat_map(|s| s.timestamps.iter().copied())
            .chain(returns.iter().flat_map(|s| s.timestamps.iter().copied()))
            .collect();
        grid.sort_unstable();
        grid.dedup();

        let position: BTreeMap<i64, usize> =
            grid.iter().enumerate().map(|(i, &ts)| (ts, i)).collect();

        let ofi_columns = place_on_grid(
            ofi.iter().map(|s| (&s.symbol, &s.timestamps, &s.values)),
            &position,
            grid.len(),
        )?;
        let return_columns = place_on_grid(
            returns.iter().map(|s| (&s.symbol, &s.timestamps, &s.returns)),
            &position,
            grid.len(),
        )?;

        let (sources, ofi): (Vec<String>, Vec<Vec<Option<f64>>>) = ofi_columns.into_iter().unzip();
        let (targets, returns): (Vec<String>, Vec<Vec<Option<f64>>>) =
            return_columns.into_iter().unzip();

        Ok(Self {
            timestamps: grid,
            sources,
            targets,
            ofi,
            returns,
        })
    }

    /// Grid timestamps, ascending and unique.
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Number of grid steps.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Symbols with integrated OFI, sorted.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Symbols with returns, sorted.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Integrated OFI of source `symbol` on the grid.
    pub fn ofi(&self, symbol: &str) -> Option<&[Option<f64>]> {
        let idx = self.sources.iter().position(|s| s == symbol)?;
        Some(&self.ofi[idx])
    }

    /// Returns of target `symbol` on the grid.
    pub fn returns(&self, symbol: &str) -> Option<&[Option<f64>]> {
        let idx = self.targets.iter().position(|s| s == symbol)?;
        Some(&self.returns[idx])
    }

    /// Integrated OFI of every source, as `[source][grid]`.
    pub fn ofi_columns(&self) -> &[Vec<Option<f64>>] {
        &self.ofi
    }

    /// Returns of every target, as `[target][grid]`.
    pub fn return_columns(&self) -> &[Vec<Option<f64>>] {
        &self.returns
    }

    /// Grid steps at which every source has a defined OFI.
    ///
    /// Zero means no design row can exist at any horizon.
    pub fn complete_source_rows(&self) -> usize {
        if self.ofi.is_empty() {
            return 0;
        }
        (0..self.timestamps.len())
            .filter(|&k| self.ofi.iter().all(|column| column[k].is_some()))
            .count()
    }
}

type Column = (String, Vec<Option<f64>>);

fn place_on_grid<'a>(
    series: impl Iterator<Item = (&'a String, &'a Vec<i64>, &'a Vec<Option<f64>>)>,
    position: &BTreeMap<i64, usize>,
    grid_len: usize,
) -> Result<Vec<Column>> {
    let mut columns: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();

    for (symbol, timestamps, values) in series {
        if columns.contains_key(symbol) {
            return Err(CrossImpactError::config(format!(
                "symbol {symbol} supplied twice to the panel"
            )));
        }

        let mut column = vec![None; grid_len];
        let mut collisions = 0usize;
        for (ts, value) in timestamps.iter().zip(values.iter()) {
            // Every timestamp is in the grid by construction
            if let Some(&k) = position.get(ts) {
                if column[k].is_some() {
                    collisions += 1;
                }
                // Last row at a timestamp wins
                column[k] = value.filter(|v| v.is_finite());
            }
        }
        if collisions > 0 {
            log::warn!("{symbol}: {collisions} values share a grid timestamp; last value kept");
        }

        columns.insert(symbol.clone(), column);
    }

    Ok(columns.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::SeriesProvenance;

    fn returns(symbol: &str, ts: Vec<i64>, values: Vec<Option<f64>>) -> ReturnSeries {
        ReturnSeries {
            symbol: symbol.to_string(),
            mid_prices: vec![Some(1.0); ts.len()],
            timestamps: ts,
            returns: values,
            provenance: SeriesProvenance::default(),
        }
    }

    #[test]
    fn test_union_grid() {
        let ofi = vec![
            IntegratedOfiSeries::new("B", vec![10, 30], vec![Some(1.0), Some(2.0)]),
            IntegratedOfiSeries::new("A", vec![10, 20], vec![None, Some(3.0)]),
        ];
        let rets = vec![returns("A", vec![10, 20], vec![None, Some(0.1)])];
        let panel = AlignedPanel::new(&ofi, &rets).unwrap();

        assert_eq!(panel.timestamps(), &[10, 20, 30]);
        assert_eq!(panel.sources(), &["A".to_string(), "B".to_string()]);
        assert_eq!(panel.targets(), &["A".to_string()]);
        assert_eq!(panel.ofi("A").unwrap(), &[None, Some(3.0), None]);
        assert_eq!(panel.ofi("B").unwrap(), &[Some(1.0), None, Some(2.0)]);
        assert_eq!(panel.returns("A").unwrap(), &[None, Some(0.1), None]);
        assert!(panel.returns("B").is_none());
    }

    #[test]
    fn test_complete_source_rows() {
        let ofi = vec![
            IntegratedOfiSeries::new("A", vec![0, 2, 4], vec![Some(1.0), Some(2.0), Some(3.0)]),
            IntegratedOfiSeries::new("B", vec![1, 2, 3], vec![Some(1.0), Some(2.0), Some(3.0)]),
        ];
        assert_eq!(AlignedPanel::new(&ofi, &[]).unwrap().complete_source_rows(), 1);

        // Interleaved clocks never line up
        let ofi = vec![
            IntegratedOfiSeries::new("A", vec![0, 2], vec![Some(1.0), Some(2.0)]),
            IntegratedOfiSeries::new("B", vec![1, 3], vec![Some(1.0), Some(2.0)]),
        ];
        assert_eq!(AlignedPanel::new(&ofi, &[]).unwrap().complete_source_rows(), 0);
        assert_eq!(AlignedPanel::new(&[], &[]).unwrap().complete_source_rows(), 0);
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let ofi = vec![
            IntegratedOfiSeries::new("A", vec![1], vec![Some(1.0)]),
            IntegratedOfiSeries::new("A", vec![2], vec![Some(1.0)]),
        ];
        assert!(AlignedPanel::new(&ofi, &[]).is_err());
    }

    #[test]
    fn test_non_finite_values_become_missing() {
        let ofi = vec![IntegratedOfiSeries::new("A", vec![1, 2], vec![Some(f64::NAN), Some(1.0)])];
        let panel = AlignedPanel::new(&ofi, &[]).unwrap();
        assert_eq!(panel.ofi("A").unwrap(), &[None, Some(1.0)]);
    }
}
