//! Result Export Module
//!
//! Writes a pipeline run to a directory for plotting and downstream analysis.
//!
//! # Files
//!
//! | File | Content |
//! |------|---------|
//! | `coefficients.csv` | `horizon,target,source,coefficient` |
//! | `scatter.csv` | `horizon,symbol,self_impact,cross_impact` |
//! | `integrated_ofi.npy` | `[grid, sources]`, `NaN` where undefined |
//! | `returns.npy` | `[grid, targets]`, `NaN` where undefined |
//! | `timestamps.npy` | `[grid]` nanoseconds, `i64` |
//! | `metadata.json` | symbols, horizons, per-fit summaries, PCA diagnostics, config |
//!
//! # Example
//!
//! ```ignore
//! use cross_impact::export::ResultExporter;
//!
//! let exporter = ResultExporter::new("out/run1");
//! let summary = exporter.export(&output, pipeline.config())?;
//! println!("wrote {} coefficients", summary.coefficient_rows);
//! ```

use crate::config::PipelineConfig;
use crate::design::AlignedPanel;
use crate::error::{CrossImpactError, Result};
use crate::estimator::FitOutcome;
use crate::integration::PcaDiagnostics;
use crate::pipeline::PipelineOutput;
use ndarray::{Array1, Array2};
use ndarray_npy::WriteNpyExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Summary of one (horizon, target) outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitRecord {
    pub horizon: usize,
    pub target: String,

    /// `"fitted"` or `"skipped"`
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub intercept: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_squared: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_score: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_rows: Option<usize>,

    /// Skip reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&FitOutcome> for FitRecord {
    fn from(outcome: &FitOutcome) -> Self {
        match outcome {
            FitOutcome::Fitted(fit) => Self {
                horizon: fit.horizon,
                target: fit.target.clone(),
                status: "fitted".to_string(),
                alpha: Some(fit.alpha),
                intercept: Some(fit.intercept),
                r_squared: fit.r_squared,
                cv_score: fit.cv_score,
                n_rows: Some(fit.n_rows),
                reason: None,
            },
            FitOutcome::Skipped {
                horizon,
                target,
                reason,
            } => Self {
                horizon: *horizon,
                target: target.clone(),
                status: "skipped".to_string(),
                alpha: None,
                intercept: None,
                r_squared: None,
                cv_score: None,
                n_rows: None,
                reason: Some(reason.to_string()),
            },
        }
    }
}

/// Run metadata written to `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Column order of `integrated_ofi.npy`
    pub sources: Vec<String>,

    /// Column order of `returns.npy`
    pub targets: Vec<String>,

    pub horizons: Vec<usize>,

    /// Grid length (rows of the `.npy` panels)
    pub grid_len: usize,

    pub fits: Vec<FitRecord>,

    pub pca: Vec<PcaDiagnostics>,

    /// `(symbol, reason)` for instruments with an undefined stage
    pub undefined_instruments: Vec<(String, String)>,

    pub config: PipelineConfig,

    /// Export timestamp
    pub export_timestamp: String,
}

/// What was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub output_dir: PathBuf,
    pub coefficient_rows: usize,
    pub scatter_rows: usize,
    pub grid_len: usize,
}

/// Writes [`PipelineOutput`] to CSV, NumPy and JSON files.
pub struct ResultExporter {
    output_dir: PathBuf,
}

impl ResultExporter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every file of a run.
    pub fn export(&self, output: &PipelineOutput, config: &PipelineConfig) -> Result<ExportSummary> {
        fs::create_dir_all(&self.output_dir)?;

        let coefficient_rows = self.write_csv("coefficients.csv", &output.model.coefficient_table())?;
        let scatter_rows = self.write_csv("scatter.csv", &output.model.scatter_table())?;

        self.write_panel(&output.panel)?;

        let metadata = ExportMetadata {
            sources: output.panel.sources().to_vec(),
            targets: output.panel.targets().to_vec(),
            horizons: output.model.horizons(),
            grid_len: output.panel.len(),
            fits: output.model.outcomes().map(FitRecord::from).collect(),
            pca: output
                .instruments
                .iter()
                .filter_map(|i| i.integration.defined().map(|x| x.diagnostics.clone()))
                .collect(),
            undefined_instruments: output
                .undefined_instruments()
                .into_iter()
                .map(|(symbol, reason)| (symbol.to_string(), reason.to_string()))
                .collect(),
            config: config.clone(),
            export_timestamp: chrono::Utc::now().to_rfc3339(),
        };
        self.write_metadata(&metadata)?;

        log::info!(
            "exported {coefficient_rows} coefficients, {scatter_rows} scatter rows, {} grid steps to {}",
            output.panel.len(),
            self.output_dir.display()
        );

        Ok(ExportSummary {
            output_dir: self.output_dir.clone(),
            coefficient_rows,
            scatter_rows,
            grid_len: output.panel.len(),
        })
    }

    fn write_csv<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<usize> {
        let path = self.output_dir.join(name);
        let mut writer = csv::Writer::from_path(&path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(rows.len())
    }

    /// Panels as `[grid, symbols]` with `NaN` for undefined.
    fn write_panel(&self, panel: &AlignedPanel) -> Result<()> {
        self.write_matrix("integrated_ofi.npy", panel.ofi_columns(), panel.len())?;
        self.write_matrix("returns.npy", panel.return_columns(), panel.len())?;

        let timestamps = Array1::from_vec(panel.timestamps().to_vec());
        let mut file = File::create(self.output_dir.join("timestamps.npy"))?;
        timestamps
            .write_npy(&mut file)
            .map_err(|e| CrossImpactError::Io(format!("Failed to write timestamps.npy: {e}")))?;
        Ok(())
    }

    fn write_matrix(&self, name: &str, columns: &[Vec<Option<f64>>], rows: usize) -> Result<()> {
        let array = Array2::from_shape_fn((rows, columns.len()), |(t, j)| {
            columns[j][t].unwrap_or(f64::NAN)
        });
        let mut file = File::create(self.output_dir.join(name))?;
        array
            .write_npy(&mut file)
            .map_err(|e| CrossImpactError::Io(format!("Failed to write {name}: {e}")))?;
        Ok(())
    }

    fn write_metadata(&self, metadata: &ExportMetadata) -> Result<()> {
        let file = File::create(self.output_dir.join("metadata.json"))?;
        serde_json::to_writer_pretty(file, metadata)
            .map_err(|e| CrossImpactError::Io(format!("Failed to write metadata: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::DesignColumn;
    use crate::estimator::{CoefficientMatrix, CrossImpactFit, CrossImpactModel};
    use crate::features::{ReturnSeries, SeriesProvenance};
    use crate::integration::IntegratedOfiSeries;
    use ndarray_npy::ReadNpyExt;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn output() -> PipelineOutput {
        let ofi = vec![
            IntegratedOfiSeries::new("A", vec![1, 2, 3], vec![None, Some(1.0), Some(2.0)]),
            IntegratedOfiSeries::new("B", vec![1, 2, 3], vec![None, Some(-1.0), None]),
        ];
        let returns = vec![ReturnSeries {
            symbol: "A".to_string(),
            timestamps: vec![1, 2, 3],
            mid_prices: vec![Some(1.0); 3],
            returns: vec![None, Some(0.01), Some(-0.02)],
            provenance: SeriesProvenance::default(),
        }];
        let panel = AlignedPanel::new(&ofi, &returns).unwrap();

        let fit = CrossImpactFit {
            horizon: 0,
            target: "A".to_string(),
            columns: ["A", "B"]
                .iter()
                .map(|s| DesignColumn {
                    source: s.to_string(),
                    lag: 0,
                })
                .collect(),
            coefficients: vec![0.4, -0.1],
            intercept: 0.0,
            alpha: 1e-3,
            r_squared: Some(0.3),
            cv_score: Some(1e-4),
            n_rows: 2,
            converged: true,
        };
        let mut outcomes = BTreeMap::new();
        outcomes.insert("A".to_string(), FitOutcome::Fitted(fit));
        let mut model = CrossImpactModel::default();
        model.matrices.insert(
            0,
            CoefficientMatrix {
                horizon: 0,
                sources: vec!["A".into(), "B".into()],
                outcomes,
            },
        );
        model.matrices.insert(
            1,
            CoefficientMatrix {
                horizon: 1,
                sources: vec!["A".into(), "B".into()],
                outcomes: [(
                    "A".to_string(),
                    FitOutcome::Skipped {
                        horizon: 1,
                        target: "A".to_string(),
                        reason: CrossImpactError::InsufficientData {
                            context: "A at horizon 1".into(),
                            available: 1,
                            required: 10,
                        },
                    },
                )]
                .into_iter()
                .collect(),
            },
        );

        PipelineOutput {
            instruments: Vec::new(),
            panel,
            model,
        }
    }

    #[test]
    fn test_export_writes_all_files() {
        let dir = tempdir().unwrap();
        let exporter = ResultExporter::new(dir.path().join("run"));
        let summary = exporter.export(&output(), &PipelineConfig::default()).unwrap();

        assert_eq!(summary.coefficient_rows, 2);
        assert_eq!(summary.scatter_rows, 1);
        assert_eq!(summary.grid_len, 3);
        for name in [
            "coefficients.csv",
            "scatter.csv",
            "integrated_ofi.npy",
            "returns.npy",
            "timestamps.npy",
            "metadata.json",
        ] {
            assert!(exporter.output_dir().join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn test_coefficient_csv_content() {
        let dir = tempdir().unwrap();
        let exporter = ResultExporter::new(dir.path());
        exporter.export(&output(), &PipelineConfig::default()).unwrap();

        let content = fs::read_to_string(dir.path().join("coefficients.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "horizon,target,source,coefficient");
        assert_eq!(lines[1], "0,A,A,0.4");
        assert_eq!(lines[2], "0,A,B,-0.1");

        let scatter = fs::read_to_string(dir.path().join("scatter.csv")).unwrap();
        assert!(scatter.contains("0,A,0.4,0.1"));
    }

    #[test]
    fn test_panel_npy_uses_nan_for_missing() {
        let dir = tempdir().unwrap();
        ResultExporter::new(dir.path())
            .export(&output(), &PipelineConfig::default())
            .unwrap();

        let file = File::open(dir.path().join("integrated_ofi.npy")).unwrap();
        let ofi = Array2::<f64>::read_npy(file).unwrap();
        assert_eq!(ofi.dim(), (3, 2));
        assert!(ofi[[0, 0]].is_nan());
        assert_eq!(ofi[[1, 0]], 1.0);
        assert!(ofi[[2, 1]].is_nan());

        let file = File::open(dir.path().join("timestamps.npy")).unwrap();
        let ts = Array1::<i64>::read_npy(file).unwrap();
        assert_eq!(ts.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_metadata_round_trip() {
        let dir = tempdir().unwrap();
        ResultExporter::new(dir.path())
            .export(&output(), &PipelineConfig::default())
            .unwrap();

        let file = File::open(dir.path().join("metadata.json")).unwrap();
        let metadata: ExportMetadata = serde_json::from_reader(file).unwrap();
        assert_eq!(metadata.sources, vec!["A", "B"]);
        assert_eq!(metadata.targets, vec!["A"]);
        assert_eq!(metadata.horizons, vec![0, 1]);
        assert_eq!(metadata.fits.len(), 2);
        assert_eq!(metadata.fits[1].status, "skipped");
        assert!(metadata.fits[1].reason.as_ref().unwrap().contains("Insufficient"));
        assert_eq!(metadata.config, PipelineConfig::default());
    }
}
