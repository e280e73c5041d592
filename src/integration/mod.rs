//! Integration of multi-level OFI into one signal per instrument.
//!
//! See [`pca`] for the principal-component integrator.

pub mod pca;

pub use pca::{PcaConfig, PcaDiagnostics, PcaInputMode, PcaIntegrator, PcaProjector};

use crate::features::SeriesProvenance;

/// Integrated OFI of one instrument, aligned with its level-OFI series.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegratedOfiSeries {
    /// Instrument identifier
    pub symbol: String,

    /// Snapshot timestamps
    pub timestamps: Vec<i64>,

    /// Integrated OFI per row (`None` where level OFI was not computable)
    pub values: Vec<Option<f64>>,

    /// Input range and row counts behind the level-OFI series
    pub provenance: SeriesProvenance,
}

impl IntegratedOfiSeries {
    /// Build a series directly from timestamps and values.
    ///
    /// Useful for feeding externally computed signals into the design
    /// matrix builder.
    pub fn new(symbol: impl Into<String>, timestamps: Vec<i64>, values: Vec<Option<f64>>) -> Self {
        let symbol = symbol.into();
        let provenance =
            SeriesProvenance::from_timestamps(&symbol, timestamps.iter().copied(), 0);
        Self {
            symbol,
            timestamps,
            values,
            provenance,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of defined values.
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}
