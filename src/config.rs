//! Pipeline configuration management.
//!
//! One serializable struct covers every stage of a cross-impact run, so an
//! experiment can be reproduced from a single TOML or JSON file.
//!
//! # Features
//!
//! - **Unified Configuration**: levels, horizons, PCA and regression settings
//! - **Serialization**: Save/load configurations to TOML or JSON
//! - **Validation**: Checked on load and when a pipeline is built
//!
//! # Example
//!
//! ```ignore
//! use cross_impact::config::PipelineConfig;
//!
//! let config = PipelineConfig::default();
//! config.save_toml("experiment_config.toml")?;
//!
//! let loaded = PipelineConfig::load_toml("experiment_config.toml")?;
//! let pipeline = CrossImpactPipeline::from_config(loaded)?;
//! ```

use crate::error::{CrossImpactError, Result};
use crate::estimator::RegressionConfig;
use crate::integration::PcaConfig;
use crate::snapshot::DuplicatePolicy;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Unified pipeline configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    /// Book levels used for OFI (columns `*_00` .. `*_{L-1}`)
    pub levels: usize,

    /// Lags in grid steps; 0 is the contemporaneous fit
    pub horizons: Vec<usize>,

    /// Rows sharing a timestamp within one symbol
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Resample every symbol onto buckets of this many nanoseconds.
    ///
    /// `None` keeps raw timestamps, written as `0` in config files. Raw
    /// feeds rarely share timestamps across symbols, so the union grid
    /// then has no row where every source is observed.
    #[serde(default = "default_resample_interval", with = "resample_interval")]
    pub resample_interval_ns: Option<i64>,

    /// PCA integration settings
    #[serde(default)]
    pub pca: PcaConfig,

    /// Lasso and penalty-selection settings
    #[serde(default)]
    pub regression: RegressionConfig,

    /// Experiment metadata (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExperimentMetadata>,
}

/// Experiment metadata for tracking and reproducibility.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExperimentMetadata {
    /// Experiment name
    pub name: String,

    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Version or git commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Custom tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// One-second clock.
pub const DEFAULT_RESAMPLE_INTERVAL_NS: i64 = 1_000_000_000;

fn default_resample_interval() -> Option<i64> {
    Some(DEFAULT_RESAMPLE_INTERVAL_NS)
}

/// `Option<i64>` as a plain integer, `0` for raw timestamps.
mod resample_interval {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.unwrap_or(0))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok((raw != 0).then_some(raw))
    }
}

impl ExperimentMetadata {
    /// Metadata stamped with the current UTC time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            version: None,
            tags: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            levels: 5,
            horizons: vec![0, 1, 5],
            duplicate_policy: DuplicatePolicy::KeepLast,
            resample_interval_ns: default_resample_interval(),
            pca: PcaConfig::default(),
            regression: RegressionConfig::default(),
            metadata: None,
        }
    }
}

impl PipelineConfig {
    /// Create default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set experiment metadata.
    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set PCA configuration.
    pub fn with_pca(mut self, config: PcaConfig) -> Self {
        self.pca = config;
        self
    }

    /// Set regression configuration.
    pub fn with_regression(mut self, config: RegressionConfig) -> Self {
        self.regression = config;
        self
    }

    /// Horizons sorted ascending.
    pub fn sorted_horizons(&self) -> Vec<usize> {
        let mut horizons = self.horizons.clone();
        horizons.sort_unstable();
        horizons
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.levels == 0 {
            return Err(CrossImpactError::config("levels must be at least 1"));
        }
        if self.levels > 100 {
            return Err(CrossImpactError::config(format!(
                "levels must be at most 100 (two-digit column suffix), got {}",
                self.levels
            )));
        }
        if self.horizons.is_empty() {
            return Err(CrossImpactError::config("horizon set is empty"));
        }
        let unique: BTreeSet<usize> = self.horizons.iter().copied().collect();
        if unique.len() != self.horizons.len() {
            return Err(CrossImpactError::config(format!(
                "duplicate horizons in {:?}",
                self.horizons
            )));
        }
        if let Some(interval) = self.resample_interval_ns {
            if interval <= 0 {
                return Err(CrossImpactError::config(format!(
                    "resample_interval_ns must be positive, got {interval}"
                )));
            }
        }
        self.pca.validate().map_err(CrossImpactError::InvalidConfig)?;
        self.regression
            .validate()
            .map_err(CrossImpactError::InvalidConfig)?;
        Ok(())
    }

    /// Save configuration to TOML file.
    ///
    /// # Example
    ///
    /// ```ignore
    /// config.save_toml("configs/experiment1.toml")?;
    /// ```
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).map_err(|e| CrossImpactError::config(e.to_string()))?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load and validate configuration from TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(contents).map_err(|e| CrossImpactError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string =
            serde_json::to_string_pretty(self).map_err(|e| CrossImpactError::config(e.to_string()))?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load and validate configuration from JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig =
            serde_json::from_str(&contents).map_err(|e| CrossImpactError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
