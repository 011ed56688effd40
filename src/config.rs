//! Configuration management for the fraud graph analysis service

use crate::error::AnalysisError;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject carrying CSV analysis requests
    pub request_subject: String,
    /// Subject for results of requests that carry no reply subject
    pub result_subject: String,
    /// Queue group shared by service instances; unset means every
    /// instance receives every request
    #[serde(default)]
    pub queue_group: Option<String>,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            request_subject: "analysis.requests".to_string(),
            result_subject: "analysis.results".to_string(),
            queue_group: None,
        }
    }
}

/// Record normalization configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizerConfig {
    /// Seed for synthetic counterparty ids
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Inclusive lower bound of synthetic ids
    #[serde(default = "default_id_low")]
    pub id_low: u64,
    /// Exclusive upper bound of synthetic ids
    #[serde(default = "default_id_high")]
    pub id_high: u64,
}

fn default_seed() -> u64 {
    42
}

fn default_id_low() -> u64 {
    1000
}

fn default_id_high() -> u64 {
    5000
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            id_low: default_id_low(),
            id_high: default_id_high(),
        }
    }
}

/// Structural scoring configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// PageRank damping factor
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// PageRank convergence tolerance (per node)
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// PageRank iteration cap
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_damping() -> f64 {
    0.85
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_max_iterations() -> u32 {
    100
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Anomaly detection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Number of isolation trees
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    /// Subsample size per tree (capped at the row count)
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    /// Expected fraction of anomalous rows
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    /// Seed for tree construction
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Minimum number of rows the forest can be fitted on
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

fn default_n_estimators() -> usize {
    100
}

fn default_max_samples() -> usize {
    256
}

fn default_contamination() -> f64 {
    0.01
}

fn default_min_samples() -> usize {
    1
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_samples: default_max_samples(),
            contamination: default_contamination(),
            seed: default_seed(),
            min_samples: default_min_samples(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of requests analyzed concurrently
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> crate::error::Result<()> {
        let n = &self.normalizer;
        if n.id_low >= n.id_high {
            return Err(AnalysisError::invalid_config(format!(
                "normalizer id range [{}, {}) is empty",
                n.id_low, n.id_high
            )));
        }

        let g = &self.graph;
        if !(g.damping > 0.0 && g.damping < 1.0) {
            return Err(AnalysisError::invalid_config(format!(
                "damping must be in (0, 1), got {}",
                g.damping
            )));
        }
        if g.tolerance.is_nan() || g.tolerance <= 0.0 || g.max_iterations == 0 {
            return Err(AnalysisError::invalid_config(
                "pagerank tolerance and max_iterations must be positive",
            ));
        }

        let d = &self.detection;
        if !(d.contamination > 0.0 && d.contamination <= 0.5) {
            return Err(AnalysisError::invalid_config(format!(
                "contamination must be in (0, 0.5], got {}",
                d.contamination
            )));
        }
        if d.n_estimators == 0 || d.max_samples == 0 {
            return Err(AnalysisError::invalid_config(
                "n_estimators and max_samples must be positive",
            ));
        }

        if self.pipeline.workers == 0 {
            return Err(AnalysisError::invalid_config("pipeline.workers must be positive"));
        }

        Ok(())
    }
}
