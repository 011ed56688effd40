//! Error types for the analysis pipeline

use thiserror::Error;

/// Errors surfaced by a pipeline run.
///
/// A run either completes or fails with exactly one of these; nothing
/// partial is returned and nothing is retried.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Input is missing required columns or carries garbled values
    #[error("data format error: {0}")]
    DataFormat(String),

    /// The feature matrix cannot be fitted by the anomaly detector
    #[error("model fit error: {0}")]
    ModelFit(String),

    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnalysisError {
    pub fn data_format(message: impl Into<String>) -> Self {
        AnalysisError::DataFormat(message.into())
    }

    pub fn model_fit(message: impl Into<String>) -> Self {
        AnalysisError::ModelFit(message.into())
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        AnalysisError::InvalidConfig(message.into())
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        AnalysisError::DataFormat(format!("malformed csv: {}", err))
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, AnalysisError>;
