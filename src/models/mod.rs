//! Anomaly detection models

pub mod detector;
pub mod isolation_forest;

pub use detector::{AnomalyDetector, DetectionOutcome};
pub use isolation_forest::IsolationForest;
