//! Unsupervised anomaly detection over the transaction feature matrix

use crate::config::DetectionConfig;
use crate::error::{AnalysisError, Result};
use crate::feature_extractor::FeatureVector;
use crate::models::isolation_forest::IsolationForest;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

/// Labels and scores for one batch
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    /// Outlier flag per row, input order
    pub labels: Vec<bool>,
    /// Anomaly score per row (higher = more isolated)
    pub scores: Vec<f64>,
    /// Rows scoring strictly above this are outliers
    pub threshold: f64,
}

impl DetectionOutcome {
    pub fn outlier_count(&self) -> usize {
        self.labels.iter().filter(|&&flag| flag).count()
    }
}

/// Fits an isolation forest on the batch and labels its low-density tail.
///
/// The model is fitted and scored on the same rows; it never sees the
/// ground-truth labels.
pub struct AnomalyDetector {
    config: DetectionConfig,
}

impl AnomalyDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Fit the forest on `features` and label every row.
    pub fn fit_predict(&self, features: &[FeatureVector]) -> Result<DetectionOutcome> {
        let contamination = self.config.contamination;
        if !(contamination > 0.0 && contamination <= 0.5) {
            return Err(AnalysisError::invalid_config(format!(
                "contamination must be in (0, 0.5], got {}",
                contamination
            )));
        }
        if self.config.n_estimators == 0 || self.config.max_samples == 0 {
            return Err(AnalysisError::invalid_config(
                "n_estimators and max_samples must be positive",
            ));
        }

        let min_rows = self.config.min_samples.max(1);
        if features.len() < min_rows {
            return Err(AnalysisError::model_fit(format!(
                "{} rows, need at least {}",
                features.len(),
                min_rows
            )));
        }

        if let Some(row) = features
            .iter()
            .position(|f| f.iter().any(|v| !v.is_finite()))
        {
            return Err(AnalysisError::data_format(format!(
                "feature row {} contains a non-finite value",
                row
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let forest = IsolationForest::fit(
            features,
            self.config.n_estimators,
            self.config.max_samples,
            &mut rng,
        );
        debug!(
            trees = forest.tree_count(),
            sample_size = forest.sample_size(),
            "Isolation forest fitted"
        );

        let scores = forest.score_all(features);
        let threshold = quantile(&scores, 1.0 - contamination);
        let labels: Vec<bool> = scores.iter().map(|&s| s > threshold).collect();

        let outcome = DetectionOutcome {
            labels,
            scores,
            threshold,
        };

        info!(
            rows = features.len(),
            outliers = outcome.outlier_count(),
            threshold = outcome.threshold,
            "Anomaly detection complete"
        );

        Ok(outcome)
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}

/// Linear-interpolated quantile, `q` in [0, 1]. `values` must be non-empty.
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn batch(rows: usize, outliers: &[FeatureVector]) -> Vec<FeatureVector> {
        let mut rng = StdRng::seed_from_u64(3);
        let mut features: Vec<FeatureVector> = (0..rows)
            .map(|_| {
                [
                    rng.gen_range(1.0..100.0),
                    rng.gen_range(0.0..0.002),
                    rng.gen_range(0.0..0.002),
                ]
            })
            .collect();
        features.extend_from_slice(outliers);
        features
    }

    #[test]
    fn test_quantile() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 5.0);
        assert_eq!(quantile(&values, 0.5), 3.0);
        assert!((quantile(&values, 0.9) - 4.6).abs() < 1e-12);
    }

    #[test]
    fn test_flags_contamination_share() {
        let features = batch(999, &[[25_000.0, 0.9, 0.3]]);
        let outcome = AnomalyDetector::default().fit_predict(&features).unwrap();

        assert_eq!(outcome.labels.len(), 1000);
        // At most 1% of 1000 rows sit strictly above the interpolated cutoff
        let count = outcome.outlier_count();
        assert!(count >= 1 && count <= 10, "unexpected outlier count {}", count);
        assert!(outcome.labels[999]);
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let features = batch(300, &[[9_000.0, 0.5, 0.1]]);
        let detector = AnomalyDetector::default();
        let a = detector.fit_predict(&features).unwrap();
        let b = detector.fit_predict(&features).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.scores, b.scores);
    }

    #[test]
    fn test_single_row_is_inlier() {
        let outcome = AnomalyDetector::default()
            .fit_predict(&[[10.0, 1.0, 0.5]])
            .unwrap();
        assert_eq!(outcome.labels, vec![false]);
    }

    #[test]
    fn test_too_few_rows() {
        let err = AnomalyDetector::default().fit_predict(&[]).unwrap_err();
        assert!(matches!(err, AnalysisError::ModelFit(_)));

        let detector = AnomalyDetector::new(DetectionConfig {
            min_samples: 5,
            ..DetectionConfig::default()
        });
        let err = detector.fit_predict(&batch(3, &[])).unwrap_err();
        assert!(matches!(err, AnalysisError::ModelFit(_)));
    }

    #[test]
    fn test_non_finite_feature() {
        let err = AnomalyDetector::default()
            .fit_predict(&[[1.0, 0.0, 0.0], [f64::NAN, 0.0, 0.0]])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DataFormat(_)));
    }

    #[test]
    fn test_invalid_contamination() {
        let detector = AnomalyDetector::new(DetectionConfig {
            contamination: 0.9,
            ..DetectionConfig::default()
        });
        let err = detector.fit_predict(&batch(10, &[])).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig(_)));
    }
}
