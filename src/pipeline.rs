//! The analysis pipeline: normalizer, graph builder, structural scorer,
//! feature extractor, anomaly detector and result composer run in sequence
//! over one batch.

use crate::composer::ResultComposer;
use crate::config::AppConfig;
use crate::error::Result;
use crate::feature_extractor::FeatureExtractor;
use crate::graph::{RelationshipGraph, StructuralScorer};
use crate::models::AnomalyDetector;
use crate::normalizer::RecordNormalizer;
use crate::types::result::AnalysisResult;
use crate::types::transaction::TransactionRecord;
use std::io::Read;
use std::time::Instant;
use tracing::{debug, info};

/// Stateless batch pipeline.
///
/// Every call builds its own graph and model, so one pipeline can serve
/// concurrent requests.
pub struct AnalysisPipeline {
    normalizer: RecordNormalizer,
    scorer: StructuralScorer,
    extractor: FeatureExtractor,
    detector: AnomalyDetector,
    composer: ResultComposer,
}

impl AnalysisPipeline {
    /// Create a pipeline from configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            normalizer: RecordNormalizer::new(config.normalizer.clone()),
            scorer: StructuralScorer::new(config.graph.clone()),
            extractor: FeatureExtractor::new(),
            detector: AnomalyDetector::new(config.detection.clone()),
            composer: ResultComposer::new(),
        })
    }

    /// Detector input columns, in feature vector order
    pub fn feature_names(&self) -> Vec<&'static str> {
        self.extractor.feature_names()
    }

    /// Analyze a CSV payload held in memory
    pub fn analyze_bytes(&self, payload: &[u8]) -> Result<AnalysisResult> {
        let records = self.normalizer.normalize_bytes(payload)?;
        self.analyze_records(&records)
    }

    /// Analyze a CSV stream
    pub fn analyze_csv<R: Read>(&self, reader: R) -> Result<AnalysisResult> {
        let records = self.normalizer.normalize_csv(reader)?;
        self.analyze_records(&records)
    }

    /// Analyze already normalized records.
    ///
    /// An empty batch yields an empty result rather than an error.
    pub fn analyze_records(&self, records: &[TransactionRecord]) -> Result<AnalysisResult> {
        if records.is_empty() {
            info!("Empty batch, returning empty analysis");
            return Ok(AnalysisResult::empty());
        }

        let start = Instant::now();

        let graph = RelationshipGraph::from_records(records);
        let scores = self.scorer.score(&graph);
        debug!(
            pagerank_iterations = scores.iterations,
            converged = scores.converged,
            "Graph scored"
        );

        let features = self.extractor.extract_all(records, &scores)?;
        let outcome = self.detector.fit_predict(&features)?;

        let result = self.composer.compose(&graph, records, &outcome.labels);

        info!(
            rows = result.summary.total_transactions,
            nodes = result.graph.nodes.len(),
            edges = result.graph.edges.len(),
            fraudulent = result.summary.fraudulent_transactions,
            anomalies = result.summary.detected_anomalies,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Batch analyzed"
        );

        Ok(result)
    }
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self {
            normalizer: RecordNormalizer::default(),
            scorer: StructuralScorer::default(),
            extractor: FeatureExtractor::default(),
            detector: AnomalyDetector::default(),
            composer: ResultComposer::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::error::AnalysisError;
    use crate::graph::StructuralScores;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn synthetic_csv(rows: usize) -> String {
        let mut rng = StdRng::seed_from_u64(11);
        let mut csv = String::from("Time,Amount,Class\n");
        for i in 0..rows {
            let fraud = rng.gen_bool(0.02);
            let amount: f64 = if fraud {
                rng.gen_range(2_000.0..9_000.0)
            } else {
                rng.gen_range(1.0..250.0)
            };
            csv.push_str(&format!("{},{:.2},{}\n", i, amount, fraud as u8));
        }
        csv
    }

    #[test]
    fn test_single_row_scenario() {
        let csv = "Amount,Class,Sender,Receiver\n10,0,1000,2000\n";
        let result = AnalysisPipeline::default().analyze_bytes(csv.as_bytes()).unwrap();

        assert_eq!(result.summary.total_transactions, 1);
        assert_eq!(result.summary.fraudulent_transactions, 0);
        assert_eq!(result.graph.nodes.len(), 2);
        assert_eq!(result.graph.edges.len(), 1);
        assert_eq!(result.graph.edges[0].weight, 10.0);
        assert!(!result.graph.edges[0].fraud);
    }

    #[test]
    fn test_duplicate_pair_scenario() {
        let csv = "Amount,Class,Sender,Receiver\n10,0,1000,2000\n20,1,1000,2000\n";
        let result = AnalysisPipeline::default().analyze_bytes(csv.as_bytes()).unwrap();

        assert_eq!(result.graph.edges.len(), 1);
        assert_eq!(result.graph.edges[0].weight, 20.0);
        assert!(result.graph.edges[0].fraud);
        assert_eq!(result.summary.fraudulent_transactions, 1);
    }

    #[test]
    fn test_empty_batch_scenario() {
        let result = AnalysisPipeline::default()
            .analyze_bytes("Amount,Class\n".as_bytes())
            .unwrap();

        assert!(result.graph.nodes.is_empty());
        assert!(result.graph.edges.is_empty());
        assert_eq!(result.summary.total_transactions, 0);
        assert!(result.anomalies.is_empty());
    }

    #[test]
    fn test_summary_counts_and_edges() {
        let csv = synthetic_csv(2_000);
        let pipeline = AnalysisPipeline::default();
        let records = pipeline.normalizer.normalize_bytes(csv.as_bytes()).unwrap();
        let result = pipeline.analyze_records(&records).unwrap();

        assert_eq!(result.summary.total_transactions, 2_000);
        assert_eq!(
            result.summary.fraudulent_transactions,
            records.iter().filter(|r| r.is_labeled_fraud).count()
        );
        assert_eq!(result.summary.detected_anomalies, result.anomalies.len());
        assert!(result.summary.detected_anomalies <= 20);

        let pairs: HashSet<_> = records.iter().map(|r| r.unordered_pair()).collect();
        for edge in &result.graph.edges {
            let u: u64 = edge.source.parse().unwrap();
            let v: u64 = edge.target.parse().unwrap();
            assert!(pairs.contains(&(u.min(v), u.max(v))));
        }

        // Any fraud row flags its pair
        for record in records.iter().filter(|r| r.is_labeled_fraud) {
            let (a, b) = record.unordered_pair();
            let edge = result
                .graph
                .edges
                .iter()
                .find(|e| {
                    let u: u64 = e.source.parse().unwrap();
                    let v: u64 = e.target.parse().unwrap();
                    (u.min(v), u.max(v)) == (a, b)
                })
                .unwrap();
            assert!(edge.fraud);
        }
    }

    #[test]
    fn test_structural_invariants_on_batch() {
        let pipeline = AnalysisPipeline::default();
        let records = pipeline
            .normalizer
            .normalize_bytes(synthetic_csv(500).as_bytes())
            .unwrap();
        let graph = RelationshipGraph::from_records(&records);
        let scores: StructuralScores = pipeline.scorer.score(&graph);

        let total: f64 = scores.iter().map(|s| s.page_rank).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(scores
            .iter()
            .all(|s| (0.0..=1.0).contains(&s.degree_centrality)));
    }

    #[test]
    fn test_idempotent() {
        let csv = synthetic_csv(800);
        let pipeline = AnalysisPipeline::default();
        let first = pipeline.analyze_bytes(csv.as_bytes()).unwrap();
        let second = pipeline.analyze_bytes(csv.as_bytes()).unwrap();
        assert_eq!(first, second);

        let rebuilt = AnalysisPipeline::new(&AppConfig::default()).unwrap();
        assert_eq!(first, rebuilt.analyze_bytes(csv.as_bytes()).unwrap());
    }

    #[test]
    fn test_garbled_input_fails_whole_run() {
        let err = AnalysisPipeline::default()
            .analyze_bytes("Amount,Class\n10,0\nten,1\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DataFormat(_)));
    }

    #[test]
    fn test_extreme_finite_amounts() {
        let csv = "Amount,Class,Sender,Receiver\n-1e308,0,1,2\n1e308,0,3,4\n5,0,5,6\n";
        let result = AnalysisPipeline::default().analyze_bytes(csv.as_bytes()).unwrap();
        assert_eq!(result.summary.total_transactions, 3);
        assert_eq!(result.graph.edges.len(), 3);
    }

    #[test]
    fn test_model_fit_error_propagates() {
        let mut config = AppConfig::default();
        config.detection = DetectionConfig {
            min_samples: 10,
            ..DetectionConfig::default()
        };
        let pipeline = AnalysisPipeline::new(&config).unwrap();
        let err = pipeline
            .analyze_bytes("Amount,Class\n10,0\n20,1\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ModelFit(_)));
    }

    #[test]
    fn test_feature_names_match_vector() {
        let names = AnalysisPipeline::default().feature_names();
        assert_eq!(names, vec!["Amount", "Degree_Centrality", "PageRank"]);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.graph.damping = 1.5;
        assert!(AnalysisPipeline::new(&config).is_err());
    }
}
