//! Feature extraction for the anomaly detector.
//!
//! Each transaction row becomes a vector of its amount plus the structural
//! scores of its sender. Receivers and edges contribute nothing, so all rows
//! sharing a sender carry identical structural features.

use crate::error::{AnalysisError, Result};
use crate::graph::StructuralScores;
use crate::types::transaction::TransactionRecord;

/// Per-row detector input
pub type FeatureVector = [f64; 3];

/// Feature extractor that joins rows with their sender's node scores.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract features for one row.
    ///
    /// Order: amount, sender degree centrality, sender PageRank.
    pub fn extract(
        &self,
        record: &TransactionRecord,
        scores: &StructuralScores,
    ) -> Result<FeatureVector> {
        let node = scores.get(record.sender_id).ok_or_else(|| {
            AnalysisError::data_format(format!(
                "sender {} has no structural score",
                record.sender_id
            ))
        })?;

        Ok([record.amount, node.degree_centrality, node.page_rank])
    }

    /// Extract the feature matrix, one row per record in input order.
    pub fn extract_all(
        &self,
        records: &[TransactionRecord],
        scores: &StructuralScores,
    ) -> Result<Vec<FeatureVector>> {
        records.iter().map(|r| self.extract(r, scores)).collect()
    }

    /// Get feature names.
    pub fn feature_names(&self) -> Vec<&'static str> {
        vec!["Amount", "Degree_Centrality", "PageRank"]
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
