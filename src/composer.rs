//! Result composition: graph, detector labels and ground truth merged into
//! the renderable analysis document.
//!
//! Two merge rules coexist. Edge weights come from the graph, where the last
//! row for a pair wins. Edge flags use set membership over all rows, so a
//! pair is flagged if any of its rows is. The flags of an edge can therefore
//! stem from a different row than its weight.

use crate::graph::RelationshipGraph;
use crate::types::result::{AnalysisResult, AnomalyDetail, EdgeView, GraphView, NodeView, Summary};
use crate::types::transaction::{CounterpartyId, TransactionRecord};
use std::collections::HashSet;

type PairSet = HashSet<(CounterpartyId, CounterpartyId)>;

/// Builds the externally visible result.
pub struct ResultComposer;

impl ResultComposer {
    pub fn new() -> Self {
        Self
    }

    /// `outliers[i]` is the detector label of `records[i]`.
    pub fn compose(
        &self,
        graph: &RelationshipGraph,
        records: &[TransactionRecord],
        outliers: &[bool],
    ) -> AnalysisResult {
        debug_assert_eq!(records.len(), outliers.len());

        let flagged = || records.iter().zip(outliers).filter(|(_, &flag)| flag);

        let anomalous_pairs: PairSet = flagged().map(|(r, _)| r.unordered_pair()).collect();
        let fraud_pairs: PairSet = records
            .iter()
            .filter(|r| r.is_labeled_fraud)
            .map(TransactionRecord::unordered_pair)
            .collect();

        let nodes = graph
            .nodes()
            .map(|id| NodeView { id: id.to_string() })
            .collect();

        let edges = graph
            .edges()
            .map(|(u, v, attrs)| {
                let pair = (u.min(v), u.max(v));
                EdgeView {
                    source: u.to_string(),
                    target: v.to_string(),
                    weight: attrs.weight,
                    anomaly: anomalous_pairs.contains(&pair),
                    fraud: fraud_pairs.contains(&pair),
                }
            })
            .collect();

        let anomalies: Vec<AnomalyDetail> = flagged()
            .map(|(r, _)| AnomalyDetail {
                sender_id: r.sender_id,
                receiver_id: r.receiver_id,
                amount: r.amount,
            })
            .collect();

        AnalysisResult {
            summary: Summary {
                total_transactions: records.len(),
                fraudulent_transactions: records.iter().filter(|r| r.is_labeled_fraud).count(),
                detected_anomalies: anomalies.len(),
            },
            graph: GraphView { nodes, edges },
            anomalies,
        }
    }
}

impl Default for ResultComposer {
    fn default() -> Self {
        Self::new()
    }
}
