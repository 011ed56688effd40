//! Analysis result document returned to callers

use super::transaction::CounterpartyId;
use serde::{Deserialize, Serialize};

/// The full analysis of one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: Summary,
    pub graph: GraphView,
    pub anomalies: Vec<AnomalyDetail>,
}

impl AnalysisResult {
    /// Result for a batch with no rows
    pub fn empty() -> Self {
        Self {
            summary: Summary::default(),
            graph: GraphView::default(),
            anomalies: Vec::new(),
        }
    }
}

/// Batch-level counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_transactions: usize,
    pub fraudulent_transactions: usize,
    pub detected_anomalies: usize,
}

/// Renderable relationship graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeView {
    pub source: String,
    pub target: String,
    /// Amount of the last row seen for this pair
    pub weight: f64,
    /// Any row for this pair was flagged by the detector
    pub anomaly: bool,
    /// Any row for this pair carries the fraud label
    pub fraud: bool,
}

/// A row flagged as an outlier, keyed by the input column names
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDetail {
    #[serde(rename = "Sender")]
    pub sender_id: CounterpartyId,
    #[serde(rename = "Receiver")]
    pub receiver_id: CounterpartyId,
    #[serde(rename = "Amount")]
    pub amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_shape() {
        let result = AnalysisResult {
            summary: Summary {
                total_transactions: 1,
                fraudulent_transactions: 0,
                detected_anomalies: 1,
            },
            graph: GraphView {
                nodes: vec![
                    NodeView { id: "1000".to_string() },
                    NodeView { id: "2000".to_string() },
                ],
                edges: vec![EdgeView {
                    source: "1000".to_string(),
                    target: "2000".to_string(),
                    weight: 10.0,
                    anomaly: true,
                    fraud: false,
                }],
            },
            anomalies: vec![AnomalyDetail {
                sender_id: 1000,
                receiver_id: 2000,
                amount: 10.0,
            }],
        };

        let json = serde_json::to_value(&result).unwrap();
        let top: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(top.len(), 3);
        assert_eq!(json["summary"]["total_transactions"], 1);
        assert_eq!(json["summary"]["detected_anomalies"], 1);
        assert_eq!(json["graph"]["nodes"][0]["id"], "1000");
        assert_eq!(json["graph"]["edges"][0]["weight"], 10.0);
        assert_eq!(json["graph"]["edges"][0]["fraud"], false);
        assert_eq!(json["anomalies"][0]["Sender"], 1000);
        assert_eq!(json["anomalies"][0]["Receiver"], 2000);
        assert_eq!(json["anomalies"][0]["Amount"], 10.0);
        assert!(json["anomalies"][0].get("sender_id").is_none());
    }

    #[test]
    fn test_empty_result() {
        let json = serde_json::to_string(&AnalysisResult::empty()).unwrap();
        assert_eq!(
            json,
            r#"{"summary":{"total_transactions":0,"fraudulent_transactions":0,"detected_anomalies":0},"graph":{"nodes":[],"edges":[]},"anomalies":[]}"#
        );
    }
}
