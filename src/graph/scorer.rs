//! Structural scoring: degree centrality and PageRank

use super::builder::RelationshipGraph;
use crate::config::GraphConfig;
use crate::types::transaction::CounterpartyId;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Per-node structural scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeScore {
    pub node_id: CounterpartyId,
    /// Fraction of the other nodes this node is adjacent to
    pub degree_centrality: f64,
    pub page_rank: f64,
}

/// Scores for every node of one graph
#[derive(Debug, Clone, Default)]
pub struct StructuralScores {
    scores: HashMap<CounterpartyId, NodeScore>,
    /// PageRank iterations performed
    pub iterations: u32,
    /// Whether PageRank met the tolerance before the iteration cap
    pub converged: bool,
}

impl StructuralScores {
    pub fn get(&self, node: CounterpartyId) -> Option<&NodeScore> {
        self.scores.get(&node)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeScore> {
        self.scores.values()
    }
}

/// Computes degree centrality and PageRank over a relationship graph.
pub struct StructuralScorer {
    config: GraphConfig,
}

impl StructuralScorer {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, graph: &RelationshipGraph) -> StructuralScores {
        if graph.is_empty() {
            return StructuralScores {
                converged: true,
                ..StructuralScores::default()
            };
        }

        let nodes: Vec<CounterpartyId> = graph.nodes().collect();
        let (ranks, iterations, converged) = self.page_rank(graph, &nodes);

        if !converged {
            warn!(
                iterations,
                nodes = nodes.len(),
                "PageRank did not converge, using last iterate"
            );
        }

        let scores = nodes
            .iter()
            .zip(ranks)
            .map(|(&node_id, page_rank)| {
                let score = NodeScore {
                    node_id,
                    degree_centrality: degree_centrality(graph, node_id, nodes.len()),
                    page_rank,
                };
                (node_id, score)
            })
            .collect();

        debug!(nodes = nodes.len(), iterations, converged, "Structural scores computed");

        StructuralScores {
            scores,
            iterations,
            converged,
        }
    }

    /// Weighted power iteration with uniform teleport.
    ///
    /// Transition probability along an edge is its weight over the node's
    /// total incident weight. Nodes with no positive incident weight are
    /// dangling and spread their mass uniformly.
    fn page_rank(
        &self,
        graph: &RelationshipGraph,
        nodes: &[CounterpartyId],
    ) -> (Vec<f64>, u32, bool) {
        let n = nodes.len();
        let n_f = n as f64;
        let d = self.config.damping;

        let index: HashMap<CounterpartyId, usize> =
            nodes.iter().enumerate().map(|(i, &node)| (node, i)).collect();

        // Negative amounts carry no walk probability. Weights are scaled by
        // the node's largest weight so their sum cannot overflow.
        let links: Vec<Vec<(usize, f64)>> = nodes
            .iter()
            .map(|&node| {
                let raw: Vec<(usize, f64)> = graph
                    .incident(node)
                    .map(|(neighbor, attrs)| (index[&neighbor], attrs.weight.max(0.0)))
                    .collect();
                let largest = raw.iter().fold(0.0_f64, |m, &(_, w)| m.max(w));
                if largest > 0.0 {
                    raw.into_iter().map(|(j, w)| (j, w / largest)).collect()
                } else {
                    raw
                }
            })
            .collect();
        let out_weight: Vec<f64> = links
            .iter()
            .map(|l| l.iter().map(|&(_, w)| w).sum())
            .collect();

        let mut scores = vec![1.0 / n_f; n];
        let mut next = vec![0.0; n];

        for iteration in 1..=self.config.max_iterations {
            let dangling: f64 = (0..n)
                .filter(|&i| out_weight[i] <= 0.0)
                .map(|i| scores[i])
                .sum();
            let base = (1.0 - d) / n_f + d * dangling / n_f;
            next.iter_mut().for_each(|x| *x = base);

            for (i, node_links) in links.iter().enumerate() {
                if out_weight[i] <= 0.0 {
                    continue;
                }
                let share = d * scores[i] / out_weight[i];
                for &(j, w) in node_links {
                    next[j] += share * w;
                }
            }

            let err: f64 = next
                .iter()
                .zip(&scores)
                .map(|(a, b)| (a - b).abs())
                .sum();
            std::mem::swap(&mut scores, &mut next);

            if err < n_f * self.config.tolerance {
                return (scores, iteration, true);
            }
        }

        (scores, self.config.max_iterations, false)
    }
}

impl Default for StructuralScorer {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

/// `degree / (N - 1)`, counting distinct other neighbors; 0 when N <= 1.
fn degree_centrality(graph: &RelationshipGraph, node: CounterpartyId, n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    graph.distinct_neighbors(node) as f64 / (n - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::TransactionRecord;

    fn graph_of(rows: &[(f64, u64, u64)]) -> RelationshipGraph {
        let records: Vec<_> = rows
            .iter()
            .map(|&(amount, s, r)| TransactionRecord::new(amount, s, r, false))
            .collect();
        RelationshipGraph::from_records(&records)
    }

    fn rank_sum(scores: &StructuralScores) -> f64 {
        scores.iter().map(|s| s.page_rank).sum()
    }

    #[test]
    fn test_empty_graph() {
        let scores = StructuralScorer::default().score(&RelationshipGraph::new());
        assert!(scores.is_empty());
    }

    #[test]
    fn test_single_node() {
        let scores = StructuralScorer::default().score(&graph_of(&[(5.0, 7, 7)]));
        let node = scores.get(7).unwrap();
        assert_eq!(node.degree_centrality, 0.0);
        assert!((node.page_rank - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_star_centrality() {
        let graph = graph_of(&[(1.0, 1, 2), (1.0, 1, 3), (1.0, 1, 4)]);
        let scores = StructuralScorer::default().score(&graph);

        assert_eq!(scores.get(1).unwrap().degree_centrality, 1.0);
        assert!((scores.get(2).unwrap().degree_centrality - 1.0 / 3.0).abs() < 1e-12);
        assert!(scores.get(1).unwrap().page_rank > scores.get(2).unwrap().page_rank);
        assert!((rank_sum(&scores) - 1.0).abs() < 1e-6);
        assert!(scores.converged);
    }

    #[test]
    fn test_self_loop_keeps_centrality_in_range() {
        let graph = graph_of(&[(1.0, 1, 2), (3.0, 1, 1)]);
        let scores = StructuralScorer::default().score(&graph);
        for score in scores.iter() {
            assert!((0.0..=1.0).contains(&score.degree_centrality));
        }
        assert!((rank_sum(&scores) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_disconnected_graph_sums_to_one() {
        let graph = graph_of(&[(10.0, 1, 2), (250.0, 3, 4), (1.0, 4, 5), (0.0, 6, 7)]);
        let scores = StructuralScorer::default().score(&graph);

        assert_eq!(scores.len(), 7);
        assert!((rank_sum(&scores) - 1.0).abs() < 1e-6);
        for score in scores.iter() {
            assert!(score.page_rank > 0.0 && score.page_rank <= 1.0);
        }
        // Symmetric pair
        let (a, b) = (scores.get(1).unwrap(), scores.get(2).unwrap());
        assert!((a.page_rank - b.page_rank).abs() < 1e-9);
    }

    #[test]
    fn test_huge_amounts_keep_rank_mass() {
        let graph = graph_of(&[(1e308, 1, 2), (1e308, 1, 3)]);
        let scores = StructuralScorer::default().score(&graph);
        assert!((rank_sum(&scores) - 1.0).abs() < 1e-6);
        assert!(scores.get(1).unwrap().page_rank > scores.get(2).unwrap().page_rank);
    }

    #[test]
    fn test_weight_shifts_rank() {
        let graph = graph_of(&[(1.0, 1, 2), (100.0, 1, 3)]);
        let scores = StructuralScorer::default().score(&graph);
        assert!(scores.get(3).unwrap().page_rank > scores.get(2).unwrap().page_rank);
    }

    #[test]
    fn test_iteration_cap() {
        let scorer = StructuralScorer::new(GraphConfig {
            max_iterations: 1,
            tolerance: 1e-15,
            ..GraphConfig::default()
        });
        let scores = scorer.score(&graph_of(&[(1.0, 1, 2), (1.0, 1, 3)]));
        assert!(!scores.converged);
        assert_eq!(scores.iterations, 1);
        assert!((rank_sum(&scores) - 1.0).abs() < 1e-9);
    }
}
