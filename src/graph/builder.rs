//! Relationship graph construction from transaction rows

use crate::types::transaction::{CounterpartyId, TransactionRecord};
use petgraph::graphmap::UnGraphMap;
use std::collections::HashMap;
use tracing::debug;

/// Attributes carried by a counterparty edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeAttributes {
    /// Amount of the last row seen for the pair
    pub weight: f64,
    /// Fraud label of the last row seen for the pair
    pub fraud_label: bool,
}

/// Undirected counterparty graph.
///
/// One edge per unordered pair; nodes keep first-seen order and each edge
/// is reported from its earlier-seen endpoint.
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    inner: UnGraphMap<CounterpartyId, EdgeAttributes>,
    first_seen: HashMap<CounterpartyId, usize>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold rows in input order. A later row for the same unordered pair
    /// overwrites the edge attributes of earlier ones.
    pub fn from_records(records: &[TransactionRecord]) -> Self {
        let mut graph = Self::new();
        for record in records {
            graph.insert(record);
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Relationship graph built"
        );
        graph
    }

    /// Insert or overwrite the edge for one row.
    pub fn insert(&mut self, record: &TransactionRecord) {
        for id in [record.sender_id, record.receiver_id] {
            let next = self.first_seen.len();
            self.first_seen.entry(id).or_insert(next);
        }
        self.inner.add_edge(
            record.sender_id,
            record.receiver_id,
            EdgeAttributes {
                weight: record.amount,
                fraud_label: record.is_labeled_fraud,
            },
        );
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// Nodes in first-seen order
    pub fn nodes(&self) -> impl Iterator<Item = CounterpartyId> + '_ {
        self.inner.nodes()
    }

    /// Edges as `(u, v, attributes)` with `u` seen no later than `v`
    pub fn edges(
        &self,
    ) -> impl Iterator<Item = (CounterpartyId, CounterpartyId, &EdgeAttributes)> + '_ {
        self.inner.all_edges().map(move |(a, b, attrs)| {
            if self.first_seen.get(&a) <= self.first_seen.get(&b) {
                (a, b, attrs)
            } else {
                (b, a, attrs)
            }
        })
    }

    pub fn edge(&self, a: CounterpartyId, b: CounterpartyId) -> Option<&EdgeAttributes> {
        self.inner.edge_weight(a, b)
    }

    /// Incident edges of `node` as `(neighbor, attributes)`. A self-loop
    /// appears once.
    pub fn incident(
        &self,
        node: CounterpartyId,
    ) -> impl Iterator<Item = (CounterpartyId, &EdgeAttributes)> + '_ {
        self.inner.edges(node).map(|(_, neighbor, attrs)| (neighbor, attrs))
    }

    /// Number of distinct other nodes adjacent to `node`
    pub fn distinct_neighbors(&self, node: CounterpartyId) -> usize {
        self.inner.neighbors(node).filter(|&n| n != node).count()
    }
}
