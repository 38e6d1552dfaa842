use schemaview_core::{Cardinality, NodeId, Relationship};
use std::collections::HashMap;
use std::ops::Index;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(pub usize);

/// A relationship whose endpoints are both visible, resolved to node indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectedEdge {
    pub source_idx: NodeIndex,
    pub target_idx: NodeIndex,
    pub cardinality: Cardinality,
}

impl ProjectedEdge {
    pub fn is_self_loop(&self) -> bool {
        self.source_idx == self.target_idx
    }
}

/// Read-only view of the schema restricted to the visible entities.
///
/// Nodes keep the order they were supplied in; placers rely on that order for
/// stable output. Relationships touching a hidden or unknown entity are left
/// out of the projection.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    nodes: Vec<NodeId>,
    edges: Vec<ProjectedEdge>,
    node_map: HashMap<NodeId, NodeIndex>,
    dropped_edges: usize,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(visible: &[NodeId], relationships: &[Relationship]) -> Self {
        let mut model = Self::new();
        for id in visible {
            model.add_node(id.clone());
        }
        for relationship in relationships {
            model.add_relationship(relationship);
        }
        if model.dropped_edge_count() > 0 {
            tracing::debug!(
                "Skipped {} relationship(s) with an endpoint outside the visible set",
                model.dropped_edge_count()
            );
        }
        model
    }

    /// Adds a node unless it is already present.
    pub fn add_node(&mut self, id: NodeId) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&id) {
            return idx;
        }
        let idx = NodeIndex(self.nodes.len());
        self.node_map.insert(id.clone(), idx);
        self.nodes.push(id);
        idx
    }

    /// Adds a relationship if both endpoints are present. Returns whether it was kept.
    pub fn add_relationship(&mut self, relationship: &Relationship) -> bool {
        match (
            self.index_of(&relationship.from),
            self.index_of(&relationship.to),
        ) {
            (Some(source_idx), Some(target_idx)) => {
                self.edges.push(ProjectedEdge {
                    source_idx,
                    target_idx,
                    cardinality: relationship.cardinality,
                });
                true
            }
            _ => {
                tracing::trace!(
                    "Dropping relationship {} -> {}: endpoint not visible",
                    relationship.from,
                    relationship.to
                );
                self.dropped_edges += 1;
                false
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Relationships left out because an endpoint was not visible.
    pub fn dropped_edge_count(&self) -> usize {
        self.dropped_edges
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[ProjectedEdge] {
        &self.edges
    }

    pub fn index_of(&self, id: &NodeId) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }
}

impl Index<NodeIndex> for GraphModel {
    type Output = NodeId;
    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index.0]
    }
}
