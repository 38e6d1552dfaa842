use schemaview_core::{Cardinality, NodeId, Relationship};

pub fn entity_ids(count: usize) -> Vec<NodeId> {
    (0..count).map(|i| NodeId::new(format!("entity_{i}"))).collect()
}

/// `entity_{i+1}` references `entity_{i}`, giving one level per entity.
pub fn dependency_chain(count: usize) -> (Vec<NodeId>, Vec<Relationship>) {
    let nodes = entity_ids(count);
    let relationships = nodes
        .windows(2)
        .map(|pair| Relationship::new(pair[1].clone(), pair[0].clone(), Cardinality::ManyToOne))
        .collect();
    (nodes, relationships)
}

/// Star-of-stars schema: every tenth entity is a hub the next nine reference.
pub fn clustered_schema(count: usize) -> (Vec<NodeId>, Vec<Relationship>) {
    let nodes = entity_ids(count);
    let relationships = nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 10 != 0)
        .map(|(i, id)| Relationship::new(id.clone(), nodes[i - i % 10].clone(), Cardinality::ManyToOne))
        .collect();
    (nodes, relationships)
}
