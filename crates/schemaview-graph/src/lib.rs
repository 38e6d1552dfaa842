pub mod force;
pub mod graph;
pub mod layout;

pub use force::ForceDirectedLayouter;
pub use graph::{GraphModel, NodeIndex, ProjectedEdge};
pub use layout::{GridLayouter, HierarchicalLayouter, Layouter};
