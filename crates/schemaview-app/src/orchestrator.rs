use rand::Rng;
use schemaview_core::{LayoutMode, LayoutSettings, NodeId, PositionMap, Relationship};
use schemaview_events::SkipReason;
use schemaview_events::telemetry::{self, LayoutRun};
use schemaview_graph::{
    ForceDirectedLayouter, GraphModel, GridLayouter, HierarchicalLayouter, Layouter,
};

/// Picks the placer for a mode and runs one pass.
///
/// The orchestrator does not decide *when* to run; callers invoke it when the
/// mode or the visible entity set changes (see [`crate::LayoutController`]).
#[derive(Debug, Clone, Default)]
pub struct LayoutOrchestrator {
    grid: GridLayouter,
    hierarchical: HierarchicalLayouter,
    force: ForceDirectedLayouter,
}

impl LayoutOrchestrator {
    pub fn new(settings: LayoutSettings) -> Self {
        Self {
            grid: GridLayouter::new(settings.grid),
            hierarchical: HierarchicalLayouter::new(settings.hierarchical),
            force: ForceDirectedLayouter::new(settings.force),
        }
    }

    /// Compute positions for `nodes` under `mode`.
    ///
    /// Returns `None`, meaning "leave the stored positions alone", in manual
    /// mode or when there is nothing to place. An empty map is never returned.
    pub fn recompute(
        &self,
        mode: LayoutMode,
        nodes: &[NodeId],
        edges: &[Relationship],
        prior: &PositionMap,
    ) -> Option<PositionMap> {
        self.pass(mode, nodes, edges, prior, |model| self.force.execute(model, prior))
    }

    /// Same as [`Self::recompute`], with new force-layout nodes seeded from `rng`.
    pub fn recompute_with_rng<R: Rng>(
        &self,
        mode: LayoutMode,
        nodes: &[NodeId],
        edges: &[Relationship],
        prior: &PositionMap,
        rng: &mut R,
    ) -> Option<PositionMap> {
        self.pass(
            mode,
            nodes,
            edges,
            prior,
            |model| self.force.execute_with_rng(model, prior, rng),
        )
    }

    fn pass(
        &self,
        mode: LayoutMode,
        nodes: &[NodeId],
        edges: &[Relationship],
        prior: &PositionMap,
        force: impl FnOnce(&GraphModel) -> PositionMap,
    ) -> Option<PositionMap> {
        let model = GraphModel::project(nodes, edges);
        let run = start_run(mode, &model);

        let positions = match (mode, model.is_empty()) {
            (LayoutMode::Manual, _) => {
                telemetry::layout_skipped(run, SkipReason::ManualMode);
                return None;
            }
            (_, true) => {
                telemetry::layout_skipped(run, SkipReason::EmptyNodeSet);
                return None;
            }
            (LayoutMode::Grid, false) => self.grid.execute(&model, prior),
            (LayoutMode::Hierarchical, false) => self.hierarchical.execute(&model, prior),
            (LayoutMode::Force, false) => force(&model),
        };

        debug_assert_eq!(positions.len(), model.node_count());
        telemetry::layout_applied(run);
        Some(positions)
    }
}

/// Telemetry counts what is actually placed: deduplicated visible nodes and
/// relationships with both endpoints visible.
fn start_run(mode: LayoutMode, model: &GraphModel) -> LayoutRun {
    telemetry::layout_started(mode, model.node_count(), model.edge_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use schemaview_core::{Cardinality, Position};

    fn ids(names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|n| NodeId::from(*n)).collect()
    }

    #[test]
    fn test_manual_mode_is_noop() {
        let orchestrator = LayoutOrchestrator::default();
        let nodes = ids(&["a", "b"]);
        let edges = vec![Relationship::new("a", "b", Cardinality::ManyToOne)];
        assert!(
            orchestrator
                .recompute(LayoutMode::Manual, &nodes, &edges, &PositionMap::new())
                .is_none()
        );
        assert!(
            orchestrator
                .recompute(LayoutMode::Manual, &[], &[], &PositionMap::new())
                .is_none()
        );
    }

    #[test]
    fn test_empty_node_set_is_noop_for_every_mode() {
        let orchestrator = LayoutOrchestrator::default();
        for mode in LayoutMode::ALL {
            assert!(
                orchestrator
                    .recompute(mode, &[], &[], &PositionMap::new())
                    .is_none(),
                "{mode} should not produce a map"
            );
        }
    }

    #[test]
    fn test_dispatches_by_mode() {
        let orchestrator = LayoutOrchestrator::default();
        let nodes = ids(&["a", "b"]);
        let edges = vec![Relationship::new("b", "a", Cardinality::ManyToOne)];

        let grid = orchestrator
            .recompute(LayoutMode::Grid, &nodes, &edges, &PositionMap::new())
            .unwrap();
        assert_eq!(grid[&NodeId::from("b")], Position::new(480.0, 80.0));

        let hierarchical = orchestrator
            .recompute(LayoutMode::Hierarchical, &nodes, &edges, &PositionMap::new())
            .unwrap();
        assert_eq!(hierarchical[&NodeId::from("b")].y, 400.0);

        let mut rng = StdRng::seed_from_u64(1);
        let force = orchestrator
            .recompute_with_rng(LayoutMode::Force, &nodes, &edges, &PositionMap::new(), &mut rng)
            .unwrap();
        assert_eq!(force.len(), 2);
    }

    #[test]
    fn test_run_counts_projected_graph() {
        let nodes = ids(&["a", "b", "a"]);
        let edges = vec![
            Relationship::new("b", "a", Cardinality::ManyToOne),
            Relationship::new("b", "hidden", Cardinality::ManyToOne),
        ];
        let model = GraphModel::project(&nodes, &edges);
        let run = start_run(LayoutMode::Grid, &model);
        assert_eq!(run.node_count, 2);
        assert_eq!(run.edge_count, 1);
    }

    #[test]
    fn test_nodes_hidden_since_last_pass_are_dropped() {
        let orchestrator = LayoutOrchestrator::default();
        let mut prior = PositionMap::new();
        prior.insert(NodeId::from("gone"), Position::new(1.0, 1.0));
        prior.insert(NodeId::from("a"), Position::new(600.0, 400.0));

        let positions = orchestrator
            .recompute(LayoutMode::Force, &ids(&["a"]), &[], &prior)
            .unwrap();
        assert_eq!(positions.ids().collect::<Vec<_>>(), vec![&NodeId::from("a")]);
    }
}
