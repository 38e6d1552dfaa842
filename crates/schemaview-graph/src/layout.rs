use crate::graph::{GraphModel, NodeIndex};
use schemaview_core::{Cardinality, GridSettings, HierarchicalSettings, Position, PositionMap};
use std::collections::{BTreeMap, VecDeque};

/// A placement strategy. Implementations return exactly one position per node
/// in the model and never fail; an empty model yields an empty map.
pub trait Layouter {
    /// `prior` holds positions from the previous pass. Strategies that are pure
    /// functions of the graph ignore it.
    fn execute(&self, model: &GraphModel, prior: &PositionMap) -> PositionMap;
}

/// Tiles nodes left-to-right, top-to-bottom in a roughly square grid.
#[derive(Debug, Clone, Default)]
pub struct GridLayouter {
    pub settings: GridSettings,
}

impl GridLayouter {
    pub fn new(settings: GridSettings) -> Self {
        Self { settings }
    }

    /// Smallest column count whose square holds `node_count` cells.
    pub fn column_count(node_count: usize) -> usize {
        if node_count == 0 {
            return 0;
        }
        let mut columns = (node_count as f64).sqrt() as usize;
        while columns * columns < node_count {
            columns += 1;
        }
        columns.max(1)
    }
}

impl Layouter for GridLayouter {
    fn execute(&self, model: &GraphModel, _prior: &PositionMap) -> PositionMap {
        let columns = Self::column_count(model.node_count());
        let s = &self.settings;

        let positions: PositionMap = model
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let col = i % columns;
                let row = i / columns;
                let position = Position::new(
                    s.start_x + col as f64 * s.spacing_x,
                    s.start_y + row as f64 * s.spacing_y,
                );
                (id.clone(), position)
            })
            .collect();

        tracing::debug!(
            nodes = model.node_count(),
            columns,
            "Grid layout complete"
        );
        positions
    }
}

/// Places nodes on levels by dependency depth: entities nothing depends on
/// structurally sit on level 0, and every dependent entity sits at least one
/// level below everything it depends on.
#[derive(Debug, Clone, Default)]
pub struct HierarchicalLayouter {
    pub settings: HierarchicalSettings,
}

impl HierarchicalLayouter {
    pub fn new(settings: HierarchicalSettings) -> Self {
        Self { settings }
    }

    /// `deps[n]` lists the nodes `n` depends on. Self-references and
    /// relationships that carry no dependency are left out.
    fn dependency_lists(&self, model: &GraphModel) -> Vec<Vec<usize>> {
        let mut deps = vec![Vec::new(); model.node_count()];
        let mut self_loops = 0usize;

        for edge in model.edges() {
            if edge.is_self_loop() {
                self_loops += 1;
                continue;
            }
            let (dependent, dependency) = match edge.cardinality {
                // The referencing record depends on the record it points to.
                Cardinality::ManyToOne => (edge.source_idx, edge.target_idx),
                Cardinality::OneToMany => (edge.target_idx, edge.source_idx),
                Cardinality::ManyToMany if self.settings.many_to_many_dependencies => {
                    (edge.source_idx, edge.target_idx)
                }
                Cardinality::ManyToMany => continue,
            };
            deps[dependent.0].push(dependency.0);
        }

        if self_loops > 0 {
            tracing::trace!("Ignored {} self-referencing relationship(s)", self_loops);
        }
        deps
    }

    /// Removes back-edges found by a depth-first walk in node order, leaving
    /// an acyclic dependency graph. Returns the number of edges removed.
    fn break_cycles(deps: &mut [Vec<usize>]) -> usize {
        const UNVISITED: u8 = 0;
        const ON_STACK: u8 = 1;
        const DONE: u8 = 2;

        let node_count = deps.len();
        let mut state = vec![UNVISITED; node_count];
        let mut kept: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        let mut removed = 0usize;

        for root in 0..node_count {
            if state[root] != UNVISITED {
                continue;
            }
            state[root] = ON_STACK;
            // (node, index of the next dependency to inspect)
            let mut stack = vec![(root, 0usize)];

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                let Some(&dep) = deps[node].get(next) else {
                    state[node] = DONE;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                match state[dep] {
                    ON_STACK => removed += 1,
                    UNVISITED => {
                        kept[node].push(dep);
                        state[dep] = ON_STACK;
                        stack.push((dep, 0));
                    }
                    _ => kept[node].push(dep),
                }
            }
        }

        for (slot, edges) in deps.iter_mut().zip(kept) {
            *slot = edges;
        }
        removed
    }

    /// Level of every node, indexed like `model.nodes()`.
    ///
    /// Levels are longest-path depths over the dependency graph after cycle
    /// breaking, so a node reachable through paths of different length lands
    /// below the deepest one.
    pub fn assign_levels(&self, model: &GraphModel) -> Vec<usize> {
        let node_count = model.node_count();
        let mut deps = self.dependency_lists(model);
        let removed = Self::break_cycles(&mut deps);
        if removed > 0 {
            tracing::debug!("Broke {} dependency cycle edge(s) before leveling", removed);
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        let mut pending: Vec<usize> = Vec::with_capacity(node_count);
        for (node, node_deps) in deps.iter().enumerate() {
            pending.push(node_deps.len());
            for &dep in node_deps {
                dependents[dep].push(node);
            }
        }

        let mut levels = vec![0usize; node_count];
        let mut queue: VecDeque<usize> = (0..node_count).filter(|&n| pending[n] == 0).collect();
        let mut finalized = 0usize;

        while let Some(node) = queue.pop_front() {
            finalized += 1;
            for &dependent in &dependents[node] {
                levels[dependent] = levels[dependent].max(levels[node] + 1);
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if finalized < node_count {
            tracing::warn!(
                "Leveling finalized {} of {} nodes; remaining nodes keep their partial level",
                finalized,
                node_count
            );
        }

        levels
    }

    fn build_layers(levels: &[usize]) -> BTreeMap<usize, Vec<NodeIndex>> {
        let mut layers: BTreeMap<usize, Vec<NodeIndex>> = BTreeMap::new();
        for (idx, &level) in levels.iter().enumerate() {
            layers.entry(level).or_default().push(NodeIndex(idx));
        }
        layers
    }

    fn layer_start_x(&self, layer_len: usize) -> f64 {
        let s = &self.settings;
        let total_width = layer_len as f64 * s.horizontal_spacing;
        s.start_x.max((s.canvas_width - total_width) / 2.0)
    }
}

impl Layouter for HierarchicalLayouter {
    fn execute(&self, model: &GraphModel, _prior: &PositionMap) -> PositionMap {
        let mut positions = PositionMap::new();
        if model.is_empty() {
            return positions;
        }

        let levels = self.assign_levels(model);
        let layers = Self::build_layers(&levels);
        let s = &self.settings;

        for (&level, layer_nodes) in &layers {
            let start_x = self.layer_start_x(layer_nodes.len());
            let y = s.start_y + level as f64 * s.level_height;
            for (j, &node_idx) in layer_nodes.iter().enumerate() {
                let x = start_x + j as f64 * s.horizontal_spacing;
                positions.insert(model[node_idx].clone(), Position::new(x, y));
            }
        }

        tracing::debug!(
            nodes = model.node_count(),
            levels = layers.len(),
            "Hierarchical layout complete"
        );
        positions
    }
}
