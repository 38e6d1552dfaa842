use crate::graph::GraphModel;
use crate::layout::Layouter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schemaview_core::{ForceSettings, Position, PositionMap};

/// Position plus the velocity the simulator integrates. Never leaves this
/// module; results are converted back to plain positions on the way out.
#[derive(Debug, Clone, Copy, Default)]
struct SimulationPosition {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
}

impl SimulationPosition {
    fn at(position: Position) -> Self {
        Self {
            x: position.x,
            y: position.y,
            vx: 0.0,
            vy: 0.0,
        }
    }

    fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Unit vector from `a` to `b` and the guarded distance between them.
/// Coincident points get a fixed direction so they still push apart.
fn separation(a: &SimulationPosition, b: &SimulationPosition) -> (f64, f64, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    let (ux, uy) = if len > 0.0 && len.is_finite() {
        (dx / len, dy / len)
    } else {
        (1.0, 0.0)
    };
    (ux, uy, len.max(1.0))
}

/// Spring-embedder placement: pairwise repulsion, spring attraction along
/// relationships and a weak pull towards the canvas center, cooled linearly
/// over a fixed number of iterations.
///
/// Cost is O(n² · iterations) because repulsion visits every pair. That is
/// fine for schemas of a few hundred entities and is the limit of this engine.
#[derive(Debug, Clone, Default)]
pub struct ForceDirectedLayouter {
    pub settings: ForceSettings,
}

impl ForceDirectedLayouter {
    pub fn new(settings: ForceSettings) -> Self {
        Self { settings }
    }

    /// Run the simulation, drawing start positions for new nodes from `rng`.
    pub fn execute_with_rng<R: Rng>(
        &self,
        model: &GraphModel,
        prior: &PositionMap,
        rng: &mut R,
    ) -> PositionMap {
        if model.is_empty() {
            return PositionMap::new();
        }

        let mut bodies = self.seed_positions(model, prior, rng);
        let springs: Vec<(usize, usize)> = model
            .edges()
            .iter()
            .filter(|edge| !edge.is_self_loop())
            .map(|edge| (edge.source_idx.0, edge.target_idx.0))
            .collect();

        let iterations = self.settings.iterations;
        for t in 0..iterations {
            let alpha = 1.0 - t as f64 / iterations as f64;
            self.apply_repulsion(&mut bodies, alpha);
            self.apply_springs(&mut bodies, &springs, alpha);
            self.apply_centering(&mut bodies, alpha);
            self.integrate(&mut bodies);
        }

        tracing::debug!(
            nodes = model.node_count(),
            springs = springs.len(),
            iterations,
            "Force-directed layout complete"
        );

        self.finish(model, prior, &bodies)
    }

    /// Prior positions are reused as-is; nodes without a usable one are
    /// scattered uniformly inside the seed bounds.
    fn seed_positions<R: Rng>(
        &self,
        model: &GraphModel,
        prior: &PositionMap,
        rng: &mut R,
    ) -> Vec<SimulationPosition> {
        let bounds = &self.settings.seed_bounds;
        let mut seeded = 0usize;

        let bodies: Vec<SimulationPosition> = model
            .nodes()
            .iter()
            .map(|id| match prior.get(id) {
                Some(position) if position.is_finite() => SimulationPosition::at(*position),
                _ => {
                    seeded += 1;
                    let x = rng.random_range(bounds.min_x..=bounds.max_x);
                    let y = rng.random_range(bounds.min_y..=bounds.max_y);
                    SimulationPosition::at(Position::new(x, y))
                }
            })
            .collect();

        if seeded > 0 {
            tracing::trace!("Seeded {} node(s) without a prior position", seeded);
        }
        bodies
    }

    fn apply_repulsion(&self, bodies: &mut [SimulationPosition], alpha: f64) {
        let strength = self.settings.repulsion * alpha;
        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let (ux, uy, r) = separation(&bodies[i], &bodies[j]);
                let force = strength / (r * r);
                let (fx, fy) = (ux * force, uy * force);

                bodies[i].vx -= fx;
                bodies[i].vy -= fy;
                bodies[j].vx += fx;
                bodies[j].vy += fy;
            }
        }
    }

    fn apply_springs(&self, bodies: &mut [SimulationPosition], springs: &[(usize, usize)], alpha: f64) {
        let s = &self.settings;
        for &(a, b) in springs {
            let (ux, uy, r) = separation(&bodies[a], &bodies[b]);
            let force = (r - s.spring_length) * s.spring_strength * alpha;
            let (fx, fy) = (ux * force, uy * force);

            bodies[a].vx += fx;
            bodies[a].vy += fy;
            bodies[b].vx -= fx;
            bodies[b].vy -= fy;
        }
    }

    fn apply_centering(&self, bodies: &mut [SimulationPosition], alpha: f64) {
        let s = &self.settings;
        let pull = s.center_force * alpha;
        for body in bodies.iter_mut() {
            body.vx += (s.center.x - body.x) * pull;
            body.vy += (s.center.y - body.y) * pull;
        }
    }

    fn integrate(&self, bodies: &mut [SimulationPosition]) {
        let damping = self.settings.damping;
        for body in bodies.iter_mut() {
            body.x += body.vx;
            body.y += body.vy;
            body.vx *= damping;
            body.vy *= damping;
        }
    }

    /// Drop velocities and make sure nothing non-finite escapes.
    fn finish(
        &self,
        model: &GraphModel,
        prior: &PositionMap,
        bodies: &[SimulationPosition],
    ) -> PositionMap {
        model
            .nodes()
            .iter()
            .zip(bodies)
            .map(|(id, body)| {
                let position = body.position();
                if position.is_finite() {
                    return (id.clone(), position);
                }
                tracing::warn!("Simulation diverged for node {}, restoring a safe position", id);
                let fallback = prior
                    .get(id)
                    .copied()
                    .filter(Position::is_finite)
                    .unwrap_or(self.settings.center);
                (id.clone(), fallback)
            })
            .collect()
    }
}

impl Layouter for ForceDirectedLayouter {
    fn execute(&self, model: &GraphModel, prior: &PositionMap) -> PositionMap {
        match self.settings.seed {
            Some(seed) => self.execute_with_rng(model, prior, &mut StdRng::seed_from_u64(seed)),
            None => self.execute_with_rng(model, prior, &mut rand::rng()),
        }
    }
}
