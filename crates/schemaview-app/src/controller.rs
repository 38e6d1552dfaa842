use crate::orchestrator::LayoutOrchestrator;
use schemaview_core::{LayoutMode, NodeId, Position, PositionMap, Relationship};
use schemaview_events::{Event, EventBus, SkipReason};
use std::collections::BTreeSet;
use std::time::Instant;

/// What the last layout decision was made for. A new pass only runs when this
/// changes, so writing positions can never re-trigger a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TriggerKey {
    mode: LayoutMode,
    visible: BTreeSet<NodeId>,
}

/// Owns the layout mode, the visible entity set and the position store, and
/// runs the orchestrator only when the mode or the visible set changes.
pub struct LayoutController {
    orchestrator: LayoutOrchestrator,
    events: EventBus,
    mode: LayoutMode,
    visible: Vec<NodeId>,
    relationships: Vec<Relationship>,
    positions: PositionMap,
    last_trigger: Option<TriggerKey>,
}

impl LayoutController {
    pub fn new(orchestrator: LayoutOrchestrator, events: EventBus) -> Self {
        Self {
            orchestrator,
            events,
            mode: LayoutMode::default(),
            visible: Vec::new(),
            relationships: Vec::new(),
            positions: PositionMap::new(),
            last_trigger: None,
        }
    }

    /// Seed the store, e.g. with positions restored from a previous session.
    pub fn with_positions(mut self, positions: PositionMap) -> Self {
        self.positions = positions;
        self
    }

    pub fn with_mode(mut self, mode: LayoutMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn visible(&self) -> &[NodeId] {
        &self.visible
    }

    pub fn positions(&self) -> &PositionMap {
        &self.positions
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Replace the relationship list. This alone never triggers a pass; the
    /// next mode or visibility change picks the new relationships up.
    pub fn set_relationships(&mut self, relationships: Vec<Relationship>) {
        self.relationships = relationships;
    }

    /// Returns whether new positions were written.
    pub fn set_mode(&mut self, mode: LayoutMode) -> bool {
        if mode != self.mode {
            self.events.publish(Event::LayoutModeChanged {
                previous: self.mode,
                mode,
            });
            self.mode = mode;
        }
        self.refresh()
    }

    /// Returns whether new positions were written.
    ///
    /// Only membership counts; the same ids in a new order are not a change.
    pub fn set_visible(&mut self, visible: Vec<NodeId>) -> bool {
        let changed = visible.iter().collect::<BTreeSet<_>>()
            != self.visible.iter().collect::<BTreeSet<_>>();
        if changed {
            self.events.publish(Event::VisibleNodesChanged {
                node_count: visible.len(),
            });
        }
        self.visible = visible;
        self.refresh()
    }

    /// Run a pass if the mode or visible set differs from the last decision.
    pub fn refresh(&mut self) -> bool {
        let key = TriggerKey {
            mode: self.mode,
            visible: self.visible.iter().cloned().collect(),
        };
        if self.last_trigger.as_ref() == Some(&key) {
            self.events.publish(Event::LayoutSkipped {
                mode: self.mode,
                reason: SkipReason::Unchanged,
            });
            return false;
        }
        self.last_trigger = Some(key);
        self.run_pass()
    }

    /// Run a pass now regardless of what changed, e.g. for an explicit
    /// "arrange again" command. Manual mode still writes nothing.
    pub fn relayout(&mut self) -> bool {
        self.last_trigger = Some(TriggerKey {
            mode: self.mode,
            visible: self.visible.iter().cloned().collect(),
        });
        self.run_pass()
    }

    /// Record a hand-placed position. Never triggers a pass.
    pub fn move_node(&mut self, id: NodeId, position: Position) {
        if !position.is_finite() {
            tracing::warn!("Ignoring non-finite position for node {}", id);
            return;
        }
        self.positions.insert(id.clone(), position);
        self.events.publish(Event::NodeMoved { id, position });
    }

    fn run_pass(&mut self) -> bool {
        let started_at = Instant::now();
        let result = self.orchestrator.recompute(
            self.mode,
            &self.visible,
            &self.relationships,
            &self.positions,
        );

        match result {
            Some(positions) => {
                let node_count = positions.len();
                self.positions = positions;
                self.events.publish(Event::LayoutApplied {
                    mode: self.mode,
                    node_count,
                    duration_ms: started_at.elapsed().as_millis(),
                });
                true
            }
            None => {
                let reason = if self.mode.is_automatic() {
                    SkipReason::EmptyNodeSet
                } else {
                    SkipReason::ManualMode
                };
                self.events.publish(Event::LayoutSkipped {
                    mode: self.mode,
                    reason,
                });
                false
            }
        }
    }
}
