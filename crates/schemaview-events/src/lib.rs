use crossbeam_channel::{Receiver, Sender, unbounded};
use schemaview_core::{LayoutMode, NodeId, Position};
use serde::{Deserialize, Serialize};

pub mod telemetry;

/// Why a layout request did not produce new positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Manual mode owns positions; nothing is recomputed.
    ManualMode,
    /// No visible entities to place.
    EmptyNodeSet,
    /// Neither the mode nor the visible set changed since the last pass.
    Unchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    LayoutModeChanged {
        previous: LayoutMode,
        mode: LayoutMode,
    },
    VisibleNodesChanged {
        node_count: usize,
    },
    /// A pass finished and its positions were written to the store.
    LayoutApplied {
        mode: LayoutMode,
        node_count: usize,
        duration_ms: u128,
    },
    LayoutSkipped {
        mode: LayoutMode,
        reason: SkipReason,
    },
    /// A single node was placed by hand.
    NodeMoved {
        id: NodeId,
        position: Position,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Hand every queued event to `listener`.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }

    /// Drain queued events without a listener.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }
}

pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}
