use crate::SkipReason;
use schemaview_core::LayoutMode;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

const LAYOUT_TARGET: &str = "schemaview::layout";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LayoutOutcome {
    Running,
    Applied,
    Skipped(SkipReason),
}

/// Structured record of one recompute request, tied together by a
/// correlation id across its start and finish log lines.
#[derive(Debug, Clone)]
pub struct LayoutRun {
    pub correlation_id: String,
    pub mode: LayoutMode,
    pub node_count: usize,
    pub edge_count: usize,
    pub outcome: LayoutOutcome,
    started_at: Instant,
}

impl LayoutRun {
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}

pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn layout_started(mode: LayoutMode, node_count: usize, edge_count: usize) -> LayoutRun {
    let run = LayoutRun {
        correlation_id: new_correlation_id(),
        mode,
        node_count,
        edge_count,
        outcome: LayoutOutcome::Running,
        started_at: Instant::now(),
    };
    debug!(
        target: LAYOUT_TARGET,
        correlation_id = %run.correlation_id,
        mode = %run.mode,
        nodes = run.node_count,
        edges = run.edge_count,
        "layout_start"
    );
    run
}

pub fn layout_applied(mut run: LayoutRun) -> LayoutRun {
    run.outcome = LayoutOutcome::Applied;
    info!(
        target: LAYOUT_TARGET,
        correlation_id = %run.correlation_id,
        mode = %run.mode,
        nodes = run.node_count,
        edges = run.edge_count,
        duration_ms = run.elapsed_ms(),
        "layout_applied"
    );
    run
}

pub fn layout_skipped(mut run: LayoutRun, reason: SkipReason) -> LayoutRun {
    run.outcome = LayoutOutcome::Skipped(reason);
    debug!(
        target: LAYOUT_TARGET,
        correlation_id = %run.correlation_id,
        mode = %run.mode,
        reason = ?reason,
        "layout_skipped"
    );
    run
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_ids_are_uuid_like() {
        let id = new_correlation_id();
        assert_eq!(id.len(), 36);
        assert_ne!(id, new_correlation_id());
    }

    #[test]
    fn layout_run_lifecycle() {
        let run = layout_started(LayoutMode::Grid, 4, 2);
        assert_eq!(run.outcome, LayoutOutcome::Running);
        let id = run.correlation_id.clone();

        let applied = layout_applied(run);
        assert_eq!(applied.outcome, LayoutOutcome::Applied);
        assert_eq!(applied.correlation_id, id);

        let skipped = layout_skipped(
            layout_started(LayoutMode::Manual, 4, 2),
            SkipReason::ManualMode,
        );
        assert_eq!(
            skipped.outcome,
            LayoutOutcome::Skipped(SkipReason::ManualMode)
        );
    }
}
