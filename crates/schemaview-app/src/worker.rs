use crate::orchestrator::LayoutOrchestrator;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use schemaview_core::{LayoutMode, NodeId, PositionMap, Relationship};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct LayoutRequest {
    pub mode: LayoutMode,
    pub nodes: Vec<NodeId>,
    pub relationships: Vec<Relationship>,
    pub prior: PositionMap,
}

#[derive(Debug, Clone)]
pub struct LayoutResponse {
    pub generation: u64,
    /// `None` when the pass was a no-op (manual mode or nothing visible).
    pub positions: Option<PositionMap>,
}

/// Runs layout passes on a background thread.
///
/// Every submitted request gets a generation number. The worker skips any
/// request that has been superseded by the time it is picked up, and
/// [`LayoutWorker::poll_latest`] drops responses for anything but the newest
/// generation, so a slow force pass can never overwrite a newer result.
pub struct LayoutWorker {
    req_tx: Option<Sender<(u64, LayoutRequest)>>,
    res_rx: Receiver<LayoutResponse>,
    latest: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl LayoutWorker {
    pub fn spawn(orchestrator: LayoutOrchestrator) -> Self {
        let (req_tx, req_rx) = unbounded::<(u64, LayoutRequest)>();
        let (res_tx, res_rx) = unbounded::<LayoutResponse>();
        let latest = Arc::new(AtomicU64::new(0));
        let worker_latest = Arc::clone(&latest);

        let handle = thread::spawn(move || {
            let skipped = serve(&orchestrator, &req_rx, &res_tx, &worker_latest);
            tracing::debug!("Layout worker stopped, {} stale request(s) skipped", skipped);
        });

        Self {
            req_tx: Some(req_tx),
            res_rx,
            latest,
            handle: Some(handle),
        }
    }

    /// Queue a request and return its generation.
    pub fn submit(&self, request: LayoutRequest) -> u64 {
        let generation = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(tx) = &self.req_tx
            && tx.send((generation, request)).is_err()
        {
            tracing::warn!("Layout worker is gone; request {} dropped", generation);
        }
        generation
    }

    pub fn latest_generation(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Drain finished responses, keeping only the one for the newest request.
    pub fn poll_latest(&self) -> Option<LayoutResponse> {
        let latest = self.latest_generation();
        self.res_rx
            .try_iter()
            .filter(|response| response.generation == latest)
            .last()
    }

    /// Block until the newest request has been answered or `timeout` elapses.
    pub fn wait_latest(&self, timeout: Duration) -> Option<LayoutResponse> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.res_rx.recv_timeout(remaining) {
                Ok(response) if response.generation == self.latest_generation() => {
                    return Some(response);
                }
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
    }
}

/// Worker loop: answer requests until either channel closes. A request whose
/// generation is already behind `latest` when it is picked up is skipped
/// without running a pass. Returns the number of requests skipped.
fn serve(
    orchestrator: &LayoutOrchestrator,
    requests: &Receiver<(u64, LayoutRequest)>,
    responses: &Sender<LayoutResponse>,
    latest: &AtomicU64,
) -> usize {
    let mut skipped = 0usize;
    while let Ok((generation, request)) = requests.recv() {
        if generation < latest.load(Ordering::Acquire) {
            tracing::trace!("Skipping stale layout request {}", generation);
            skipped += 1;
            continue;
        }

        let positions = orchestrator.recompute(
            request.mode,
            &request.nodes,
            &request.relationships,
            &request.prior,
        );
        if responses
            .send(LayoutResponse {
                generation,
                positions,
            })
            .is_err()
        {
            break;
        }
    }
    skipped
}

impl Drop for LayoutWorker {
    fn drop(&mut self) {
        self.req_tx.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("Layout worker panicked");
        }
    }
}
