//! Layout orchestration for the schema canvas: mode dispatch, trigger
//! discipline around the position store, and an off-thread worker.

pub mod controller;
pub mod orchestrator;
pub mod worker;

pub use controller::LayoutController;
pub use orchestrator::LayoutOrchestrator;
pub use worker::{LayoutRequest, LayoutResponse, LayoutWorker};
