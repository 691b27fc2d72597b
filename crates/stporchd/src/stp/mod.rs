//! STP orchestration: instance, binding, and port-state management.

mod orch;
mod tasks;
mod types;

pub use orch::{StpOrch, StpOrchError};
pub use tasks::StpReconciler;
pub use types::{StpInstanceEntry, StpState};
