//! Base Orch trait and shared daemon context.

use async_trait::async_trait;

/// Flags the daemon shares with every Orch.
#[derive(Debug, Clone, Default)]
pub struct OrchContext {
    /// True once port initialization has completed. Orchs that program
    /// per-port hardware state hold their records until this flips.
    pub all_ports_ready: bool,
}

/// An orchestration agent in the daemon's event loop.
///
/// An Orch owns one or more [`Consumer`]s and is responsible for turning
/// their pending records into hardware calls. The daemon calls
/// [`do_task`](Orch::do_task) whenever records are available and
/// [`on_timer`](Orch::on_timer) on its periodic tick, which is where
/// retry-eligible records get another pass.
///
/// [`Consumer`]: crate::Consumer
#[async_trait]
pub trait Orch: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Drains pending records and applies them.
    async fn do_task(&mut self);

    /// Returns true if any consumer holds pending records.
    fn has_pending_tasks(&self) -> bool {
        false
    }

    /// Renders pending records for debug dumps.
    fn dump_pending_tasks(&self) -> Vec<String> {
        vec![]
    }

    /// Periodic tick from the daemon loop.
    fn on_timer(&mut self) {}
}
