//! Record dispatcher for the three STP streams.
//!
//! `StpReconciler` owns one consumer per application table and turns each
//! drained record into `StpOrch` calls. Outcomes are classified: malformed
//! records are dropped without touching hardware, transient failures stay
//! pending under a bounded retry budget, permanent failures are logged and
//! dropped.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, warn};
use stp_orch_common::{
    Consumer, KeyOpFieldsValues, Orch, OrchContext, RetryBudget, RetryDecision, TaskError,
    TaskResult, TaskStatus,
};
use tokio::sync::RwLock;

use super::orch::{StpOrch, StpOrchError};
use super::types::StpState;
use crate::tables::{
    fields, APP_STP_FASTAGEING_FLUSH_TABLE_NAME, APP_STP_PORT_STATE_TABLE_NAME,
    APP_STP_VLAN_INSTANCE_TABLE_NAME,
};

/// Failed attempts allowed per record before it is dropped.
const MAX_RETRY_ATTEMPTS: u32 = 8;
/// Backoff ceiling, in timer cycles.
const MAX_BACKOFF_CYCLES: u64 = 8;

impl From<StpOrchError> for TaskError {
    fn from(e: StpOrchError) -> Self {
        match e {
            StpOrchError::InstanceExceedsMax { .. } | StpOrchError::NotBindable(_) => {
                TaskError::invalid_entry(e.to_string())
            }
            StpOrchError::VlanNotFound(_) | StpOrchError::PortNotFound(_) => {
                TaskError::need_retry(e.to_string())
            }
            StpOrchError::Sai(source) => TaskError::Hardware { source },
        }
    }
}

/// Which stream a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    VlanInstance,
    PortState,
    Fastage,
}

impl Stream {
    fn table_name(self) -> &'static str {
        match self {
            Stream::VlanInstance => APP_STP_VLAN_INSTANCE_TABLE_NAME,
            Stream::PortState => APP_STP_PORT_STATE_TABLE_NAME,
            Stream::Fastage => APP_STP_FASTAGEING_FLUSH_TABLE_NAME,
        }
    }
}

/// Drains the three STP streams into the orchestrator.
pub struct StpReconciler {
    orch: StpOrch,
    ctx: Arc<RwLock<OrchContext>>,
    vlan_consumer: Consumer,
    port_state_consumer: Consumer,
    fastage_consumer: Consumer,
    retry: RetryBudget,
}

impl StpReconciler {
    /// Creates a reconciler over an initialized orchestrator.
    pub fn new(orch: StpOrch, ctx: Arc<RwLock<OrchContext>>) -> Self {
        Self {
            orch,
            ctx,
            vlan_consumer: Consumer::new(APP_STP_VLAN_INSTANCE_TABLE_NAME).with_priority(0),
            port_state_consumer: Consumer::new(APP_STP_PORT_STATE_TABLE_NAME).with_priority(1),
            fastage_consumer: Consumer::new(APP_STP_FASTAGEING_FLUSH_TABLE_NAME).with_priority(2),
            retry: RetryBudget::new(MAX_RETRY_ATTEMPTS, MAX_BACKOFF_CYCLES),
        }
    }

    /// Replaces the retry budget.
    pub fn with_retry_budget(mut self, retry: RetryBudget) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the orchestrator.
    pub fn orch(&self) -> &StpOrch {
        &self.orch
    }

    /// Returns the orchestrator mutably, for startup initialization.
    pub fn orch_mut(&mut self) -> &mut StpOrch {
        &mut self.orch
    }

    /// Buffers VLAN-instance binding records.
    pub fn enqueue_vlan_instance(&mut self, records: Vec<KeyOpFieldsValues>) {
        self.vlan_consumer.add_to_sync(records);
    }

    /// Buffers port-state records.
    pub fn enqueue_port_state(&mut self, records: Vec<KeyOpFieldsValues>) {
        self.port_state_consumer.add_to_sync(records);
    }

    /// Buffers fast-ageing flush records.
    pub fn enqueue_fastage(&mut self, records: Vec<KeyOpFieldsValues>) {
        self.fastage_consumer.add_to_sync(records);
    }

    fn consumer_mut(&mut self, stream: Stream) -> &mut Consumer {
        match stream {
            Stream::VlanInstance => &mut self.vlan_consumer,
            Stream::PortState => &mut self.port_state_consumer,
            Stream::Fastage => &mut self.fastage_consumer,
        }
    }

    fn drain_stream(&mut self, stream: Stream) {
        let records = self.consumer_mut(stream).drain();
        let mut keep = Vec::new();
        for record in records {
            let tag = format!("{}|{}", stream.table_name(), record.key);
            if !self.retry.is_eligible(&tag) {
                keep.push(record);
                continue;
            }

            let result = match stream {
                Stream::VlanInstance => self.apply_vlan_instance(&record),
                Stream::PortState => self.apply_port_state(&record),
                Stream::Fastage => self.apply_fastage(&record),
            };
            if let Some(record) = self.settle(&tag, record, result) {
                keep.push(record);
            }
        }
        // Requeue in drain order so per-key Del/Set sequencing survives.
        if !keep.is_empty() {
            self.consumer_mut(stream).add_to_sync(keep);
        }
    }

    /// Classifies one record's outcome; returns the record if it should
    /// stay pending.
    fn settle(
        &mut self,
        tag: &str,
        record: KeyOpFieldsValues,
        result: TaskResult<()>,
    ) -> Option<KeyOpFieldsValues> {
        let err = match result {
            Ok(()) => {
                self.retry.clear(tag);
                return None;
            }
            Err(e) => e,
        };
        match err.to_status() {
            TaskStatus::Ignore => {
                self.retry.clear(tag);
                None
            }
            TaskStatus::NeedRetry => match self.retry.record_failure(tag) {
                RetryDecision::Retry => {
                    debug!(
                        "holding {} (attempt {}): {}",
                        tag,
                        self.retry.attempts(tag),
                        err
                    );
                    Some(record)
                }
                RetryDecision::GiveUp => {
                    error!("giving up on {} after repeated attempts: {}", tag, err);
                    None
                }
            },
            _ => {
                error!("dropping {}: {}", tag, err);
                self.retry.clear(tag);
                None
            }
        }
    }

    /// STP_VLAN_INSTANCE_TABLE: key "Vlan<id>", field `stp_instance`.
    fn apply_vlan_instance(&mut self, record: &KeyOpFieldsValues) -> TaskResult<()> {
        if record.op.is_del() {
            self.orch.unbind_vlan(&record.key)?;
            return Ok(());
        }

        let instance = record
            .get_field(fields::STP_INSTANCE)
            .ok_or_else(|| TaskError::invalid_entry("missing stp_instance field"))?;
        let instance: u16 = instance
            .parse()
            .map_err(|_| TaskError::invalid_entry(format!("bad stp_instance '{}'", instance)))?;

        self.orch.bind_vlan(&record.key, instance)?;
        Ok(())
    }

    /// STP_PORT_STATE_TABLE: key "<port>:<instance>", field `state`.
    fn apply_port_state(&mut self, record: &KeyOpFieldsValues) -> TaskResult<()> {
        let (alias, instance) = record
            .key
            .rsplit_once(':')
            .ok_or_else(|| TaskError::invalid_entry(format!("bad key '{}'", record.key)))?;
        let instance: u16 = instance
            .parse()
            .map_err(|_| TaskError::invalid_entry(format!("bad instance in '{}'", record.key)))?;

        if record.op.is_del() {
            self.orch.remove_port_binding(alias, instance)?;
            return Ok(());
        }

        let state = record
            .get_field(fields::STATE)
            .ok_or_else(|| TaskError::invalid_entry("missing state field"))?;
        self.orch
            .set_port_state(alias, instance, StpState::from_wire(state))?;
        Ok(())
    }

    /// STP_FASTAGEING_FLUSH_TABLE: key "Vlan<id>", field `state`. Only the
    /// value "true" triggers a flush; anything else is a no-op.
    fn apply_fastage(&mut self, record: &KeyOpFieldsValues) -> TaskResult<()> {
        if record.op.is_del() {
            return Ok(());
        }
        if record.get_field(fields::STATE) != Some("true") {
            return Ok(());
        }
        match self.orch.flush_vlan_fdb(&record.key) {
            Ok(()) => Ok(()),
            Err(StpOrchError::VlanNotFound(alias)) => {
                warn!("skipping FDB flush, {} not present", alias);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Orch for StpReconciler {
    fn name(&self) -> &str {
        "StpOrch"
    }

    async fn do_task(&mut self) {
        // Hold every stream until port initialization has finished;
        // bindings programmed against half-built ports would be lost.
        if !self.ctx.read().await.all_ports_ready {
            debug!("ports not ready, holding {} records", self.pending_count());
            return;
        }

        self.drain_stream(Stream::VlanInstance);
        self.drain_stream(Stream::PortState);
        self.drain_stream(Stream::Fastage);
    }

    fn has_pending_tasks(&self) -> bool {
        self.pending_count() > 0
    }

    fn dump_pending_tasks(&self) -> Vec<String> {
        let mut lines = self.vlan_consumer.dump();
        lines.extend(self.port_state_consumer.dump());
        lines.extend(self.fastage_consumer.dump());
        lines
    }

    fn on_timer(&mut self) {
        self.retry.tick();
    }
}

impl StpReconciler {
    fn pending_count(&self) -> usize {
        self.vlan_consumer.pending_count()
            + self.port_state_consumer.pending_count()
            + self.fastage_consumer.pending_count()
    }
}
