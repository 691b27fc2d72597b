//! Daemon startup and event loop.
//!
//! The daemon performs the startup handshake (switch-level STP queries,
//! capacity publication), then loops over the three record channels and a
//! heartbeat timer. Every received batch is drained immediately; the timer
//! advances the retry budget and gives held records another pass.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use stp_orch_common::{KeyOpFieldsValues, Orch, OrchContext, Table};
use stp_sai::{SaiError, StpHardware};
use tokio::sync::{mpsc, Notify, RwLock};

use crate::ports::PortRegistry;
use crate::stp::{StpOrch, StpReconciler};
use crate::tables::STATE_STP_TABLE_NAME;

/// Record batches buffered per channel before senders block.
const CHANNEL_DEPTH: usize = 1024;

/// Configuration for the STP daemon.
#[derive(Debug, Clone)]
pub struct StpDaemonConfig {
    /// Heartbeat interval in milliseconds.
    pub heartbeat_interval_ms: u64,
}

impl Default for StpDaemonConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 1000,
        }
    }
}

/// Producer-side handles to a running daemon.
#[derive(Clone)]
pub struct StpDaemonHandles {
    /// Feed for STP_VLAN_INSTANCE_TABLE records.
    pub vlan_instance: mpsc::Sender<Vec<KeyOpFieldsValues>>,
    /// Feed for STP_PORT_STATE_TABLE records.
    pub port_state: mpsc::Sender<Vec<KeyOpFieldsValues>>,
    /// Feed for STP_FASTAGEING_FLUSH_TABLE records.
    pub fastage: mpsc::Sender<Vec<KeyOpFieldsValues>>,
    ctx: Arc<RwLock<OrchContext>>,
    shutdown: Arc<Notify>,
}

impl StpDaemonHandles {
    /// Signals that port initialization has completed; held records become
    /// processable on the next drain.
    pub async fn set_ports_ready(&self) {
        self.ctx.write().await.all_ports_ready = true;
        info!("all ports ready");
    }

    /// Requests a graceful stop of the event loop.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// The STP reconciliation daemon.
pub struct StpDaemon {
    config: StpDaemonConfig,
    reconciler: StpReconciler,
    state_table: Table,
    vlan_rx: mpsc::Receiver<Vec<KeyOpFieldsValues>>,
    port_rx: mpsc::Receiver<Vec<KeyOpFieldsValues>>,
    fastage_rx: mpsc::Receiver<Vec<KeyOpFieldsValues>>,
    shutdown: Arc<Notify>,
}

impl StpDaemon {
    /// Creates the daemon and its producer handles.
    pub fn new(
        config: StpDaemonConfig,
        hw: Arc<dyn StpHardware>,
        ports: PortRegistry,
    ) -> (Self, StpDaemonHandles) {
        let state_table = Table::new(STATE_STP_TABLE_NAME);
        let ctx = Arc::new(RwLock::new(OrchContext::default()));
        let orch = StpOrch::new(hw, ports, state_table.clone());
        let reconciler = StpReconciler::new(orch, ctx.clone());

        let (vlan_tx, vlan_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (port_tx, port_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (fastage_tx, fastage_rx) = mpsc::channel(CHANNEL_DEPTH);
        let shutdown = Arc::new(Notify::new());

        let handles = StpDaemonHandles {
            vlan_instance: vlan_tx,
            port_state: port_tx,
            fastage: fastage_tx,
            ctx,
            shutdown: shutdown.clone(),
        };

        let daemon = Self {
            config,
            reconciler,
            state_table,
            vlan_rx,
            port_rx,
            fastage_rx,
            shutdown,
        };
        (daemon, handles)
    }

    /// Runs the startup handshake.
    ///
    /// Queries the default STP instance and the instance ceiling, and
    /// publishes capacity to the state table. An error here means the switch
    /// cannot do STP at all and must abort startup.
    pub fn init(&mut self) -> Result<(), SaiError> {
        self.reconciler.orch_mut().initialize()
    }

    /// Returns the state table the daemon publishes into.
    pub fn state_table(&self) -> &Table {
        &self.state_table
    }

    /// Runs the event loop until [`StpDaemonHandles::shutdown`] is called.
    pub async fn run(&mut self) {
        info!(
            "starting STP event loop, heartbeat {}ms",
            self.config.heartbeat_interval_ms
        );
        let mut heartbeat =
            tokio::time::interval(Duration::from_millis(self.config.heartbeat_interval_ms));

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("shutdown requested");
                    break;
                }
                Some(records) = self.vlan_rx.recv() => {
                    debug!("received {} VLAN-instance records", records.len());
                    self.reconciler.enqueue_vlan_instance(records);
                    self.reconciler.do_task().await;
                }
                Some(records) = self.port_rx.recv() => {
                    debug!("received {} port-state records", records.len());
                    self.reconciler.enqueue_port_state(records);
                    self.reconciler.do_task().await;
                }
                Some(records) = self.fastage_rx.recv() => {
                    debug!("received {} fast-ageing records", records.len());
                    self.reconciler.enqueue_fastage(records);
                    self.reconciler.do_task().await;
                }
                _ = heartbeat.tick() => {
                    self.reconciler.on_timer();
                    if self.reconciler.has_pending_tasks() {
                        self.reconciler.do_task().await;
                    }
                }
            }
        }

        info!("STP event loop stopped");
    }
}
