//! End-to-end reconciliation tests through the record dispatcher.
//!
//! These drive `StpReconciler` with table records against a recording mock
//! of the hardware contract and assert on the exact calls the ASIC would
//! see.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use stp_orch_common::{KeyOpFieldsValues, Orch, OrchContext, RetryBudget, Table};
use stp_sai::{
    BridgePortOid, RawObjectId, SaiAttribute, SaiError, SaiObjectId, SaiResult, SaiStatus,
    StpHardware, StpOid, StpPortHwState, StpPortOid, VlanOid,
};
use stporchd::ports::{Port, PortRegistry};
use stporchd::stp::{StpOrch, StpReconciler};
use stporchd::tables::STATE_STP_TABLE_NAME;
use tokio::sync::RwLock;

const DEFAULT_STP: RawObjectId = 0x100;

/// Recording hardware mock with per-call fault injection.
struct MockHardware {
    next_oid: Mutex<RawObjectId>,
    created_stps: Mutex<Vec<StpOid>>,
    removed_stps: Mutex<Vec<StpOid>>,
    created_stp_ports: Mutex<Vec<Vec<SaiAttribute>>>,
    removed_stp_ports: Mutex<Vec<StpPortOid>>,
    state_sets: Mutex<Vec<(StpPortOid, StpPortHwState)>>,
    vlan_sets: Mutex<Vec<(VlanOid, StpOid)>>,
    flushed: Mutex<Vec<VlanOid>>,
    /// Next N set_vlan_stp_instance calls fail with a transient status.
    fail_vlan_set_transient: AtomicU32,
    /// Next N set_vlan_stp_instance calls fail with a permanent status.
    fail_vlan_set_permanent: AtomicU32,
}

impl MockHardware {
    fn new() -> Self {
        Self {
            next_oid: Mutex::new(0x1000),
            created_stps: Mutex::new(Vec::new()),
            removed_stps: Mutex::new(Vec::new()),
            created_stp_ports: Mutex::new(Vec::new()),
            removed_stp_ports: Mutex::new(Vec::new()),
            state_sets: Mutex::new(Vec::new()),
            vlan_sets: Mutex::new(Vec::new()),
            flushed: Mutex::new(Vec::new()),
            fail_vlan_set_transient: AtomicU32::new(0),
            fail_vlan_set_permanent: AtomicU32::new(0),
        }
    }

    fn next_id(&self) -> RawObjectId {
        let mut oid = self.next_oid.lock().unwrap();
        *oid += 1;
        *oid
    }

    fn take_fault(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl StpHardware for MockHardware {
    fn default_stp_instance(&self) -> SaiResult<StpOid> {
        Ok(SaiObjectId::from_raw_unchecked(DEFAULT_STP))
    }

    fn max_stp_instances(&self) -> SaiResult<u32> {
        Ok(255)
    }

    fn create_stp(&self) -> SaiResult<StpOid> {
        let oid = SaiObjectId::from_raw_unchecked(self.next_id());
        self.created_stps.lock().unwrap().push(oid);
        Ok(oid)
    }

    fn remove_stp(&self, stp: StpOid) -> SaiResult<()> {
        self.removed_stps.lock().unwrap().push(stp);
        Ok(())
    }

    fn create_stp_port(&self, attrs: &[SaiAttribute]) -> SaiResult<StpPortOid> {
        self.created_stp_ports.lock().unwrap().push(attrs.to_vec());
        Ok(SaiObjectId::from_raw_unchecked(self.next_id()))
    }

    fn remove_stp_port(&self, stp_port: StpPortOid) -> SaiResult<()> {
        self.removed_stp_ports.lock().unwrap().push(stp_port);
        Ok(())
    }

    fn set_stp_port_state(&self, stp_port: StpPortOid, state: StpPortHwState) -> SaiResult<()> {
        self.state_sets.lock().unwrap().push((stp_port, state));
        Ok(())
    }

    fn set_vlan_stp_instance(&self, vlan: VlanOid, stp: StpOid) -> SaiResult<()> {
        if Self::take_fault(&self.fail_vlan_set_transient) {
            return Err(SaiError::table_full("vlan_stp"));
        }
        if Self::take_fault(&self.fail_vlan_set_permanent) {
            return Err(SaiError::from_status(SaiStatus::InvalidParameter));
        }
        self.vlan_sets.lock().unwrap().push((vlan, stp));
        Ok(())
    }

    fn create_bridge_port(&self, _port: RawObjectId) -> SaiResult<BridgePortOid> {
        Ok(SaiObjectId::from_raw_unchecked(self.next_id()))
    }

    fn flush_fdb_by_vlan(&self, vlan: VlanOid) -> SaiResult<()> {
        self.flushed.lock().unwrap().push(vlan);
        Ok(())
    }
}

struct Harness {
    hw: Arc<MockHardware>,
    ports: PortRegistry,
    ctx: Arc<RwLock<OrchContext>>,
    reconciler: StpReconciler,
    state_table: Table,
}

async fn harness() -> Harness {
    let hw = Arc::new(MockHardware::new());
    let ports = PortRegistry::new();
    ports.set_port(Port::phy("Ethernet0", 0x9001));
    ports.set_port(Port::phy("Ethernet4", 0x9002));
    ports.set_port(Port::lag("PortChannel01", 0x9003));
    ports.set_port(Port::vlan(
        "Vlan100",
        100,
        SaiObjectId::from_raw_unchecked(0x2600),
    ));
    ports.set_port(Port::vlan(
        "Vlan200",
        200,
        SaiObjectId::from_raw_unchecked(0x2601),
    ));

    let state_table = Table::new(STATE_STP_TABLE_NAME);
    let mut orch = StpOrch::new(hw.clone(), ports.clone(), state_table.clone());
    orch.initialize().unwrap();

    let ctx = Arc::new(RwLock::new(OrchContext {
        all_ports_ready: true,
    }));
    let reconciler = StpReconciler::new(orch, ctx.clone());

    Harness {
        hw,
        ports,
        ctx,
        reconciler,
        state_table,
    }
}

fn fv(f: &str, v: &str) -> (String, String) {
    (f.to_string(), v.to_string())
}

#[tokio::test]
async fn capacity_is_published_on_init() {
    let h = harness().await;
    assert_eq!(
        h.state_table.hget("GLOBAL", "max_stp_inst"),
        Some("254".to_string())
    );
}

#[tokio::test]
async fn records_are_held_until_ports_ready() {
    let mut h = harness().await;
    h.ctx.write().await.all_ports_ready = false;

    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan100",
            vec![fv("stp_instance", "1")],
        )]);
    h.reconciler.do_task().await;

    assert!(h.reconciler.has_pending_tasks());
    assert!(h.hw.created_stps.lock().unwrap().is_empty());

    h.ctx.write().await.all_ports_ready = true;
    h.reconciler.do_task().await;

    assert!(!h.reconciler.has_pending_tasks());
    assert_eq!(h.hw.created_stps.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn vlan_binding_creates_instance_and_sets_attribute() {
    let mut h = harness().await;
    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan100",
            vec![fv("stp_instance", "1")],
        )]);
    h.reconciler.do_task().await;

    assert_eq!(h.hw.created_stps.lock().unwrap().len(), 1);
    let vlan_sets = h.hw.vlan_sets.lock().unwrap();
    assert_eq!(vlan_sets.len(), 1);
    assert_eq!(vlan_sets[0].0.as_raw(), 0x2600);
    assert_eq!(h.reconciler.orch().instance_oid(1), Some(vlan_sets[0].1));
}

#[tokio::test]
async fn delete_always_unbinds_toward_default() {
    let mut h = harness().await;
    // Delete with no prior binding on record.
    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::del("Vlan100")]);
    h.reconciler.do_task().await;

    let vlan_sets = h.hw.vlan_sets.lock().unwrap();
    assert_eq!(vlan_sets.len(), 1);
    assert_eq!(vlan_sets[0].1.as_raw(), DEFAULT_STP);
    assert!(h.hw.removed_stps.lock().unwrap().is_empty());
}

#[tokio::test]
async fn double_delete_removes_instance_once() {
    let mut h = harness().await;
    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan100",
            vec![fv("stp_instance", "1")],
        )]);
    h.reconciler.do_task().await;

    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::del("Vlan100")]);
    h.reconciler.do_task().await;
    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::del("Vlan100")]);
    h.reconciler.do_task().await;

    assert_eq!(h.hw.removed_stps.lock().unwrap().len(), 1);
    assert!(!h.reconciler.has_pending_tasks());
}

#[tokio::test]
async fn rebind_keeps_old_instance() {
    let mut h = harness().await;
    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan100",
            vec![fv("stp_instance", "5")],
        )]);
    h.reconciler.do_task().await;
    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan100",
            vec![fv("stp_instance", "7")],
        )]);
    h.reconciler.do_task().await;

    assert!(h.reconciler.orch().instance_oid(5).is_some());
    assert!(h.reconciler.orch().instance_oid(7).is_some());
    assert!(h.hw.removed_stps.lock().unwrap().is_empty());
}

#[tokio::test]
async fn instance_removal_cascades_port_bindings() {
    let mut h = harness().await;
    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan100",
            vec![fv("stp_instance", "1")],
        )]);
    h.reconciler.enqueue_port_state(vec![
        KeyOpFieldsValues::set("Ethernet0:1", vec![fv("state", "4")]),
        KeyOpFieldsValues::set("PortChannel01:1", vec![fv("state", "1")]),
    ]);
    h.reconciler.do_task().await;
    assert_eq!(h.hw.created_stp_ports.lock().unwrap().len(), 2);

    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::del("Vlan100")]);
    h.reconciler.do_task().await;

    assert_eq!(h.hw.removed_stp_ports.lock().unwrap().len(), 2);
    assert_eq!(h.hw.removed_stps.lock().unwrap().len(), 1);
    assert!(h.ports.get_port("Ethernet0").unwrap().stp_port(1).is_none());
}

#[tokio::test]
async fn state_before_binding_creates_then_sets() {
    let mut h = harness().await;
    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan100",
            vec![fv("stp_instance", "1")],
        )]);
    h.reconciler.do_task().await;

    h.reconciler.enqueue_port_state(vec![KeyOpFieldsValues::set(
        "Ethernet0:1",
        vec![fv("state", "4")],
    )]);
    h.reconciler.do_task().await;

    // Exactly one binding creation (started Blocking) and one state set.
    assert_eq!(h.hw.created_stp_ports.lock().unwrap().len(), 1);
    let state_sets = h.hw.state_sets.lock().unwrap();
    assert_eq!(state_sets.len(), 1);
    assert_eq!(state_sets[0].1, StpPortHwState::Forwarding);
}

#[tokio::test]
async fn state_without_prior_bind_creates_instance_and_binding() {
    let mut h = harness().await;
    // The VLAN bind for instance 5 has not arrived yet; streams carry no
    // cross-ordering guarantee, so the state record must still land.
    h.reconciler.enqueue_port_state(vec![KeyOpFieldsValues::set(
        "Ethernet0:5",
        vec![fv("state", "4")],
    )]);
    h.reconciler.do_task().await;

    assert_eq!(h.hw.created_stps.lock().unwrap().len(), 1);
    assert_eq!(h.hw.created_stp_ports.lock().unwrap().len(), 1);
    let state_sets = h.hw.state_sets.lock().unwrap();
    assert_eq!(state_sets.len(), 1);
    assert_eq!(state_sets[0].1, StpPortHwState::Forwarding);
    assert!(!h.reconciler.has_pending_tasks());
}

#[tokio::test]
async fn bad_instance_value_is_dropped_without_hw_calls() {
    let mut h = harness().await;
    h.reconciler.enqueue_vlan_instance(vec![
        KeyOpFieldsValues::set("Vlan100", vec![fv("stp_instance", "abc")]),
        KeyOpFieldsValues::set("Vlan200", vec![]), // field missing entirely
    ]);
    h.reconciler.do_task().await;

    assert!(h.hw.created_stps.lock().unwrap().is_empty());
    assert!(h.hw.vlan_sets.lock().unwrap().is_empty());
    assert!(!h.reconciler.has_pending_tasks());
}

#[tokio::test]
async fn unknown_state_value_fails_closed_to_blocking() {
    let mut h = harness().await;
    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan100",
            vec![fv("stp_instance", "1")],
        )]);
    h.reconciler.enqueue_port_state(vec![KeyOpFieldsValues::set(
        "Ethernet0:1",
        vec![fv("state", "9")],
    )]);
    h.reconciler.do_task().await;

    let state_sets = h.hw.state_sets.lock().unwrap();
    assert_eq!(state_sets.len(), 1);
    assert_eq!(state_sets[0].1, StpPortHwState::Blocking);
}

#[tokio::test]
async fn malformed_key_is_dropped_without_aborting_batch() {
    let mut h = harness().await;
    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan100",
            vec![fv("stp_instance", "1")],
        )]);
    h.reconciler.enqueue_port_state(vec![
        KeyOpFieldsValues::set("Ethernet0", vec![fv("state", "4")]), // no instance
        KeyOpFieldsValues::set("Ethernet4:abc", vec![fv("state", "4")]), // bad number
        KeyOpFieldsValues::set("Ethernet4:1", vec![fv("state", "4")]), // fine
    ]);
    h.reconciler.do_task().await;

    // Only the valid record reached hardware, and nothing stayed pending.
    assert_eq!(h.hw.state_sets.lock().unwrap().len(), 1);
    assert_eq!(h.hw.created_stp_ports.lock().unwrap().len(), 1);
    assert!(!h.reconciler.has_pending_tasks());
}

#[tokio::test]
async fn binding_waits_for_vlan_to_appear() {
    let mut h = harness().await;
    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan300",
            vec![fv("stp_instance", "3")],
        )]);
    h.reconciler.do_task().await;
    assert!(h.reconciler.has_pending_tasks());
    assert!(h.hw.vlan_sets.lock().unwrap().is_empty());

    h.ports.set_port(Port::vlan(
        "Vlan300",
        300,
        SaiObjectId::from_raw_unchecked(0x2602),
    ));
    h.reconciler.on_timer();
    h.reconciler.do_task().await;

    assert!(!h.reconciler.has_pending_tasks());
    assert_eq!(h.hw.vlan_sets.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn transient_hardware_failure_is_retried_until_success() {
    let mut h = harness().await;
    h.hw.fail_vlan_set_transient.store(1, Ordering::SeqCst);

    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan100",
            vec![fv("stp_instance", "1")],
        )]);
    h.reconciler.do_task().await;
    assert!(h.reconciler.has_pending_tasks());

    h.reconciler.on_timer();
    h.reconciler.do_task().await;

    assert!(!h.reconciler.has_pending_tasks());
    assert_eq!(h.hw.vlan_sets.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn retries_are_bounded() {
    let mut h = harness().await;
    h.reconciler = {
        let hw: Arc<MockHardware> = h.hw.clone();
        let mut orch = StpOrch::new(hw, h.ports.clone(), h.state_table.clone());
        orch.initialize().unwrap();
        StpReconciler::new(orch, h.ctx.clone()).with_retry_budget(RetryBudget::new(2, 8))
    };
    h.hw.fail_vlan_set_transient.store(u32::MAX, Ordering::SeqCst);

    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan100",
            vec![fv("stp_instance", "1")],
        )]);
    h.reconciler.do_task().await;
    assert!(h.reconciler.has_pending_tasks());

    h.reconciler.on_timer();
    h.reconciler.do_task().await;

    // Second transient failure exhausts the two-attempt budget.
    assert!(!h.reconciler.has_pending_tasks());
    assert!(h.hw.vlan_sets.lock().unwrap().is_empty());
}

#[tokio::test]
async fn permanent_hardware_failure_is_dropped_immediately() {
    let mut h = harness().await;
    h.hw.fail_vlan_set_permanent.store(1, Ordering::SeqCst);

    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan100",
            vec![fv("stp_instance", "1")],
        )]);
    h.reconciler.do_task().await;

    assert!(!h.reconciler.has_pending_tasks());
    assert!(h.hw.vlan_sets.lock().unwrap().is_empty());
}

#[tokio::test]
async fn port_state_delete_removes_binding() {
    let mut h = harness().await;
    h.reconciler
        .enqueue_vlan_instance(vec![KeyOpFieldsValues::set(
            "Vlan100",
            vec![fv("stp_instance", "1")],
        )]);
    h.reconciler.enqueue_port_state(vec![KeyOpFieldsValues::set(
        "Ethernet0:1",
        vec![fv("state", "4")],
    )]);
    h.reconciler.do_task().await;

    h.reconciler
        .enqueue_port_state(vec![KeyOpFieldsValues::del("Ethernet0:1")]);
    h.reconciler.do_task().await;

    assert_eq!(h.hw.removed_stp_ports.lock().unwrap().len(), 1);
    assert!(h.ports.get_port("Ethernet0").unwrap().stp_port(1).is_none());
}

#[tokio::test]
async fn fastage_flushes_only_on_true() {
    let mut h = harness().await;
    h.reconciler.enqueue_fastage(vec![KeyOpFieldsValues::set(
        "Vlan100",
        vec![fv("state", "true")],
    )]);
    h.reconciler.do_task().await;
    assert_eq!(h.hw.flushed.lock().unwrap().len(), 1);

    h.reconciler.enqueue_fastage(vec![
        KeyOpFieldsValues::set("Vlan100", vec![fv("state", "false")]),
        KeyOpFieldsValues::del("Vlan200"),
    ]);
    h.reconciler.do_task().await;
    assert_eq!(h.hw.flushed.lock().unwrap().len(), 1);
    assert!(!h.reconciler.has_pending_tasks());
}

#[tokio::test]
async fn set_then_delete_collapses_to_delete() {
    let mut h = harness().await;
    h.reconciler.enqueue_vlan_instance(vec![
        KeyOpFieldsValues::set("Vlan100", vec![fv("stp_instance", "1")]),
        KeyOpFieldsValues::del("Vlan100"),
    ]);
    h.reconciler.do_task().await;

    // The set never reached hardware; only the unbind-to-default did.
    assert!(h.hw.created_stps.lock().unwrap().is_empty());
    let vlan_sets = h.hw.vlan_sets.lock().unwrap();
    assert_eq!(vlan_sets.len(), 1);
    assert_eq!(vlan_sets[0].1.as_raw(), DEFAULT_STP);
}
