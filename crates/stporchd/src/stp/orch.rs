//! STP orchestration logic.
//!
//! `StpOrch` owns the instance-number to hardware-object mapping and applies
//! binding and state decisions through the hardware contract. Instance
//! lifetime is derived from references: an instance is created lazily when
//! the first VLAN binding or port-state decision needs it and destroyed when
//! its last VLAN binding is removed, tearing down any STP ports still under
//! it.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use stp_orch_common::Table;
use stp_sai::{SaiAttrId, SaiAttribute, SaiError, StpHardware, StpOid, StpPortHwState, StpPortOid};

use super::types::{StpInstanceEntry, StpState};
use crate::ports::{PortRegistry, PortType};
use crate::tables::{fields, STATE_STP_GLOBAL_KEY};

/// Errors from STP orchestration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StpOrchError {
    #[error("instance {instance} out of range, max is {max}")]
    InstanceExceedsMax { instance: u16, max: u16 },
    #[error("VLAN {0} not found")]
    VlanNotFound(String),
    #[error("port {0} not found")]
    PortNotFound(String),
    #[error("port {0} cannot carry STP bindings")]
    NotBindable(String),
    #[error(transparent)]
    Sai(#[from] SaiError),
}

/// STP orchestrator.
pub struct StpOrch {
    hw: Arc<dyn StpHardware>,
    ports: PortRegistry,
    state_table: Table,
    /// Instance number to tracking entry. Instance 0 is the default.
    instances: HashMap<u16, StpInstanceEntry>,
    default_stp: StpOid,
    max_instances: u16,
}

impl StpOrch {
    /// Creates an orchestrator. [`initialize`] must run before any record is
    /// applied.
    ///
    /// [`initialize`]: StpOrch::initialize
    pub fn new(hw: Arc<dyn StpHardware>, ports: PortRegistry, state_table: Table) -> Self {
        Self {
            hw,
            ports,
            state_table,
            instances: HashMap::new(),
            default_stp: StpOid::NULL,
            max_instances: 0,
        }
    }

    /// Queries switch-level STP facts and publishes capacity.
    ///
    /// Failure here is fatal to daemon startup; nothing can be reconciled
    /// without the default instance handle and the instance ceiling.
    pub fn initialize(&mut self) -> Result<(), SaiError> {
        self.default_stp = self.hw.default_stp_instance()?;
        let max = self.hw.max_stp_instances()?;
        self.max_instances = u16::try_from(max).unwrap_or(u16::MAX);
        self.instances
            .insert(0, StpInstanceEntry::new(self.default_stp));

        // Instance numbers are zero-based, so the highest usable one is
        // max - 1. That is the figure protocol daemons size themselves by.
        self.state_table.set(
            STATE_STP_GLOBAL_KEY,
            vec![(
                fields::MAX_STP_INST.to_string(),
                self.max_instances.saturating_sub(1).to_string(),
            )],
        );

        info!(
            "STP initialized: default instance {}, max instances {}",
            self.default_stp, self.max_instances
        );
        Ok(())
    }

    /// Returns the default STP instance handle.
    pub fn default_instance(&self) -> StpOid {
        self.default_stp
    }

    /// Returns the hardware instance ceiling.
    pub fn max_instances(&self) -> u16 {
        self.max_instances
    }

    /// Returns the hardware object for an instance number, if tracked.
    pub fn instance_oid(&self, instance: u16) -> Option<StpOid> {
        self.instances.get(&instance).map(|e| e.stp_oid)
    }

    /// Returns the tracking entry for an instance number.
    pub fn instance_entry(&self, instance: u16) -> Option<&StpInstanceEntry> {
        self.instances.get(&instance)
    }

    /// Returns the number of tracked instances, default included.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Returns the instance oid, creating the hardware instance on first use.
    fn ensure_instance(&mut self, instance: u16) -> Result<StpOid, StpOrchError> {
        if let Some(entry) = self.instances.get(&instance) {
            return Ok(entry.stp_oid);
        }
        if instance >= self.max_instances {
            return Err(StpOrchError::InstanceExceedsMax {
                instance,
                max: self.max_instances,
            });
        }
        let stp_oid = self.hw.create_stp()?;
        self.instances.insert(instance, StpInstanceEntry::new(stp_oid));
        info!("created STP instance {} -> {}", instance, stp_oid);
        Ok(stp_oid)
    }

    /// Binds a VLAN to an STP instance, creating the instance if needed.
    ///
    /// A rebind only adds the VLAN to the new instance; the old instance
    /// keeps its reference until the binding is deleted outright.
    pub fn bind_vlan(&mut self, vlan_alias: &str, instance: u16) -> Result<(), StpOrchError> {
        let mut vlan = self
            .ports
            .get_port(vlan_alias)
            .filter(|p| p.port_type == PortType::Vlan)
            .ok_or_else(|| StpOrchError::VlanNotFound(vlan_alias.to_string()))?;

        let stp_oid = self.ensure_instance(instance)?;
        self.hw.set_vlan_stp_instance(vlan.vlan_oid, stp_oid)?;
        vlan.stp_instance = Some(instance);
        self.ports.set_port(vlan);

        if let Some(entry) = self.instances.get_mut(&instance) {
            if entry.add_vlan(vlan_alias) {
                debug!("bound {} to STP instance {}", vlan_alias, instance);
            }
        }
        Ok(())
    }

    /// Removes a VLAN's STP binding, always pointing the VLAN back at the
    /// default instance first.
    ///
    /// Any instance left without VLAN references is destroyed, which also
    /// tears down its remaining STP ports.
    pub fn unbind_vlan(&mut self, vlan_alias: &str) -> Result<(), StpOrchError> {
        match self.ports.get_port(vlan_alias) {
            Some(mut vlan) if vlan.port_type == PortType::Vlan => {
                self.hw
                    .set_vlan_stp_instance(vlan.vlan_oid, self.default_stp)?;
                vlan.stp_instance = None;
                self.ports.set_port(vlan);
            }
            _ => debug!(
                "VLAN {} no longer present, skipping reset to default instance",
                vlan_alias
            ),
        }

        let owners: Vec<u16> = self
            .instances
            .iter()
            .filter(|(inst, entry)| **inst != 0 && entry.vlan_refs.contains(vlan_alias))
            .map(|(inst, _)| *inst)
            .collect();

        for instance in owners {
            let emptied = match self.instances.get_mut(&instance) {
                Some(entry) => {
                    entry.remove_vlan(vlan_alias);
                    entry.vlan_refs.is_empty()
                }
                None => false,
            };
            if emptied {
                self.destroy_instance(instance)?;
            }
        }

        // A failed hardware removal leaves an unreferenced entry behind;
        // the retried delete picks it up here.
        let stale: Vec<u16> = self
            .instances
            .iter()
            .filter(|(inst, entry)| **inst != 0 && entry.is_unreferenced())
            .map(|(inst, _)| *inst)
            .collect();
        for instance in stale {
            self.destroy_instance(instance)?;
        }
        Ok(())
    }

    /// Destroys an instance: removes its remaining STP ports across every
    /// port, then the hardware instance itself.
    fn destroy_instance(&mut self, instance: u16) -> Result<(), StpOrchError> {
        let Some(mut entry) = self.instances.remove(&instance) else {
            return Ok(());
        };

        for mut port in self.ports.snapshot() {
            if !port.is_bindable() {
                continue;
            }
            if let Some(stp_port) = port.stp_port_ids.remove(&instance) {
                // Best effort: a stuck port binding must not orphan the rest
                // of the teardown.
                if let Err(e) = self.hw.remove_stp_port(stp_port) {
                    warn!(
                        "failed to remove STP port {} on {}: {}",
                        stp_port, port.alias, e
                    );
                }
                entry.port_refs = entry.port_refs.saturating_sub(1);
                self.ports.set_port(port);
            }
        }

        if let Err(e) = self.hw.remove_stp(entry.stp_oid) {
            self.instances.insert(instance, entry);
            return Err(e.into());
        }
        info!("removed STP instance {}", instance);
        Ok(())
    }

    /// Returns the STP port binding a port and instance, creating it (and
    /// the port's bridge port, and the instance itself) on first use. New
    /// bindings start Blocking.
    pub fn ensure_port_binding(
        &mut self,
        alias: &str,
        instance: u16,
    ) -> Result<StpPortOid, StpOrchError> {
        let mut port = self
            .ports
            .get_port(alias)
            .ok_or_else(|| StpOrchError::PortNotFound(alias.to_string()))?;
        if !port.is_bindable() {
            return Err(StpOrchError::NotBindable(alias.to_string()));
        }
        if let Some(stp_port) = port.stp_port(instance) {
            return Ok(stp_port);
        }

        let stp_oid = self.ensure_instance(instance)?;

        if port.bridge_port_id.is_null() {
            port.bridge_port_id = self.hw.create_bridge_port(port.port_id)?;
            debug!("created bridge port {} for {}", port.bridge_port_id, alias);
        }

        let attrs = [
            SaiAttribute::oid(SaiAttrId::StpPortBridgePort, port.bridge_port_id.as_raw()),
            SaiAttribute::oid(SaiAttrId::StpPortInstance, stp_oid.as_raw()),
            SaiAttribute::s32(SaiAttrId::StpPortState, StpPortHwState::Blocking.as_s32()),
        ];
        let stp_port = match self.hw.create_stp_port(&attrs) {
            Ok(oid) => oid,
            Err(e) => {
                // Keep the bridge port we may have just created.
                self.ports.set_port(port);
                return Err(e.into());
            }
        };

        port.stp_port_ids.insert(instance, stp_port);
        self.ports.set_port(port);
        if let Some(entry) = self.instances.get_mut(&instance) {
            entry.port_refs += 1;
        }
        debug!(
            "created STP port {} for {} instance {}",
            stp_port, alias, instance
        );
        Ok(stp_port)
    }

    /// Applies a protocol state decision to a port's binding under an
    /// instance, creating the binding first if it does not exist yet.
    ///
    /// A failure to establish the binding is logged and reported as applied;
    /// the protocol daemon re-announces states on topology change, so the
    /// record must not wedge the stream. A missing port is reported so the
    /// caller can hold the record.
    pub fn set_port_state(
        &mut self,
        alias: &str,
        instance: u16,
        state: StpState,
    ) -> Result<(), StpOrchError> {
        if !self.ports.contains(alias) {
            return Err(StpOrchError::PortNotFound(alias.to_string()));
        }

        let stp_port = match self.ensure_port_binding(alias, instance) {
            Ok(oid) => oid,
            Err(e) => {
                warn!(
                    "no STP port for {} instance {}: {}; dropping state {}",
                    alias,
                    instance,
                    e,
                    state.as_str()
                );
                return Ok(());
            }
        };

        self.hw.set_stp_port_state(stp_port, state.to_hw_state())?;
        debug!(
            "set {} instance {} to {} ({:?})",
            alias,
            instance,
            state.as_str(),
            state.to_hw_state()
        );
        Ok(())
    }

    /// Removes the STP port binding a port and instance, if present.
    pub fn remove_port_binding(&mut self, alias: &str, instance: u16) -> Result<(), StpOrchError> {
        let Some(mut port) = self.ports.get_port(alias) else {
            debug!("port {} gone, nothing to unbind", alias);
            return Ok(());
        };
        let Some(stp_port) = port.stp_port_ids.remove(&instance) else {
            return Ok(());
        };

        self.hw.remove_stp_port(stp_port)?;
        self.ports.set_port(port);
        debug!("removed STP port for {} instance {}", alias, instance);
        self.deref_instance_port(instance)?;
        Ok(())
    }

    /// Removes every STP port binding a port still carries, best effort.
    ///
    /// For ports leaving the switch; the binding map is cleared even when a
    /// hardware removal fails.
    pub fn remove_all_bindings(&mut self, alias: &str) -> Result<(), StpOrchError> {
        let Some(mut port) = self.ports.get_port(alias) else {
            return Ok(());
        };
        let bindings: Vec<(u16, StpPortOid)> = port.stp_port_ids.drain().collect();
        self.ports.set_port(port);

        for (instance, stp_port) in bindings {
            if let Err(e) = self.hw.remove_stp_port(stp_port) {
                warn!("failed to remove STP port {} on {}: {}", stp_port, alias, e);
            }
            self.deref_instance_port(instance)?;
        }
        Ok(())
    }

    /// Drops one port reference from an instance, destroying it when no
    /// VLAN or port references remain.
    fn deref_instance_port(&mut self, instance: u16) -> Result<(), StpOrchError> {
        let unreferenced = match self.instances.get_mut(&instance) {
            Some(entry) => {
                entry.port_refs = entry.port_refs.saturating_sub(1);
                entry.is_unreferenced()
            }
            None => false,
        };
        if unreferenced && instance != 0 {
            self.destroy_instance(instance)?;
        }
        Ok(())
    }

    /// Flushes learned forwarding entries on a VLAN (fast ageing).
    pub fn flush_vlan_fdb(&mut self, vlan_alias: &str) -> Result<(), StpOrchError> {
        let vlan = self
            .ports
            .get_port(vlan_alias)
            .filter(|p| p.port_type == PortType::Vlan)
            .ok_or_else(|| StpOrchError::VlanNotFound(vlan_alias.to_string()))?;
        self.hw.flush_fdb_by_vlan(vlan.vlan_oid)?;
        info!("flushed FDB on {}", vlan_alias);
        Ok(())
    }
}
