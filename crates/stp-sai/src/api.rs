//! The STP hardware call contract.
//!
//! Every call is a synchronous round trip returning success or failure; no
//! partial results. The orchestration core is written against the
//! [`StpHardware`] trait; the production implementation binds the SAI C API,
//! tests substitute recording mocks.

use crate::attr::SaiAttribute;
use crate::error::{SaiError, SaiResult};
use crate::types::{BridgePortOid, RawObjectId, StpOid, StpPortOid, SwitchOid, VlanOid};

/// Hardware STP port states (the 3-valued model the ASIC understands).
///
/// Values match `sai_stp_port_state_t`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StpPortHwState {
    Learning = 0,
    Forwarding = 1,
    Blocking = 2,
}

impl StpPortHwState {
    /// Returns the raw attribute value for this state.
    pub const fn as_s32(self) -> i32 {
        self as i32
    }
}

/// Synchronous call contract to the switch abstraction layer, restricted to
/// the objects STP orchestration touches.
pub trait StpHardware: Send + Sync {
    /// Returns the handle of the always-present default STP instance.
    fn default_stp_instance(&self) -> SaiResult<StpOid>;

    /// Returns the maximum number of STP instances the hardware supports.
    fn max_stp_instances(&self) -> SaiResult<u32>;

    /// Allocates a new STP instance object.
    fn create_stp(&self) -> SaiResult<StpOid>;

    /// Removes an STP instance object.
    fn remove_stp(&self, stp: StpOid) -> SaiResult<()>;

    /// Creates an STP port binding from an attribute list (bridge port,
    /// instance, initial state).
    fn create_stp_port(&self, attrs: &[SaiAttribute]) -> SaiResult<StpPortOid>;

    /// Removes an STP port binding.
    fn remove_stp_port(&self, stp_port: StpPortOid) -> SaiResult<()>;

    /// Moves an STP port binding to a new hardware state.
    fn set_stp_port_state(&self, stp_port: StpPortOid, state: StpPortHwState) -> SaiResult<()>;

    /// Rebinds a VLAN object to an STP instance.
    fn set_vlan_stp_instance(&self, vlan: VlanOid, stp: StpOid) -> SaiResult<()>;

    /// Creates the bridge port object for a switch port.
    fn create_bridge_port(&self, port: RawObjectId) -> SaiResult<BridgePortOid>;

    /// Requests a flush of learned forwarding entries on one VLAN.
    fn flush_fdb_by_vlan(&self, vlan: VlanOid) -> SaiResult<()>;
}

/// Production hardware binding.
///
/// Holds the switch this API instance is scoped to. The raw SAI API table
/// pointers are wired in when FFI is enabled; until then every call reports
/// not-supported, mirroring the other API stubs in this tree.
pub struct StpApi {
    switch_id: SwitchOid,
    // When FFI is enabled:
    // stp_api: *const sai_stp_api_t,
    // vlan_api: *const sai_vlan_api_t,
}

impl StpApi {
    /// Creates a new StpApi scoped to a switch.
    pub fn new(switch_id: SwitchOid) -> Self {
        Self { switch_id }
    }

    /// Returns the switch id this API is associated with.
    pub fn switch_id(&self) -> SwitchOid {
        self.switch_id
    }
}

impl StpHardware for StpApi {
    fn default_stp_instance(&self) -> SaiResult<StpOid> {
        Err(SaiError::not_supported("FFI not enabled"))
    }

    fn max_stp_instances(&self) -> SaiResult<u32> {
        Err(SaiError::not_supported("FFI not enabled"))
    }

    fn create_stp(&self) -> SaiResult<StpOid> {
        Err(SaiError::not_supported("FFI not enabled"))
    }

    fn remove_stp(&self, _stp: StpOid) -> SaiResult<()> {
        Err(SaiError::not_supported("FFI not enabled"))
    }

    fn create_stp_port(&self, attrs: &[SaiAttribute]) -> SaiResult<StpPortOid> {
        if attrs.is_empty() {
            return Err(SaiError::invalid_parameter("empty attribute list"));
        }
        Err(SaiError::not_supported("FFI not enabled"))
    }

    fn remove_stp_port(&self, _stp_port: StpPortOid) -> SaiResult<()> {
        Err(SaiError::not_supported("FFI not enabled"))
    }

    fn set_stp_port_state(&self, _stp_port: StpPortOid, _state: StpPortHwState) -> SaiResult<()> {
        Err(SaiError::not_supported("FFI not enabled"))
    }

    fn set_vlan_stp_instance(&self, _vlan: VlanOid, _stp: StpOid) -> SaiResult<()> {
        Err(SaiError::not_supported("FFI not enabled"))
    }

    fn create_bridge_port(&self, _port: RawObjectId) -> SaiResult<BridgePortOid> {
        Err(SaiError::not_supported("FFI not enabled"))
    }

    fn flush_fdb_by_vlan(&self, _vlan: VlanOid) -> SaiResult<()> {
        Err(SaiError::not_supported("FFI not enabled"))
    }
}
