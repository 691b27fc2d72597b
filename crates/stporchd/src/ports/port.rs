//! Port struct and related types.
//!
//! A Port carries the hardware object ids STP orchestration needs: the
//! underlying switch object, the bridge port (created lazily), and the STP
//! port bindings keyed by instance.

use std::collections::HashMap;
use std::fmt;

use stp_sai::{BridgePortOid, RawObjectId, StpPortOid, VlanOid};

/// Port type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PortType {
    /// Physical front-panel port.
    #[default]
    Phy,
    /// Link aggregation group.
    Lag,
    /// VLAN interface.
    Vlan,
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phy => write!(f, "PHY"),
            Self::Lag => write!(f, "LAG"),
            Self::Vlan => write!(f, "VLAN"),
        }
    }
}

/// A switch port as seen by STP orchestration.
#[derive(Debug, Clone, Default)]
pub struct Port {
    /// Port name (e.g., "Ethernet0", "PortChannel01", "Vlan100").
    pub alias: String,
    /// Port type.
    pub port_type: PortType,
    /// Underlying switch object id (port or LAG).
    pub port_id: RawObjectId,
    /// VLAN object id; valid only for [`PortType::Vlan`].
    pub vlan_oid: VlanOid,
    /// VLAN number; valid only for [`PortType::Vlan`].
    pub vlan_id: u16,
    /// STP instance this VLAN is bound to; valid only for
    /// [`PortType::Vlan`], `None` means the default instance.
    pub stp_instance: Option<u16>,
    /// Bridge port object, created on first STP binding.
    pub bridge_port_id: BridgePortOid,
    /// STP port bindings: instance number to STP port object.
    pub stp_port_ids: HashMap<u16, StpPortOid>,
}

impl Port {
    /// Creates a physical port.
    pub fn phy(alias: impl Into<String>, port_id: RawObjectId) -> Self {
        Self {
            alias: alias.into(),
            port_type: PortType::Phy,
            port_id,
            ..Self::default()
        }
    }

    /// Creates a LAG port.
    pub fn lag(alias: impl Into<String>, lag_id: RawObjectId) -> Self {
        Self {
            alias: alias.into(),
            port_type: PortType::Lag,
            port_id: lag_id,
            ..Self::default()
        }
    }

    /// Creates a VLAN interface.
    pub fn vlan(alias: impl Into<String>, vlan_id: u16, vlan_oid: VlanOid) -> Self {
        Self {
            alias: alias.into(),
            port_type: PortType::Vlan,
            vlan_id,
            vlan_oid,
            ..Self::default()
        }
    }

    /// Returns true if this port can carry STP port bindings.
    pub fn is_bindable(&self) -> bool {
        matches!(self.port_type, PortType::Phy | PortType::Lag)
    }

    /// Returns the STP port object bound for an instance, if any.
    pub fn stp_port(&self, instance: u16) -> Option<StpPortOid> {
        self.stp_port_ids.get(&instance).copied()
    }
}
