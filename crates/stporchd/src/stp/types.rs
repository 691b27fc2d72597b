//! STP types and structures.

use std::collections::HashSet;

use stp_sai::{StpOid, StpPortHwState};

/// Protocol port state as carried on the wire (five states).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StpState {
    Disabled = 0,
    Blocking = 1,
    Listening = 2,
    Learning = 3,
    Forwarding = 4,
}

impl StpState {
    /// Parses a state from its wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "0" | "disabled" => Some(Self::Disabled),
            "1" | "blocking" => Some(Self::Blocking),
            "2" | "listening" => Some(Self::Listening),
            "3" | "learning" => Some(Self::Learning),
            "4" | "forwarding" => Some(Self::Forwarding),
            _ => None,
        }
    }

    /// Parses a state, mapping anything unrecognized to Blocking.
    ///
    /// The hardware fail-safe for an unknown protocol state is to keep the
    /// port from forwarding.
    pub fn from_wire(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Blocking)
    }

    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Blocking => "blocking",
            Self::Listening => "listening",
            Self::Learning => "learning",
            Self::Forwarding => "forwarding",
        }
    }

    /// Maps the five protocol states onto the three hardware states.
    ///
    /// Disabled, Blocking, and Listening all stop forwarding, so they
    /// collapse to hardware Blocking.
    pub fn to_hw_state(self) -> StpPortHwState {
        match self {
            Self::Disabled | Self::Blocking | Self::Listening => StpPortHwState::Blocking,
            Self::Learning => StpPortHwState::Learning,
            Self::Forwarding => StpPortHwState::Forwarding,
        }
    }
}

/// Tracking entry for one STP instance.
///
/// Instance lifetime is derived from the references that need it: the VLANs
/// bound to it and the STP ports created under it. When the last VLAN
/// reference goes away, the instance (and its remaining port bindings) is
/// torn down.
#[derive(Debug, Clone)]
pub struct StpInstanceEntry {
    /// Hardware STP instance object.
    pub stp_oid: StpOid,
    /// VLAN aliases bound to this instance.
    pub vlan_refs: HashSet<String>,
    /// Number of STP port bindings under this instance.
    pub port_refs: u32,
}

impl StpInstanceEntry {
    /// Creates an entry with no references.
    pub fn new(stp_oid: StpOid) -> Self {
        Self {
            stp_oid,
            vlan_refs: HashSet::new(),
            port_refs: 0,
        }
    }

    /// Records a VLAN reference. Returns false if already present.
    pub fn add_vlan(&mut self, vlan_alias: impl Into<String>) -> bool {
        self.vlan_refs.insert(vlan_alias.into())
    }

    /// Drops a VLAN reference. Returns false if it was not present.
    pub fn remove_vlan(&mut self, vlan_alias: &str) -> bool {
        self.vlan_refs.remove(vlan_alias)
    }

    /// Returns true once nothing references the instance.
    pub fn is_unreferenced(&self) -> bool {
        self.vlan_refs.is_empty() && self.port_refs == 0
    }
}
