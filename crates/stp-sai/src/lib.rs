//! Safe hardware abstraction for the STP half of the switch abstraction
//! interface.
//!
//! The control plane talks to the forwarding hardware through a small set of
//! synchronous calls: create/remove an STP instance, create/remove a
//! per-(port, instance) STP port binding, move a binding between the three
//! hardware states, rebind a VLAN to an instance, and create the bridge port
//! a binding hangs off. This crate provides:
//!
//! - [`types`]: type-safe object ids so an STP instance handle cannot be
//!   passed where a bridge-port handle is expected
//! - [`error`]: `SaiStatus`/`SaiError` status handling
//! - [`attr`]: a tagged-union attribute value, replacing the C-style
//!   `sai_attribute_t` union
//! - [`api`]: the [`StpHardware`] call contract and the stub [`StpApi`]

pub mod api;
pub mod attr;
pub mod error;
pub mod types;

pub use api::{StpApi, StpHardware, StpPortHwState};
pub use attr::{SaiAttrId, SaiAttrValue, SaiAttribute};
pub use error::{SaiError, SaiResult, SaiStatus};
pub use types::{
    BridgePortKind, BridgePortOid, RawObjectId, SaiObjectId, SaiObjectKind, StpKind, StpOid,
    StpPortKind, StpPortOid, SwitchKind, SwitchOid, VlanKind, VlanOid,
};
