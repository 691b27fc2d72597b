//! Attribute lists for hardware object creation.
//!
//! The C API builds object-create calls from arrays of `sai_attribute_t`, a
//! struct of attribute id plus an untyped union. Here the value is a tagged
//! union, so reading the wrong member is impossible.

use crate::types::RawObjectId;

/// Attribute ids used by the STP object family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaiAttrId {
    /// SAI_STP_PORT_ATTR_BRIDGE_PORT
    StpPortBridgePort,
    /// SAI_STP_PORT_ATTR_STP
    StpPortInstance,
    /// SAI_STP_PORT_ATTR_STATE
    StpPortState,
    /// SAI_VLAN_ATTR_STP_INSTANCE
    VlanStpInstance,
    /// SAI_SWITCH_ATTR_DEFAULT_STP_INST_ID
    SwitchDefaultStpInstance,
    /// SAI_SWITCH_ATTR_MAX_STP_INSTANCE
    SwitchMaxStpInstance,
}

/// Attribute value, discriminated by variant instead of a C union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaiAttrValue {
    /// An object id value.
    Oid(RawObjectId),
    /// A signed 32-bit value (enum-typed attributes).
    S32(i32),
    /// An unsigned 32-bit value.
    U32(u32),
    /// A boolean value.
    Bool(bool),
}

impl SaiAttrValue {
    /// Returns the object id if this is an Oid value.
    pub fn as_oid(&self) -> Option<RawObjectId> {
        match self {
            SaiAttrValue::Oid(oid) => Some(*oid),
            _ => None,
        }
    }

    /// Returns the i32 if this is an S32 value.
    pub fn as_s32(&self) -> Option<i32> {
        match self {
            SaiAttrValue::S32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the u32 if this is a U32 value.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            SaiAttrValue::U32(v) => Some(*v),
            _ => None,
        }
    }
}

/// One attribute in a create/set call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaiAttribute {
    pub id: SaiAttrId,
    pub value: SaiAttrValue,
}

impl SaiAttribute {
    /// Creates an attribute.
    pub fn new(id: SaiAttrId, value: SaiAttrValue) -> Self {
        Self { id, value }
    }

    /// Creates an object-id attribute.
    pub fn oid(id: SaiAttrId, oid: RawObjectId) -> Self {
        Self::new(id, SaiAttrValue::Oid(oid))
    }

    /// Creates a signed 32-bit attribute.
    pub fn s32(id: SaiAttrId, v: i32) -> Self {
        Self::new(id, SaiAttrValue::S32(v))
    }
}
