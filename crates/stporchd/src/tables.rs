//! Table name constants for stporchd.
//!
//! These match the schema definitions in swss-common.

/// APPL_DB table binding VLANs to STP instances.
pub const APP_STP_VLAN_INSTANCE_TABLE_NAME: &str = "STP_VLAN_INSTANCE_TABLE";

/// APPL_DB table carrying per-port, per-instance STP state decisions.
pub const APP_STP_PORT_STATE_TABLE_NAME: &str = "STP_PORT_STATE_TABLE";

/// APPL_DB table requesting fast-ageing FDB flushes per VLAN.
pub const APP_STP_FASTAGEING_FLUSH_TABLE_NAME: &str = "STP_FASTAGEING_FLUSH_TABLE";

/// STATE_DB table where stporchd publishes STP capacity.
pub const STATE_STP_TABLE_NAME: &str = "STP_TABLE";

/// Key for switch-wide entries in the STATE_DB STP table.
pub const STATE_STP_GLOBAL_KEY: &str = "GLOBAL";

/// Field names used in STP tables.
pub mod fields {
    /// Instance number a VLAN is bound to.
    pub const STP_INSTANCE: &str = "stp_instance";

    /// Protocol port state, numeric.
    pub const STATE: &str = "state";

    /// Maximum usable STP instance number, published to STATE_DB.
    pub const MAX_STP_INST: &str = "max_stp_inst";
}
