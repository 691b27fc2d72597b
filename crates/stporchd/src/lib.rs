//! STP hardware-state reconciliation daemon.
//!
//! stporchd drains spanning-tree decisions from three application tables and
//! applies them to the switch ASIC through the SAI-style hardware contract:
//!
//! ```text
//! [STP_VLAN_INSTANCE_TABLE] ─┐
//! [STP_PORT_STATE_TABLE] ────┼──> [StpReconciler] ──> [StpHardware] ──> ASIC
//! [STP_FASTAGEING_FLUSH_TABLE] ┘        │
//!                                       ↓
//!                                  [STP_TABLE] (capacity facts)
//! ```
//!
//! # Key Components
//!
//! - [`stp::StpOrch`]: instance, VLAN-binding, and port-binding management,
//!   with reference-counted instance lifetimes
//! - [`stp::StpReconciler`]: record dispatcher with classified, bounded retry
//! - [`ports::PortRegistry`]: shared view of switch ports and their STP
//!   bindings
//! - [`daemon::StpDaemon`]: startup handshake and the event loop

pub mod daemon;
pub mod ports;
pub mod stp;
pub mod tables;
