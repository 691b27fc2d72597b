//! Switch port model and the shared registry.

mod port;
mod registry;

pub use port::{Port, PortType};
pub use registry::PortRegistry;
