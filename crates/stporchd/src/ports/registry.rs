//! Shared registry of switch ports.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::Port;

/// Shared, cloneable view of all switch ports keyed by alias.
///
/// Reads hand out clones; updates go through [`set_port`], which overwrites
/// the stored entry. This mirrors the get-modify-set contract the port
/// subsystem exposes to other orchestration modules.
///
/// [`set_port`]: PortRegistry::set_port
#[derive(Debug, Clone, Default)]
pub struct PortRegistry {
    ports: Arc<RwLock<BTreeMap<String, Port>>>,
}

impl PortRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the port with the given alias.
    pub fn get_port(&self, alias: &str) -> Option<Port> {
        let ports = self.ports.read().unwrap_or_else(|e| e.into_inner());
        ports.get(alias).cloned()
    }

    /// Stores a port, replacing any entry under the same alias.
    pub fn set_port(&self, port: Port) {
        let mut ports = self.ports.write().unwrap_or_else(|e| e.into_inner());
        ports.insert(port.alias.clone(), port);
    }

    /// Removes a port.
    pub fn remove_port(&self, alias: &str) -> Option<Port> {
        let mut ports = self.ports.write().unwrap_or_else(|e| e.into_inner());
        ports.remove(alias)
    }

    /// Returns true if a port with the alias exists.
    pub fn contains(&self, alias: &str) -> bool {
        let ports = self.ports.read().unwrap_or_else(|e| e.into_inner());
        ports.contains_key(alias)
    }

    /// Returns a snapshot of every port, in alias order.
    pub fn snapshot(&self) -> Vec<Port> {
        let ports = self.ports.read().unwrap_or_else(|e| e.into_inner());
        ports.values().cloned().collect()
    }

    /// Returns the number of ports.
    pub fn len(&self) -> usize {
        let ports = self.ports.read().unwrap_or_else(|e| e.into_inner());
        ports.len()
    }

    /// Returns true if the registry holds no ports.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
