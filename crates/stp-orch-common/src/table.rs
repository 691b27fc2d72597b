//! State table writer for publishing operational facts.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::consumer::FieldValue;

/// A named key/field-value table an Orch publishes into.
///
/// Backed by shared memory; clones write to the same table. The daemon hands
/// an Orch the tables it owns, tests read them back through [`get`].
///
/// [`get`]: Table::get
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    entries: Arc<Mutex<BTreeMap<String, BTreeMap<String, String>>>>,
}

impl Table {
    /// Creates an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes field-values under a key, merging with existing fields.
    pub fn set(&self, key: &str, fvs: Vec<FieldValue>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(key.to_string()).or_default();
        for (field, value) in fvs {
            entry.insert(field, value);
        }
    }

    /// Removes a key.
    pub fn del(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }

    /// Reads all field-values under a key.
    pub fn get(&self, key: &str) -> Option<Vec<FieldValue>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .map(|fields| fields.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
    }

    /// Reads one field under a key.
    pub fn hget(&self, key: &str, field: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).and_then(|fields| fields.get(field)).cloned()
    }

    /// Returns all keys.
    pub fn keys(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.keys().cloned().collect()
    }
}
