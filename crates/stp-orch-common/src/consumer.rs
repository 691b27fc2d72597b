//! Buffered consumption of key/op/field-value records from application tables.

use std::collections::{BTreeMap, VecDeque};

use log::debug;

/// Operation carried by a table record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Add or update a key.
    Set,
    /// Remove a key.
    Del,
}

impl Operation {
    /// Parses the wire representation ("SET"/"DEL").
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SET" => Some(Operation::Set),
            "DEL" => Some(Operation::Del),
            _ => None,
        }
    }

    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Set => "SET",
            Operation::Del => "DEL",
        }
    }

    /// Returns true for a Set operation.
    pub fn is_set(&self) -> bool {
        matches!(self, Operation::Set)
    }

    /// Returns true for a Del operation.
    pub fn is_del(&self) -> bool {
        matches!(self, Operation::Del)
    }
}

/// One field-value pair of a table record.
pub type FieldValue = (String, String);

/// A single record popped from an application table: the key it addresses,
/// the operation, and the field-value payload (empty for Del).
#[derive(Debug, Clone)]
pub struct KeyOpFieldsValues {
    pub key: String,
    pub op: Operation,
    pub fvs: Vec<FieldValue>,
}

impl KeyOpFieldsValues {
    /// Creates a record.
    pub fn new(key: impl Into<String>, op: Operation, fvs: Vec<FieldValue>) -> Self {
        Self {
            key: key.into(),
            op,
            fvs,
        }
    }

    /// Creates a Set record.
    pub fn set(key: impl Into<String>, fvs: Vec<FieldValue>) -> Self {
        Self::new(key, Operation::Set, fvs)
    }

    /// Creates a Del record.
    pub fn del(key: impl Into<String>) -> Self {
        Self::new(key, Operation::Del, vec![])
    }

    /// Returns the value of a field, if the record carries it.
    pub fn get_field(&self, field: &str) -> Option<&str> {
        self.fvs
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if the record carries the field.
    pub fn has_field(&self, field: &str) -> bool {
        self.fvs.iter().any(|(f, _)| f == field)
    }
}

/// Buffers records from one application table for an Orch.
///
/// Records accumulate between drains; per-key deduplication keeps the buffer
/// equivalent to replaying the raw stream in arrival order:
///
/// - Set after Set merges field-values, newer values winning.
/// - Del supersedes anything pending for the key.
/// - Set after Del keeps both, in order.
///
/// Records that could not be applied are pushed back with [`retry`] and
/// come out first on the next drain.
///
/// [`retry`]: Consumer::retry
pub struct Consumer {
    table_name: String,
    priority: i32,
    /// Pending records, keyed for deduplication. BTreeMap keeps drain order
    /// deterministic.
    to_sync: BTreeMap<String, VecDeque<KeyOpFieldsValues>>,
    pending: usize,
}

impl Consumer {
    /// Creates a consumer for the named table.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            priority: 0,
            to_sync: BTreeMap::new(),
            pending: 0,
        }
    }

    /// Sets the drain priority (lower drains first).
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Returns the table name this consumer reads.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the drain priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns true if any records are pending.
    pub fn has_pending(&self) -> bool {
        self.pending > 0
    }

    /// Returns the number of pending records.
    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// Buffers a batch of records with deduplication.
    pub fn add_to_sync(&mut self, records: Vec<KeyOpFieldsValues>) {
        for record in records {
            self.push_record(record);
        }
    }

    fn push_record(&mut self, record: KeyOpFieldsValues) {
        let queue = self.to_sync.entry(record.key.clone()).or_default();

        match record.op {
            Operation::Del => {
                // A delete makes everything pending for the key moot.
                if !queue.is_empty() {
                    debug!(
                        "{}: delete supersedes {} pending records for {}",
                        self.table_name,
                        queue.len(),
                        record.key
                    );
                }
                self.pending -= queue.len();
                queue.clear();
                queue.push_back(record);
                self.pending += 1;
            }
            Operation::Set => {
                if let Some(last) = queue.back_mut() {
                    if last.op.is_set() {
                        for (field, value) in record.fvs {
                            match last.fvs.iter_mut().find(|(f, _)| *f == field) {
                                Some(slot) => slot.1 = value,
                                None => last.fvs.push((field, value)),
                            }
                        }
                        return;
                    }
                }
                queue.push_back(record);
                self.pending += 1;
            }
        }
    }

    /// Takes all pending records, per-key order preserved.
    pub fn drain(&mut self) -> Vec<KeyOpFieldsValues> {
        let mut out = Vec::with_capacity(self.pending);
        for (_, queue) in std::mem::take(&mut self.to_sync) {
            out.extend(queue);
        }
        self.pending = 0;
        out
    }

    /// Pushes a record back for another attempt on the next drain.
    pub fn retry(&mut self, record: KeyOpFieldsValues) {
        self.to_sync
            .entry(record.key.clone())
            .or_default()
            .push_front(record);
        self.pending += 1;
    }

    /// Drops all pending records.
    pub fn clear(&mut self) {
        self.to_sync.clear();
        self.pending = 0;
    }

    /// Renders the pending records for debug dumps.
    pub fn dump(&self) -> Vec<String> {
        self.to_sync
            .values()
            .flat_map(|queue| queue.iter())
            .map(|r| format!("{}|{} {} {:?}", self.table_name, r.key, r.op.as_str(), r.fvs))
            .collect()
    }
}
