//! Bounded retry accounting for transiently failed records.
//!
//! A record that fails with a transient status stays in its consumer, but
//! unbounded replay would let one stuck record hammer the hardware forever.
//! The budget bounds attempts per record and spaces them out with an
//! exponential backoff measured in daemon timer cycles.

use std::collections::HashMap;

/// What to do with a record after a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Keep the record pending; it becomes eligible again after backoff.
    Retry,
    /// Attempts exhausted; drop the record.
    GiveUp,
}

#[derive(Debug)]
struct RetryState {
    attempts: u32,
    eligible_at: u64,
}

/// Per-record retry accounting, keyed by "table|key".
#[derive(Debug)]
pub struct RetryBudget {
    max_attempts: u32,
    max_backoff_cycles: u64,
    cycle: u64,
    entries: HashMap<String, RetryState>,
}

impl RetryBudget {
    /// Creates a budget allowing `max_attempts` failed attempts per record,
    /// with backoff capped at `max_backoff_cycles` timer cycles.
    pub fn new(max_attempts: u32, max_backoff_cycles: u64) -> Self {
        Self {
            max_attempts,
            max_backoff_cycles,
            cycle: 0,
            entries: HashMap::new(),
        }
    }

    /// Advances the cycle counter. Called once per daemon timer tick.
    pub fn tick(&mut self) {
        self.cycle += 1;
    }

    /// Returns the current cycle.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Returns true if the record may be attempted this cycle.
    ///
    /// Records the budget has never seen are always eligible.
    pub fn is_eligible(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map_or(true, |state| state.eligible_at <= self.cycle)
    }

    /// Returns the number of failed attempts recorded for the record.
    pub fn attempts(&self, key: &str) -> u32 {
        self.entries.get(key).map_or(0, |state| state.attempts)
    }

    /// Records a transient failure and decides the record's fate.
    ///
    /// Backoff doubles with each failure: 1, 2, 4, ... cycles, capped.
    pub fn record_failure(&mut self, key: &str) -> RetryDecision {
        let state = self.entries.entry(key.to_string()).or_insert(RetryState {
            attempts: 0,
            eligible_at: self.cycle,
        });
        state.attempts += 1;

        if state.attempts >= self.max_attempts {
            self.entries.remove(key);
            return RetryDecision::GiveUp;
        }

        let backoff = 1u64
            .checked_shl(state.attempts - 1)
            .unwrap_or(self.max_backoff_cycles)
            .min(self.max_backoff_cycles);
        state.eligible_at = self.cycle + backoff;
        RetryDecision::Retry
    }

    /// Forgets a record, resetting its attempt count. Called on success or
    /// when the record is superseded.
    pub fn clear(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Returns the number of records currently under backoff.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no records are under backoff.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
