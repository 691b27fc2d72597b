//! Reconciliation primitives shared by STP orchestration daemons.
//!
//! The pieces here implement the event-driven model the daemons follow:
//!
//! 1. Protocol decisions land in application tables as key/op/field-value
//!    records.
//! 2. An [`Orch`] subscribes to its tables through [`Consumer`]s, which
//!    buffer and deduplicate pending records.
//! 3. The daemon loop calls [`Orch::do_task`] whenever records are pending;
//!    the Orch translates each record into hardware calls.
//! 4. Failures are classified through [`TaskStatus`]: transient ones stay in
//!    the consumer under a bounded [`RetryBudget`], permanent ones are
//!    logged and dropped.
//! 5. Operational facts are published back through a [`Table`].

mod consumer;
mod orch;
mod retry;
mod table;
mod task;

pub use consumer::{Consumer, FieldValue, KeyOpFieldsValues, Operation};
pub use orch::{Orch, OrchContext};
pub use retry::{RetryBudget, RetryDecision};
pub use table::Table;
pub use task::{TaskError, TaskResult, TaskResultExt, TaskStatus};
