//! Classification of per-record processing outcomes.

use stp_sai::SaiError;
use thiserror::Error;

/// Outcome of applying one table record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Applied (or verified already applied).
    Success,
    /// Record is malformed; drop it without touching hardware.
    InvalidEntry,
    /// Permanent failure; drop after logging.
    Failed,
    /// Transient failure; leave the record pending.
    NeedRetry,
    /// Nothing to do for this record.
    Ignore,
}

impl TaskStatus {
    /// Returns true if the record is finished and should be consumed.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Ignore)
    }

    /// Returns true if the record should stay pending.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskStatus::NeedRetry)
    }

    /// Returns true for a permanent failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::InvalidEntry | TaskStatus::Failed)
    }
}

/// Error raised while applying a table record.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The record itself is malformed (bad key, missing field, unparsable
    /// value). Never retried.
    #[error("invalid entry: {message}")]
    InvalidEntry { message: String },

    /// A hardware call failed. Retryability follows the underlying status.
    #[error("hardware call failed: {source}")]
    Hardware {
        #[source]
        source: SaiError,
    },

    /// A dependency is not in place yet; retry once it might be.
    #[error("retry needed: {reason}")]
    NeedRetry { reason: String },

    /// The record requires no action.
    #[error("ignored: {reason}")]
    Ignored { reason: String },

    /// Internal inconsistency.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl TaskError {
    /// Creates an invalid-entry error.
    pub fn invalid_entry(message: impl Into<String>) -> Self {
        TaskError::InvalidEntry {
            message: message.into(),
        }
    }

    /// Creates a retry request.
    pub fn need_retry(reason: impl Into<String>) -> Self {
        TaskError::NeedRetry {
            reason: reason.into(),
        }
    }

    /// Creates an ignored outcome.
    pub fn ignored(reason: impl Into<String>) -> Self {
        TaskError::Ignored {
            reason: reason.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        TaskError::Internal {
            message: message.into(),
        }
    }

    /// Maps this error onto a processing status.
    ///
    /// Hardware failures split on the status code: resource exhaustion and
    /// other transient conditions become [`TaskStatus::NeedRetry`], anything
    /// else is a permanent [`TaskStatus::Failed`].
    pub fn to_status(&self) -> TaskStatus {
        match self {
            TaskError::InvalidEntry { .. } => TaskStatus::InvalidEntry,
            TaskError::Hardware { source } if source.is_retryable() => TaskStatus::NeedRetry,
            TaskError::Hardware { .. } => TaskStatus::Failed,
            TaskError::NeedRetry { .. } => TaskStatus::NeedRetry,
            TaskError::Ignored { .. } => TaskStatus::Ignore,
            TaskError::Internal { .. } => TaskStatus::Failed,
        }
    }
}

impl From<SaiError> for TaskError {
    fn from(source: SaiError) -> Self {
        TaskError::Hardware { source }
    }
}

/// Result of applying one record.
pub type TaskResult<T> = Result<T, TaskError>;

/// Converts a [`TaskResult`] into the status the dispatcher acts on.
pub trait TaskResultExt {
    fn to_status(&self) -> TaskStatus;
}

impl<T> TaskResultExt for TaskResult<T> {
    fn to_status(&self) -> TaskStatus {
        match self {
            Ok(_) => TaskStatus::Success,
            Err(e) => e.to_status(),
        }
    }
}
