//! Hardware status and error handling.
//!
//! Raw status codes from the abstraction layer are converted into
//! `SaiError`, with a transient/permanent classification the dispatcher
//! uses to decide between retry and drop.

use std::fmt;
use thiserror::Error;

/// Status codes matching `sai_status_t`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaiStatus {
    Success = 0,
    Failure = -1,
    NotSupported = -2,
    NoMemory = -3,
    InsufficientResources = -4,
    InvalidParameter = -5,
    ItemAlreadyExists = -6,
    ItemNotFound = -7,
    Uninitialized = -12,
    TableFull = -13,
    ObjectInUse = -17,
    InvalidObjectId = -19,
    NotExecuted = -23,
}

impl SaiStatus {
    /// Creates a SaiStatus from a raw i32 value.
    pub fn from_raw(status: i32) -> Self {
        match status {
            0 => SaiStatus::Success,
            -2 => SaiStatus::NotSupported,
            -3 => SaiStatus::NoMemory,
            -4 => SaiStatus::InsufficientResources,
            -5 => SaiStatus::InvalidParameter,
            -6 => SaiStatus::ItemAlreadyExists,
            -7 => SaiStatus::ItemNotFound,
            -12 => SaiStatus::Uninitialized,
            -13 => SaiStatus::TableFull,
            -17 => SaiStatus::ObjectInUse,
            -19 => SaiStatus::InvalidObjectId,
            -23 => SaiStatus::NotExecuted,
            _ => SaiStatus::Failure,
        }
    }

    /// Returns true if the status indicates success.
    pub fn is_success(&self) -> bool {
        *self == SaiStatus::Success
    }

    /// Converts to a Result, returning Ok(()) for success.
    pub fn into_result(self) -> SaiResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(SaiError::Status { status: self })
        }
    }
}

impl fmt::Display for SaiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaiStatus::Success => "SAI_STATUS_SUCCESS",
            SaiStatus::Failure => "SAI_STATUS_FAILURE",
            SaiStatus::NotSupported => "SAI_STATUS_NOT_SUPPORTED",
            SaiStatus::NoMemory => "SAI_STATUS_NO_MEMORY",
            SaiStatus::InsufficientResources => "SAI_STATUS_INSUFFICIENT_RESOURCES",
            SaiStatus::InvalidParameter => "SAI_STATUS_INVALID_PARAMETER",
            SaiStatus::ItemAlreadyExists => "SAI_STATUS_ITEM_ALREADY_EXISTS",
            SaiStatus::ItemNotFound => "SAI_STATUS_ITEM_NOT_FOUND",
            SaiStatus::Uninitialized => "SAI_STATUS_UNINITIALIZED",
            SaiStatus::TableFull => "SAI_STATUS_TABLE_FULL",
            SaiStatus::ObjectInUse => "SAI_STATUS_OBJECT_IN_USE",
            SaiStatus::InvalidObjectId => "SAI_STATUS_INVALID_OBJECT_ID",
            SaiStatus::NotExecuted => "SAI_STATUS_NOT_EXECUTED",
        };
        write!(f, "{}", s)
    }
}

/// Error type for hardware calls.
#[derive(Debug, Clone, Error)]
pub enum SaiError {
    /// The hardware call returned a failure status.
    #[error("hardware call failed: {status}")]
    Status { status: SaiStatus },

    /// The requested feature is not available in this build.
    #[error("feature not supported: {feature}")]
    NotSupported { feature: String },

    /// Invalid parameter passed to a hardware call.
    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// The referenced hardware object was not found.
    #[error("object not found: {item}")]
    NotFound { item: String },

    /// Hardware resource table is full.
    #[error("table full: {table}")]
    TableFull { table: String },

    /// The abstraction layer is not initialized.
    #[error("hardware abstraction not initialized")]
    Uninitialized,
}

impl SaiError {
    /// Creates an error from a status code.
    pub fn from_status(status: SaiStatus) -> Self {
        match status {
            SaiStatus::NotSupported => SaiError::NotSupported {
                feature: "unknown".to_string(),
            },
            SaiStatus::InvalidParameter | SaiStatus::InvalidObjectId => SaiError::InvalidParameter {
                message: format!("hardware returned {}", status),
            },
            SaiStatus::ItemNotFound => SaiError::NotFound {
                item: "unknown".to_string(),
            },
            SaiStatus::TableFull => SaiError::TableFull {
                table: "unknown".to_string(),
            },
            SaiStatus::Uninitialized => SaiError::Uninitialized,
            _ => SaiError::Status { status },
        }
    }

    /// Creates a not supported error.
    pub fn not_supported(feature: impl Into<String>) -> Self {
        SaiError::NotSupported {
            feature: feature.into(),
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        SaiError::InvalidParameter {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(item: impl Into<String>) -> Self {
        SaiError::NotFound { item: item.into() }
    }

    /// Creates a table full error.
    pub fn table_full(table: impl Into<String>) -> Self {
        SaiError::TableFull {
            table: table.into(),
        }
    }

    /// Returns the underlying status if this is a Status error.
    pub fn status(&self) -> Option<SaiStatus> {
        match self {
            SaiError::Status { status } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the failure is transient and worth retrying.
    ///
    /// Resource exhaustion and not-executed statuses clear up as other
    /// objects are released; parameter and not-found failures do not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SaiError::TableFull { .. }
                | SaiError::Status {
                    status: SaiStatus::InsufficientResources
                        | SaiStatus::NoMemory
                        | SaiStatus::NotExecuted
                        | SaiStatus::Failure
                }
        )
    }
}

/// Result type for hardware calls.
pub type SaiResult<T> = Result<T, SaiError>;
