//! Core error types for rogueday-core.
//!
//! `EconomyError` is the user-facing taxonomy returned by every engine
//! operation. Storage and configuration failures get their own enums and
//! are folded into `CoreError` at the engine boundary.

use std::path::PathBuf;
use thiserror::Error;

use crate::task::{TaskAction, TaskStatus};
use crate::tier::{TierLevel, TimerMode};

/// Core error type for rogueday-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Rule violations raised by the run economy
    #[error(transparent)]
    Economy(#[from] EconomyError),

    /// Persistence collaborator failures
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// The economy error behind this failure, if that is what it is.
    pub fn as_economy(&self) -> Option<&EconomyError> {
        match self {
            CoreError::Economy(e) => Some(e),
            _ => None,
        }
    }
}

/// Recoverable rule violations. None of these are process-fatal; the
/// presentation layer turns them into user feedback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EconomyError {
    #[error("a run is already active")]
    RunAlreadyActive,

    #[error("no active run")]
    NoActiveRun,

    #[error("tier {tier} is locked: requires {required_minutes} focus minutes, have {lifetime_minutes}")]
    TierLocked {
        tier: TierLevel,
        required_minutes: u32,
        lifetime_minutes: u32,
    },

    #[error("not enough energy: need {required}, have {available}")]
    InsufficientEnergy { required: u32, available: u32 },

    #[error("duration {duration}m is outside tier {tier} range {min}-{max}m")]
    InvalidDuration {
        tier: TierLevel,
        duration: u32,
        min: u32,
        max: u32,
    },

    #[error("cannot {action} task {task_id} while it is {status}")]
    InvalidTaskState {
        task_id: String,
        status: TaskStatus,
        action: TaskAction,
    },

    #[error("task title must not be empty")]
    EmptyTitle,

    #[error("preset name must not be empty")]
    EmptyName,

    #[error("tier {tier} timer mode is {mode}; use_timer={use_timer} is not allowed")]
    TimerModeMismatch {
        tier: TierLevel,
        mode: TimerMode,
        use_timer: bool,
    },

    #[error("unknown tier: {0} (must be 1, 2, or 3)")]
    UnknownTier(u8),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("preset not found: {0}")]
    PresetNotFound(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),
}

/// Persistence-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored row could not be turned back into a domain value
    #[error("Corrupt record in {table}: {message}")]
    Corrupt { table: &'static str, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// The run was saved by another writer since it was loaded
    #[error("run {run_id} was changed by another writer; reload and retry")]
    StaleWrite { run_id: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Store(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
