//! Error types for the persistence engine.
//!
//! Every failure inside `load()`/`save()` is mapped to one of four kinds:
//! storage, serialization, transformation or invalid version.

use std::fmt;

use thiserror::Error;

/// Errors raised by a storage engine.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Why a saved version cannot be brought to the target version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionMismatch {
    /// The saved data is newer than the running code.
    Downgrade,
    /// No registered migration exists above `stuck_at`.
    NoMigrationPath { stuck_at: i64 },
}

impl fmt::Display for VersionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionMismatch::Downgrade => write!(f, "downgrading is not supported"),
            VersionMismatch::NoMigrationPath { stuck_at } => {
                write!(f, "no migration registered above version {}", stuck_at)
            }
        }
    }
}

/// Errors raised by [`Persistor::load`](crate::Persistor::load) and
/// [`Persistor::save`](crate::Persistor::save).
#[derive(Error, Debug)]
pub enum PersistError {
    /// The storage backend failed to read or write.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The envelope string could not be parsed or produced.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A transform, migration or the decoder failed.
    #[error("Transformation error in {stage}: {message}")]
    Transformation { stage: String, message: String },

    /// The saved version cannot be migrated to the target version.
    #[error("Invalid version: saved {saved}, target {target} ({reason})")]
    InvalidVersion {
        saved: i64,
        target: i64,
        reason: VersionMismatch,
    },
}

impl PersistError {
    /// Wrap a caller-supplied closure failure, keeping its full error chain.
    pub fn transformation(stage: impl Into<String>, error: anyhow::Error) -> Self {
        PersistError::Transformation {
            stage: stage.into(),
            message: format!("{:#}", error),
        }
    }

    /// Short kind name, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PersistError::Storage(_) => "storage",
            PersistError::Serialization(_) => "serialization",
            PersistError::Transformation { .. } => "transformation",
            PersistError::InvalidVersion { .. } => "invalid_version",
        }
    }
}

pub type Result<T, E = PersistError> = std::result::Result<T, E>;
