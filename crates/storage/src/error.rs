//! Typed error enum for the storage layer.
//!
//! Callers match on the failure mode (store could not be opened, transient
//! SQLite contention, host storage rejection) instead of inspecting strings.

#[cfg(feature = "sqlite")]
use std::path::PathBuf;

use thiserror::Error;

/// Storage-layer error with variants covering every expected failure mode.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The durable store could not be opened or its schema created.
    #[cfg(feature = "sqlite")]
    #[error("failed to open store at {}: {source}", path.display())]
    Init {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// SQL statement or transaction failure.
    #[cfg(feature = "sqlite")]
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection became available.
    #[cfg(feature = "sqlite")]
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The host-managed storage area rejected an operation.
    #[error("host storage error: {0}")]
    Host(String),

    /// A blocking database task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// A value could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Whether this error is likely transient (worth retrying).
    pub fn is_transient(&self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            #[cfg(feature = "sqlite")]
            Self::Pool(_) => true,
            _ => false,
        }
    }

    /// Whether the store never came up.
    pub fn is_init(&self) -> bool {
        #[cfg(feature = "sqlite")]
        {
            matches!(self, Self::Init { .. })
        }
        #[cfg(not(feature = "sqlite"))]
        {
            false
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
