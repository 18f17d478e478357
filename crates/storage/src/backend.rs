//! Storage backend trait abstraction
//!
//! Both storage media implement [`KvBackend`]; the store picks one when it is
//! first used and never branches on the host type afterwards.

use std::fmt::Debug;
#[cfg(feature = "sqlite")]
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;
use crate::batch::Batch;
use crate::host::{HostStorage, StorageArea};

/// How a backend represents values at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoding {
    /// Values are kept as JSON text (`Value::String` holding the document).
    Text,
    /// Values are kept as native JSON values.
    Native,
}

impl ValueEncoding {
    /// Raw stored form of `value`.
    ///
    /// # Errors
    /// Returns error if `value` cannot be serialized.
    pub fn encode(self, value: &Value) -> Result<Value> {
        Ok(match self {
            Self::Text => Value::String(serde_json::to_string(value)?),
            Self::Native => value.clone(),
        })
    }

    /// Decoded form of a raw stored value. Corrupt text decodes to `None`.
    #[must_use]
    pub fn decode(self, raw: Value) -> Option<Value> {
        match (self, raw) {
            (Self::Text, Value::String(text)) => match serde_json::from_str(&text) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(error = %e, "stored value is not valid JSON, treating as absent");
                    None
                },
            },
            (_, raw) => Some(raw),
        }
    }
}

/// A concrete storage medium.
///
/// Keys passed to a backend are fully qualified; namespacing happens above.
#[async_trait]
pub trait KvBackend: Send + Sync + Debug {
    /// Representation of values at rest.
    fn encoding(&self) -> ValueEncoding;

    /// Raw stored value for `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Apply every mutation of `batch`.
    async fn apply(&self, batch: Batch) -> Result<()>;

    /// Every record, as `(key, raw value)` pairs.
    async fn dump(&self) -> Result<Vec<(String, Value)>>;
}

/// Backend selection, fixed per process type.
#[derive(Debug, Clone)]
pub enum BackendKind {
    /// Durable SQLite file, used by the desktop host process.
    #[cfg(feature = "sqlite")]
    Sqlite { path: PathBuf, pool_size: u32 },
    /// Host-provided storage area, used by the extension runtime.
    Host(Arc<dyn StorageArea>),
    /// Caller-supplied backend.
    Custom(Arc<dyn KvBackend>),
}

impl BackendKind {
    /// Open the selected backend.
    ///
    /// # Errors
    /// Returns error if the durable store cannot be opened.
    pub async fn open(&self) -> Result<Arc<dyn KvBackend>> {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite { path, pool_size } => {
                let path = path.clone();
                let pool_size = *pool_size;
                let backend = tokio::task::spawn_blocking(move || {
                    crate::sqlite::SqliteBackend::open(&path, pool_size)
                })
                .await??;
                Ok(Arc::new(backend))
            },
            Self::Host(area) => Ok(Arc::new(HostStorage::new(Arc::clone(area)))),
            Self::Custom(backend) => Ok(Arc::clone(backend)),
        }
    }
}
