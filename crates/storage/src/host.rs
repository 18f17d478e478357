//! Host-managed storage backend for the extension runtime.
//!
//! The host exposes an asynchronous storage area with bulk `get`, `set` and
//! `remove` and no transactions. Every key write is independent, so a batch
//! that fails halfway leaves the earlier writes applied; callers must not
//! rely on cross-key atomicity on this backend.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::Result;
use crate::backend::{KvBackend, ValueEncoding};
use crate::batch::{Batch, Run};

/// Asynchronous storage area provided by the host (extension storage API).
#[async_trait]
pub trait StorageArea: Send + Sync + Debug {
    /// Values for the given keys; missing keys are omitted.
    async fn get(&self, keys: &[String]) -> Result<Map<String, Value>>;

    /// Every stored item.
    async fn get_all(&self) -> Result<Map<String, Value>>;

    /// Store every item, replacing existing values.
    async fn set(&self, items: Map<String, Value>) -> Result<()>;

    /// Remove the given keys; missing keys are ignored.
    async fn remove(&self, keys: &[String]) -> Result<()>;
}

/// In-process storage area.
#[derive(Debug, Default)]
pub struct MemoryStorageArea {
    items: RwLock<Map<String, Value>>,
}

impl MemoryStorageArea {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageArea for MemoryStorageArea {
    async fn get(&self, keys: &[String]) -> Result<Map<String, Value>> {
        let items = self.items.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| items.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    async fn get_all(&self) -> Result<Map<String, Value>> {
        Ok(self.items.read().await.clone())
    }

    async fn set(&self, items: Map<String, Value>) -> Result<()> {
        self.items.write().await.extend(items);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let mut items = self.items.write().await;
        for key in keys {
            items.remove(key);
        }
        Ok(())
    }
}

/// [`KvBackend`] over a host [`StorageArea`]; values are stored natively.
#[derive(Debug, Clone)]
pub struct HostStorage {
    area: Arc<dyn StorageArea>,
}

impl HostStorage {
    pub fn new(area: Arc<dyn StorageArea>) -> Self {
        Self { area }
    }
}

#[async_trait]
impl KvBackend for HostStorage {
    fn encoding(&self) -> ValueEncoding {
        ValueEncoding::Native
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut found = self.area.get(&[key.to_owned()]).await?;
        Ok(found.remove(key))
    }

    async fn apply(&self, batch: Batch) -> Result<()> {
        for run in batch.into_runs() {
            match run {
                Run::Puts(items) => self.area.set(items).await?,
                Run::Deletes(keys) => self.area.remove(&keys).await?,
            }
        }
        Ok(())
    }

    /// No native dump: reads the whole area and lets the caller filter.
    async fn dump(&self) -> Result<Vec<(String, Value)>> {
        Ok(self.area.get_all().await?.into_iter().collect())
    }
}
