//! Namespaced key-value store.
//!
//! [`KvStore`] resolves namespaced keys, encodes values for the active
//! backend and routes multi-key writes through a [`Batch`]. The backend is
//! opened on first use and kept for the life of the store.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use enhancer_core::{Namespace, StoreOperation, StoreRequest};

use crate::Result;
use crate::backend::{BackendKind, KvBackend};
use crate::batch::Batch;

/// Backend-agnostic store front.
#[derive(Debug)]
pub struct KvStore {
    kind: BackendKind,
    backend: OnceCell<Arc<dyn KvBackend>>,
}

impl KvStore {
    /// Store that opens `kind` on first use.
    #[must_use]
    pub fn new(kind: BackendKind) -> Self {
        Self { kind, backend: OnceCell::new() }
    }

    /// Store over an already-open backend.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn KvBackend>) -> Self {
        Self::new(BackendKind::Custom(backend))
    }

    /// The active backend, opening it if this is the first call.
    ///
    /// A failed open is not cached; the next call tries again and reports
    /// the error to its own caller.
    ///
    /// # Errors
    /// Returns error if the backend cannot be opened.
    pub async fn backend(&self) -> Result<&Arc<dyn KvBackend>> {
        self.backend.get_or_try_init(|| self.kind.open()).await
    }

    /// Decoded value of `key` in `namespace`, falling back to
    /// `fallbacks[key]` when nothing usable is stored.
    ///
    /// # Errors
    /// Returns error if the backend cannot be reached; corrupt values are
    /// treated as absent.
    pub async fn get(
        &self,
        namespace: &Namespace,
        key: &str,
        fallbacks: &Map<String, Value>,
    ) -> Result<Option<Value>> {
        let backend = self.backend().await?;
        let stored = backend
            .get(&namespace.resolve(key))
            .await?
            .and_then(|raw| backend.encoding().decode(raw))
            .filter(|value| !value.is_null());
        Ok(stored.or_else(|| fallbacks.get(key).cloned()))
    }

    /// Upsert one value.
    ///
    /// # Errors
    /// Returns error if the value cannot be encoded or the write fails.
    pub async fn set(&self, namespace: &Namespace, key: &str, value: &Value) -> Result<bool> {
        let backend = self.backend().await?;
        let raw = backend.encoding().encode(value)?;
        backend.apply(Batch::puts([(namespace.resolve(key), raw)])).await?;
        Ok(true)
    }

    /// Delete every key as one batch. Missing keys are not an error.
    ///
    /// # Errors
    /// Returns error if the delete fails.
    pub async fn remove<S: AsRef<str>>(&self, namespace: &Namespace, keys: &[S]) -> Result<bool> {
        let backend = self.backend().await?;
        let keys = keys.iter().map(|key| namespace.resolve(key.as_ref()));
        backend.apply(Batch::deletes(keys)).await?;
        Ok(true)
    }

    /// Raw stored values of every record in `namespace`, keyed by local key.
    ///
    /// # Errors
    /// Returns error if the backend cannot be read.
    pub async fn export(&self, namespace: &Namespace) -> Result<Map<String, Value>> {
        let backend = self.backend().await?;
        Ok(backend
            .dump()
            .await?
            .into_iter()
            .filter_map(|(key, raw)| namespace.strip(&key).map(|local| (local.to_owned(), raw)))
            .collect())
    }

    /// Upsert raw values under `namespace` as one batch.
    ///
    /// Every key gets the namespace prefix, mirroring [`KvStore::export`].
    ///
    /// # Errors
    /// Returns error if the write fails.
    pub async fn import(&self, namespace: &Namespace, obj: Map<String, Value>) -> Result<bool> {
        let backend = self.backend().await?;
        let prefix = namespace.prefix();
        let items = obj.into_iter().map(|(key, raw)| (format!("{prefix}{key}"), raw));
        backend.apply(Batch::puts(items)).await?;
        Ok(true)
    }

    /// Run a request envelope and return its JSON reply.
    ///
    /// # Errors
    /// Propagates backend errors from the underlying operation.
    pub async fn query(&self, request: &StoreRequest) -> Result<Value> {
        let ns = &request.namespace;
        Ok(match &request.operation {
            StoreOperation::Get { key, fallbacks } => {
                self.get(ns, key, fallbacks).await?.unwrap_or(Value::Null)
            },
            StoreOperation::Set { key, value } => Value::Bool(self.set(ns, key, value).await?),
            StoreOperation::Remove { keys } => Value::Bool(self.remove(ns, keys.as_slice()).await?),
            StoreOperation::Export => Value::Object(self.export(ns).await?),
            StoreOperation::Import { obj } => Value::Bool(self.import(ns, obj.clone()).await?),
        })
    }
}
