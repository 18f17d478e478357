//! Storage layer for the enhancer
//!
//! A namespaced key-value store over two interchangeable backends: a SQLite
//! file for the desktop host process and the host-managed storage area of
//! the extension runtime.

mod backend;
pub mod batch;
mod error;
mod host;
#[cfg(feature = "sqlite")]
mod sqlite;
mod store;
#[cfg(test)]
mod tests;

pub use backend::{BackendKind, KvBackend, ValueEncoding};
pub use batch::{Batch, Mutation};
pub use error::{Result, StorageError};
pub use host::{HostStorage, MemoryStorageArea, StorageArea};
#[cfg(feature = "sqlite")]
pub use sqlite::{SCHEMA_VERSION, SqliteBackend, run_migrations};
pub use store::KvStore;
