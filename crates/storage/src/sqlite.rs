//! `SQLite` backend for the desktop host process.
//!
//! One table, `kvstore (key TEXT PRIMARY KEY, value TEXT)`, holding JSON
//! text. Statements go through rusqlite's per-connection statement cache so
//! each is compiled once and reused. All methods on [`SqliteBackend`] are
//! synchronous; the [`KvBackend`] impl moves them onto the blocking pool.

use std::path::Path;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension as _, Transaction, TransactionBehavior, params};
use serde_json::Value;

use enhancer_core::constants::KV_TABLE;

use crate::backend::{KvBackend, ValueEncoding};
use crate::batch::{Batch, Mutation};
use crate::{Result, StorageError};

pub const SCHEMA_VERSION: i32 = 1;

const SELECT_SQL: &str = "SELECT value FROM kvstore WHERE key = ?1 LIMIT 1";
const EXISTS_SQL: &str = "SELECT 1 FROM kvstore WHERE key = ?1 LIMIT 1";
const INSERT_SQL: &str = "INSERT INTO kvstore (key, value) VALUES (?1, ?2)";
const UPDATE_SQL: &str = "UPDATE kvstore SET value = ?1 WHERE key = ?2";
const DELETE_SQL: &str = "DELETE FROM kvstore WHERE key = ?1";
const DUMP_SQL: &str = "SELECT key, value FROM kvstore";

/// Type alias for pooled connection
pub(crate) type PooledConn = PooledConnection<SqliteConnectionManager>;

/// `SQLite` store wrapping a connection pool
#[derive(Clone, Debug)]
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
}

fn init_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA busy_timeout = 30000;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// Create the schema if the file is new.
pub fn run_migrations(conn: &Connection) -> std::result::Result<(), rusqlite::Error> {
    let current_version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    tracing::debug!(current_version, target = SCHEMA_VERSION, "database schema version");

    if current_version < 1 {
        // Files written before versioning already have the table.
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {KV_TABLE} (
                key     TEXT PRIMARY KEY,
                value   TEXT
            );"
        ))?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    Ok(())
}

/// Text column content for a raw stored value.
fn column_text(raw: &Value) -> String {
    match raw {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn upsert(tx: &Transaction<'_>, key: &str, text: &str) -> Result<()> {
    let exists = tx.prepare_cached(EXISTS_SQL)?.exists(params![key])?;
    if exists {
        tx.prepare_cached(UPDATE_SQL)?.execute(params![text, key])?;
    } else {
        tx.prepare_cached(INSERT_SQL)?.execute(params![key, text])?;
    }
    Ok(())
}

impl SqliteBackend {
    /// Open (creating if needed) the store at `db_path`.
    ///
    /// The schema is created on a direct connection first so an unusable
    /// path fails immediately instead of inside the pool's retry loop.
    ///
    /// # Errors
    /// Returns [`StorageError::Init`] if the file cannot be opened or migrated.
    pub fn open(db_path: &Path, pool_size: u32) -> Result<Self> {
        let init_err = |source| StorageError::Init { path: db_path.to_path_buf(), source };

        let mut conn = Connection::open(db_path).map_err(init_err)?;
        init_connection(&mut conn).map_err(init_err)?;
        run_migrations(&conn).map_err(init_err)?;
        drop(conn);

        let manager = SqliteConnectionManager::file(db_path).with_init(init_connection);
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager)?;

        tracing::info!(path = %db_path.display(), pool_size, "SQLite store opened");

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConn> {
        Ok(self.pool.get()?)
    }

    /// Stored JSON text for `key`; `NULL` values read as absent.
    pub fn get_text(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(SELECT_SQL)?;
        let text: Option<Option<String>> =
            stmt.query_row(params![key], |row| row.get(0)).optional()?;
        Ok(text.flatten())
    }

    /// Apply `batch` in one transaction: all mutations commit or none do.
    ///
    /// The write lock is taken up front so concurrent upserts of the same
    /// key serialize on the existence check.
    pub fn apply_batch(&self, batch: Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        tracing::trace!(mutations = batch.len(), "applying batch");
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for mutation in batch {
            match mutation {
                Mutation::Put { key, value } => upsert(&tx, &key, &column_text(&value))?,
                Mutation::Delete { key } => {
                    tx.prepare_cached(DELETE_SQL)?.execute(params![key])?;
                },
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Every row. Rows with a `NULL` value are skipped.
    pub fn dump_rows(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(DUMP_SQL)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().filter_map(|(key, value)| value.map(|v| (key, v))).collect())
    }
}

/// Helper: run a blocking closure on the tokio blocking pool.
async fn blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

#[async_trait]
impl KvBackend for SqliteBackend {
    fn encoding(&self) -> ValueEncoding {
        ValueEncoding::Text
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let s = self.clone();
        let key = key.to_owned();
        let text = blocking(move || s.get_text(&key)).await?;
        Ok(text.map(Value::String))
    }

    async fn apply(&self, batch: Batch) -> Result<()> {
        let s = self.clone();
        blocking(move || s.apply_batch(batch)).await
    }

    async fn dump(&self) -> Result<Vec<(String, Value)>> {
        let s = self.clone();
        let rows = blocking(move || s.dump_rows()).await?;
        Ok(rows.into_iter().map(|(key, text)| (key, Value::String(text))).collect())
    }
}
