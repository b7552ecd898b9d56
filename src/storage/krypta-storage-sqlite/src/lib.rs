//! # Krypta Storage - SQLite Backend
//!
//! SQLite implementation of the key store backend, plus the ordered schema
//! migration registry for this engine's dialect.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

use krypta_storage::{
    validate_identifier, KeyRow, KeyStoreBackend, MigrateError, MigrationStep, StorageError,
};
#[cfg(test)]
use krypta_storage::DEFAULT_HISTORY_TABLE;

/// Ordered schema steps for the `krypta_keys` table, SQLite dialect.
///
/// The sequence is frozen for compatibility with existing deployments; new
/// schema work appends steps, it never edits these.
pub const MIGRATIONS: &[MigrationStep] = &[
    MigrationStep {
        id: "1",
        up: &["CREATE TABLE IF NOT EXISTS krypta_keys (
    sid     TEXT NOT NULL,
    kid     TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0,
    keydata TEXT NOT NULL,
    PRIMARY KEY (sid, kid)
)"],
        down: &["DROP TABLE krypta_keys"],
    },
    MigrationStep {
        id: "2",
        // SQLite forbids non-constant defaults in ADD COLUMN, so the row
        // timestamp is supplied at insert time (see INSERT_KEY) and the
        // column default only covers rows that predate this step.
        up: &["ALTER TABLE krypta_keys ADD COLUMN created_at TEXT NOT NULL DEFAULT '1970-01-01 00:00:00.000'"],
        down: &["ALTER TABLE krypta_keys DROP COLUMN created_at"],
    },
    MigrationStep {
        id: "3",
        // Early releases persisted ephemeral handshake keys under this set.
        // One-way: there is nothing to restore.
        up: &["DELETE FROM krypta_keys WHERE sid = 'krypta.ephemeral.handshake'"],
        down: &[],
    },
];

const INSERT_KEY: &str = "INSERT INTO krypta_keys (sid, kid, version, keydata, created_at) \
     VALUES (?, ?, ?, ?, STRFTIME('%Y-%m-%d %H:%M:%f', 'now'))";

const SELECT_LATEST: &str = "SELECT sid, kid, version, keydata FROM krypta_keys \
     WHERE sid = ? AND kid = ? ORDER BY created_at DESC LIMIT 1";

const SELECT_SET: &str = "SELECT sid, kid, version, keydata FROM krypta_keys \
     WHERE sid = ? ORDER BY created_at DESC";

/// Rolls a transaction back, surfacing a rollback failure instead of
/// swallowing it.
async fn abort(tx: Transaction<'static, Sqlite>, cause: StorageError) -> StorageError {
    match tx.rollback().await {
        Ok(()) => cause,
        Err(err) => StorageError::RollbackFailed {
            cause: cause.to_string(),
            rollback: err.to_string(),
        },
    }
}

/// Applies the [`MIGRATIONS`] registry against a SQLite pool.
///
/// Applied-step state is recorded in a bookkeeping table named at
/// construction, so independent histories (one per test, one per logical
/// store) never interfere.
pub struct Migrator {
    pool: SqlitePool,
    history_table: String,
}

impl Migrator {
    /// Creates a migrator recording state in `history_table`.
    ///
    /// # Errors
    ///
    /// Returns an error if `history_table` is not a safe SQL identifier.
    pub fn new(pool: SqlitePool, history_table: &str) -> Result<Self, StorageError> {
        validate_identifier(history_table)?;
        Ok(Self {
            pool,
            history_table: history_table.to_string(),
        })
    }

    /// Applies all not-yet-applied steps in ascending order.
    ///
    /// Returns the number of steps applied. Already-applied steps are
    /// skipped, so re-running is a no-op.
    pub async fn up(&self) -> Result<usize, MigrateError> {
        self.up_max(usize::MAX).await
    }

    /// Applies at most `max` not-yet-applied steps in ascending order.
    ///
    /// Each step runs as its own transaction. On failure the error reports
    /// how many steps completed before the failing one.
    pub async fn up_max(&self, max: usize) -> Result<usize, MigrateError> {
        let applied = self.prepare().await?;

        let mut completed = 0;
        for step in MIGRATIONS {
            if completed >= max {
                break;
            }
            if applied.contains(step.id) {
                continue;
            }

            self.run_step(step, true)
                .await
                .map_err(|source| MigrateError { completed, source })?;
            debug!(step = step.id, "applied schema step");
            completed += 1;
        }

        if completed > 0 {
            info!(steps = completed, "schema migrated");
        }
        Ok(completed)
    }

    /// Reverts all applied steps in descending order.
    ///
    /// A step with no reverse statements only has its bookkeeping record
    /// removed; its forward effect is one-way by design.
    pub async fn down(&self) -> Result<usize, MigrateError> {
        self.down_max(usize::MAX).await
    }

    /// Reverts at most `max` applied steps in descending order.
    pub async fn down_max(&self, max: usize) -> Result<usize, MigrateError> {
        let applied = self.prepare().await?;

        let mut completed = 0;
        for step in MIGRATIONS.iter().rev() {
            if completed >= max {
                break;
            }
            if !applied.contains(step.id) {
                continue;
            }

            self.run_step(step, false)
                .await
                .map_err(|source| MigrateError { completed, source })?;
            debug!(step = step.id, "reverted schema step");
            completed += 1;
        }

        Ok(completed)
    }

    async fn prepare(&self) -> Result<HashSet<String>, MigrateError> {
        self.ensure_history()
            .await
            .map_err(|source| MigrateError {
                completed: 0,
                source,
            })?;
        self.applied_ids().await.map_err(|source| MigrateError {
            completed: 0,
            source,
        })
    }

    async fn ensure_history(&self) -> Result<(), StorageError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, applied_at TEXT NOT NULL)",
            self.history_table
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn applied_ids(&self) -> Result<HashSet<String>, StorageError> {
        let sql = format!("SELECT id FROM {}", self.history_table);
        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn run_step(&self, step: &MigrationStep, up: bool) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        let statements = if up { step.up } else { step.down };
        for statement in statements {
            if let Err(err) = sqlx::query(statement).execute(&mut *tx).await {
                return Err(abort(tx, err.into()).await);
            }
        }

        let bookkeeping = if up {
            format!(
                "INSERT INTO {} (id, applied_at) VALUES (?, STRFTIME('%Y-%m-%d %H:%M:%f', 'now'))",
                self.history_table
            )
        } else {
            format!("DELETE FROM {} WHERE id = ?", self.history_table)
        };
        if let Err(err) = sqlx::query(&bookkeeping).bind(step.id).execute(&mut *tx).await {
            return Err(abort(tx, err.into()).await);
        }

        tx.commit().await.map_err(StorageError::from)
    }
}

/// SQLite key store backend.
///
/// The pool is shared, process-wide state; this type only borrows it. Run a
/// [`Migrator`] before first use so the table shape matches what the row
/// operations assume.
#[derive(Clone)]
pub struct SqliteKeyStore {
    pool: SqlitePool,
}

impl SqliteKeyStore {
    /// Opens or creates a SQLite database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// database connection fails.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::ConnectionFailed(format!("failed to create directory: {e}"))
                })?;
            }
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        debug!(path = %path.display(), "Opening SQLite key store");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Wraps an existing pool. The pool's lifecycle stays with the caller.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates a [`Migrator`] over this store's pool.
    pub fn migrator(&self, history_table: &str) -> Result<Migrator, StorageError> {
        Migrator::new(self.pool.clone(), history_table)
    }
}

#[async_trait]
impl KeyStoreBackend for SqliteKeyStore {
    async fn insert(&self, row: KeyRow) -> Result<(), StorageError> {
        sqlx::query(INSERT_KEY)
            .bind(&row.set)
            .bind(&row.kid)
            .bind(row.version)
            .bind(&row.keydata)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        debug!(set = %row.set, kid = %row.kid, "stored key row");
        Ok(())
    }

    async fn insert_all(&self, rows: Vec<KeyRow>) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        for row in &rows {
            if let Err(err) = sqlx::query(INSERT_KEY)
                .bind(&row.set)
                .bind(&row.kid)
                .bind(row.version)
                .bind(&row.keydata)
                .execute(&mut *tx)
                .await
            {
                return Err(abort(tx, err.into()).await);
            }
        }

        tx.commit().await.map_err(StorageError::from)?;

        debug!(rows = rows.len(), "stored key row batch");
        Ok(())
    }

    async fn fetch_latest(&self, set: &str, kid: &str) -> Result<Option<KeyRow>, StorageError> {
        let row: Option<(String, String, i32, String)> = sqlx::query_as(SELECT_LATEST)
            .bind(set)
            .bind(kid)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|(set, kid, version, keydata)| KeyRow {
            set,
            kid,
            version,
            keydata,
        }))
    }

    async fn fetch_set(&self, set: &str) -> Result<Vec<KeyRow>, StorageError> {
        let rows: Vec<(String, String, i32, String)> = sqlx::query_as(SELECT_SET)
            .bind(set)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows
            .into_iter()
            .map(|(set, kid, version, keydata)| KeyRow {
                set,
                kid,
                version,
                keydata,
            })
            .collect())
    }

    async fn delete(&self, set: &str, kid: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM krypta_keys WHERE sid = ? AND kid = ?")
            .bind(set)
            .bind(kid)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn delete_set(&self, set: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM krypta_keys WHERE sid = ?")
            .bind(set)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
