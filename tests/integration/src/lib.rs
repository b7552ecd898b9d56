//! Integration test harness for the Krypta key store.
//!
//! Shared fixtures for driving a real manager over real backends: a
//! migrated SQLite store in a temp directory, and sample key material.

// Allow unwrap() in test support code - panics are acceptable here.
#![allow(clippy::disallowed_methods)]

use anyhow::Result;
use tempfile::TempDir;

use krypta_crypto::Aes256GcmCipher;
use krypta_keystore::{JsonWebKey, KeyManager};
use krypta_storage::DEFAULT_HISTORY_TABLE;
use krypta_storage_sqlite::{Migrator, SqliteKeyStore};

/// A migrated SQLite store rooted in its own temp directory.
pub struct SqliteHarness {
    /// Keeps the database directory alive for the test's duration.
    pub dir: TempDir,
    /// The backend, cloneable for raw SQL assertions.
    pub store: SqliteKeyStore,
    /// A manager with a fresh random cipher key.
    pub manager: KeyManager<SqliteKeyStore, Aes256GcmCipher>,
}

impl SqliteHarness {
    /// Opens a fresh database and applies the full migration sequence.
    pub async fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let store = SqliteKeyStore::open(dir.path().join("keys.db")).await?;
        store.migrator(DEFAULT_HISTORY_TABLE)?.up().await?;

        let manager = KeyManager::new(store.clone(), Aes256GcmCipher::generate());

        Ok(Self {
            dir,
            store,
            manager,
        })
    }

    /// A migrator over this store's default history table.
    pub fn migrator(&self) -> Migrator {
        self.store
            .migrator(DEFAULT_HISTORY_TABLE)
            .expect("default history table name is valid")
    }
}

/// Builds a deterministic symmetric test key.
pub fn sample_key(kid: &str) -> JsonWebKey {
    JsonWebKey::symmetric(kid, "A256GCM", format!("material-{kid}").as_bytes())
}

/// Lists the column names of a table in a SQLite database, in order.
pub async fn sqlite_columns(pool: &sqlx::SqlitePool, table: &str) -> Result<Vec<String>> {
    let rows: Vec<(i32, String, String, i32, Option<String>, i32)> =
        sqlx::query_as(&format!("PRAGMA table_info({table})"))
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(_, name, ..)| name).collect())
}
