//! Key store backend trait definition.

use async_trait::async_trait;

use crate::error::StorageError;

/// One persisted key: the row shape of the `krypta_keys` table.
///
/// `keydata` is the base64-armored ciphertext of a serialized key; it is
/// opaque to every backend. `created_at` is server-assigned at insert time
/// and only ever used for most-recent-first ordering, so it does not appear
/// here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRow {
    /// Key set identifier. Groups related keys; not unique on its own.
    pub set: String,
    /// Key identifier, unique within a set.
    pub kid: String,
    /// Reserved for future rotation tracking. Always written as 0 today.
    pub version: i32,
    /// Encrypted, serialized key material.
    pub keydata: String,
}

/// Row-level operations a relational engine must provide for the key store.
///
/// Implementations own the SQL dialect; the manager on top owns
/// serialization and encryption. Backends are safe for concurrent use over
/// a shared connection pool.
#[async_trait]
pub trait KeyStoreBackend: Send + Sync {
    /// Inserts a single row.
    async fn insert(&self, row: KeyRow) -> Result<(), StorageError>;

    /// Inserts every row as one all-or-nothing transaction.
    ///
    /// On any failure the whole batch is rolled back; a rollback failure is
    /// reported as [`StorageError::RollbackFailed`] rather than swallowed.
    async fn insert_all(&self, rows: Vec<KeyRow>) -> Result<(), StorageError>;

    /// Fetches the most recent row for `(set, kid)`, if any.
    async fn fetch_latest(&self, set: &str, kid: &str) -> Result<Option<KeyRow>, StorageError>;

    /// Fetches all rows for a set, most recent first.
    async fn fetch_set(&self, set: &str) -> Result<Vec<KeyRow>, StorageError>;

    /// Deletes all rows matching `(set, kid)`. Zero matches is success.
    async fn delete(&self, set: &str, kid: &str) -> Result<(), StorageError>;

    /// Deletes all rows for a set. Zero matches is success.
    async fn delete_set(&self, set: &str) -> Result<(), StorageError>;
}
