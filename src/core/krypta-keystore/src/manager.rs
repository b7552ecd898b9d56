//! The key store manager.
//!
//! Data flow: caller → manager → (serialize → encrypt → base64) → backend,
//! and the reverse on reads. The manager owns no connections and no locks;
//! concurrency control is the pool's problem, and the only transactional
//! scope it requires is the one [`KeyStoreBackend::insert_all`] holds for a
//! batch.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use zeroize::Zeroizing;

use krypta_crypto::{CryptoError, KeysetCipher};
use krypta_storage::{KeyRow, KeyStoreBackend, StorageError};

use crate::error::KeystoreError;

/// A key object the store can persist.
///
/// Implementors need a stable serialized form and a string identifier; the
/// store never looks inside beyond that.
pub trait KeyMaterial: Serialize + DeserializeOwned {
    /// The key's identifier, unique within a set.
    fn key_id(&self) -> &str;
}

/// An ordered collection of keys from one set, most recent first.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySet<K> {
    /// The decoded keys.
    pub keys: Vec<K>,
}

/// Create/read/delete operations over encrypted key sets.
///
/// Generic over the storage backend and the cipher so either can be
/// substituted without touching this logic. Decrypted plaintext never
/// outlives the call that produced it and is never logged.
pub struct KeyManager<B, C> {
    backend: B,
    cipher: C,
}

impl<B, C> KeyManager<B, C>
where
    B: KeyStoreBackend,
    C: KeysetCipher,
{
    /// Creates a manager over a migrated backend.
    pub fn new(backend: B, cipher: C) -> Self {
        Self { backend, cipher }
    }

    /// Serializes and encrypts one key into the stored `keydata` form.
    fn seal<K: KeyMaterial>(&self, key: &K) -> Result<String, KeystoreError> {
        let plaintext = Zeroizing::new(serde_json::to_vec(key).map_err(|e| {
            KeystoreError::Encoding(format!("serializing key {}: {e}", key.key_id()))
        })?);

        let sealed = self.cipher.encrypt(&plaintext)?;
        Ok(BASE64.encode(sealed))
    }

    /// Decrypts and deserializes one stored row back into a key.
    fn open<K: KeyMaterial>(&self, row: &KeyRow) -> Result<K, KeystoreError> {
        let sealed = BASE64.decode(&row.keydata).map_err(|e| {
            // Unarmorable keydata is corrupt ciphertext, not a format issue
            // in the caller's key type.
            KeystoreError::Crypto(CryptoError::InvalidInput(format!(
                "keydata for {}/{} is not valid base64: {e}",
                row.set, row.kid
            )))
        })?;

        let plaintext = self.cipher.decrypt(&sealed)?;

        serde_json::from_slice(&plaintext).map_err(|e| {
            KeystoreError::Encoding(format!("deserializing key {}/{}: {e}", row.set, row.kid))
        })
    }

    fn classify(set: &str, err: StorageError) -> KeystoreError {
        match err {
            StorageError::Conflict(detail) => KeystoreError::Conflict {
                set: set.to_string(),
                detail,
            },
            other => KeystoreError::Storage(other),
        }
    }

    /// Persists one key into `set`.
    ///
    /// The row either exists fully formed afterwards or not at all: a
    /// serialization or encryption failure happens before anything is
    /// written.
    pub async fn add_key<K: KeyMaterial>(&self, set: &str, key: &K) -> Result<(), KeystoreError> {
        let keydata = self.seal(key)?;
        let kid = key.key_id().to_string();

        self.backend
            .insert(KeyRow {
                set: set.to_string(),
                kid: kid.clone(),
                version: 0,
                keydata,
            })
            .await
            .map_err(|e| Self::classify(set, e))?;

        debug!(set, kid = %kid, "added key");
        Ok(())
    }

    /// Persists every key in `keys` into `set` as one all-or-nothing unit.
    ///
    /// Every key is serialized and encrypted before any row is written, so
    /// a failing key leaves storage untouched; insert failures roll the
    /// whole batch back inside the backend's transaction.
    pub async fn add_key_set<K: KeyMaterial>(
        &self,
        set: &str,
        keys: &[K],
    ) -> Result<(), KeystoreError> {
        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            rows.push(KeyRow {
                set: set.to_string(),
                kid: key.key_id().to_string(),
                version: 0,
                keydata: self.seal(key)?,
            });
        }

        self.backend
            .insert_all(rows)
            .await
            .map_err(|e| Self::classify(set, e))?;

        debug!(set, keys = keys.len(), "added key set");
        Ok(())
    }

    /// Fetches the most recent key for `(set, kid)` as a single-element set.
    ///
    /// Returns the not-found sentinel when no row matches. A decode failure
    /// on a matched row is corruption and surfaces as `Crypto`/`Encoding`,
    /// never as absence.
    pub async fn get_key<K: KeyMaterial>(
        &self,
        set: &str,
        kid: &str,
    ) -> Result<KeySet<K>, KeystoreError> {
        let row = self
            .backend
            .fetch_latest(set, kid)
            .await?
            .ok_or_else(|| KeystoreError::NotFound {
                set: set.to_string(),
                kid: Some(kid.to_string()),
            })?;

        let key = self.open(&row)?;
        Ok(KeySet { keys: vec![key] })
    }

    /// Fetches every key in `set`, most recent first.
    ///
    /// A set with zero rows is not-found, not an empty success. A decode
    /// failure on any row aborts the whole call; partial sets are never
    /// returned.
    pub async fn get_key_set<K: KeyMaterial>(&self, set: &str) -> Result<KeySet<K>, KeystoreError> {
        let rows = self.backend.fetch_set(set).await?;
        if rows.is_empty() {
            return Err(KeystoreError::NotFound {
                set: set.to_string(),
                kid: None,
            });
        }

        let mut keys = Vec::with_capacity(rows.len());
        for row in &rows {
            keys.push(self.open(row)?);
        }

        // Decoding must never quietly turn matched rows into an empty
        // success.
        if keys.is_empty() {
            return Err(KeystoreError::NotFound {
                set: set.to_string(),
                kid: None,
            });
        }

        Ok(KeySet { keys })
    }

    /// Deletes all rows for `(set, kid)`. Deleting nothing is success.
    pub async fn delete_key(&self, set: &str, kid: &str) -> Result<(), KeystoreError> {
        self.backend.delete(set, kid).await?;
        debug!(set, kid, "deleted key");
        Ok(())
    }

    /// Deletes all rows for `set`. Deleting nothing is success.
    pub async fn delete_key_set(&self, set: &str) -> Result<(), KeystoreError> {
        self.backend.delete_set(set).await?;
        debug!(set, "deleted key set");
        Ok(())
    }
}
