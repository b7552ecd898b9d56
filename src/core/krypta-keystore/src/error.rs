//! Keystore error types.

use thiserror::Error;

use krypta_crypto::CryptoError;
use krypta_storage::StorageError;

/// Errors that can occur during key store operations.
///
/// `NotFound` is the process-wide "no matching data" sentinel: callers rely
/// on it to distinguish a legitimately absent key (for example, no active
/// rotation key yet) from a real failure, so it is never conflated with the
/// other variants.
#[derive(Debug, Error)]
pub enum KeystoreError {
    /// No rows matched the requested set (and key id, if one was given).
    #[error("key material not found: set={set}, kid={kid:?}")]
    NotFound {
        /// The requested set.
        set: String,
        /// The requested key id, absent for whole-set lookups.
        kid: Option<String>,
    },

    /// Serializing or deserializing a key failed.
    #[error("key encoding failed: {0}")]
    Encoding(String),

    /// Encrypting or decrypting key material failed.
    ///
    /// On the read path this means the stored ciphertext is corrupt or the
    /// cipher is misconfigured; it is data corruption, never absence.
    #[error("cipher failure: {0}")]
    Crypto(#[from] CryptoError),

    /// An insert violated a uniqueness constraint.
    #[error("key already exists in set {set}: {detail}")]
    Conflict {
        /// The target set.
        set: String,
        /// Engine-reported detail.
        detail: String,
    },

    /// The storage layer failed.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl KeystoreError {
    /// Whether this error is the not-found sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KeystoreError::NotFound { .. })
    }
}
