//! # Krypta Keystore
//!
//! Durable, encrypted persistence for sets of cryptographic keys.
//!
//! The [`KeyManager`] serializes each key, encrypts the serialized bytes
//! through a [`krypta_crypto::KeysetCipher`], and persists the result as an
//! opaque string through a [`krypta_storage::KeyStoreBackend`]. Reads
//! reverse the process. Keys are grouped under a named set; a set with zero
//! rows is indistinguishable from one that never existed, and both are
//! reported as not-found.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod jwk;
pub mod manager;

pub use error::KeystoreError;
pub use jwk::JsonWebKey;
pub use manager::{KeyManager, KeyMaterial, KeySet};
