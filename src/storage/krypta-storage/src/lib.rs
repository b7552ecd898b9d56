//! # Krypta Storage
//!
//! Storage abstraction layer for the Krypta key store.
//!
//! Defines the row shape, the backend trait implemented by each relational
//! engine, the migration step type shared by the per-engine schema
//! registries, and the common storage error taxonomy.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod migrate;

pub use backend::{KeyRow, KeyStoreBackend};
pub use error::StorageError;
pub use migrate::{validate_identifier, MigrateError, MigrationStep, DEFAULT_HISTORY_TABLE};
