//! Schema migration building blocks shared by the engine backends.
//!
//! Each backend ships its own ordered list of [`MigrationStep`]s in its own
//! dialect and a `Migrator` that applies them. Applied-version state lives
//! in a bookkeeping table whose name is an explicit constructor parameter,
//! so isolated migration histories can coexist (one per test, or one per
//! logical store instance).

use thiserror::Error;

use crate::error::StorageError;

/// Default name of the bookkeeping table that records applied steps.
pub const DEFAULT_HISTORY_TABLE: &str = "krypta_keys_migration";

/// One ordered, reversible schema change.
///
/// Steps are static configuration: defined once, applied in ascending `id`
/// order, never mutated at runtime. An empty `down` list marks a step as
/// one-way by design (for example a one-time corrective data deletion), not
/// as a bug.
#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    /// Ordering identifier, unique within a registry.
    pub id: &'static str,
    /// Forward statements, executed in order inside one transaction.
    pub up: &'static [&'static str],
    /// Reverse statements for teardown and rollback tooling.
    pub down: &'static [&'static str],
}

impl MigrationStep {
    /// Whether this step can be reverted.
    pub fn reversible(&self) -> bool {
        !self.down.is_empty()
    }
}

/// A halted migration run.
///
/// Partial application is visible through `completed`: how many steps
/// finished before the failing one, in the direction the run was going.
#[derive(Debug, Error)]
#[error("schema migration halted after {completed} completed step(s): {source}")]
pub struct MigrateError {
    /// Steps that completed before the failure.
    pub completed: usize,
    /// The underlying storage failure.
    #[source]
    pub source: StorageError,
}

/// Validates a SQL identifier that will be interpolated into statements.
///
/// Bookkeeping table names come from configuration, not from literals, so
/// they must be constrained to `[a-z_][a-z0-9_]*` (max 63 chars) before
/// being spliced into `CREATE TABLE`/`INSERT` text.
pub fn validate_identifier(name: &str) -> Result<(), StorageError> {
    if name.is_empty() {
        return Err(StorageError::InvalidInput(
            "identifier cannot be empty".into(),
        ));
    }

    if name.len() > 63 {
        return Err(StorageError::InvalidInput("identifier too long".into()));
    }

    let mut chars = name.chars();
    let first = chars.next().unwrap_or_default();
    if !(first.is_ascii_lowercase() || first == '_') {
        return Err(StorageError::InvalidInput(
            "identifier must start with a lowercase letter or underscore".into(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(StorageError::InvalidInput(
            "identifier must match [a-z_][a-z0-9_]*".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for name in ["krypta_keys_migration", "_history", "m1", "a"] {
            assert!(validate_identifier(name).is_ok(), "should accept {name}");
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        let too_long = "a".repeat(64);
        let invalid = [
            "",
            "1history",
            "History",
            "drop table",
            "x;--",
            "tab-le",
            too_long.as_str(),
        ];

        for name in invalid {
            assert!(
                matches!(
                    validate_identifier(name),
                    Err(StorageError::InvalidInput(_))
                ),
                "should reject {name:?}"
            );
        }
    }

    #[test]
    fn test_reversible() {
        let one_way = MigrationStep {
            id: "3",
            up: &["DELETE FROM t"],
            down: &[],
        };
        let two_way = MigrationStep {
            id: "1",
            up: &["CREATE TABLE t (c TEXT)"],
            down: &["DROP TABLE t"],
        };

        assert!(!one_way.reversible());
        assert!(two_way.reversible());
    }
}
