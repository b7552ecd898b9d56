//! End-to-end tests over the SQLite backend.

#![allow(clippy::disallowed_methods)]

use krypta_integration_tests::{sample_key, sqlite_columns, SqliteHarness};
use krypta_keystore::{JsonWebKey, KeySet, KeystoreError};
use krypta_storage_sqlite::MIGRATIONS;

#[tokio::test]
async fn store_read_delete_lifecycle() {
    let h = SqliteHarness::new().await.unwrap();

    let key = sample_key("k1");
    h.manager.add_key("set-a", &key).await.unwrap();

    let found: KeySet<JsonWebKey> = h.manager.get_key("set-a", "k1").await.unwrap();
    assert_eq!(found.keys.len(), 1);
    assert_eq!(found.keys[0].kid, "k1");
    assert_eq!(found.keys[0], key);

    h.manager.delete_key("set-a", "k1").await.unwrap();

    let err = h
        .manager
        .get_key::<JsonWebKey>("set-a", "k1")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn whole_sets_roundtrip_and_empty_sets_are_not_found() {
    let h = SqliteHarness::new().await.unwrap();

    let keys = vec![sample_key("sig-1"), sample_key("sig-2")];
    h.manager.add_key_set("rotation", &keys).await.unwrap();

    let found: KeySet<JsonWebKey> = h.manager.get_key_set("rotation").await.unwrap();
    assert_eq!(found.keys.len(), 2);

    h.manager.delete_key_set("rotation").await.unwrap();

    // Emptied and never-existed sets are the same sentinel.
    for set in ["rotation", "never-existed"] {
        let err = h
            .manager
            .get_key_set::<JsonWebKey>(set)
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "expected not-found for {set}");
    }
}

#[tokio::test]
async fn batch_failure_persists_nothing() {
    let h = SqliteHarness::new().await.unwrap();

    // A key that collides with itself inside the batch forces the insert
    // transaction to roll back after rows have already been written to it.
    let keys = vec![sample_key("dup"), sample_key("other"), sample_key("dup")];
    let err = h.manager.add_key_set("set-a", &keys).await.unwrap_err();
    assert!(matches!(err, KeystoreError::Conflict { .. }));

    let err = h
        .manager
        .get_key_set::<JsonWebKey>("set-a")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn migrations_are_reproducible() {
    let h = SqliteHarness::new().await.unwrap();
    let migrator = h.migrator();

    // Fresh harness is fully migrated; capture the shape.
    let shape = sqlite_columns(h.store.pool(), "krypta_keys").await.unwrap();
    assert_eq!(shape, ["sid", "kid", "version", "keydata", "created_at"]);

    // Re-running forward is a no-op.
    assert_eq!(migrator.up().await.unwrap(), 0);

    // All the way down (the irreversible step only clears its bookkeeping)
    // leaves the table absent, matching the pre-migration state.
    assert_eq!(migrator.down().await.unwrap(), MIGRATIONS.len());
    let columns = sqlite_columns(h.store.pool(), "krypta_keys").await.unwrap();
    assert!(columns.is_empty());

    // Forward from scratch reproduces the identical shape.
    assert_eq!(migrator.up().await.unwrap(), MIGRATIONS.len());
    let rebuilt = sqlite_columns(h.store.pool(), "krypta_keys").await.unwrap();
    assert_eq!(rebuilt, shape);

    // And the rebuilt table is usable.
    h.manager.add_key("set-a", &sample_key("k1")).await.unwrap();
    let found: KeySet<JsonWebKey> = h.manager.get_key("set-a", "k1").await.unwrap();
    assert_eq!(found.keys[0].kid, "k1");
}

#[tokio::test]
async fn concurrent_readers_and_writers_share_one_pool() {
    let h = SqliteHarness::new().await.unwrap();

    for i in 0..4 {
        h.manager
            .add_key("shared", &sample_key(&format!("k{i}")))
            .await
            .unwrap();
    }

    // Readers racing a writer see some consistent subset; none of them
    // error out.
    let manager = &h.manager;
    let k4 = sample_key("k4");
    let (a, b, write) = tokio::join!(
        manager.get_key_set::<JsonWebKey>("shared"),
        manager.get_key::<JsonWebKey>("shared", "k2"),
        manager.add_key("shared", &k4),
    );

    assert!(a.unwrap().keys.len() >= 4);
    assert_eq!(b.unwrap().keys[0].kid, "k2");
    write.unwrap();

    let all: KeySet<JsonWebKey> = manager.get_key_set("shared").await.unwrap();
    assert_eq!(all.keys.len(), 5);
}
