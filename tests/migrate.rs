//! End-to-end migration tests: a manager building real schema over an
//! on-disk database, inspected through the accessor operations.

use rowkit::rusqlite::{Connection, Row};
use rowkit::{Accessor, ConnectionProvider, Manager, Result, Sql, SqlMigration};
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(Clone)]
struct FileProvider {
    path: PathBuf,
}

impl ConnectionProvider for FileProvider {
    fn connection(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }
}

fn test_provider() -> (TempDir, FileProvider) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("migrate.sqlite");
    (dir, FileProvider { path })
}

fn tracked(row: &Row<'_>) -> Result<(String, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

#[test]
fn migrations_build_schema_and_track_completion() {
    let (_dir, provider) = test_provider();

    let mut manager = Manager::new(provider.clone());
    manager.add(SqlMigration::new(
        "002",
        "seed words",
        "INSERT INTO words (word) VALUES ('a'), ('a'), ('b')",
    ));
    manager.add(SqlMigration::new(
        "001",
        "words table",
        "CREATE TABLE words (word TEXT)",
    ));

    // Identifier order puts table creation before the seed.
    assert_eq!(manager.do_migrations().unwrap(), 2);

    let words: Vec<String> = provider
        .query_all(
            &Sql::new("SELECT word FROM words"),
            |row: &Row<'_>| -> Result<String> { Ok(row.get(0)?) },
        )
        .unwrap();
    assert_eq!(words, vec!["a", "a", "b"]);

    let records = provider
        .query_all(&rowkit::migrate::tracked_migrations_sql(), tracked)
        .unwrap();
    assert_eq!(
        records,
        vec![
            ("001".to_string(), "words table".to_string()),
            ("002".to_string(), "seed words".to_string()),
        ]
    );
}

#[test]
fn second_run_leaves_tracking_table_unchanged() {
    let (_dir, provider) = test_provider();

    let mut manager = Manager::new(provider.clone());
    manager.add(SqlMigration::new(
        "001",
        "words table",
        "CREATE TABLE words (word TEXT)",
    ));

    assert_eq!(manager.do_migrations().unwrap(), 1);
    let before = provider
        .query_all(&rowkit::migrate::tracked_migrations_sql(), tracked)
        .unwrap();

    assert_eq!(manager.do_migrations().unwrap(), 0);
    let after = provider
        .query_all(&rowkit::migrate::tracked_migrations_sql(), tracked)
        .unwrap();

    assert_eq!(before, after);
}

#[test]
fn always_run_migration_reruns_without_duplicate_tracking() {
    let (_dir, provider) = test_provider();

    let mut manager = Manager::new(provider.clone());
    manager.add(SqlMigration::new(
        "001",
        "words table",
        "CREATE TABLE IF NOT EXISTS words (word TEXT)",
    ));
    manager.add(
        SqlMigration::new(
            "002",
            "reseed words",
            "DELETE FROM words; INSERT INTO words (word) VALUES ('a')",
        )
        .always(),
    );

    assert_eq!(manager.do_migrations().unwrap(), 2);
    assert_eq!(manager.do_migrations().unwrap(), 1);

    let records = provider
        .query_all(&rowkit::migrate::tracked_migrations_sql(), tracked)
        .unwrap();
    assert_eq!(records.len(), 2, "re-recording must upsert, not duplicate");

    let count = provider
        .find(
            &Sql::new("SELECT COUNT(*) FROM words"),
            |row: &Row<'_>| -> Result<i64> { Ok(row.get(0)?) },
        )
        .unwrap();
    assert_eq!(count, Some(1));
}

#[test]
fn failing_sql_migration_surfaces_identifier() {
    let (_dir, provider) = test_provider();

    let mut manager = Manager::new(provider);
    manager.add(SqlMigration::new(
        "bad",
        "references a missing table",
        "INSERT INTO missing (x) VALUES (1)",
    ));

    let err = manager.do_migrations().unwrap_err();
    match err {
        rowkit::Error::Migration { identifier, .. } => assert_eq!(identifier, "bad"),
        other => panic!("unexpected error: {other:?}"),
    }
}
