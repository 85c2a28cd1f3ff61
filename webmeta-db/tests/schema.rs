use webmeta_db::schema::CURRENT_VERSION;
use webmeta_db::*;

#[test]
fn memory_database_has_all_tables() {
    let conn = open_memory().unwrap();
    for table in ["metadata", "series", "episode", "banner", "alias", "movie", "hash"] {
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert!(exists, "missing table {table}");
    }
}

#[test]
fn reopening_keeps_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thetvdb.db");
    drop(open_database(&path).unwrap());
    let conn = open_database(&path).unwrap();
    let version: i32 = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
        .unwrap();
    assert_eq!(version, CURRENT_VERSION);
}

#[test]
fn migrates_version_one_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_version (version INTEGER NOT NULL, applied_at TEXT);
             INSERT INTO schema_version (version) VALUES (1);
             CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL);
             CREATE TABLE movie (tmdb_id INTEGER PRIMARY KEY, imdb TEXT, name TEXT, data TEXT NOT NULL DEFAULT '{}');",
        )
        .unwrap();
    }
    let conn = open_database(&path).unwrap();
    let has_hash: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='hash')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(has_hash);
}

#[test]
fn newer_schema_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_version (version INTEGER NOT NULL, applied_at TEXT);
             INSERT INTO schema_version (version) VALUES (99);",
        )
        .unwrap();
    }
    assert!(matches!(
        open_database(&path),
        Err(SchemaError::VersionMismatch { found: 99, .. })
    ));
}
