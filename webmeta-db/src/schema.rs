//! SQLite schema creation and migration.

use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: expected version {expected}, found {found}")]
    VersionMismatch { expected: i32, found: i32 },
}

/// Current schema version. Increment when adding migrations.
pub const CURRENT_VERSION: i32 = 2;

/// Create all tables and indexes if they don't exist.
///
/// This is idempotent, safe to call on an existing database.
pub fn create_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(SCHEMA_SQL)?;
    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Open or create a store database at the given path.
pub fn open_database(path: &std::path::Path) -> Result<Connection, SchemaError> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    let version = get_schema_version(&conn)?;
    if version == 0 {
        log::info!("Creating store schema in {}", path.display());
        create_schema(&conn)?;
    } else if version < CURRENT_VERSION {
        log::info!(
            "Migrating store {} from schema {} to {}",
            path.display(),
            version,
            CURRENT_VERSION
        );
        migrate(&conn, version)?;
    } else if version > CURRENT_VERSION {
        return Err(SchemaError::VersionMismatch {
            expected: CURRENT_VERSION,
            found: version,
        });
    }

    Ok(conn)
}

/// Open an in-memory database with the full schema. Useful for testing.
pub fn open_memory() -> Result<Connection, SchemaError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Get the current schema version, or 0 if no schema exists.
fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), SchemaError> {
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Run migrations from `from_version` up to `CURRENT_VERSION`.
fn migrate(conn: &Connection, from_version: i32) -> Result<(), SchemaError> {
    let mut version = from_version;
    while version < CURRENT_VERSION {
        if version == 1 {
            // v2 binds content hashes to movies
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS hash (
                     value TEXT PRIMARY KEY,
                     tmdb_id INTEGER NOT NULL REFERENCES movie(tmdb_id) ON DELETE CASCADE
                 );
                 CREATE INDEX IF NOT EXISTS idx_hash_movie ON hash(tmdb_id);",
            )?;
        }
        version += 1;
        set_schema_version(conn, version)?;
    }

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Opaque key/value pairs (sync cursor, schema version, provider config)
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- TV series
CREATE TABLE IF NOT EXISTS series (
    tvdb_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_series_name ON series(name COLLATE NOCASE);

-- Episodes; seasons are derived from the season column
CREATE TABLE IF NOT EXISTS episode (
    tvdb_id INTEGER PRIMARY KEY,
    series_id INTEGER NOT NULL REFERENCES series(tvdb_id) ON DELETE CASCADE,
    season INTEGER NOT NULL,
    episode INTEGER NOT NULL,
    name TEXT,
    data TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_episode_season ON episode(series_id, season);

-- Artwork metadata attached to a series
CREATE TABLE IF NOT EXISTS banner (
    tvdb_id INTEGER PRIMARY KEY,
    series_id INTEGER NOT NULL REFERENCES series(tvdb_id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_banner_kind ON banner(series_id, kind);

-- Free-text names mapped to a series
CREATE TABLE IF NOT EXISTS alias (
    name TEXT NOT NULL COLLATE NOCASE UNIQUE,
    series_id INTEGER NOT NULL REFERENCES series(tvdb_id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_alias_series ON alias(series_id);

-- Movies
CREATE TABLE IF NOT EXISTS movie (
    tmdb_id INTEGER PRIMARY KEY,
    imdb TEXT,
    name TEXT,
    data TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_movie_imdb ON movie(imdb);

-- Content hash ("<hash>|<size>") bound to a movie
CREATE TABLE IF NOT EXISTS hash (
    value TEXT PRIMARY KEY,
    tmdb_id INTEGER NOT NULL REFERENCES movie(tmdb_id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_hash_movie ON hash(tmdb_id);
"#;
