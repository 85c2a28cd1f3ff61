//! Row writes for every mirrored record type.
//!
//! All functions take a plain connection so they compose inside the store's
//! scoped transaction (`Transaction` derefs to `Connection`). None of them
//! commit or bump the store version.

use rusqlite::{params, Connection};
use thiserror::Error;
use webmeta_catalog::types::*;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error in stored data: {0}")]
    Json(#[from] serde_json::Error),
}

// ── Metadata ────────────────────────────────────────────────────────────────

/// Raw JSON text stored under `key`.
pub fn get_metadata_raw(conn: &Connection, key: &str) -> Result<Option<String>, OperationError> {
    let result = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        params![key],
        |row| row.get::<_, String>(0),
    );
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_metadata_raw(conn: &Connection, key: &str, value: &str) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

// ── Series Operations ───────────────────────────────────────────────────────

/// Insert or update a series row.
pub fn upsert_series(conn: &Connection, series: &SeriesRecord) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO series (tvdb_id, name, data)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(tvdb_id) DO UPDATE SET
             name = excluded.name,
             data = excluded.data",
        params![
            series.tvdb_id as i64,
            series.name,
            serde_json::to_string(&series.data)?,
        ],
    )?;
    Ok(())
}

/// Insert or update an episode row. The parent series must exist.
pub fn upsert_episode(conn: &Connection, episode: &EpisodeRecord) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO episode (tvdb_id, series_id, season, episode, name, data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(tvdb_id) DO UPDATE SET
             series_id = excluded.series_id,
             season = excluded.season,
             episode = excluded.episode,
             name = excluded.name,
             data = excluded.data",
        params![
            episode.tvdb_id as i64,
            episode.series_id as i64,
            episode.season,
            episode.episode,
            episode.name,
            serde_json::to_string(&episode.data)?,
        ],
    )?;
    Ok(())
}

/// Insert or update a banner row. The parent series must exist.
pub fn upsert_banner(conn: &Connection, banner: &BannerRecord) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO banner (tvdb_id, series_id, kind, data)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(tvdb_id) DO UPDATE SET
             series_id = excluded.series_id,
             kind = excluded.kind,
             data = excluded.data",
        params![
            banner.tvdb_id as i64,
            banner.series_id as i64,
            banner.kind,
            serde_json::to_string(&banner.data)?,
        ],
    )?;
    Ok(())
}

/// Map `name` to a series. A mapping of the same name to another series is
/// removed first. Returns `true` if anything changed.
pub fn set_alias(conn: &Connection, name: &str, series_id: u64) -> Result<bool, OperationError> {
    let removed = conn.execute(
        "DELETE FROM alias WHERE name = ?1 AND series_id != ?2",
        params![name, series_id as i64],
    )?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO alias (name, series_id) VALUES (?1, ?2)",
        params![name, series_id as i64],
    )?;
    Ok(removed + inserted > 0)
}

/// Drop the episodes and banners of a series before a full re-import.
/// The series row and its aliases stay.
pub fn clear_series_children(conn: &Connection, tvdb_id: u64) -> Result<(), OperationError> {
    let id = tvdb_id as i64;
    conn.execute("DELETE FROM episode WHERE series_id = ?1", params![id])?;
    conn.execute("DELETE FROM banner WHERE series_id = ?1", params![id])?;
    Ok(())
}

/// Remove a series with its episodes, banners and aliases.
/// Returns `false` if the series was not stored.
pub fn delete_series(conn: &Connection, tvdb_id: u64) -> Result<bool, OperationError> {
    let id = tvdb_id as i64;
    conn.execute("DELETE FROM episode WHERE series_id = ?1", params![id])?;
    conn.execute("DELETE FROM banner WHERE series_id = ?1", params![id])?;
    conn.execute("DELETE FROM alias WHERE series_id = ?1", params![id])?;
    let deleted = conn.execute("DELETE FROM series WHERE tvdb_id = ?1", params![id])?;
    Ok(deleted > 0)
}

// ── Movie Operations ────────────────────────────────────────────────────────

/// Insert or update a movie row with its full JSON document.
pub fn upsert_movie(conn: &Connection, movie: &MovieDetails) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO movie (tmdb_id, imdb, name, data)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(tmdb_id) DO UPDATE SET
             imdb = excluded.imdb,
             name = excluded.name,
             data = excluded.data",
        params![
            movie.id as i64,
            movie.imdb(),
            movie.title,
            serde_json::to_string(movie)?,
        ],
    )?;
    Ok(())
}

/// Bind a content hash and file size to a stored movie.
pub fn add_hash(
    conn: &Connection,
    hash: &str,
    size: u64,
    tmdb_id: u64,
) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO hash (value, tmdb_id) VALUES (?1, ?2)
         ON CONFLICT(value) DO UPDATE SET tmdb_id = excluded.tmdb_id",
        params![HashRecord::key(hash, size), tmdb_id as i64],
    )?;
    Ok(())
}

pub fn delete_movie(conn: &Connection, tmdb_id: u64) -> Result<bool, OperationError> {
    let id = tmdb_id as i64;
    conn.execute("DELETE FROM hash WHERE tmdb_id = ?1", params![id])?;
    let deleted = conn.execute("DELETE FROM movie WHERE tmdb_id = ?1", params![id])?;
    Ok(deleted > 0)
}

// ── Maintenance ─────────────────────────────────────────────────────────────

/// Delete every mirrored row. Metadata (cursor, schema version) is kept.
pub fn clear_catalog(conn: &Connection) -> Result<(), OperationError> {
    conn.execute_batch(
        "DELETE FROM hash;
         DELETE FROM movie;
         DELETE FROM alias;
         DELETE FROM banner;
         DELETE FROM episode;
         DELETE FROM series;",
    )?;
    Ok(())
}
