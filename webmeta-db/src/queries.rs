//! Read queries for the store.
//!
//! Provides lookup by provider id, alias, imdb id, content hash, and listing.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use webmeta_catalog::types::*;

use crate::operations::OperationError;

// ── Series Lookups ──────────────────────────────────────────────────────────

pub fn find_series(conn: &Connection, tvdb_id: u64) -> Result<Option<SeriesRecord>, OperationError> {
    conn.query_row(
        "SELECT tvdb_id, name, data FROM series WHERE tvdb_id = ?1",
        params![tvdb_id as i64],
        row_to_series,
    )
    .optional()
    .map_err(Into::into)
}

pub fn series_exists(conn: &Connection, tvdb_id: u64) -> Result<bool, OperationError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM series WHERE tvdb_id = ?1",
            params![tvdb_id as i64],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// All series, by name.
pub fn list_series(conn: &Connection) -> Result<Vec<SeriesRecord>, OperationError> {
    let mut stmt = conn.prepare("SELECT tvdb_id, name, data FROM series ORDER BY name")?;
    let rows = stmt.query_map([], row_to_series)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Provider ids of every tracked series.
pub fn series_ids(conn: &Connection) -> Result<Vec<u64>, OperationError> {
    let mut stmt = conn.prepare("SELECT tvdb_id FROM series")?;
    let rows = stmt.query_map([], |row| Ok(row.get::<_, i64>(0)? as u64))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Find a series by an alias name (case-insensitive).
pub fn find_series_by_alias(
    conn: &Connection,
    name: &str,
) -> Result<Option<SeriesRecord>, OperationError> {
    conn.query_row(
        "SELECT s.tvdb_id, s.name, s.data
         FROM alias a JOIN series s ON s.tvdb_id = a.series_id
         WHERE a.name = ?1",
        params![name],
        row_to_series,
    )
    .optional()
    .map_err(Into::into)
}

/// Aliases, optionally restricted to one series.
pub fn list_aliases(
    conn: &Connection,
    series_id: Option<u64>,
) -> Result<Vec<AliasRecord>, OperationError> {
    let map = |row: &Row<'_>| {
        Ok(AliasRecord {
            name: row.get(0)?,
            series_id: row.get::<_, i64>(1)? as u64,
        })
    };
    let rows = match series_id {
        Some(id) => {
            let mut stmt = conn.prepare(
                "SELECT name, series_id FROM alias WHERE series_id = ?1 ORDER BY name",
            )?;
            let rows = stmt.query_map(params![id as i64], map)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare("SELECT name, series_id FROM alias ORDER BY name")?;
            let rows = stmt.query_map([], map)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(rows)
}

// ── Episode Lookups ─────────────────────────────────────────────────────────

/// Distinct season numbers that have at least one episode, ascending.
pub fn season_numbers(conn: &Connection, series_id: u64) -> Result<Vec<u32>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT season FROM episode WHERE series_id = ?1 ORDER BY season",
    )?;
    let rows = stmt.query_map(params![series_id as i64], |row| row.get::<_, u32>(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

pub fn find_episode(
    conn: &Connection,
    tvdb_id: u64,
) -> Result<Option<EpisodeRecord>, OperationError> {
    conn.query_row(
        "SELECT tvdb_id, series_id, season, episode, name, data
         FROM episode WHERE tvdb_id = ?1",
        params![tvdb_id as i64],
        row_to_episode,
    )
    .optional()
    .map_err(Into::into)
}

pub fn episodes_for_season(
    conn: &Connection,
    series_id: u64,
    season: u32,
) -> Result<Vec<EpisodeRecord>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT tvdb_id, series_id, season, episode, name, data
         FROM episode WHERE series_id = ?1 AND season = ?2 ORDER BY tvdb_id",
    )?;
    let rows = stmt.query_map(params![series_id as i64, season], row_to_episode)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

pub fn episodes_for_series(
    conn: &Connection,
    series_id: u64,
) -> Result<Vec<EpisodeRecord>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT tvdb_id, series_id, season, episode, name, data
         FROM episode WHERE series_id = ?1 ORDER BY season, episode, tvdb_id",
    )?;
    let rows = stmt.query_map(params![series_id as i64], row_to_episode)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

// ── Banner Lookups ──────────────────────────────────────────────────────────

/// Banners of a series, optionally of one kind (`fanart`, `poster`, `series`).
pub fn banners_for_series(
    conn: &Connection,
    series_id: u64,
    kind: Option<&str>,
) -> Result<Vec<BannerRecord>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT tvdb_id, series_id, kind, data FROM banner
         WHERE series_id = ?1 AND (?2 IS NULL OR kind = ?2)
         ORDER BY tvdb_id",
    )?;
    let rows = stmt.query_map(params![series_id as i64, kind], |row| {
        Ok(BannerRecord {
            tvdb_id: row.get::<_, i64>(0)? as u64,
            series_id: row.get::<_, i64>(1)? as u64,
            kind: row.get(2)?,
            data: json_column(row, 3)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

// ── Movie Lookups ───────────────────────────────────────────────────────────

pub fn find_movie(conn: &Connection, tmdb_id: u64) -> Result<Option<MovieDetails>, OperationError> {
    conn.query_row(
        "SELECT data FROM movie WHERE tmdb_id = ?1",
        params![tmdb_id as i64],
        |row| json_column(row, 0),
    )
    .optional()
    .map_err(Into::into)
}

pub fn find_movie_by_imdb(
    conn: &Connection,
    imdb: &str,
) -> Result<Option<MovieDetails>, OperationError> {
    conn.query_row(
        "SELECT data FROM movie WHERE imdb = ?1 LIMIT 1",
        params![imdb],
        |row| json_column(row, 0),
    )
    .optional()
    .map_err(Into::into)
}

/// Movie previously bound to this exact file content.
pub fn find_movie_by_hash(
    conn: &Connection,
    hash: &str,
    size: u64,
) -> Result<Option<MovieDetails>, OperationError> {
    conn.query_row(
        "SELECT m.data FROM hash h JOIN movie m ON m.tmdb_id = h.tmdb_id
         WHERE h.value = ?1",
        params![HashRecord::key(hash, size)],
        |row| json_column(row, 0),
    )
    .optional()
    .map_err(Into::into)
}

pub fn movie_exists(conn: &Connection, tmdb_id: u64) -> Result<bool, OperationError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM movie WHERE tmdb_id = ?1",
            params![tmdb_id as i64],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn list_movies(conn: &Connection) -> Result<Vec<MovieDetails>, OperationError> {
    let mut stmt = conn.prepare("SELECT data FROM movie ORDER BY name")?;
    let rows = stmt.query_map([], |row| json_column(row, 0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

pub fn movie_ids(conn: &Connection) -> Result<Vec<u64>, OperationError> {
    let mut stmt = conn.prepare("SELECT tmdb_id FROM movie")?;
    let rows = stmt.query_map([], |row| Ok(row.get::<_, i64>(0)? as u64))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

// ── Statistics ──────────────────────────────────────────────────────────────

/// Row counts per table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub series: i64,
    pub episodes: i64,
    pub banners: i64,
    pub aliases: i64,
    pub movies: i64,
    pub hashes: i64,
}

pub fn catalog_stats(conn: &Connection) -> Result<CatalogStats, OperationError> {
    let count = |table: &str| -> Result<i64, rusqlite::Error> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
    };
    Ok(CatalogStats {
        series: count("series")?,
        episodes: count("episode")?,
        banners: count("banner")?,
        aliases: count("alias")?,
        movies: count("movie")?,
        hashes: count("hash")?,
    })
}

// ── Row Mapping ─────────────────────────────────────────────────────────────

fn row_to_series(row: &Row<'_>) -> rusqlite::Result<SeriesRecord> {
    Ok(SeriesRecord {
        tvdb_id: row.get::<_, i64>(0)? as u64,
        name: row.get(1)?,
        data: json_column(row, 2)?,
    })
}

fn row_to_episode(row: &Row<'_>) -> rusqlite::Result<EpisodeRecord> {
    Ok(EpisodeRecord {
        tvdb_id: row.get::<_, i64>(0)? as u64,
        series_id: row.get::<_, i64>(1)? as u64,
        season: row.get(2)?,
        episode: row.get(3)?,
        name: row.get(4)?,
        data: json_column(row, 5)?,
    })
}

/// Decode a JSON text column, reporting bad JSON as a conversion failure.
fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
