//! How each provider's full record is written to and found in a store.

use rusqlite::Connection;
use webmeta_catalog::types::{MovieDetails, SeriesTree};
use webmeta_core::CatalogError;
use webmeta_db::{self as db, OperationError};

/// A denormalized record tree the engine can persist as one unit.
pub trait CatalogRecord: Send + 'static {
    /// Write every row of the tree. Runs inside the caller's transaction.
    fn persist(&self, conn: &Connection) -> Result<(), CatalogError>;

    fn exists(conn: &Connection, id: u64) -> Result<bool, OperationError>;

    /// Ids of every entity this store mirrors.
    fn tracked_ids(conn: &Connection) -> Result<Vec<u64>, OperationError>;

    fn delete(conn: &Connection, id: u64) -> Result<bool, OperationError>;

    /// Map a free-text name to the entity. Returns `true` if anything changed.
    fn map_alias(_conn: &Connection, _id: u64, _alias: &str) -> Result<bool, OperationError> {
        Ok(false)
    }
}

impl CatalogRecord for SeriesTree {
    fn persist(&self, conn: &Connection) -> Result<(), CatalogError> {
        let Some(series) = &self.series else {
            return Err(CatalogError::corrupt("series archive without a Series element"));
        };
        let id = series.tvdb_id;
        if let Some(stray) = self.episodes.iter().find(|e| e.series_id != id) {
            return Err(CatalogError::corrupt(format!(
                "episode {} belongs to series {}, not {}",
                stray.tvdb_id, stray.series_id, id
            )));
        }

        db::upsert_series(conn, series)?;
        db::clear_series_children(conn, id)?;
        for episode in &self.episodes {
            db::upsert_episode(conn, episode)?;
        }
        for banner in &self.banners {
            db::upsert_banner(conn, banner)?;
        }
        if !series.name.trim().is_empty() {
            db::set_alias(conn, series.name.trim(), id)?;
        }
        log::debug!(
            "stored series {} ({} episodes, {} banners)",
            id,
            self.episodes.len(),
            self.banners.len()
        );
        Ok(())
    }

    fn exists(conn: &Connection, id: u64) -> Result<bool, OperationError> {
        db::series_exists(conn, id)
    }

    fn tracked_ids(conn: &Connection) -> Result<Vec<u64>, OperationError> {
        db::series_ids(conn)
    }

    fn delete(conn: &Connection, id: u64) -> Result<bool, OperationError> {
        db::delete_series(conn, id)
    }

    fn map_alias(conn: &Connection, id: u64, alias: &str) -> Result<bool, OperationError> {
        db::set_alias(conn, alias, id)
    }
}

impl CatalogRecord for MovieDetails {
    fn persist(&self, conn: &Connection) -> Result<(), CatalogError> {
        db::upsert_movie(conn, self)?;
        log::debug!("stored movie {}", self.id);
        Ok(())
    }

    fn exists(conn: &Connection, id: u64) -> Result<bool, OperationError> {
        db::movie_exists(conn, id)
    }

    fn tracked_ids(conn: &Connection) -> Result<Vec<u64>, OperationError> {
        db::movie_ids(conn)
    }

    fn delete(conn: &Connection, id: u64) -> Result<bool, OperationError> {
        db::delete_movie(conn, id)
    }
}
