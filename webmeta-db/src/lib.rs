//! SQLite-backed versioned store for mirrored catalog data.
//!
//! A store is one database file plus a small version marker file that other
//! processes can watch, and a directory for cached artwork. Row operations
//! and queries are plain functions over a rusqlite connection; the
//! [`VersionedStore`] wraps them with a scoped write transaction and the
//! version bookkeeping.

pub mod operations;
pub mod queries;
pub mod schema;
pub mod store;
pub mod watch;

pub use operations::{
    add_hash, clear_catalog, clear_series_children, delete_movie, delete_series,
    get_metadata_raw, set_alias, set_metadata_raw, upsert_banner, upsert_episode, upsert_movie,
    upsert_series, OperationError,
};
pub use queries::{
    banners_for_series, catalog_stats, episodes_for_season, episodes_for_series, find_episode,
    find_movie, find_movie_by_hash, find_movie_by_imdb, find_series, find_series_by_alias,
    list_aliases, list_movies, list_series, movie_exists, movie_ids, season_numbers, series_exists,
    series_ids, CatalogStats,
};
pub use schema::{open_database, open_memory, SchemaError};
pub use store::{StoreError, VersionedStore};
pub use watch::VersionWatcher;
