//! Catalog data model and the pure matching heuristics.
//!
//! This crate defines the records mirrored from the remote providers without
//! any database or network dependencies. `webmeta-db` persists these types,
//! `webmeta-provider` produces them, and `webmeta-sync` turns them into views.

pub mod images;
pub mod name_parser;
pub mod types;

pub use images::{backdrop_size, poster_size, rank_banners, rank_images, thumbnail_size};
pub use name_parser::{
    current_year, imdb_from_nfo, mark_likely, normalize_name, parse_title_year, search_query,
    strip_3d, year_from_date,
};
pub use types::*;
