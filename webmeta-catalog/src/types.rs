//! Record types mirrored from the remote catalogs.
//!
//! TheTVDB records keep their raw field maps (the provider's XML is flat and
//! loosely typed); TheMovieDB records are typed JSON with the raw sub-documents
//! for cast and keywords kept as opaque values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::name_parser::year_from_date;

/// Raw element fields as delivered by TheTVDB.
pub type FieldMap = BTreeMap<String, String>;

// ── Series ──────────────────────────────────────────────────────────────────

/// A TV series row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub tvdb_id: u64,
    pub name: String,
    #[serde(default)]
    pub data: FieldMap,
}

impl SeriesRecord {
    pub fn overview(&self) -> Option<&str> {
        field(&self.data, "Overview")
    }

    pub fn year(&self) -> Option<i32> {
        field(&self.data, "FirstAired").and_then(year_from_date)
    }

    pub fn imdb(&self) -> Option<&str> {
        field(&self.data, "IMDB_ID")
    }
}

// ── Episode ─────────────────────────────────────────────────────────────────

/// A TV episode row. `episode` may be 0 (special), duplicated, or sparse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub tvdb_id: u64,
    pub series_id: u64,
    pub season: u32,
    pub episode: u32,
    pub name: Option<String>,
    #[serde(default)]
    pub data: FieldMap,
}

impl EpisodeRecord {
    pub fn overview(&self) -> Option<&str> {
        field(&self.data, "Overview")
    }

    /// Relative image path inside the provider's banner tree.
    pub fn image_path(&self) -> Option<&str> {
        field(&self.data, "filename")
    }

    pub fn imdb(&self) -> Option<&str> {
        field(&self.data, "IMDB_ID")
    }
}

// ── Banner ──────────────────────────────────────────────────────────────────

/// Banner kinds TheTVDB uses in `BannerType`.
pub mod banner_kind {
    pub const FANART: &str = "fanart";
    pub const POSTER: &str = "poster";
    pub const SERIES: &str = "series";
    pub const SEASON: &str = "season";
}

/// Image metadata row attached to a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BannerRecord {
    pub tvdb_id: u64,
    pub series_id: u64,
    pub kind: String,
    #[serde(default)]
    pub data: FieldMap,
}

impl BannerRecord {
    pub fn path(&self) -> Option<&str> {
        field(&self.data, "BannerPath")
    }

    pub fn thumbnail_path(&self) -> Option<&str> {
        field(&self.data, "ThumbnailPath")
    }

    /// Average user rating; unrated banners sort as 0.
    pub fn rating(&self) -> f64 {
        field(&self.data, "Rating")
            .and_then(|r| r.parse().ok())
            .unwrap_or(0.0)
    }

    pub fn language(&self) -> Option<&str> {
        field(&self.data, "Language")
    }
}

/// Everything TheTVDB returns for one series in a single full fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesTree {
    pub series: Option<SeriesRecord>,
    pub episodes: Vec<EpisodeRecord>,
    pub banners: Vec<BannerRecord>,
}

// ── Alias ───────────────────────────────────────────────────────────────────

/// A free-text name mapped to a series, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecord {
    pub name: String,
    pub series_id: u64,
}

// ── Movie ───────────────────────────────────────────────────────────────────

/// One image entry from TheMovieDB's `movie/{id}/images`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub file_path: String,
    #[serde(default)]
    pub iso_639_1: Option<String>,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieImages {
    #[serde(default)]
    pub backdrops: Vec<ImageInfo>,
    #[serde(default)]
    pub posters: Vec<ImageInfo>,
}

/// A movie as persisted: the `movie/{id}` document plus its sub-resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub images: MovieImages,
    #[serde(default)]
    pub casts: serde_json::Value,
    #[serde(default)]
    pub keywords: serde_json::Value,
}

impl MovieDetails {
    pub fn year(&self) -> Option<i32> {
        self.release_date.as_deref().and_then(year_from_date)
    }

    /// IMDb id, with empty strings treated as absent.
    pub fn imdb(&self) -> Option<&str> {
        self.imdb_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// Binding of file content (hash + size) to a movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRecord {
    pub value: String,
    pub tmdb_id: u64,
}

impl HashRecord {
    /// Key stored in the `hash` table: `"<hash>|<size>"`.
    pub fn key(hash: &str, size: u64) -> String {
        format!("{hash}|{size}")
    }
}

// ── Images ──────────────────────────────────────────────────────────────────

/// Kinds of locally cached artwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Poster,
    Backdrop,
}

impl ImageKind {
    /// Suffix used in the cached file name (`<id>.<suffix>.jpg`).
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Poster => "poster",
            Self::Backdrop => "image",
        }
    }
}

/// A resolved remote image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub url: String,
    pub thumbnail: String,
    pub rating: Option<f64>,
    pub language: Option<String>,
}

/// TheMovieDB `configuration.images` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    pub base_url: String,
    #[serde(default)]
    pub poster_sizes: Vec<String>,
    #[serde(default)]
    pub backdrop_sizes: Vec<String>,
}

/// Provider configuration as cached in the store's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unix time the configuration was fetched.
    pub fetched_at: i64,
    pub images: ImageConfig,
}

impl ProviderConfig {
    pub fn is_fresh(&self, now: i64, ttl_secs: u64) -> bool {
        now.saturating_sub(self.fetched_at) < ttl_secs as i64
    }
}

fn field<'a>(data: &'a FieldMap, key: &str) -> Option<&'a str> {
    data.get(key).map(String::as_str).filter(|s| !s.is_empty())
}
