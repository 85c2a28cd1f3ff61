//! Rate-limited clients for the remote metadata catalogs.
//!
//! Every client implements [`CatalogProvider`], the three-operation contract
//! the sync engine needs (search, full fetch, delta since a cursor). Parsing
//! of provider payloads happens on the blocking pool.

pub mod credentials;
pub mod error;
pub mod opensubtitles;
pub mod provider;
pub mod rate_limit;
pub mod tmdb;
pub mod tvdb;
pub mod xml;
pub mod xmlrpc;

pub use credentials::{ApiKeySource, ApiKeys};
pub use error::ProviderError;
pub use opensubtitles::OpenSubtitlesClient;
pub use provider::{CatalogProvider, Delta, HashLookup, MovieProvider, NoHashLookup, TvProvider};
pub use rate_limit::RateLimiter;
pub use tmdb::TmdbClient;
pub use tvdb::TvdbClient;
