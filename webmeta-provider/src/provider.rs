use webmeta_catalog::types::{ImageConfig, MovieDetails, SeriesTree};
use webmeta_core::{MatchCandidate, Provider};

use crate::error::ProviderError;

/// Ids changed on the provider side since a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// Cursor to store for the next incremental sync.
    pub cursor: i64,
    pub ids: Vec<u64>,
}

/// The operations the sync engine needs from a remote catalog.
///
/// Implementations serialize their own requests and enforce the provider's
/// rate limit. `fetch_full` returns `Ok(None)` when the id does not exist;
/// errors are reserved for failures worth retrying (see
/// [`ProviderError::is_transient`]).
#[allow(async_fn_in_trait)]
pub trait CatalogProvider: Send + Sync {
    /// Denormalized record tree produced by a full fetch.
    type Record: Send + 'static;

    fn provider(&self) -> Provider;

    async fn search(
        &self,
        query: &str,
        year: Option<i32>,
    ) -> Result<Vec<MatchCandidate>, ProviderError>;

    async fn fetch_full(&self, id: u64) -> Result<Option<Self::Record>, ProviderError>;

    async fn fetch_delta_since(&self, cursor: i64) -> Result<Delta, ProviderError>;

    /// Provider clock, stored as the first sync cursor.
    async fn server_time(&self) -> Result<i64, ProviderError>;

    /// Download a binary asset (artwork) through the same rate limiter.
    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}

/// TV catalogs: records are series trees, artwork paths are relative.
pub trait TvProvider: CatalogProvider<Record = SeriesTree> {
    /// Absolute URL of a path from the provider's banner tree.
    fn image_url(&self, path: &str) -> String;
}

/// Movie catalogs: lookups by IMDb id and image configuration.
#[allow(async_fn_in_trait)]
pub trait MovieProvider: CatalogProvider<Record = MovieDetails> {
    /// Candidate for an IMDb id (`tt0133093`), flagged likely.
    async fn lookup_imdb(&self, imdb: &str) -> Result<Option<MatchCandidate>, ProviderError>;

    /// Image base URL and the renditions the provider serves.
    async fn configuration(&self) -> Result<ImageConfig, ProviderError>;
}

/// Auxiliary service mapping a file's content hash to an IMDb id.
///
/// Lookups never fail: any problem yields `None`.
#[allow(async_fn_in_trait)]
pub trait HashLookup: Send + Sync {
    async fn imdb_for_hash(&self, hash: &str) -> Option<String>;
}

impl<T: HashLookup> HashLookup for std::sync::Arc<T> {
    async fn imdb_for_hash(&self, hash: &str) -> Option<String> {
        (**self).imdb_for_hash(hash).await
    }
}

/// Hash lookup that never knows anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHashLookup;

impl HashLookup for NoHashLookup {
    async fn imdb_for_hash(&self, _hash: &str) -> Option<String> {
        None
    }
}

/// Run CPU-bound parsing on the blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ProviderError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ProviderError> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
