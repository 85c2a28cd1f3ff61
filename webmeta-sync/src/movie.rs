//! The movie catalog: feature films mirrored from a movie provider.

use std::path::Path;
use std::sync::Arc;

use webmeta_catalog::name_parser::{
    current_year, imdb_from_nfo, mark_likely, normalize_name, parse_title_year, strip_3d,
};
use rusqlite::Connection;
use webmeta_catalog::types::{ImageConfig, ImageKind, MovieDetails, ProviderConfig};
use webmeta_core::{CatalogError, FileInfo, MatchCandidate, MatchPolicy, Provider};
use webmeta_db::{self as db, OperationError, VersionedStore};
use webmeta_provider::{CatalogProvider, HashLookup, MovieProvider};

use crate::engine::{on_store, AddOutcome, SyncEngine, SyncReport};
use crate::entities::{Entity, Movie};
use crate::images::ImageCache;
use crate::progress::SyncProgress;
use crate::resolver::{pick_by_imdb, Backend};

/// Bumped whenever the stored representation of movies changes.
pub const MOVIE_SCHEMA_VERSION: u32 = 1;

/// Metadata key of the cached [`ProviderConfig`].
pub const PROVIDER_CONFIG_KEY: &str = "providerConfig";

/// Extension of the sidecar that may carry an IMDb link.
const NFO_EXTENSION: &str = "nfo";

pub struct MovieCatalog<P: MovieProvider, H: HashLookup> {
    engine: SyncEngine<P>,
    hashes: H,
    images: ImageCache,
    language: String,
}

impl<P, H> MovieCatalog<P, H>
where
    P: MovieProvider + 'static,
    H: HashLookup,
{
    pub fn new(
        store: Arc<VersionedStore>,
        provider: P,
        hashes: H,
        policy: MatchPolicy,
    ) -> Result<Self, CatalogError> {
        let images = ImageCache::new(store.image_dir());
        let engine = SyncEngine::new(store, provider, policy);
        engine.check_schema(MOVIE_SCHEMA_VERSION)?;
        Ok(Self {
            engine,
            hashes,
            images,
            language: "en".to_string(),
        })
    }

    /// Preferred artwork language (ISO 639-1). Defaults to `en`.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Report add and sync progress to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn SyncProgress>) -> Self {
        self.engine = self.engine.with_progress(progress);
        self
    }

    pub fn engine(&self) -> &SyncEngine<P> {
        &self.engine
    }

    pub fn store(&self) -> &Arc<VersionedStore> {
        self.engine.store()
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    // ── Provider configuration ──────────────────────────────────────────────

    async fn stored_config(&self) -> Result<Option<ProviderConfig>, CatalogError> {
        on_store(self.store(), |store| Ok(store.get_metadata(PROVIDER_CONFIG_KEY)?)).await
    }

    /// The stored image configuration, however old. Never touches the
    /// network.
    pub async fn cached_config(&self) -> Result<Option<ImageConfig>, CatalogError> {
        Ok(self.stored_config().await?.map(|c| c.images))
    }

    /// Image configuration, refreshed from the provider when the cached copy
    /// is older than the policy's TTL. A failed refresh falls back to the
    /// stale copy.
    pub async fn image_config(&self) -> Result<Option<ImageConfig>, CatalogError> {
        let cached = self.stored_config().await?;
        let now = chrono::Utc::now().timestamp();
        let ttl = self.engine.policy().provider_config_ttl_secs;
        if let Some(config) = &cached {
            if config.is_fresh(now, ttl) {
                return Ok(Some(config.images.clone()));
            }
        }

        match self.engine.provider().configuration().await {
            Ok(images) => {
                let fresh = ProviderConfig {
                    fetched_at: now,
                    images: images.clone(),
                };
                self.engine
                    .locked(move |store| Ok(store.set_metadata(PROVIDER_CONFIG_KEY, &fresh)?))
                    .await?;
                Ok(Some(images))
            }
            Err(e) => {
                log::warn!("Could not refresh TheMovieDB configuration: {e}");
                Ok(cached.map(|c| c.images))
            }
        }
    }

    // ── Lookups ─────────────────────────────────────────────────────────────

    pub async fn movie(&self, id: u64) -> Result<Option<Movie>, CatalogError> {
        let Some(row) = self.read_row(move |conn| db::find_movie(conn, id)).await? else {
            return Ok(None);
        };
        let config = self.image_config().await?;
        Ok(Some(self.view(row, config)))
    }

    pub async fn list_movies(&self) -> Result<Vec<Movie>, CatalogError> {
        let (version, all) = on_store(self.store(), |store| {
            let version = store.version();
            Ok((version, store.read(db::list_movies)?))
        })
        .await?;
        let config = self.image_config().await?;
        Ok(all
            .into_iter()
            .map(|details| self.view((version, details), config.clone()))
            .collect())
    }

    /// One movie row, with the store version read before the query.
    async fn read_row<F>(&self, query: F) -> Result<Option<(u64, MovieDetails)>, CatalogError>
    where
        F: FnOnce(&Connection) -> Result<Option<MovieDetails>, OperationError> + Send + 'static,
    {
        on_store(self.store(), move |store| {
            let version = store.version();
            Ok(store.read(query)?.map(|details| (version, details)))
        })
        .await
    }

    fn view(&self, (version, details): (u64, MovieDetails), config: Option<ImageConfig>) -> Movie {
        Movie::at_version(Arc::clone(self.store()), version, details, config)
    }

    // ── Mutations ───────────────────────────────────────────────────────────

    /// Store movie `id` and prefetch its artwork.
    pub async fn add_movie(&self, id: u64) -> Result<AddOutcome, CatalogError> {
        let outcome = self.engine.add_by_id(id, None).await?;
        self.prefetch_images(id).await;
        Ok(outcome)
    }

    pub async fn delete_movie(&self, id: u64) -> Result<bool, CatalogError> {
        self.engine.delete(id).await
    }

    pub async fn sync(&self, force: bool) -> Result<SyncReport, CatalogError> {
        self.engine.sync(force).await
    }

    /// Download the best poster and backdrop unless already cached.
    /// Failures are logged and otherwise ignored.
    pub async fn prefetch_images(&self, id: u64) {
        let movie = match self.movie(id).await {
            Ok(Some(movie)) => movie,
            Ok(None) => return,
            Err(e) => {
                log::warn!("movie {id}: cannot load for artwork: {e}");
                return;
            }
        };
        for kind in [ImageKind::Poster, ImageKind::Backdrop] {
            let asset = match movie.best(kind, &self.language) {
                Ok(Some(asset)) => asset,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("movie {id}: cannot rank {}: {e}", kind.file_suffix());
                    continue;
                }
            };
            if let Err(e) = self
                .images
                .ensure(self.engine.provider(), id, kind, &asset.url)
                .await
            {
                log::warn!("movie {id}: {} not cached: {e}", kind.file_suffix());
            }
        }
    }

    // ── File evidence ───────────────────────────────────────────────────────

    /// IMDb id from the file's `.nfo` sidecar, if it has one with a link.
    async fn sidecar_imdb(info: &FileInfo) -> Option<String> {
        let text = tokio::fs::read_to_string(info.sidecar(NFO_EXTENSION))
            .await
            .ok()?;
        imdb_from_nfo(&text)
    }

    async fn search_titles(
        &self,
        info: &FileInfo,
    ) -> Result<(String, Vec<MatchCandidate>), CatalogError> {
        let provider = self.engine.provider();
        let file_name = info.file_name().unwrap_or_default();

        if let Some((title, year)) = parse_title_year(file_name, current_year()) {
            let found = provider.search(&title, Some(year)).await?;
            if !found.is_empty() {
                return Ok((title, found));
            }
            if let Some(stripped) = strip_3d(&title) {
                let found = provider.search(&stripped, Some(year)).await?;
                if !found.is_empty() {
                    return Ok((stripped, found));
                }
            }
        }

        let fallback = info
            .title
            .clone()
            .or_else(|| stem(info.path()))
            .map(|t| normalize_name(&t))
            .unwrap_or_default();
        if fallback.is_empty() {
            return Ok((fallback, Vec::new()));
        }
        let found = provider.search(&fallback, None).await?;
        if found.is_empty() {
            if let Some(stripped) = strip_3d(&fallback) {
                let found = provider.search(&stripped, None).await?;
                return Ok((stripped, found));
            }
        }
        Ok((fallback, found))
    }
}

fn stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

impl<P, H> Backend for MovieCatalog<P, H>
where
    P: MovieProvider + 'static,
    H: HashLookup,
{
    fn provider(&self) -> Provider {
        self.engine.provider().provider()
    }

    /// Content hash first, then the sidecar's IMDb id. Local rows only;
    /// image URLs use whatever configuration is stored, stale or not.
    async fn parse(&self, info: &FileInfo) -> Result<Option<Entity>, CatalogError> {
        let mut found = None;
        if let (Some(hash), Some(size)) = (info.hash.clone(), info.file_size) {
            found = self
                .read_row(move |conn| db::find_movie_by_hash(conn, &hash, size))
                .await?;
        }
        if found.is_none() {
            if let Some(imdb) = Self::sidecar_imdb(info).await {
                found = self
                    .read_row(move |conn| db::find_movie_by_imdb(conn, &imdb))
                    .await?;
            }
        }
        let Some(row) = found else {
            return Ok(None);
        };
        let config = self.cached_config().await?;
        Ok(Some(Entity::Movie(self.view(row, config))))
    }

    async fn search(&self, info: &FileInfo) -> Result<Vec<MatchCandidate>, CatalogError> {
        if !tokio::fs::try_exists(info.path()).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let has_sidecar = tokio::fs::try_exists(info.sidecar(NFO_EXTENSION))
            .await
            .unwrap_or(false);
        if has_sidecar {
            if let Some(imdb) = Self::sidecar_imdb(info).await {
                if let Some(candidate) = self.engine.provider().lookup_imdb(&imdb).await? {
                    return Ok(vec![candidate]);
                }
            }
        }

        if !has_sidecar && !self.engine.policy().looks_like_movie(info.length) {
            log::debug!("{}: too short for a movie", info.path.display());
            return Ok(Vec::new());
        }

        let (query, mut candidates) = self.search_titles(info).await?;
        mark_likely(&mut candidates, &query);
        Ok(candidates)
    }

    async fn match_file(
        &self,
        info: &FileInfo,
        candidate: &MatchCandidate,
    ) -> Result<bool, CatalogError> {
        let id = self.engine.candidate_id(candidate)?;
        let binding = info.hash.clone().zip(info.file_size);
        self.engine
            .add_and_bind(id, None, move |conn| {
                let Some((hash, size)) = binding else {
                    return Ok(false);
                };
                db::add_hash(conn, &hash, size, id)?;
                Ok(true)
            })
            .await?;
        self.prefetch_images(id).await;
        Ok(true)
    }

    /// Prefer the candidate whose IMDb id the hash service reports, either
    /// directly or through the provider's IMDb lookup.
    async fn disambiguate(
        &self,
        info: &FileInfo,
        candidates: &[MatchCandidate],
    ) -> Result<Option<MatchCandidate>, CatalogError> {
        let Some(hash) = info.hash.as_deref() else {
            return Ok(None);
        };
        let Some(imdb) = self.hashes.imdb_for_hash(hash).await else {
            return Ok(None);
        };
        if let Some(found) = pick_by_imdb(candidates, &imdb) {
            return Ok(Some(found));
        }
        let Some(resolved) = self.engine.provider().lookup_imdb(&imdb).await? else {
            return Ok(None);
        };
        Ok(candidates.iter().find(|c| c.id == resolved.id).cloned())
    }
}
