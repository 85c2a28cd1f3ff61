//! The host facade: both catalogs behind one set of entry points.
//!
//! Files carrying a series attribute go to the TV catalog, everything else
//! to the movie catalog. A catalog whose API key is missing is not
//! registered; calls that would need it find nothing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use webmeta_core::{CatalogError, FileInfo, MatchCandidate, MatchPolicy, Provider};
use webmeta_db::{self as db, VersionWatcher, VersionedStore};
use webmeta_provider::{CatalogProvider, OpenSubtitlesClient, TmdbClient, TvdbClient};
use webmeta_sync::{
    Backend, CatalogRecord, Entity, MovieCatalog, Resolution, Resolver, SyncEngine, SyncProgress,
    SyncReport, TvCatalog,
};

use crate::error::LibError;
use crate::hasher::fill_hash;
use crate::settings::Settings;

pub type TvBackend = TvCatalog<TvdbClient, Arc<OpenSubtitlesClient>>;
pub type MovieBackend = MovieCatalog<TmdbClient, Arc<OpenSubtitlesClient>>;

const EVENT_CAPACITY: usize = 256;

// ── Progress events ─────────────────────────────────────────────────────────

/// Sync progress as seen by a frontend.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Phase(String),
    Item {
        current: usize,
        total: usize,
        message: String,
    },
    Complete(String),
}

/// Forwards engine progress onto the registry's event channel.
struct ChannelProgress {
    tx: broadcast::Sender<SyncEvent>,
}

impl SyncProgress for ChannelProgress {
    fn on_phase(&self, message: &str) {
        log::info!("{}", message);
        let _ = self.tx.send(SyncEvent::Phase(message.to_string()));
    }

    fn on_item(&self, current: usize, total: usize, message: &str) {
        log::debug!("[{}/{}] {}", current, total, message);
        let _ = self.tx.send(SyncEvent::Item {
            current,
            total,
            message: message.to_string(),
        });
    }

    fn on_complete(&self, message: &str) {
        log::info!("{}", message);
        let _ = self.tx.send(SyncEvent::Complete(message.to_string()));
    }
}

// ── Registry ────────────────────────────────────────────────────────────────

pub struct Registry {
    base: PathBuf,
    tv: Option<TvBackend>,
    movies: Option<MovieBackend>,
    resolver: Resolver,
    changed: broadcast::Sender<u64>,
    events: broadcast::Sender<SyncEvent>,
    _watchers: Vec<VersionWatcher>,
    forwarders: Vec<JoinHandle<()>>,
}

fn open_store(base: &Path, provider: Provider) -> Result<Arc<VersionedStore>, LibError> {
    let store = VersionedStore::open(base, provider.scheme())?;
    log::debug!(
        "Opened {} store at {}",
        provider.display_name(),
        store.db_path().display()
    );
    Ok(Arc::new(store))
}

impl Registry {
    /// Open the stores under the configured base directory, check their
    /// schema and start watching them for changes by other processes.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn init(settings: &Settings) -> Result<Self, LibError> {
        let base = settings.storage_base();
        let keys = settings.api_keys();
        let policy = settings.policy.clone();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let progress: Arc<dyn SyncProgress> = Arc::new(ChannelProgress { tx: events.clone() });
        let hashes = Arc::new(OpenSubtitlesClient::new()?);

        let tv = match keys.get(Provider::TheTvDb) {
            Some(key) => {
                let store = open_store(&base, Provider::TheTvDb)?;
                let client = TvdbClient::new(key, policy.tvdb_request_interval())?;
                let catalog = TvCatalog::new(store, client, Arc::clone(&hashes), policy.clone())?;
                Some(catalog.with_progress(Arc::clone(&progress)))
            }
            None => {
                log::info!("No TheTVDB API key; episodes will not be matched");
                None
            }
        };

        let movies = match keys.get(Provider::TheMovieDb) {
            Some(key) => {
                let store = open_store(&base, Provider::TheMovieDb)?;
                let client = TmdbClient::new(key, policy.tmdb_request_interval())?;
                let catalog = MovieCatalog::new(store, client, hashes, policy.clone())?;
                Some(catalog.with_progress(progress))
            }
            None => {
                log::info!("No TheMovieDB API key; movies will not be matched");
                None
            }
        };

        Ok(Self::assemble(base, &policy, tv, movies, events))
    }

    fn assemble(
        base: PathBuf,
        policy: &MatchPolicy,
        tv: Option<TvBackend>,
        movies: Option<MovieBackend>,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        let (changed, _) = broadcast::channel(EVENT_CAPACITY);
        let stores: Vec<Arc<VersionedStore>> = tv
            .iter()
            .map(|c| Arc::clone(c.store()))
            .chain(movies.iter().map(|c| Arc::clone(c.store())))
            .collect();

        let mut watchers = Vec::new();
        let mut forwarders = Vec::new();
        for store in &stores {
            match store.watch() {
                Ok(watcher) => watchers.push(watcher),
                // Local changes are still broadcast without the watcher.
                Err(e) => log::warn!("Cannot watch {}: {}", store.version_path().display(), e),
            }
            forwarders.push(tokio::spawn(forward_changes(
                store.subscribe(),
                stores.clone(),
                changed.clone(),
            )));
        }

        Self {
            base,
            tv,
            movies,
            resolver: Resolver::new(policy.stabilize_delay()),
            changed,
            events,
            _watchers: watchers,
            forwarders,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn tv(&self) -> Option<&TvBackend> {
        self.tv.as_ref()
    }

    pub fn movies(&self) -> Option<&MovieBackend> {
        self.movies.as_ref()
    }

    /// Providers with a registered catalog.
    pub fn providers(&self) -> Vec<Provider> {
        let mut providers = Vec::new();
        if self.tv.is_some() {
            providers.push(Provider::TheTvDb);
        }
        if self.movies.is_some() {
            providers.push(Provider::TheMovieDb);
        }
        providers
    }

    fn stores(&self) -> Vec<&Arc<VersionedStore>> {
        self.tv
            .iter()
            .map(|c| c.store())
            .chain(self.movies.iter().map(|c| c.store()))
            .collect()
    }

    // ── Versions and metadata ───────────────────────────────────────────────

    /// Sum of all store versions; changes whenever any store changes.
    pub fn db_version(&self) -> u64 {
        self.stores().iter().map(|s| s.version()).sum()
    }

    /// Receive the new [`db_version`](Self::db_version) after every change
    /// to any store, including changes made by other processes.
    pub fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.changed.subscribe()
    }

    /// Receive sync progress.
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// First value stored under `key` in any store.
    pub async fn get_metadata<T>(&self, key: &str) -> Result<Option<T>, LibError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        for store in self.stores() {
            let store = Arc::clone(store);
            let key = key.to_string();
            let value = tokio::task::spawn_blocking(move || store.get_metadata::<T>(&key))
                .await
                .map_err(|e| CatalogError::store(format!("store task failed: {e}")))??;
            if value.is_some() {
                return Ok(value);
            }
        }
        Ok(None)
    }

    /// Store `value` under `key` in every store.
    pub async fn set_metadata<T: Serialize>(&self, key: &str, value: &T) -> Result<(), LibError> {
        let json = serde_json::to_string(value).map_err(|e| CatalogError::store(e.to_string()))?;
        if let Some(tv) = &self.tv {
            set_raw(tv.engine(), key, &json).await?;
        }
        if let Some(movies) = &self.movies {
            set_raw(movies.engine(), key, &json).await?;
        }
        Ok(())
    }

    // ── Matching ────────────────────────────────────────────────────────────

    /// The stored entity a file maps to, without touching the network.
    pub async fn parse(&self, info: FileInfo) -> Result<Option<Entity>, LibError> {
        if info.is_episode() {
            return match &self.tv {
                Some(tv) => Ok(tv.parse(&info).await?),
                None => Ok(None),
            };
        }
        match &self.movies {
            Some(movies) => Ok(movies.parse(&fill_hash(info).await).await?),
            None => Ok(None),
        }
    }

    /// Remote candidates for a file.
    pub async fn search(&self, info: &FileInfo) -> Result<Vec<MatchCandidate>, LibError> {
        let found = match (&self.tv, &self.movies) {
            (Some(tv), _) if info.is_episode() => tv.search(info).await?,
            (_, Some(movies)) if !info.is_episode() => movies.search(info).await?,
            _ => Vec::new(),
        };
        Ok(found)
    }

    /// Bind a file to a candidate, routed by the candidate's provider.
    pub async fn match_file(
        &self,
        info: FileInfo,
        candidate: &MatchCandidate,
    ) -> Result<bool, LibError> {
        let provider = candidate.id.provider;
        match provider {
            Provider::TheTvDb => {
                let tv = self.tv.as_ref().ok_or(LibError::NotConfigured(provider))?;
                Ok(tv.match_file(&info, candidate).await?)
            }
            Provider::TheMovieDb => {
                let movies = self
                    .movies
                    .as_ref()
                    .ok_or(LibError::NotConfigured(provider))?;
                Ok(movies.match_file(&fill_hash(info).await, candidate).await?)
            }
        }
    }

    /// Parse, search and, when the choice is clear, match a file. The
    /// content hash is computed once the file has stopped growing.
    pub async fn identify(&self, info: FileInfo) -> Result<Resolution, LibError> {
        let prepare = |info: FileInfo| async move { Ok(fill_hash(info).await) };
        let resolution = match (&self.tv, &self.movies) {
            (Some(tv), _) if info.is_episode() => {
                self.resolver.identify_with(tv, info, prepare).await?
            }
            (_, Some(movies)) if !info.is_episode() => {
                self.resolver.identify_with(movies, info, prepare).await?
            }
            _ => {
                log::debug!("{}: no catalog for this kind of file", info.path.display());
                Resolution::NotFound
            }
        };
        Ok(resolution)
    }

    /// Sync every registered catalog. The catalogs run side by side and
    /// one failing does not stop the other.
    pub async fn sync(&self, force: bool) -> Vec<(Provider, Result<SyncReport, CatalogError>)> {
        let tv = async {
            match &self.tv {
                Some(tv) => Some((Provider::TheTvDb, tv.sync(force).await)),
                None => None,
            }
        };
        let movies = async {
            match &self.movies {
                Some(movies) => Some((Provider::TheMovieDb, movies.sync(force).await)),
                None => None,
            }
        };
        let (tv, movies) = futures::future::join(tv, movies).await;

        let reports: Vec<_> = tv.into_iter().chain(movies).collect();
        for (provider, result) in &reports {
            if let Err(e) = result {
                log::warn!("Sync of {} failed: {}", provider.display_name(), e);
            }
        }
        reports
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        for task in &self.forwarders {
            task.abort();
        }
    }
}

async fn set_raw<P>(
    engine: &SyncEngine<P>,
    key: &str,
    json: &str,
) -> Result<(), CatalogError>
where
    P: CatalogProvider + 'static,
    P::Record: CatalogRecord,
{
    let (key, json) = (key.to_string(), json.to_string());
    engine
        .write(move |conn| Ok(db::set_metadata_raw(conn, &key, &json)?))
        .await
}

/// Re-broadcast one store's changes as the registry-wide version.
async fn forward_changes(
    mut rx: broadcast::Receiver<u64>,
    stores: Vec<Arc<VersionedStore>>,
    changed: broadcast::Sender<u64>,
) {
    loop {
        match rx.recv().await {
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                let total = stores.iter().map(|s| s.version()).sum();
                let _ = changed.send(total);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
