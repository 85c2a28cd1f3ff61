//! The TV catalog: series trees mirrored from an episodic provider.

use std::sync::Arc;

use webmeta_catalog::name_parser::mark_likely;
use webmeta_core::{CatalogError, FileInfo, MatchCandidate, MatchPolicy, Provider};
use webmeta_db::{self as db, VersionedStore};
use webmeta_provider::{CatalogProvider, HashLookup, TvProvider};

use crate::engine::{on_store, AddOutcome, SyncEngine, SyncReport};
use crate::entities::{Entity, Series};
use crate::progress::SyncProgress;
use crate::resolver::{pick_by_imdb, Backend};

/// Bumped whenever the stored representation of series trees changes.
pub const TV_SCHEMA_VERSION: u32 = 1;

pub struct TvCatalog<P: TvProvider, H: HashLookup> {
    engine: SyncEngine<P>,
    hashes: H,
    image_base: String,
}

impl<P, H> TvCatalog<P, H>
where
    P: TvProvider + 'static,
    H: HashLookup,
{
    /// Wrap an opened store. Clears it and schedules a full resync when it
    /// was written with a different schema version.
    pub fn new(
        store: Arc<VersionedStore>,
        provider: P,
        hashes: H,
        policy: MatchPolicy,
    ) -> Result<Self, CatalogError> {
        let image_base = provider.image_url("");
        let engine = SyncEngine::new(store, provider, policy);
        engine.check_schema(TV_SCHEMA_VERSION)?;
        Ok(Self {
            engine,
            hashes,
            image_base,
        })
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

    pub async fn series(&self, id: u64) -> Result<Option<Series>, CatalogError> {
        let (base, policy) = (self.image_base.clone(), self.engine.policy().clone());
        on_store(self.store(), move |store| {
            Series::load(Arc::clone(store), id, base, policy)
        })
        .await
    }

    /// Series an alias (or the series' own name) points to.
    pub async fn series_by_name(&self, name: &str) -> Result<Option<Series>, CatalogError> {
        let name = name.trim().to_string();
        let found = on_store(self.store(), move |store| {
            Ok(store.read(|conn| db::find_series_by_alias(conn, &name))?)
        })
        .await?;
        match found {
            Some(record) => self.series(record.tvdb_id).await,
            None => Ok(None),
        }
    }

    pub async fn list_series(&self) -> Result<Vec<Series>, CatalogError> {
        let ids = on_store(self.store(), |store| Ok(store.read(db::series_ids)?)).await?;
        let mut all = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(series) = self.series(id).await? {
                all.push(series);
            }
        }
        Ok(all)
    }

    /// Descend series, season, episode as far as the file's attributes
    /// allow.
    pub async fn entry_from_file(&self, info: &FileInfo) -> Result<Option<Entity>, CatalogError> {
        let Some(name) = info.series.as_deref() else {
            return Ok(None);
        };
        let Some(series) = self.series_by_name(name).await? else {
            return Ok(None);
        };
        let Some(number) = info.season else {
            return Ok(Some(Entity::Series(series)));
        };
        let episode = info.episode;
        let entity = tokio::task::spawn_blocking(move || -> Result<Entity, CatalogError> {
            let Some(season) = series.season(number)? else {
                return Ok(Entity::Series(series));
            };
            match episode {
                Some(n) => Ok(match season.episode(n)? {
                    Some(episode) => Entity::Episode(episode),
                    None => Entity::Season(season),
                }),
                None => Ok(Entity::Season(season)),
            }
        })
        .await
        .map_err(|e| CatalogError::store(format!("store task failed: {e}")))??;
        Ok(Some(entity))
    }

    pub async fn add_series(&self, id: u64, alias: Option<&str>) -> Result<AddOutcome, CatalogError> {
        self.engine.add_by_id(id, alias).await
    }

    pub async fn delete_series(&self, id: u64) -> Result<bool, CatalogError> {
        self.engine.delete(id).await
    }

    pub async fn sync(&self, force: bool) -> Result<SyncReport, CatalogError> {
        self.engine.sync(force).await
    }
}

impl<P, H> Backend for TvCatalog<P, H>
where
    P: TvProvider + 'static,
    H: HashLookup,
{
    fn provider(&self) -> Provider {
        self.engine.provider().provider()
    }

    async fn parse(&self, info: &FileInfo) -> Result<Option<Entity>, CatalogError> {
        if !info.is_episode() {
            return Ok(None);
        }
        self.entry_from_file(info).await
    }

    async fn search(&self, info: &FileInfo) -> Result<Vec<MatchCandidate>, CatalogError> {
        let Some(name) = info.series.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(Vec::new());
        };
        let mut candidates = self.engine.provider().search(name, None).await?;
        mark_likely(&mut candidates, name);
        Ok(candidates)
    }

    async fn match_file(
        &self,
        info: &FileInfo,
        candidate: &MatchCandidate,
    ) -> Result<bool, CatalogError> {
        self.engine
            .add_by_search_result(candidate, info.series.as_deref())
            .await?;
        Ok(true)
    }

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
        Ok(pick_by_imdb(candidates, &imdb))
    }
}
