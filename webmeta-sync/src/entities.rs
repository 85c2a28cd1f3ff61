//! Read-only views over stored rows.
//!
//! Views are cheap handles. Whatever they materialize is cached together
//! with the store version it was built at and rebuilt on the next access
//! after `notify_resync`, so a view never serves rows older than the last
//! announced change.
//!
//! All accessors run synchronous SQLite reads; async callers build and
//! query views on the blocking pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use webmeta_catalog::images::{
    backdrop_size, poster_size, rank_banners, rank_images, thumbnail_size,
};
use webmeta_catalog::types::{
    banner_kind, EpisodeRecord, ImageAsset, ImageConfig, ImageInfo, ImageKind, MovieDetails,
    SeriesRecord,
};
use webmeta_core::{CatalogError, CatalogId, MatchPolicy};
use webmeta_db::{self as db, VersionedStore};

// ── Version cache ───────────────────────────────────────────────────────────

/// A value tagged with the store version it was built at.
#[derive(Debug)]
pub(crate) struct VersionCache<T> {
    slot: Mutex<Option<(u64, T)>>,
}

impl<T> Default for VersionCache<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> VersionCache<T> {
    /// A cache already holding `value` as built at `version`.
    pub fn seeded(version: u64, value: T) -> Self {
        Self {
            slot: Mutex::new(Some((version, value))),
        }
    }
}

impl<T: Clone> VersionCache<T> {
    /// The cached value if it was built at `version`, else a fresh one from
    /// `build`. Build failures are not cached.
    pub fn get_or_try(
        &self,
        version: u64,
        build: impl FnOnce() -> Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((built_at, value)) = slot.as_ref() {
            if *built_at == version {
                return Ok(value.clone());
            }
        }
        let value = build()?;
        *slot = Some((version, value.clone()));
        Ok(value)
    }

    pub fn built_at(&self) -> Option<u64> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(v, _)| *v)
    }
}

// ── Series ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct SeriesData {
    store: Arc<VersionedStore>,
    id: u64,
    /// Prefix turning a stored banner path into a URL.
    image_base: String,
    policy: MatchPolicy,
    record: VersionCache<SeriesRecord>,
    season_numbers: VersionCache<Vec<u32>>,
}

impl SeriesData {
    fn version(&self) -> u64 {
        self.store.version()
    }

    fn record(&self) -> Result<SeriesRecord, CatalogError> {
        self.record.get_or_try(self.version(), || {
            self.store
                .read(|conn| db::find_series(conn, self.id))?
                .ok_or_else(|| CatalogError::not_found(format!("series {} is gone", self.id)))
        })
    }

    fn season_numbers(&self) -> Result<Vec<u32>, CatalogError> {
        self.season_numbers.get_or_try(self.version(), || {
            Ok(self.store.read(|conn| db::season_numbers(conn, self.id))?)
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.image_base, path)
    }
}

/// A stored TV series.
#[derive(Debug, Clone)]
pub struct Series {
    data: Arc<SeriesData>,
}

impl Series {
    /// View of series `id`, or `None` if it is not stored.
    pub fn load(
        store: Arc<VersionedStore>,
        id: u64,
        image_base: impl Into<String>,
        policy: MatchPolicy,
    ) -> Result<Option<Self>, CatalogError> {
        let version = store.version();
        let Some(record) = store.read(|conn| db::find_series(conn, id))? else {
            return Ok(None);
        };
        let record_cache = VersionCache::seeded(version, record);
        Ok(Some(Self {
            data: Arc::new(SeriesData {
                store,
                id,
                image_base: image_base.into(),
                policy,
                record: record_cache,
                season_numbers: VersionCache::default(),
            }),
        }))
    }

    pub fn id(&self) -> CatalogId {
        CatalogId::tvdb(self.data.id)
    }

    pub fn name(&self) -> Result<String, CatalogError> {
        Ok(self.data.record()?.name)
    }

    pub fn overview(&self) -> Result<Option<String>, CatalogError> {
        Ok(self.data.record()?.overview().map(str::to_string))
    }

    pub fn year(&self) -> Result<Option<i32>, CatalogError> {
        Ok(self.data.record()?.year())
    }

    pub fn imdb(&self) -> Result<Option<String>, CatalogError> {
        Ok(self.data.record()?.imdb().map(str::to_string))
    }

    /// Seasons 1..=highest, with `None` for numbers that have no episodes.
    pub fn seasons(&self) -> Result<Vec<Option<Season>>, CatalogError> {
        let numbers = self.data.season_numbers()?;
        let max = numbers.iter().copied().max().unwrap_or(0);
        Ok((1..=max)
            .map(|n| numbers.contains(&n).then(|| self.season_view(n)))
            .collect())
    }

    /// Season `number`, including season 0 when the provider has one.
    pub fn season(&self, number: u32) -> Result<Option<Season>, CatalogError> {
        let numbers = self.data.season_numbers()?;
        Ok(numbers.contains(&number).then(|| self.season_view(number)))
    }

    /// Positioned episodes of every regular season, in order.
    pub fn episodes(&self) -> Result<Vec<Episode>, CatalogError> {
        let mut all = Vec::new();
        for season in self.seasons()?.into_iter().flatten() {
            all.extend(season.episodes()?.into_iter().flatten());
        }
        Ok(all)
    }

    /// Fan art, best rated first.
    pub fn images(&self) -> Result<Vec<ImageAsset>, CatalogError> {
        self.banners_of(banner_kind::FANART)
    }

    pub fn posters(&self) -> Result<Vec<ImageAsset>, CatalogError> {
        self.banners_of(banner_kind::POSTER)
    }

    /// Wide series banners.
    pub fn banners(&self) -> Result<Vec<ImageAsset>, CatalogError> {
        self.banners_of(banner_kind::SERIES)
    }

    pub fn poster(&self) -> Result<Option<ImageAsset>, CatalogError> {
        Ok(self.posters()?.into_iter().next())
    }

    fn banners_of(&self, kind: &str) -> Result<Vec<ImageAsset>, CatalogError> {
        let rows = self
            .data
            .store
            .read(|conn| db::banners_for_series(conn, self.data.id, Some(kind)))?;
        Ok(rank_banners(rows)
            .into_iter()
            .filter_map(|banner| {
                let url = self.data.url(banner.path()?);
                let thumbnail = banner
                    .thumbnail_path()
                    .map_or_else(|| url.clone(), |p| self.data.url(p));
                Some(ImageAsset {
                    url,
                    thumbnail,
                    rating: Some(banner.rating()),
                    language: banner.language().map(str::to_string),
                })
            })
            .collect())
    }

    fn season_view(&self, number: u32) -> Season {
        Season {
            series: Arc::clone(&self.data),
            number,
            episodes: Arc::new(VersionCache::default()),
        }
    }
}

// ── Season ──────────────────────────────────────────────────────────────────

/// Episodes of one season number. Never stored; built from episode rows.
#[derive(Debug, Clone)]
pub struct Season {
    series: Arc<SeriesData>,
    number: u32,
    episodes: Arc<VersionCache<Vec<Option<Episode>>>>,
}

impl Season {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn series(&self) -> Series {
        Series {
            data: Arc::clone(&self.series),
        }
    }

    /// Dense positional list: `episodes()[n - 1]` is episode `n`.
    ///
    /// Gaps in the provider's numbering are `None`. Specials have no
    /// position; see [`Season::specials`]. When two rows claim the same
    /// number the later one wins.
    pub fn episodes(&self) -> Result<Vec<Option<Episode>>, CatalogError> {
        let version = self.series.version();
        self.episodes.get_or_try(version, || self.build(version))
    }

    /// Episode `number` (1-based), if present.
    pub fn episode(&self, number: u32) -> Result<Option<Episode>, CatalogError> {
        if number == 0 {
            return Ok(None);
        }
        Ok(self
            .episodes()?
            .into_iter()
            .nth(number as usize - 1)
            .flatten())
    }

    /// Episodes numbered as specials.
    pub fn specials(&self) -> Result<Vec<Episode>, CatalogError> {
        let version = self.series.version();
        let rows = self.rows()?;
        Ok(rows
            .into_iter()
            .filter(|row| self.is_special(row.episode))
            .map(|record| Episode::new(Arc::clone(&self.series), version, record))
            .collect())
    }

    /// The version the positional list was last built at.
    pub fn built_at(&self) -> Option<u64> {
        self.episodes.built_at()
    }

    pub fn poster(&self) -> Result<Option<ImageAsset>, CatalogError> {
        self.series().poster()
    }

    pub fn images(&self) -> Result<Vec<ImageAsset>, CatalogError> {
        self.series().images()
    }

    pub fn banners(&self) -> Result<Vec<ImageAsset>, CatalogError> {
        self.series().banners()
    }

    fn is_special(&self, number: u32) -> bool {
        number == 0 || number == self.series.policy.special_episode
    }

    fn rows(&self) -> Result<Vec<EpisodeRecord>, CatalogError> {
        Ok(self
            .series
            .store
            .read(|conn| db::episodes_for_season(conn, self.series.id, self.number))?)
    }

    fn build(&self, version: u64) -> Result<Vec<Option<Episode>>, CatalogError> {
        let rows = self.rows()?;
        let cap = self.series.policy.max_episode_number;
        let max = rows
            .iter()
            .map(|r| r.episode)
            .filter(|&n| !self.is_special(n))
            .max()
            .unwrap_or(0);
        if max > cap {
            let message = format!(
                "series {} season {} has episode number {}, above the cap of {}",
                self.series.id, self.number, max, cap
            );
            log::error!("{message}");
            return Err(CatalogError::corrupt(message));
        }

        let mut slots: Vec<Option<Episode>> = vec![None; max as usize];
        for record in rows {
            if self.is_special(record.episode) {
                continue;
            }
            let index = record.episode as usize - 1;
            slots[index] = Some(Episode::new(Arc::clone(&self.series), version, record));
        }
        Ok(slots)
    }
}

// ── Episode ─────────────────────────────────────────────────────────────────

/// One episode row. The row is re-read after the store version changes, so
/// a held handle follows renames and renumbering from later syncs.
#[derive(Debug, Clone)]
pub struct Episode {
    series: Arc<SeriesData>,
    tvdb_id: u64,
    record: Arc<VersionCache<EpisodeRecord>>,
}

impl Episode {
    fn new(series: Arc<SeriesData>, version: u64, record: EpisodeRecord) -> Self {
        Self {
            series,
            tvdb_id: record.tvdb_id,
            record: Arc::new(VersionCache::seeded(version, record)),
        }
    }

    pub fn id(&self) -> CatalogId {
        CatalogId::tvdb(self.tvdb_id)
    }

    /// The row as of the current store version.
    pub fn record(&self) -> Result<EpisodeRecord, CatalogError> {
        self.record.get_or_try(self.series.version(), || {
            self.series
                .store
                .read(|conn| db::find_episode(conn, self.tvdb_id))?
                .ok_or_else(|| CatalogError::not_found(format!("episode {} is gone", self.tvdb_id)))
        })
    }

    /// Number within the season as the provider reports it.
    pub fn number(&self) -> Result<u32, CatalogError> {
        Ok(self.record()?.episode)
    }

    pub fn season_number(&self) -> Result<u32, CatalogError> {
        Ok(self.record()?.season)
    }

    pub fn name(&self) -> Result<Option<String>, CatalogError> {
        Ok(self.record()?.name)
    }

    pub fn overview(&self) -> Result<Option<String>, CatalogError> {
        Ok(self.record()?.overview().map(str::to_string))
    }

    /// Absolute URL of the episode still.
    pub fn image(&self) -> Result<Option<String>, CatalogError> {
        Ok(self.record()?.image_path().map(|p| self.series.url(p)))
    }

    pub fn imdb(&self) -> Result<Option<String>, CatalogError> {
        Ok(self.record()?.imdb().map(str::to_string))
    }

    pub fn series(&self) -> Series {
        Series {
            data: Arc::clone(&self.series),
        }
    }

    pub fn season(&self) -> Result<Season, CatalogError> {
        Ok(Season {
            series: Arc::clone(&self.series),
            number: self.season_number()?,
            episodes: Arc::new(VersionCache::default()),
        })
    }
}

// ── Movie ───────────────────────────────────────────────────────────────────

/// A stored movie with the image configuration needed to build URLs.
///
/// Like the TV views, the row is re-read once the store version moves on.
#[derive(Debug, Clone)]
pub struct Movie {
    store: Arc<VersionedStore>,
    id: u64,
    config: Option<ImageConfig>,
    details: Arc<VersionCache<MovieDetails>>,
}

impl Movie {
    /// View of movie `id`, or `None` if it is not stored.
    pub fn load(
        store: Arc<VersionedStore>,
        id: u64,
        config: Option<ImageConfig>,
    ) -> Result<Option<Self>, CatalogError> {
        let version = store.version();
        let Some(details) = store.read(|conn| db::find_movie(conn, id))? else {
            return Ok(None);
        };
        Ok(Some(Self::at_version(store, version, details, config)))
    }

    /// View of a row read at `version`.
    pub(crate) fn at_version(
        store: Arc<VersionedStore>,
        version: u64,
        details: MovieDetails,
        config: Option<ImageConfig>,
    ) -> Self {
        Self {
            store,
            id: details.id,
            config,
            details: Arc::new(VersionCache::seeded(version, details)),
        }
    }

    pub fn id(&self) -> CatalogId {
        CatalogId::tmdb(self.id)
    }

    /// The row as of the current store version.
    pub fn details(&self) -> Result<MovieDetails, CatalogError> {
        self.details.get_or_try(self.store.version(), || {
            self.store
                .read(|conn| db::find_movie(conn, self.id))?
                .ok_or_else(|| CatalogError::not_found(format!("movie {} is gone", self.id)))
        })
    }

    pub fn name(&self) -> Result<String, CatalogError> {
        Ok(self.details()?.title.unwrap_or_default())
    }

    pub fn tagline(&self) -> Result<Option<String>, CatalogError> {
        Ok(self.details()?.tagline)
    }

    pub fn overview(&self) -> Result<Option<String>, CatalogError> {
        Ok(self.details()?.overview)
    }

    pub fn rating(&self) -> Result<Option<f64>, CatalogError> {
        Ok(self.details()?.vote_average)
    }

    /// Runtime in minutes.
    pub fn runtime(&self) -> Result<Option<u32>, CatalogError> {
        Ok(self.details()?.runtime)
    }

    pub fn year(&self) -> Result<Option<i32>, CatalogError> {
        Ok(self.details()?.year())
    }

    pub fn imdb(&self) -> Result<Option<String>, CatalogError> {
        Ok(self.details()?.imdb().map(str::to_string))
    }

    /// Ranked posters in `lang` or without a language. Empty when no image
    /// configuration is known.
    pub fn posters(&self, lang: &str) -> Result<Vec<ImageAsset>, CatalogError> {
        let Some(config) = &self.config else {
            return Ok(Vec::new());
        };
        let size = poster_size(&config.poster_sizes);
        Ok(assets(&self.details()?.images.posters, lang, config, size))
    }

    pub fn backdrops(&self, lang: &str) -> Result<Vec<ImageAsset>, CatalogError> {
        let Some(config) = &self.config else {
            return Ok(Vec::new());
        };
        let size = backdrop_size(&config.backdrop_sizes);
        Ok(assets(&self.details()?.images.backdrops, lang, config, size))
    }

    /// Best asset of `kind`, if any.
    pub fn best(&self, kind: ImageKind, lang: &str) -> Result<Option<ImageAsset>, CatalogError> {
        let ranked = match kind {
            ImageKind::Poster => self.posters(lang)?,
            ImageKind::Backdrop => self.backdrops(lang)?,
        };
        Ok(ranked.into_iter().next())
    }

    /// Local path of the cached poster.
    pub fn poster(&self) -> PathBuf {
        self.local_path(ImageKind::Poster)
    }

    /// Local path of the cached backdrop.
    pub fn image(&self) -> PathBuf {
        self.local_path(ImageKind::Backdrop)
    }

    pub fn local_path(&self, kind: ImageKind) -> PathBuf {
        image_path(self.store.image_dir(), self.id, kind)
    }
}

fn assets(images: &[ImageInfo], lang: &str, config: &ImageConfig, size: &str) -> Vec<ImageAsset> {
    let thumb = thumbnail_size(&config.poster_sizes);
    rank_images(images, lang)
        .into_iter()
        .map(|image| ImageAsset {
            url: format!("{}{}{}", config.base_url, size, image.file_path),
            thumbnail: format!("{}{}{}", config.base_url, thumb, image.file_path),
            rating: Some(image.vote_average),
            language: image.iso_639_1.clone(),
        })
        .collect()
}

/// `<dir>/<id>.<kind>.jpg`
pub fn image_path(dir: &Path, id: u64, kind: ImageKind) -> PathBuf {
    dir.join(format!("{}.{}.jpg", id, kind.file_suffix()))
}

// ── Entity ──────────────────────────────────────────────────────────────────

/// Anything a media file can resolve to.
#[derive(Debug, Clone)]
pub enum Entity {
    Series(Series),
    Season(Season),
    Episode(Episode),
    Movie(Movie),
}

impl Entity {
    /// Provider id of the entity; a season reports its series.
    pub fn id(&self) -> CatalogId {
        match self {
            Self::Series(s) => s.id(),
            Self::Season(s) => s.series().id(),
            Self::Episode(e) => e.id(),
            Self::Movie(m) => m.id(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Series(_) => "series",
            Self::Season(_) => "season",
            Self::Episode(_) => "episode",
            Self::Movie(_) => "movie",
        }
    }

    /// Display name: the series name for seasons, the title otherwise.
    pub fn name(&self) -> Result<String, CatalogError> {
        match self {
            Self::Series(s) => s.name(),
            Self::Season(s) => Ok(format!("{} season {}", s.series().name()?, s.number())),
            Self::Episode(e) => Ok(e.name()?.unwrap_or_default()),
            Self::Movie(m) => m.name(),
        }
    }

    pub fn as_episode(&self) -> Option<&Episode> {
        match self {
            Self::Episode(e) => Some(e),
            _ => None,
        }
    }
}
