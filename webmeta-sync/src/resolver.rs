//! Matching media files to catalog entries.
//!
//! Each catalog implements [`Backend`]; the [`Resolver`] runs the decision
//! procedure shared by all of them: local lookup first, then a remote
//! search, narrowing, and promotion of a single survivor.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use webmeta_core::{CatalogError, FileInfo, MatchCandidate, Provider};

use crate::entities::Entity;
use crate::single_flight::SingleFlight;

/// One catalog's view of a media file.
#[allow(async_fn_in_trait)]
pub trait Backend {
    fn provider(&self) -> Provider;

    /// Resolve from stored data only. Never touches the network.
    async fn parse(&self, info: &FileInfo) -> Result<Option<Entity>, CatalogError>;

    /// Remote candidates for the file, with `likely` flags set.
    async fn search(&self, info: &FileInfo) -> Result<Vec<MatchCandidate>, CatalogError>;

    /// Persist `candidate` and bind the file to it so `parse` finds it.
    async fn match_file(
        &self,
        info: &FileInfo,
        candidate: &MatchCandidate,
    ) -> Result<bool, CatalogError>;

    /// Pick one of `candidates` using extra evidence about the file.
    async fn disambiguate(
        &self,
        info: &FileInfo,
        candidates: &[MatchCandidate],
    ) -> Result<Option<MatchCandidate>, CatalogError>;
}

/// Outcome of [`Resolver::identify`].
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Already in the store.
    Known(Entity),
    /// A single candidate was found and promoted.
    Matched(MatchCandidate),
    /// More than one candidate survived narrowing.
    Ambiguous(Vec<MatchCandidate>),
    NotFound,
    /// The file is still being written; try again later.
    NotYet,
}

/// Candidate whose IMDb cross-reference equals `imdb`.
pub fn pick_by_imdb(candidates: &[MatchCandidate], imdb: &str) -> Option<MatchCandidate> {
    candidates
        .iter()
        .find(|c| c.imdb.as_deref().is_some_and(|i| i.eq_ignore_ascii_case(imdb)))
        .cloned()
}

/// Size of `path` if it did not change across `delay`, `None` if it did.
pub async fn stable_size(path: &Path, delay: Duration) -> std::io::Result<Option<u64>> {
    let before = tokio::fs::metadata(path).await?.len();
    if delay.is_zero() {
        return Ok(Some(before));
    }
    tokio::time::sleep(delay).await;
    let after = tokio::fs::metadata(path).await?.len();
    Ok((before == after).then_some(after))
}

/// Runs identification, one file at a time per path.
pub struct Resolver {
    stabilize_delay: Duration,
    flights: SingleFlight<PathBuf, Result<Resolution, CatalogError>>,
}

impl Resolver {
    pub fn new(stabilize_delay: Duration) -> Self {
        Self {
            stabilize_delay,
            flights: SingleFlight::new(),
        }
    }

    pub async fn identify<B: Backend>(
        &self,
        backend: &B,
        info: FileInfo,
    ) -> Result<Resolution, CatalogError> {
        self.identify_with(backend, info, |info| async { Ok(info) })
            .await
    }

    /// Like [`Resolver::identify`], with `prepare` run on the file's
    /// attributes once the file is known to be complete (to fill in the
    /// content hash, for instance).
    pub async fn identify_with<B, F, Fut>(
        &self,
        backend: &B,
        info: FileInfo,
        prepare: F,
    ) -> Result<Resolution, CatalogError>
    where
        B: Backend,
        F: FnOnce(FileInfo) -> Fut,
        Fut: Future<Output = Result<FileInfo, CatalogError>>,
    {
        let key = info.path.clone();
        self.flights
            .run(key, || self.resolve(backend, info, prepare))
            .await
    }

    async fn resolve<B, F, Fut>(
        &self,
        backend: &B,
        mut info: FileInfo,
        prepare: F,
    ) -> Result<Resolution, CatalogError>
    where
        B: Backend,
        F: FnOnce(FileInfo) -> Fut,
        Fut: Future<Output = Result<FileInfo, CatalogError>>,
    {
        let path = info.path.display().to_string();
        match stable_size(&info.path, self.stabilize_delay).await {
            Ok(Some(size)) => {
                info.file_size.get_or_insert(size);
            }
            Ok(None) => {
                log::info!("{path}: still growing, deferring");
                return Ok(Resolution::NotYet);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("{path}: no such file");
                return Ok(Resolution::NotFound);
            }
            Err(e) => return Err(CatalogError::store(format!("cannot stat {path}: {e}"))),
        }
        let info = prepare(info).await?;

        if let Some(entity) = backend.parse(&info).await? {
            log::debug!("{path}: already known as {}", entity.id());
            return Ok(Resolution::Known(entity));
        }

        let candidates = backend.search(&info).await?;
        let chosen = match candidates.len() {
            0 => {
                log::info!("{path}: no {} candidates", backend.provider());
                return Ok(Resolution::NotFound);
            }
            1 => candidates.into_iter().next(),
            _ => {
                let likely: Vec<MatchCandidate> =
                    candidates.iter().filter(|c| c.likely).cloned().collect();
                if likely.len() == 1 {
                    likely.into_iter().next()
                } else {
                    let pool = if likely.is_empty() { candidates } else { likely };
                    match backend.disambiguate(&info, &pool).await? {
                        Some(candidate) => Some(candidate),
                        None => {
                            log::info!("{path}: {} candidates, none preferred", pool.len());
                            return Ok(Resolution::Ambiguous(pool));
                        }
                    }
                }
            }
        };

        let Some(candidate) = chosen else {
            return Ok(Resolution::NotFound);
        };
        log::info!("{path}: matched {} ({})", candidate.name, candidate.id);
        backend.match_file(&info, &candidate).await?;
        Ok(Resolution::Matched(candidate))
    }
}
