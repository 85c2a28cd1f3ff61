//! Synchronization between one remote catalog and its local store.
//!
//! The engine owns the write discipline of a store: every mutation runs on
//! the blocking pool while holding a FIFO write lock, full fetches are
//! retried a bounded number of times, `add_by_id` is coalesced per id and
//! `sync` is coalesced globally.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;
use webmeta_core::{CatalogError, MatchCandidate, MatchPolicy};
use webmeta_db::{self as db, VersionedStore};
use webmeta_provider::CatalogProvider;

use crate::progress::{SilentProgress, SyncProgress};
use crate::record::CatalogRecord;
use crate::single_flight::SingleFlight;
use crate::state::{EntityState, StateTable};

/// Metadata key of the provider-side delta cursor.
pub const SERVERTIME_KEY: &str = "servertime";
/// Metadata key of the local time the cursor was stored.
pub const LOCALTIME_KEY: &str = "localtime";
/// Metadata key of the schema version the rows were written with.
pub const SCHEMA_VERSION_KEY: &str = "schemaVersion";

/// What `add_by_id` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The record was fetched and stored.
    Fetched,
    /// The record was already stored; nothing was fetched.
    AlreadyPresent,
}

/// Result of one `sync` run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub forced: bool,
    /// Ids re-fetched and stored.
    pub updated: Vec<u64>,
    /// Ids whose refresh failed; the batch continued without them.
    pub failed: Vec<(u64, CatalogError)>,
    /// Cursor stored at the end of the run. `None` when nothing ran.
    pub cursor: Option<i64>,
}

/// Run `f` against the store on the blocking pool.
pub(crate) async fn on_store<T, F>(store: &Arc<VersionedStore>, f: F) -> Result<T, CatalogError>
where
    T: Send + 'static,
    F: FnOnce(&Arc<VersionedStore>) -> Result<T, CatalogError> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| CatalogError::store(format!("store task failed: {e}")))?
}

pub struct SyncEngine<P: CatalogProvider> {
    store: Arc<VersionedStore>,
    provider: P,
    policy: MatchPolicy,
    write_lock: Mutex<()>,
    adds: SingleFlight<u64, Result<AddOutcome, CatalogError>>,
    syncs: SingleFlight<(), Result<SyncReport, CatalogError>>,
    states: StateTable,
    /// Set when the stored rows were discarded; the next sync is forced.
    force_next: AtomicBool,
    /// Rows were added but no caller has announced them yet.
    unannounced: AtomicBool,
    progress: Arc<dyn SyncProgress>,
}

impl<P> SyncEngine<P>
where
    P: CatalogProvider + 'static,
    P::Record: CatalogRecord,
{
    pub fn new(store: Arc<VersionedStore>, provider: P, policy: MatchPolicy) -> Self {
        Self {
            store,
            provider,
            policy,
            write_lock: Mutex::new(()),
            adds: SingleFlight::new(),
            syncs: SingleFlight::new(),
            states: StateTable::default(),
            force_next: AtomicBool::new(false),
            unannounced: AtomicBool::new(false),
            progress: Arc::new(SilentProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn SyncProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn store(&self) -> &Arc<VersionedStore> {
        &self.store
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    pub fn state(&self, id: u64) -> EntityState {
        self.states.get(id)
    }

    fn label(&self) -> &'static str {
        if self.provider.provider().is_episodic() {
            "series"
        } else {
            "movie"
        }
    }

    // ── Schema ──────────────────────────────────────────────────────────────

    /// Compare the stored schema version with `expected`.
    ///
    /// On a mismatch the mirrored rows are discarded and the next `sync` is
    /// forced. Returns `true` in that case.
    pub fn check_schema(&self, expected: u32) -> Result<bool, CatalogError> {
        let stored: Option<u32> = self.store.get_metadata(SCHEMA_VERSION_KEY)?;
        if stored == Some(expected) {
            return Ok(false);
        }
        let outdated = stored.is_some();
        if outdated {
            log::warn!(
                "Store {} has schema version {:?}, expected {}; clearing catalog",
                self.store.name(),
                stored,
                expected
            );
            self.store
                .write(|tx| db::clear_catalog(tx).map_err(CatalogError::from))?;
            self.states.clear();
            self.force_next.store(true, Ordering::Release);
        }
        self.store.set_metadata(SCHEMA_VERSION_KEY, &expected)?;
        Ok(outdated)
    }

    // ── Writes ──────────────────────────────────────────────────────────────

    /// Run `f` on the blocking pool while holding the write lock.
    pub(crate) async fn locked<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        T: Send + 'static,
        F: FnOnce(&Arc<VersionedStore>) -> Result<T, CatalogError> + Send + 'static,
    {
        let _guard = self.write_lock.lock().await;
        on_store(&self.store, f).await
    }

    /// Run `f` in one store transaction, serialized with every other write.
    pub async fn write<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, CatalogError> + Send + 'static,
    {
        self.locked(move |store| store.write(|tx| f(tx))).await
    }

    /// Bump the store version so every cached view is rebuilt.
    pub async fn notify(&self) -> Result<u64, CatalogError> {
        on_store(&self.store, |store| Ok(store.notify_resync()?)).await
    }

    // ── Add ─────────────────────────────────────────────────────────────────

    /// Make sure the entity `id` is stored, fetching it if needed, and map
    /// `alias` to it.
    ///
    /// A stored entity is never re-fetched: a second call only updates the
    /// alias. Concurrent calls for the same id share one fetch.
    pub async fn add_by_id(
        &self,
        id: u64,
        alias: Option<&str>,
    ) -> Result<AddOutcome, CatalogError> {
        self.add_and_bind(id, alias, |_| Ok(false)).await
    }

    /// [`add_by_id`](Self::add_by_id), with `bind` run in the same
    /// transaction as the alias mapping. `bind` returns whether it changed
    /// anything.
    ///
    /// The fetched rows, the alias and the binding are announced with a
    /// single version bump.
    pub async fn add_and_bind<F>(
        &self,
        id: u64,
        alias: Option<&str>,
        bind: F,
    ) -> Result<AddOutcome, CatalogError>
    where
        F: FnOnce(&Connection) -> Result<bool, CatalogError> + Send + 'static,
    {
        let outcome = self.adds.run(id, || self.fetch_and_store(id)).await?;

        let alias = alias
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        let changed = self
            .write(move |conn| {
                let mut changed = bind(conn)?;
                if let Some(alias) = alias {
                    changed |= P::Record::map_alias(conn, id, &alias)?;
                }
                Ok(changed)
            })
            .await?;

        if self.unannounced.swap(false, Ordering::AcqRel) || changed {
            self.notify().await?;
        }
        Ok(outcome)
    }

    /// Promote a search candidate. The candidate must come from this
    /// engine's provider.
    pub async fn add_by_search_result(
        &self,
        candidate: &MatchCandidate,
        alias: Option<&str>,
    ) -> Result<AddOutcome, CatalogError> {
        self.add_by_id(self.candidate_id(candidate)?, alias).await
    }

    /// The provider id of `candidate`, if it is one of this provider's.
    pub fn candidate_id(&self, candidate: &MatchCandidate) -> Result<u64, CatalogError> {
        let provider = self.provider.provider();
        if candidate.id.provider != provider {
            return Err(CatalogError::not_found(format!(
                "{} is not a {} result",
                candidate.id,
                provider.display_name()
            )));
        }
        Ok(candidate.id.id)
    }

    async fn fetch_and_store(&self, id: u64) -> Result<AddOutcome, CatalogError> {
        let exists = on_store(&self.store, move |store| {
            Ok(store.read(|conn| P::Record::exists(conn, id))?)
        })
        .await?;
        if exists {
            self.states.set(id, EntityState::Persisted);
            return Ok(AddOutcome::AlreadyPresent);
        }

        self.ensure_cursor().await?;
        self.progress
            .on_phase(&format!("Adding {} {}", self.label(), id));
        self.refresh(id).await?;
        self.unannounced.store(true, Ordering::Release);
        Ok(AddOutcome::Fetched)
    }

    /// Store the provider clock as the first delta cursor.
    async fn ensure_cursor(&self) -> Result<(), CatalogError> {
        let cursor: Option<i64> =
            on_store(&self.store, |store| Ok(store.get_metadata(SERVERTIME_KEY)?)).await?;
        if cursor.is_some() {
            return Ok(());
        }
        match self.provider.server_time().await {
            Ok(time) => self.store_cursor(time).await,
            Err(e) => {
                log::warn!(
                    "Could not read {} server time: {}",
                    self.provider.provider().display_name(),
                    e
                );
                Ok(())
            }
        }
    }

    async fn store_cursor(&self, cursor: i64) -> Result<(), CatalogError> {
        self.locked(move |store| {
            store.set_metadata(SERVERTIME_KEY, &cursor)?;
            store.set_metadata(LOCALTIME_KEY, &chrono::Utc::now().timestamp())?;
            Ok(())
        })
        .await
    }

    /// Fetch and persist one entity, tracking its state. Does not notify.
    async fn refresh(&self, id: u64) -> Result<(), CatalogError> {
        self.states.set(id, EntityState::Fetching);
        let result = async {
            let record = self.fetch_with_retry(id).await?;
            self.write(move |conn| record.persist(conn)).await
        }
        .await;
        match &result {
            Ok(()) => self.states.set(id, EntityState::Persisted),
            Err(e) => {
                if matches!(e, CatalogError::Corrupt(_)) {
                    log::error!("{} {}: {}", self.label(), id, e);
                }
                self.states.set(id, EntityState::Failed);
            }
        }
        result
    }

    /// `fetch_full` with the policy's attempt budget.
    ///
    /// "No such id" ends the loop at once; terminal provider errors too.
    async fn fetch_with_retry(&self, id: u64) -> Result<P::Record, CatalogError> {
        let attempts = self.policy.fetch_attempts.max(1);
        let name = self.provider.provider().display_name();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.provider.fetch_full(id).await {
                Ok(Some(record)) => return Ok(record),
                Ok(None) => {
                    return Err(CatalogError::not_found(format!(
                        "{name} has no {} {id}",
                        self.label()
                    )));
                }
                Err(e) if !e.is_transient() => return Err(e.into()),
                Err(e) => {
                    log::warn!("{name} fetch of {id} failed (attempt {attempt}/{attempts}): {e}");
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.retry_delay()).await;
                    }
                }
            }
        }
        Err(CatalogError::transient(attempts, last_error))
    }

    // ── Delete ──────────────────────────────────────────────────────────────

    /// Remove an entity with everything stored under it.
    pub async fn delete(&self, id: u64) -> Result<bool, CatalogError> {
        let deleted = self
            .write(move |conn| Ok(P::Record::delete(conn, id)?))
            .await?;
        if deleted {
            self.states.set(id, EntityState::Unsynced);
            self.notify().await?;
        }
        Ok(deleted)
    }

    // ── Sync ────────────────────────────────────────────────────────────────

    /// Bring tracked entities up to date.
    ///
    /// Without `force`, only ids the provider reports as changed since the
    /// stored cursor are re-fetched; with no cursor stored nothing happens.
    /// With `force`, every tracked id is re-fetched. Concurrent calls share
    /// one run.
    pub async fn sync(&self, force: bool) -> Result<SyncReport, CatalogError> {
        self.syncs.run((), || self.run_sync(force)).await
    }

    async fn run_sync(&self, force: bool) -> Result<SyncReport, CatalogError> {
        let force = self.force_next.swap(false, Ordering::AcqRel) || force;
        let name = self.provider.provider().display_name();

        let (cursor, tracked) = on_store(&self.store, |store| {
            let cursor: Option<i64> = store.get_metadata(SERVERTIME_KEY)?;
            let tracked = store.read(P::Record::tracked_ids)?;
            Ok((cursor, tracked))
        })
        .await?;

        let (ids, next_cursor) = if force {
            self.progress
                .on_phase(&format!("Refreshing {} entries from {}", tracked.len(), name));
            let now = self.provider.server_time().await?;
            (tracked, now)
        } else {
            let Some(cursor) = cursor else {
                log::debug!("{name}: no sync cursor stored, nothing to update");
                return Ok(SyncReport::default());
            };
            self.progress.on_phase(&format!("Fetching updates from {name}"));
            let delta = self.provider.fetch_delta_since(cursor).await?;
            let tracked: HashSet<u64> = tracked.into_iter().collect();
            let ids = delta
                .ids
                .into_iter()
                .filter(|id| tracked.contains(id))
                .collect::<Vec<_>>();
            (ids, delta.cursor)
        };

        let mut report = SyncReport {
            forced: force,
            ..SyncReport::default()
        };
        let total = ids.len();
        for (i, id) in ids.into_iter().enumerate() {
            self.progress
                .on_item(i + 1, total, &format!("Updating {} {}", self.label(), id));
            match self.refresh(id).await {
                Ok(()) => report.updated.push(id),
                Err(e) => {
                    log::warn!("{name}: {} {} not updated: {}", self.label(), id, e);
                    report.failed.push((id, e));
                }
            }
        }

        self.store_cursor(next_cursor).await?;
        report.cursor = Some(next_cursor);
        if !report.updated.is_empty() {
            self.notify().await?;
        }

        self.progress.on_complete(&format!(
            "Sync complete: {} updated, {} failed",
            report.updated.len(),
            report.failed.len()
        ));
        Ok(report)
    }
}
