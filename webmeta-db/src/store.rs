//! The versioned store: one database, one version marker, one image directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::operations::{self, OperationError};
use crate::schema::{self, SchemaError};
use crate::watch::VersionWatcher;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("Database error: {0}")]
    Operation(#[from] OperationError),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error("Store connection lock poisoned")]
    Poisoned,
}

impl From<StoreError> for webmeta_core::CatalogError {
    fn from(e: StoreError) -> Self {
        Self::store(e.to_string())
    }
}

impl From<OperationError> for webmeta_core::CatalogError {
    fn from(e: OperationError) -> Self {
        Self::store(e.to_string())
    }
}

/// A local mirror of one provider's catalog.
///
/// Readers may query at any time; writes go through [`write`](Self::write),
/// which commits or rolls back as a unit. The version marker is bumped
/// explicitly with [`notify_resync`](Self::notify_resync) so one logical
/// change produces one notification no matter how many rows it touched.
pub struct VersionedStore {
    name: String,
    db_path: PathBuf,
    version_path: PathBuf,
    image_dir: PathBuf,
    conn: Mutex<Connection>,
    version: AtomicU64,
    /// Serializes marker writes against marker refreshes.
    version_lock: Mutex<()>,
    changed: broadcast::Sender<u64>,
}

impl VersionedStore {
    /// Open or create the store `<base>/<name>.db` with its marker and image
    /// directory.
    pub fn open(base: &Path, name: &str) -> Result<Self, StoreError> {
        std::fs::create_dir_all(base)?;
        let db_path = base.join(format!("{name}.db"));
        let version_path = base.join(format!("{name}.db.version"));
        let image_dir = base.join(format!("{name}.db.images"));
        std::fs::create_dir_all(&image_dir)?;

        let conn = schema::open_database(&db_path)?;

        if !version_path.exists() {
            std::fs::write(&version_path, "0")?;
        }
        let version = read_marker(&version_path)?.unwrap_or(0);
        log::info!("Opened store {} at version {}", db_path.display(), version);

        let (changed, _) = broadcast::channel(16);
        Ok(Self {
            name: name.to_string(),
            db_path,
            version_path,
            image_dir,
            conn: Mutex::new(conn),
            version: AtomicU64::new(version),
            version_lock: Mutex::new(()),
            changed,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn version_path(&self) -> &Path {
        &self.version_path
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    // ── Reads and writes ────────────────────────────────────────────────────

    /// Run read queries against the current committed state.
    pub fn read<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, OperationError>,
    ) -> Result<T, StoreError> {
        let conn = self.lock()?;
        Ok(f(&conn)?)
    }

    /// Run `f` inside a transaction that commits when `f` returns `Ok` and
    /// rolls back otherwise.
    pub fn write<T, E>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(StoreError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }

    // ── Metadata ────────────────────────────────────────────────────────────

    pub fn get_metadata<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let raw = self.read(|conn| operations::get_metadata_raw(conn, key))?;
        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    pub fn set_metadata<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let text = serde_json::to_string(value)?;
        self.write(|tx| {
            operations::set_metadata_raw(tx, key, &text).map_err(StoreError::from)
        })
    }

    // ── Version marker ──────────────────────────────────────────────────────

    /// Last version this process has seen.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Bump the version and tell every reader (in-process and on disk) that
    /// derived caches are stale.
    ///
    /// The new version is one past the newer of the cached and on-disk
    /// values, so a bump by another process is never overwritten.
    pub fn notify_resync(&self) -> Result<u64, StoreError> {
        let _guard = self.version_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let cached = self.version.load(Ordering::Acquire);
        let on_disk = read_marker(&self.version_path)?.unwrap_or(cached);
        let version = cached.max(on_disk) + 1;
        let tmp = self.version_path.with_extension("version.tmp");
        std::fs::write(&tmp, version.to_string())?;
        std::fs::rename(&tmp, &self.version_path)?;
        self.version.store(version, Ordering::Release);
        log::debug!("Store {} bumped to version {}", self.name, version);
        let _ = self.changed.send(version);
        Ok(version)
    }

    /// Re-read the marker file. Returns `true` if another process changed it.
    ///
    /// A marker that cannot be parsed (caught mid-write) counts as one newer
    /// than the cached version.
    pub fn refresh_version(&self) -> Result<bool, StoreError> {
        let _guard = self.version_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let cached = self.version.load(Ordering::Acquire);
        let on_disk = read_marker(&self.version_path)?.unwrap_or(cached + 1);
        if on_disk == cached {
            return Ok(false);
        }
        self.version.store(on_disk, Ordering::Release);
        log::debug!(
            "Store {} changed on disk: version {} -> {}",
            self.name,
            cached,
            on_disk
        );
        let _ = self.changed.send(on_disk);
        Ok(true)
    }

    /// Receive every version change this process observes.
    pub fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.changed.subscribe()
    }

    /// Watch the marker file for writes by other processes.
    ///
    /// The watcher stops when the returned handle is dropped.
    pub fn watch(self: &Arc<Self>) -> Result<VersionWatcher, StoreError> {
        VersionWatcher::start(Arc::downgrade(self), &self.version_path)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl std::fmt::Debug for VersionedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedStore")
            .field("db_path", &self.db_path)
            .field("version", &self.version())
            .finish()
    }
}

/// `Ok(None)` when the marker exists but does not hold an integer.
fn read_marker(path: &Path) -> Result<Option<u64>, StoreError> {
    let text = std::fs::read_to_string(path)?;
    Ok(text.trim().parse().ok())
}
