//! Cross-process change detection on the version marker file.

use std::path::{Path, PathBuf};
use std::sync::Weak;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::store::{StoreError, VersionedStore};

/// Keeps a filesystem watcher alive for one store's marker file.
pub struct VersionWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl VersionWatcher {
    pub(crate) fn start(
        store: Weak<VersionedStore>,
        version_path: &Path,
    ) -> Result<Self, StoreError> {
        let target = version_path.to_path_buf();
        let dir = version_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let watched = target.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if !touches_marker(&event, &watched) {
                        return;
                    }
                    let Some(store) = store.upgrade() else {
                        return;
                    };
                    if let Err(e) = store.refresh_version() {
                        log::warn!("Failed to re-read {}: {}", watched.display(), e);
                    }
                }
                Err(e) => log::error!("Version watch error: {:?}", e),
            },
            Config::default(),
        )?;

        // The marker is replaced by rename, so watch its directory rather
        // than the file inode.
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        log::debug!("Watching {}", target.display());

        Ok(Self {
            _watcher: watcher,
            path: target,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn touches_marker(event: &Event, marker: &Path) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    );
    relevant
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == marker.file_name())
}
