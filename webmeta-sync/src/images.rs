//! On-disk artwork cache.
//!
//! An asset lives at a path derived from its parent id and kind. The path
//! existing is the cache hit test: once written, an asset is never fetched
//! again.

use std::path::{Path, PathBuf};

use webmeta_catalog::types::ImageKind;
use webmeta_core::CatalogError;
use webmeta_provider::CatalogProvider;

use crate::entities::image_path;
use crate::single_flight::SingleFlight;

pub struct ImageCache {
    dir: PathBuf,
    fetches: SingleFlight<PathBuf, Result<PathBuf, CatalogError>>,
}

impl ImageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fetches: SingleFlight::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, id: u64, kind: ImageKind) -> PathBuf {
        image_path(&self.dir, id, kind)
    }

    /// Whether the asset is already on disk.
    pub async fn contains(&self, id: u64, kind: ImageKind) -> bool {
        tokio::fs::try_exists(self.path(id, kind))
            .await
            .unwrap_or(false)
    }

    /// Local path of the asset, downloading `url` first if it is not cached.
    ///
    /// Concurrent calls for the same path share one download. The file is
    /// written under a temporary name and renamed into place, so a reader
    /// never sees a partial image.
    pub async fn ensure<P: CatalogProvider>(
        &self,
        provider: &P,
        id: u64,
        kind: ImageKind,
        url: &str,
    ) -> Result<PathBuf, CatalogError> {
        let path = self.path(id, kind);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(path);
        }
        self.fetches
            .run(path.clone(), || async move {
                // Another flight may have finished while this one queued.
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    return Ok(path);
                }
                log::debug!("downloading {url} to {}", path.display());
                let bytes = provider.download(url).await?;
                let target = path.clone();
                tokio::task::spawn_blocking(move || write_atomically(&target, &bytes))
                    .await
                    .map_err(|e| CatalogError::store(format!("image task failed: {e}")))?
                    .map_err(|e| {
                        CatalogError::store(format!("cannot write {}: {e}", path.display()))
                    })?;
                Ok(path)
            })
            .await
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("jpg.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}
