use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Technical attributes the host indexer already knows about a media file.
///
/// Everything except the path is optional; the resolver fills in the content
/// hash on demand and otherwise works with whatever it is given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    /// OpenSubtitles-style content hash (16 lowercase hex digits).
    pub hash: Option<String>,
    pub file_size: Option<u64>,
    /// Playback duration in seconds.
    pub length: Option<u64>,
    /// Series name parsed from the filename by the host.
    pub series: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub title: Option<String>,
}

impl FileInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>, file_size: u64) -> Self {
        self.hash = Some(hash.into());
        self.file_size = Some(file_size);
        self
    }

    pub fn with_length(mut self, seconds: u64) -> Self {
        self.length = Some(seconds);
        self
    }

    pub fn with_episode(mut self, series: impl Into<String>, season: u32, episode: u32) -> Self {
        self.series = Some(series.into());
        self.season = Some(season);
        self.episode = Some(episode);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Files carrying a series attribute are routed to the TV store.
    pub fn is_episode(&self) -> bool {
        self.series.is_some()
    }

    /// File name without directory.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Companion file with the same stem and a different extension.
    pub fn sidecar(&self, extension: &str) -> PathBuf {
        self.path.with_extension(extension)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
