//! Shared application settings (storage location, API keys, match policy).
//!
//! The settings file is always `~/.config/webmeta/settings.toml`. Values are
//! resolved with the priority CLI override > environment > file > default.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use webmeta_core::{MatchPolicy, Provider};
use webmeta_provider::ApiKeys;

use crate::error::LibError;

/// Environment variable overriding `storage.base`.
pub const BASE_ENV: &str = "WEBMETA_BASE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub thetvdb: ProviderSettings,
    pub themoviedb: ProviderSettings,
    pub policy: MatchPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding both stores. `~` expands to the home directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Canonical path to the settings file: `~/.config/webmeta/settings.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("webmeta").join("settings.toml")
}

/// Default storage directory: `~/.webmeta`.
pub fn default_base() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".webmeta")
}

impl Settings {
    /// Load from the canonical file, then apply the environment and the
    /// optional CLI override for the storage directory.
    pub fn resolve(cli_base: Option<PathBuf>) -> Result<Self, LibError> {
        let mut settings = Self::load_from(&settings_path())?;
        settings.apply_env_with(|var| std::env::var(var).ok());
        if let Some(base) = cli_base {
            settings.storage.base = Some(base);
        }
        Ok(settings)
    }

    /// Read a settings file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, LibError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply environment overrides through an explicit lookup.
    pub fn apply_env_with(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(base) = env(BASE_ENV).filter(|v| !v.trim().is_empty()) {
            self.storage.base = Some(PathBuf::from(base));
        }
    }

    /// The resolved storage directory.
    pub fn storage_base(&self) -> PathBuf {
        match &self.storage.base {
            Some(base) => expand_home(base),
            None => default_base(),
        }
    }

    /// API keys with environment variables taking priority over the file.
    pub fn api_keys(&self) -> ApiKeys {
        ApiKeys::resolve(
            self.thetvdb.api_key.clone(),
            self.themoviedb.api_key.clone(),
        )
    }

    pub fn config_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::TheTvDb => self.thetvdb.api_key.as_deref(),
            Provider::TheMovieDb => self.themoviedb.api_key.as_deref(),
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Table name of a provider in the settings file.
fn provider_table(provider: Provider) -> &'static str {
    match provider {
        Provider::TheTvDb => "thetvdb",
        Provider::TheMovieDb => "themoviedb",
    }
}

/// Save (or clear) a provider's API key in the settings file at `path`.
///
/// Uses `toml::Value` for a surgical update so fields the code does not
/// know about are preserved.
pub fn save_api_key(path: &Path, provider: Provider, key: Option<&str>) -> io::Result<()> {
    let mut doc: toml::Value = if let Ok(contents) = std::fs::read_to_string(path) {
        contents
            .parse()
            .unwrap_or_else(|_| toml::Value::Table(Default::default()))
    } else {
        toml::Value::Table(Default::default())
    };

    let table = doc
        .as_table_mut()
        .ok_or_else(|| io::Error::other("settings.toml root is not a table"))?;
    let name = provider_table(provider);
    let section = table
        .entry(name)
        .or_insert_with(|| toml::Value::Table(Default::default()));
    let section = section
        .as_table_mut()
        .ok_or_else(|| io::Error::other(format!("[{name}] is not a table")))?;

    match key {
        Some(k) => {
            section.insert("api_key".to_string(), toml::Value::String(k.to_string()));
        }
        None => {
            section.remove("api_key");
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string_pretty(&doc).map_err(io::Error::other)?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, &serialized)?;
    std::fs::rename(&tmp, path)?;

    Ok(())
}

/// Load the full settings file as a pretty-printed TOML string for display.
pub fn load_settings_string() -> Option<String> {
    let contents = std::fs::read_to_string(settings_path()).ok()?;
    let doc: toml::Value = contents.parse().ok()?;
    toml::to_string_pretty(&doc).ok()
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
