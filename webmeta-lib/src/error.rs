use thiserror::Error;

use webmeta_core::{CatalogError, Provider};
use webmeta_db::StoreError;
use webmeta_provider::ProviderError;

/// Errors surfaced by the host facade.
#[derive(Debug, Error)]
pub enum LibError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("Could not serialize settings: {0}")]
    SettingsWrite(#[from] toml::ser::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The operation needs a provider that was not registered (no API key).
    #[error("{} is not configured (missing API key)", .0.display_name())]
    NotConfigured(Provider),
}
