use thiserror::Error;

use webmeta_core::{CatalogError, IdParseError};
use webmeta_lib::LibError;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Lib(#[from] LibError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("{0}")]
    InvalidId(#[from] IdParseError),

    /// Runtime creation or async error
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl CliError {
    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }
}
