use crate::candidate::MatchCandidate;

/// Error taxonomy surfaced at the sync and match boundaries.
///
/// Lower layers (store, providers) have their own error types; they are
/// folded into one of these kinds before reaching the host.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    /// File missing, no candidate, no mapping.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network, parse, or rate-limit failure that outlived its retries.
    #[error("transient failure after {attempts} attempt(s): {message}")]
    Transient { attempts: u32, message: String },

    /// More than one indistinguishable candidate remained.
    #[error("ambiguous match: {} candidates", .0.len())]
    Ambiguous(Vec<MatchCandidate>),

    /// Provider data violated a sanity check; the sync unit is abandoned.
    #[error("corrupt catalog data: {0}")]
    Corrupt(String),

    /// The local store could not be opened or written.
    #[error("store error: {0}")]
    Store(String),
}

impl CatalogError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn transient(attempts: u32, msg: impl Into<String>) -> Self {
        Self::Transient {
            attempts,
            message: msg.into(),
        }
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
