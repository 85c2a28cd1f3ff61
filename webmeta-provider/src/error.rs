/// Errors that can occur while talking to a remote catalog.
///
/// "No such id" is not an error: lookups return `Ok(None)` for it.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited by {0}")]
    RateLimit(&'static str),

    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid API key for {0}")]
    InvalidApiKey(&'static str),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("ZIP archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Corrupt provider data: {0}")]
    Corrupt(String),

    #[error("XML-RPC fault: {0}")]
    Fault(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl ProviderError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Corrupt data and rejected credentials fail the same way every time.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Corrupt(_) | Self::InvalidApiKey(_))
    }
}

impl From<tokio::task::JoinError> for ProviderError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

impl From<ProviderError> for webmeta_core::CatalogError {
    /// A single failed call. Retry loops build their own `Transient` with the
    /// real attempt count.
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Corrupt(msg) => Self::Corrupt(msg),
            other => Self::transient(1, other.to_string()),
        }
    }
}
