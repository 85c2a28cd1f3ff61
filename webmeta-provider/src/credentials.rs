use webmeta_core::Provider;

pub const TVDB_ENV: &str = "WEBMETA_TVDB_API_KEY";
pub const TMDB_ENV: &str = "WEBMETA_TMDB_API_KEY";

/// Where an API key's value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeySource {
    /// Loaded from an environment variable.
    EnvVar(&'static str),
    /// Loaded from the settings file.
    ConfigFile,
    /// Not set anywhere.
    Missing,
}

impl std::fmt::Display for ApiKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvVar(var) => write!(f, "env ${}", var),
            Self::ConfigFile => write!(f, "config file"),
            Self::Missing => write!(f, "not set"),
        }
    }
}

/// Static API keys for the remote catalogs.
///
/// Priority: env vars > settings file. A provider without a key is not
/// registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    pub tvdb: Option<String>,
    pub tmdb: Option<String>,
}

impl ApiKeys {
    /// Resolve keys from the process environment over the settings values.
    pub fn resolve(config_tvdb: Option<String>, config_tmdb: Option<String>) -> Self {
        Self::resolve_with(config_tvdb, config_tmdb, |var| std::env::var(var).ok())
    }

    /// Resolve keys with an explicit environment lookup.
    pub fn resolve_with(
        config_tvdb: Option<String>,
        config_tmdb: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let pick = |var: &str, config: Option<String>| {
            env(var)
                .filter(|v| !v.trim().is_empty())
                .or(config.filter(|v| !v.trim().is_empty()))
        };
        Self {
            tvdb: pick(TVDB_ENV, config_tvdb),
            tmdb: pick(TMDB_ENV, config_tmdb),
        }
    }

    pub fn get(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::TheTvDb => self.tvdb.as_deref(),
            Provider::TheMovieDb => self.tmdb.as_deref(),
        }
    }
}

/// Determine where the key for `provider` is coming from.
pub fn key_source(provider: Provider, config_value: Option<&str>) -> ApiKeySource {
    key_source_with(provider, config_value, |var| std::env::var(var).ok())
}

pub fn key_source_with(
    provider: Provider,
    config_value: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> ApiKeySource {
    let var = match provider {
        Provider::TheTvDb => TVDB_ENV,
        Provider::TheMovieDb => TMDB_ENV,
    };
    if env(var).is_some_and(|v| !v.trim().is_empty()) {
        ApiKeySource::EnvVar(var)
    } else if config_value.is_some_and(|v| !v.trim().is_empty()) {
        ApiKeySource::ConfigFile
    } else {
        ApiKeySource::Missing
    }
}
