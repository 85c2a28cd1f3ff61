use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Remote metadata catalogs a store can mirror.
///
/// Each provider owns one local store and one id namespace. Ids are
/// qualified with the provider's scheme (`thetvdb:80379`) whenever they
/// leave the provider boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// TV series, seasons and episodes.
    TheTvDb,
    /// Feature films.
    TheMovieDb,
}

const ALL_PROVIDERS: &[Provider] = &[Provider::TheTvDb, Provider::TheMovieDb];

impl Provider {
    pub fn all() -> &'static [Provider] {
        ALL_PROVIDERS
    }

    /// Scheme prefix used in qualified ids and as the store name.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::TheTvDb => "thetvdb",
            Self::TheMovieDb => "themoviedb",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::TheTvDb => "TheTVDB",
            Self::TheMovieDb => "TheMovieDB",
        }
    }

    /// Whether this provider's records are episodic (series → season → episode).
    pub fn is_episodic(&self) -> bool {
        matches!(self, Self::TheTvDb)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "thetvdb" | "tvdb" => Ok(Self::TheTvDb),
            "themoviedb" | "tmdb" => Ok(Self::TheMovieDb),
            _ => Err(IdParseError::UnknownProvider(s.to_string())),
        }
    }
}

/// Errors from parsing a provider name or qualified id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("id '{0}' has no provider scheme (expected e.g. 'thetvdb:80379')")]
    MissingScheme(String),

    #[error("invalid numeric id '{0}'")]
    InvalidNumber(String),
}

/// A provider-qualified record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CatalogId {
    pub provider: Provider,
    pub id: u64,
}

impl CatalogId {
    pub fn new(provider: Provider, id: u64) -> Self {
        Self { provider, id }
    }

    pub fn tvdb(id: u64) -> Self {
        Self::new(Provider::TheTvDb, id)
    }

    pub fn tmdb(id: u64) -> Self {
        Self::new(Provider::TheMovieDb, id)
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider.scheme(), self.id)
    }
}

impl FromStr for CatalogId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, number) = s
            .split_once(':')
            .ok_or_else(|| IdParseError::MissingScheme(s.to_string()))?;
        let provider: Provider = scheme.parse()?;
        let id = number
            .trim()
            .parse::<u64>()
            .map_err(|_| IdParseError::InvalidNumber(number.to_string()))?;
        Ok(Self { provider, id })
    }
}

impl Serialize for CatalogId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CatalogId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "tests/provider_tests.rs"]
mod tests;
