use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunable thresholds for matching and synchronisation.
///
/// Loaded from the `[policy]` table of the settings file; every field is
/// optional there and falls back to the default below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Files shorter than this are not searched as movies unless a sidecar exists.
    pub min_movie_length_secs: u64,
    /// Episode number that marks a special; such episodes get no position in a season.
    pub special_episode: u32,
    /// Highest episode number a season may contain before it is considered corrupt.
    pub max_episode_number: u32,
    /// Attempts made for a full fetch before the entity is marked failed.
    pub fetch_attempts: u32,
    pub retry_delay_ms: u64,
    /// Minimum gap between two requests to TheMovieDB.
    pub tmdb_request_interval_ms: u64,
    /// Minimum gap between two requests to TheTVDB.
    pub tvdb_request_interval_ms: u64,
    /// How long a file's size must stay unchanged before it is hashed.
    pub stabilize_delay_ms: u64,
    /// Freshness window of the cached provider configuration.
    pub provider_config_ttl_secs: u64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            min_movie_length_secs: 3600,
            special_episode: 0,
            max_episode_number: 1000,
            fetch_attempts: 3,
            retry_delay_ms: 1000,
            tmdb_request_interval_ms: 1000,
            tvdb_request_interval_ms: 0,
            stabilize_delay_ms: 2000,
            provider_config_ttl_secs: 3600,
        }
    }
}

impl MatchPolicy {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn stabilize_delay(&self) -> Duration {
        Duration::from_millis(self.stabilize_delay_ms)
    }

    pub fn tmdb_request_interval(&self) -> Duration {
        Duration::from_millis(self.tmdb_request_interval_ms)
    }

    pub fn tvdb_request_interval(&self) -> Duration {
        Duration::from_millis(self.tvdb_request_interval_ms)
    }

    pub fn provider_config_ttl(&self) -> Duration {
        Duration::from_secs(self.provider_config_ttl_secs)
    }

    /// Whether a file of the given length could be a feature film.
    /// Unknown lengths are given the benefit of the doubt.
    pub fn looks_like_movie(&self, length_secs: Option<u64>) -> bool {
        length_secs.is_none_or(|l| l >= self.min_movie_length_secs)
    }

    /// Policy for tests: no delays anywhere.
    pub fn immediate() -> Self {
        Self {
            retry_delay_ms: 0,
            tmdb_request_interval_ms: 0,
            tvdb_request_interval_ms: 0,
            stabilize_delay_ms: 0,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_table_keeps_defaults() {
        let policy: MatchPolicy = toml::from_str("min_movie_length_secs = 1800").unwrap();
        assert_eq!(policy.min_movie_length_secs, 1800);
        assert_eq!(policy.max_episode_number, 1000);
        assert_eq!(policy.fetch_attempts, 3);
    }

    #[test]
    fn short_files_do_not_look_like_movies() {
        let policy = MatchPolicy::default();
        assert!(!policy.looks_like_movie(Some(1500)));
        assert!(policy.looks_like_movie(Some(3600)));
        assert!(policy.looks_like_movie(None));
    }
}
