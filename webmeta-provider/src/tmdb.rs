//! TheMovieDB client (v3 JSON API).

use serde::Deserialize;
use tokio::time::Duration;
use webmeta_catalog::name_parser::{search_query, year_from_date};
use webmeta_catalog::types::{ImageConfig, MovieDetails, MovieImages};
use webmeta_core::{CatalogId, MatchCandidate, Provider};

use crate::error::ProviderError;
use crate::provider::{CatalogProvider, Delta, MovieProvider};
use crate::rate_limit::RateLimiter;

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const NAME: &str = "TheMovieDB";
/// Upper bound on pages walked by one delta request.
const MAX_CHANGE_PAGES: u32 = 100;

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    imdb_id: Option<String>,
}

impl SearchResult {
    fn into_candidate(self) -> MatchCandidate {
        let mut candidate = MatchCandidate::new(
            CatalogId::tmdb(self.id),
            self.title.unwrap_or_default(),
        );
        candidate.overview = self.overview.filter(|s| !s.is_empty());
        candidate.year = self.release_date.as_deref().and_then(year_from_date);
        candidate.imdb = self.imdb_id.filter(|s| !s.is_empty());
        candidate
    }
}

#[derive(Debug, Deserialize)]
struct ChangesResponse {
    #[serde(default)]
    results: Vec<ChangeEntry>,
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ChangeEntry {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct ConfigurationResponse {
    images: WireImageConfig,
}

#[derive(Debug, Deserialize)]
struct WireImageConfig {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    secure_base_url: Option<String>,
    #[serde(default)]
    poster_sizes: Vec<String>,
    #[serde(default)]
    backdrop_sizes: Vec<String>,
}

/// HTTP client for TheMovieDB with request spacing.
///
/// TheMovieDB allows 30 requests per 10 seconds; the default spacing of one
/// second keeps well inside that.
pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    limiter: RateLimiter,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, interval: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            limiter: RateLimiter::new(interval),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// GET `{base}/{command}` as JSON. `Ok(None)` on HTTP 404.
    async fn call(
        &self,
        command: &str,
        query: &[(&str, String)],
    ) -> Result<Option<Vec<u8>>, ProviderError> {
        let _permit = self.limiter.acquire().await;
        log::debug!("{NAME} GET {command}");

        let resp = self
            .http
            .get(format!("{}/{}", self.base_url, command))
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimit(NAME));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::InvalidApiKey(NAME));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::ServerError {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }
        Ok(Some(resp.bytes().await?.to_vec()))
    }

    async fn call_json<T: serde::de::DeserializeOwned>(
        &self,
        command: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, ProviderError> {
        match self.call(command, query).await? {
            Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
            None => Ok(None),
        }
    }
}

impl CatalogProvider for TmdbClient {
    type Record = MovieDetails;

    fn provider(&self) -> Provider {
        Provider::TheMovieDb
    }

    async fn search(
        &self,
        query: &str,
        year: Option<i32>,
    ) -> Result<Vec<MatchCandidate>, ProviderError> {
        let mut params = vec![("query", search_query(query))];
        if let Some(year) = year {
            params.push(("year", year.to_string()));
        }
        match self.call("search/movie", &params).await? {
            Some(body) => parse_search(&body),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_full(&self, id: u64) -> Result<Option<MovieDetails>, ProviderError> {
        let Some(body) = self.call(&format!("movie/{id}"), &[]).await? else {
            return Ok(None);
        };
        let images: Option<MovieImages> =
            self.call_json(&format!("movie/{id}/images"), &[]).await?;
        let casts: Option<serde_json::Value> =
            self.call_json(&format!("movie/{id}/casts"), &[]).await?;
        let keywords: Option<serde_json::Value> =
            self.call_json(&format!("movie/{id}/keywords"), &[]).await?;
        parse_movie(&body, images, casts, keywords).map(Some)
    }

    async fn fetch_delta_since(&self, cursor: i64) -> Result<Delta, ProviderError> {
        let next_cursor = chrono::Utc::now().timestamp();
        let start_date = chrono::DateTime::from_timestamp(cursor, 0)
            .ok_or_else(|| ProviderError::parse(format!("invalid sync cursor {cursor}")))?
            .format("%Y-%m-%d")
            .to_string();

        let mut ids = Vec::new();
        let mut page = 1;
        loop {
            let params = [
                ("start_date", start_date.clone()),
                ("page", page.to_string()),
            ];
            let Some(body) = self.call("movie/changes", &params).await? else {
                break;
            };
            let (page_ids, total_pages) = parse_changes(&body)?;
            ids.extend(page_ids);
            if page >= total_pages || page >= MAX_CHANGE_PAGES {
                break;
            }
            page += 1;
        }
        ids.sort_unstable();
        ids.dedup();
        Ok(Delta {
            cursor: next_cursor,
            ids,
        })
    }

    async fn server_time(&self) -> Result<i64, ProviderError> {
        Ok(chrono::Utc::now().timestamp())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let _permit = self.limiter.acquire().await;
        log::debug!("{NAME} download {url}");
        let resp = self.http.get(url).send().await?.error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    }
}

impl MovieProvider for TmdbClient {
    async fn lookup_imdb(&self, imdb: &str) -> Result<Option<MatchCandidate>, ProviderError> {
        let Some(body) = self.call(&format!("movie/{imdb}"), &[]).await? else {
            return Ok(None);
        };
        let result: SearchResult = serde_json::from_slice(&body)?;
        let mut candidate = result.into_candidate();
        candidate.likely = true;
        Ok(Some(candidate))
    }

    async fn configuration(&self) -> Result<ImageConfig, ProviderError> {
        let body = self
            .call("configuration", &[])
            .await?
            .ok_or_else(|| ProviderError::parse("configuration endpoint returned 404"))?;
        parse_configuration(&body)
    }
}

// ── Payload parsing ─────────────────────────────────────────────────────────

/// Parse a `search/movie` response.
pub fn parse_search(json: &[u8]) -> Result<Vec<MatchCandidate>, ProviderError> {
    let response: SearchResponse = serde_json::from_slice(json)?;
    Ok(response
        .results
        .into_iter()
        .map(SearchResult::into_candidate)
        .collect())
}

/// Parse one `movie/changes` page into its ids and the total page count.
pub fn parse_changes(json: &[u8]) -> Result<(Vec<u64>, u32), ProviderError> {
    let response: ChangesResponse = serde_json::from_slice(json)?;
    let total = response.total_pages.max(response.page);
    Ok((response.results.into_iter().map(|c| c.id).collect(), total))
}

/// Parse a `configuration` response, preferring the HTTPS image base.
pub fn parse_configuration(json: &[u8]) -> Result<ImageConfig, ProviderError> {
    let response: ConfigurationResponse = serde_json::from_slice(json)?;
    let images = response.images;
    let base_url = images
        .secure_base_url
        .or(images.base_url)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::parse("configuration without image base URL"))?;
    Ok(ImageConfig {
        base_url,
        poster_sizes: images.poster_sizes,
        backdrop_sizes: images.backdrop_sizes,
    })
}

/// Assemble the stored movie document from `movie/{id}` and its sub-resources.
pub fn parse_movie(
    json: &[u8],
    images: Option<MovieImages>,
    casts: Option<serde_json::Value>,
    keywords: Option<serde_json::Value>,
) -> Result<MovieDetails, ProviderError> {
    let mut movie: MovieDetails = serde_json::from_slice(json)?;
    movie.images = images.unwrap_or_default();
    movie.casts = casts.unwrap_or_default();
    movie.keywords = keywords.unwrap_or_default();
    Ok(movie)
}

#[cfg(test)]
#[path = "tests/tmdb_tests.rs"]
mod tests;
