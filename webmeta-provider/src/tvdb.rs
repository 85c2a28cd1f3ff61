//! TheTVDB client (legacy XML API).
//!
//! Full records arrive as a ZIP archive holding `en.xml` (one `Series`
//! element followed by its `Episode` elements) and `banners.xml`.

use std::io::{Cursor, Read};

use tokio::time::Duration;
use webmeta_catalog::name_parser::{search_query, year_from_date};
use webmeta_catalog::types::{BannerRecord, EpisodeRecord, SeriesRecord, SeriesTree};
use webmeta_core::{CatalogId, MatchCandidate, Provider};

use crate::error::ProviderError;
use crate::provider::{run_blocking, CatalogProvider, Delta, TvProvider};
use crate::rate_limit::RateLimiter;
use crate::xml::{parse_records, XmlRecord};

const DEFAULT_HOST: &str = "https://thetvdb.com";
const NAME: &str = "TheTVDB";

/// HTTP client for TheTVDB with per-client request serialization.
pub struct TvdbClient {
    http: reqwest::Client,
    host: String,
    api_key: String,
    limiter: RateLimiter,
}

impl TvdbClient {
    pub fn new(api_key: impl Into<String>, interval: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            host: DEFAULT_HOST.to_string(),
            api_key: api_key.into(),
            limiter: RateLimiter::new(interval),
        })
    }

    /// Point the client at another server (mirrors, local fixtures).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into().trim_end_matches('/').to_string();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// GET a URL through the rate limiter. `Ok(None)` on HTTP 404.
    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Option<Vec<u8>>, ProviderError> {
        let _permit = self.limiter.acquire().await;
        log::debug!("{NAME} GET {url}");

        let resp = self.http.get(url).query(query).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimit(NAME));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
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

    async fn updates(&self, query: &[(&str, String)]) -> Result<Vec<u8>, ProviderError> {
        let url = format!("{}/api/Updates.php", self.host);
        self.get(&url, query)
            .await?
            .ok_or_else(|| ProviderError::parse("update endpoint returned 404"))
    }
}

impl CatalogProvider for TvdbClient {
    type Record = SeriesTree;

    fn provider(&self) -> Provider {
        Provider::TheTvDb
    }

    async fn search(
        &self,
        query: &str,
        _year: Option<i32>,
    ) -> Result<Vec<MatchCandidate>, ProviderError> {
        let url = format!("{}/api/GetSeries.php", self.host);
        let Some(body) = self.get(&url, &[("seriesname", search_query(query))]).await? else {
            return Ok(Vec::new());
        };
        run_blocking(move || parse_search(&body)).await
    }

    async fn fetch_full(&self, id: u64) -> Result<Option<SeriesTree>, ProviderError> {
        let url = format!("{}/api/{}/series/{}/all/en.zip", self.host, self.api_key, id);
        let Some(archive) = self.get(&url, &[]).await? else {
            return Ok(None);
        };
        let tree = run_blocking(move || parse_series_archive(&archive)).await?;
        Ok(tree.series.is_some().then_some(tree))
    }

    async fn fetch_delta_since(&self, cursor: i64) -> Result<Delta, ProviderError> {
        let body = self
            .updates(&[("type", "all".to_string()), ("time", cursor.to_string())])
            .await?;
        run_blocking(move || parse_updates(&body)).await
    }

    async fn server_time(&self) -> Result<i64, ProviderError> {
        let body = self.updates(&[("type", "none".to_string())]).await?;
        let delta = run_blocking(move || parse_updates(&body)).await?;
        Ok(delta.cursor)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let _permit = self.limiter.acquire().await;
        log::debug!("{NAME} download {url}");
        let resp = self.http.get(url).send().await?.error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    }
}

impl TvProvider for TvdbClient {
    fn image_url(&self, path: &str) -> String {
        format!("{}/banners/{}", self.host, path.trim_start_matches('/'))
    }
}

// ── Payload parsing ─────────────────────────────────────────────────────────

/// Parse a `GetSeries.php` response.
pub fn parse_search(xml: &[u8]) -> Result<Vec<MatchCandidate>, ProviderError> {
    let mut candidates = Vec::new();
    for record in parse_records(xml)? {
        if record.tag != "Series" {
            continue;
        }
        let id = match record.field("seriesid").or_else(|| record.field("id")) {
            Some(id) => parse_number(id, "seriesid")?,
            None => {
                log::debug!("{NAME} search result without id skipped");
                continue;
            }
        };
        let Some(name) = record.field("SeriesName") else {
            continue;
        };
        let mut candidate = MatchCandidate::new(CatalogId::tvdb(id), name);
        candidate.overview = record.field("Overview").map(str::to_string);
        candidate.year = record.field("FirstAired").and_then(year_from_date);
        candidate.imdb = record.field("IMDB_ID").map(str::to_string);
        candidates.push(candidate);
    }
    Ok(candidates)
}

/// Parse an `Updates.php` response into the new cursor and changed series.
pub fn parse_updates(xml: &[u8]) -> Result<Delta, ProviderError> {
    let mut cursor = None;
    let mut ids = Vec::new();
    for record in parse_records(xml)? {
        let Some(text) = record.text.as_deref() else {
            continue;
        };
        match record.tag.as_str() {
            "Time" => cursor = Some(parse_number(text, "Time")? as i64),
            "Series" => ids.push(parse_number(text, "Series")?),
            _ => {}
        }
    }
    let cursor = cursor.ok_or_else(|| ProviderError::parse("update response has no Time"))?;
    Ok(Delta { cursor, ids })
}

/// Unpack and parse a full series archive.
pub fn parse_series_archive(bytes: &[u8]) -> Result<SeriesTree, ProviderError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let mut en = Vec::new();
    archive.by_name("en.xml")?.read_to_end(&mut en)?;

    let mut banners = Vec::new();
    match archive.by_name("banners.xml") {
        Ok(mut file) => {
            file.read_to_end(&mut banners)?;
        }
        Err(zip::result::ZipError::FileNotFound) => {
            log::debug!("{NAME} archive has no banners.xml");
        }
        Err(e) => return Err(e.into()),
    }

    let banner_records = if banners.is_empty() {
        Vec::new()
    } else {
        parse_records(&banners[..])?
    };
    build_tree(parse_records(&en[..])?, banner_records)
}

/// Assemble a tree from the records of `en.xml` and `banners.xml`.
pub fn build_tree(
    records: Vec<XmlRecord>,
    banners: Vec<XmlRecord>,
) -> Result<SeriesTree, ProviderError> {
    let mut tree = SeriesTree::default();

    for record in records {
        match record.tag.as_str() {
            "Series" => {
                let tvdb_id = required_number(&record, "id")?;
                tree.series = Some(SeriesRecord {
                    tvdb_id,
                    name: record.field("SeriesName").unwrap_or_default().to_string(),
                    data: record.fields,
                });
            }
            "Episode" => {
                let Some(series) = tree.series.as_ref() else {
                    return Err(ProviderError::corrupt(
                        "got Episode element before Series",
                    ));
                };
                tree.episodes.push(EpisodeRecord {
                    tvdb_id: required_number(&record, "id")?,
                    series_id: series.tvdb_id,
                    season: required_number(&record, "SeasonNumber")? as u32,
                    episode: required_number(&record, "EpisodeNumber")? as u32,
                    name: record.field("EpisodeName").map(str::to_string),
                    data: record.fields,
                });
            }
            other => log::error!("{NAME}: unknown element {other}"),
        }
    }

    let Some(series_id) = tree.series.as_ref().map(|s| s.tvdb_id) else {
        return Ok(tree);
    };
    for record in banners {
        if record.tag != "Banner" {
            log::error!("{NAME}: unknown element {}", record.tag);
            continue;
        }
        tree.banners.push(BannerRecord {
            tvdb_id: required_number(&record, "id")?,
            series_id,
            kind: record.field("BannerType").unwrap_or_default().to_string(),
            data: record.fields,
        });
    }

    Ok(tree)
}

fn required_number(record: &XmlRecord, field: &str) -> Result<u64, ProviderError> {
    let value = record.field(field).ok_or_else(|| {
        ProviderError::parse(format!("{} element without {}", record.tag, field))
    })?;
    parse_number(value, field)
}

/// TheTVDB sometimes sends numbers as floats ("3.0").
fn parse_number(value: &str, field: &str) -> Result<u64, ProviderError> {
    let trimmed = value.trim();
    trimmed
        .parse::<u64>()
        .ok()
        .or_else(|| {
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        })
        .ok_or_else(|| ProviderError::parse(format!("invalid {field} '{value}'")))
}

#[cfg(test)]
#[path = "tests/tvdb_tests.rs"]
mod tests;
