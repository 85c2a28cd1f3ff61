//! In-memory providers with call counters.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use webmeta_catalog::types::*;
use webmeta_core::{CatalogId, MatchCandidate, Provider};
use webmeta_provider::{
    CatalogProvider, Delta, HashLookup, MovieProvider, ProviderError, TvProvider,
};

pub const IMAGE_HOST: &str = "https://images.test/banners/";

// ── Fixtures ────────────────────────────────────────────────────────────────

pub fn series_tree(id: u64, name: &str, episodes: &[(u32, u32)]) -> SeriesTree {
    let mut data = FieldMap::new();
    data.insert("FirstAired".into(), "2005-03-24".into());
    data.insert("IMDB_ID".into(), format!("tt{id:07}"));
    SeriesTree {
        series: Some(SeriesRecord {
            tvdb_id: id,
            name: name.to_string(),
            data,
        }),
        episodes: episodes
            .iter()
            .enumerate()
            .map(|(i, &(season, number))| episode(id, id * 1000 + i as u64, season, number))
            .collect(),
        banners: Vec::new(),
    }
}

pub fn episode(series: u64, id: u64, season: u32, number: u32) -> EpisodeRecord {
    let mut data = FieldMap::new();
    data.insert("filename".into(), format!("episodes/{series}/{id}.jpg"));
    EpisodeRecord {
        tvdb_id: id,
        series_id: series,
        season,
        episode: number,
        name: Some(format!("S{season:02}E{number:02}")),
        data,
    }
}

pub fn banner(series: u64, id: u64, kind: &str, path: &str, rating: &str) -> BannerRecord {
    let mut data = FieldMap::new();
    data.insert("BannerPath".into(), path.into());
    data.insert("Rating".into(), rating.into());
    BannerRecord {
        tvdb_id: id,
        series_id: series,
        kind: kind.to_string(),
        data,
    }
}

pub fn movie(id: u64, title: &str, imdb: &str) -> MovieDetails {
    MovieDetails {
        id,
        title: Some(title.to_string()),
        tagline: None,
        overview: None,
        vote_average: Some(7.5),
        runtime: Some(120),
        release_date: Some("1999-03-31".to_string()),
        imdb_id: Some(imdb.to_string()),
        images: MovieImages {
            posters: vec![image("/poster.jpg", 20, 5.0)],
            backdrops: vec![image("/backdrop.jpg", 20, 5.0)],
        },
        casts: serde_json::Value::Null,
        keywords: serde_json::Value::Null,
    }
}

pub fn image(path: &str, votes: u32, average: f64) -> ImageInfo {
    ImageInfo {
        file_path: path.to_string(),
        iso_639_1: None,
        vote_count: votes,
        vote_average: average,
        width: None,
        height: None,
    }
}

pub fn candidate(id: CatalogId, name: &str) -> MatchCandidate {
    MatchCandidate::new(id, name)
}

// ── Shared mock state ───────────────────────────────────────────────────────

/// State and counters shared by a mock provider and the test that owns it.
pub struct MockState<R> {
    pub records: Mutex<HashMap<u64, R>>,
    pub search_results: Mutex<Vec<MatchCandidate>>,
    /// Results for specific queries; other queries get `search_results`.
    pub by_query: Mutex<HashMap<String, Vec<MatchCandidate>>>,
    pub queries: Mutex<Vec<String>>,
    pub delta: Mutex<Delta>,
    pub imdb: Mutex<HashMap<String, MatchCandidate>>,
    /// Transient failures `fetch_full` returns before succeeding.
    pub failures_left: AtomicU32,
    /// Make every `fetch_full` fail with corrupt data.
    pub corrupt: Mutex<bool>,
    pub fetch_delay: Mutex<Duration>,
    pub server_time: i64,
    pub fetches: AtomicUsize,
    pub searches: AtomicUsize,
    pub deltas: AtomicUsize,
    pub server_times: AtomicUsize,
    pub downloads: AtomicUsize,
    pub lookups: AtomicUsize,
    pub configs: AtomicUsize,
}

impl<R> Default for MockState<R> {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            search_results: Mutex::new(Vec::new()),
            by_query: Mutex::new(HashMap::new()),
            queries: Mutex::new(Vec::new()),
            delta: Mutex::new(Delta::default()),
            imdb: Mutex::new(HashMap::new()),
            failures_left: AtomicU32::new(0),
            corrupt: Mutex::new(false),
            fetch_delay: Mutex::new(Duration::ZERO),
            server_time: 1_000,
            fetches: AtomicUsize::new(0),
            searches: AtomicUsize::new(0),
            deltas: AtomicUsize::new(0),
            server_times: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
            configs: AtomicUsize::new(0),
        }
    }
}

impl<R: Clone> MockState<R> {
    pub fn insert(&self, id: u64, record: R) {
        self.records.lock().unwrap().insert(id, record);
    }

    pub fn set_search(&self, results: Vec<MatchCandidate>) {
        *self.search_results.lock().unwrap() = results;
    }

    pub fn set_search_for(&self, query: &str, results: Vec<MatchCandidate>) {
        self.by_query
            .lock()
            .unwrap()
            .insert(query.to_string(), results);
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn set_delta(&self, cursor: i64, ids: Vec<u64>) {
        *self.delta.lock().unwrap() = Delta { cursor, ids };
    }

    pub fn network_calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
            + self.searches.load(Ordering::SeqCst)
            + self.deltas.load(Ordering::SeqCst)
            + self.server_times.load(Ordering::SeqCst)
            + self.lookups.load(Ordering::SeqCst)
            + self.configs.load(Ordering::SeqCst)
            + self.downloads.load(Ordering::SeqCst)
    }

    async fn fetch(&self, id: u64) -> Result<Option<R>, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *self.corrupt.lock().unwrap() {
            return Err(ProviderError::corrupt("episode before series"));
        }
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(ProviderError::ServerError {
                status: 503,
                message: "try later".into(),
            });
        }
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    fn search(&self, query: &str) -> Vec<MatchCandidate> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(found) = self.by_query.lock().unwrap().get(query) {
            return found.clone();
        }
        self.search_results.lock().unwrap().clone()
    }

    fn delta(&self) -> Delta {
        self.deltas.fetch_add(1, Ordering::SeqCst);
        self.delta.lock().unwrap().clone()
    }

    fn now(&self) -> i64 {
        self.server_times.fetch_add(1, Ordering::SeqCst);
        self.server_time
    }

    fn download(&self, url: &str) -> Vec<u8> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        url.as_bytes().to_vec()
    }
}

// ── TV ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockTv(pub Arc<MockState<SeriesTree>>);

impl Deref for MockTv {
    type Target = MockState<SeriesTree>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl CatalogProvider for MockTv {
    type Record = SeriesTree;

    fn provider(&self) -> Provider {
        Provider::TheTvDb
    }

    async fn search(
        &self,
        query: &str,
        _year: Option<i32>,
    ) -> Result<Vec<MatchCandidate>, ProviderError> {
        Ok(self.0.search(query))
    }

    async fn fetch_full(&self, id: u64) -> Result<Option<SeriesTree>, ProviderError> {
        self.0.fetch(id).await
    }

    async fn fetch_delta_since(&self, _cursor: i64) -> Result<Delta, ProviderError> {
        Ok(self.0.delta())
    }

    async fn server_time(&self) -> Result<i64, ProviderError> {
        Ok(self.0.now())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        Ok(self.0.download(url))
    }
}

impl TvProvider for MockTv {
    fn image_url(&self, path: &str) -> String {
        format!("{IMAGE_HOST}{path}")
    }
}

// ── Movies ──────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockMovies(pub Arc<MockState<MovieDetails>>);

impl Deref for MockMovies {
    type Target = MockState<MovieDetails>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MockMovies {
    pub fn add_imdb(&self, imdb: &str, candidate: MatchCandidate) {
        self.0
            .imdb
            .lock()
            .unwrap()
            .insert(imdb.to_string(), candidate);
    }
}

impl CatalogProvider for MockMovies {
    type Record = MovieDetails;

    fn provider(&self) -> Provider {
        Provider::TheMovieDb
    }

    async fn search(
        &self,
        query: &str,
        _year: Option<i32>,
    ) -> Result<Vec<MatchCandidate>, ProviderError> {
        Ok(self.0.search(query))
    }

    async fn fetch_full(&self, id: u64) -> Result<Option<MovieDetails>, ProviderError> {
        self.0.fetch(id).await
    }

    async fn fetch_delta_since(&self, _cursor: i64) -> Result<Delta, ProviderError> {
        Ok(self.0.delta())
    }

    async fn server_time(&self) -> Result<i64, ProviderError> {
        Ok(self.0.now())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        Ok(self.0.download(url))
    }
}

impl MovieProvider for MockMovies {
    async fn lookup_imdb(&self, imdb: &str) -> Result<Option<MatchCandidate>, ProviderError> {
        self.0.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.0.imdb.lock().unwrap().get(imdb).cloned().map(|mut c| {
            c.likely = true;
            c
        }))
    }

    async fn configuration(&self) -> Result<ImageConfig, ProviderError> {
        self.0.configs.fetch_add(1, Ordering::SeqCst);
        Ok(ImageConfig {
            base_url: "https://image.test/t/p/".to_string(),
            poster_sizes: vec!["w92".into(), "w342".into(), "w500".into()],
            backdrop_sizes: vec!["w300".into(), "w1280".into()],
        })
    }
}

// ── Hash lookup ─────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockHashes {
    pub known: Arc<Mutex<HashMap<String, String>>>,
    pub calls: Arc<AtomicUsize>,
}

impl MockHashes {
    pub fn with(hash: &str, imdb: &str) -> Self {
        let hashes = Self::default();
        hashes
            .known
            .lock()
            .unwrap()
            .insert(hash.to_string(), imdb.to_string());
        hashes
    }
}

impl HashLookup for MockHashes {
    async fn imdb_for_hash(&self, hash: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.known.lock().unwrap().get(hash).cloned()
    }
}
