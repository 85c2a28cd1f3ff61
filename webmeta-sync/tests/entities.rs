mod common;

use std::sync::Arc;

use common::*;
use webmeta_catalog::types::{banner_kind, ImageConfig, ImageKind, MovieDetails};
use webmeta_core::{CatalogError, CatalogId, MatchPolicy};
use webmeta_db::{self as db, VersionedStore};
use webmeta_sync::{Entity, Movie, TvCatalog};

async fn catalog_with(
    dir: &tempfile::TempDir,
    tree: webmeta_catalog::types::SeriesTree,
    policy: MatchPolicy,
) -> (TvCatalog<MockTv, MockHashes>, MockTv) {
    let mock = MockTv::default();
    let id = tree.series.as_ref().unwrap().tvdb_id;
    mock.insert(id, tree);
    let store = Arc::new(VersionedStore::open(dir.path(), "thetvdb").unwrap());
    let catalog = TvCatalog::new(store, mock.clone(), MockHashes::default(), policy).unwrap();
    catalog.add_series(id, None).await.unwrap();
    (catalog, mock)
}

// ── Seasons ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn episodes_sit_at_their_number() {
    let dir = tempfile::tempdir().unwrap();
    let tree = series_tree(1, "Lost", &[(1, 1), (1, 3), (1, 0), (2, 1)]);
    let (catalog, _) = catalog_with(&dir, tree, MatchPolicy::immediate()).await;
    let series = catalog.series(1).await.unwrap().unwrap();

    let seasons = series.seasons().unwrap();
    assert_eq!(seasons.len(), 2);

    let season = series.season(1).unwrap().unwrap();
    let episodes = season.episodes().unwrap();
    assert_eq!(episodes.len(), 3);
    assert_eq!(episodes[0].as_ref().map(|e| e.number().unwrap()), Some(1));
    assert!(episodes[1].is_none());
    assert_eq!(episodes[2].as_ref().map(|e| e.number().unwrap()), Some(3));

    assert!(season.episode(0).unwrap().is_none());
    assert!(season.episode(2).unwrap().is_none());
    assert_eq!(
        season.episode(3).unwrap().unwrap().name().unwrap().as_deref(),
        Some("S01E03")
    );

    let specials = season.specials().unwrap();
    assert_eq!(specials.len(), 1);
    assert_eq!(specials[0].number().unwrap(), 0);

    // Specials never count towards the series' positioned episodes.
    assert_eq!(series.episodes().unwrap().len(), 3);
}

#[tokio::test]
async fn missing_seasons_leave_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let tree = series_tree(1, "Lost", &[(1, 1), (3, 1)]);
    let (catalog, _) = catalog_with(&dir, tree, MatchPolicy::immediate()).await;
    let series = catalog.series(1).await.unwrap().unwrap();

    let seasons = series.seasons().unwrap();
    assert_eq!(seasons.len(), 3);
    assert!(seasons[1].is_none());
    assert_eq!(seasons[2].as_ref().map(|s| s.number()), Some(3));
    assert!(series.season(2).unwrap().is_none());
}

#[tokio::test]
async fn later_duplicate_wins() {
    let dir = tempfile::tempdir().unwrap();
    let tree = series_tree(1, "Lost", &[(1, 2), (1, 2)]);
    let second = tree.episodes[1].tvdb_id;
    let (catalog, _) = catalog_with(&dir, tree, MatchPolicy::immediate()).await;
    let season = catalog.series(1).await.unwrap().unwrap().season(1).unwrap().unwrap();

    let episode = season.episode(2).unwrap().unwrap();
    assert_eq!(episode.id(), CatalogId::tvdb(second));
}

#[tokio::test]
async fn episode_number_above_cap_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let tree = series_tree(1, "Lost", &[(1, 1), (1, 1001)]);
    let (catalog, _) = catalog_with(&dir, tree, MatchPolicy::immediate()).await;
    let season = catalog.series(1).await.unwrap().unwrap().season(1).unwrap().unwrap();

    assert!(matches!(season.episodes(), Err(CatalogError::Corrupt(_))));
    assert!(matches!(season.episode(1), Err(CatalogError::Corrupt(_))));
}

#[tokio::test]
async fn thresholds_come_from_policy() {
    let dir = tempfile::tempdir().unwrap();
    let policy = MatchPolicy {
        max_episode_number: 30,
        special_episode: 99,
        ..MatchPolicy::immediate()
    };
    let tree = series_tree(1, "Lost", &[(1, 1), (1, 99)]);
    let (catalog, _) = catalog_with(&dir, tree, policy).await;
    let season = catalog.series(1).await.unwrap().unwrap().season(1).unwrap().unwrap();

    assert_eq!(season.episodes().unwrap().len(), 1);
    assert_eq!(season.specials().unwrap()[0].number().unwrap(), 99);
}

// ── Cache invalidation ──────────────────────────────────────────────────────

#[tokio::test]
async fn views_rebuild_after_notify() {
    let dir = tempfile::tempdir().unwrap();
    let tree = series_tree(1, "Lost", &[(1, 1)]);
    let (catalog, _) = catalog_with(&dir, tree, MatchPolicy::immediate()).await;
    let series = catalog.series(1).await.unwrap().unwrap();
    let season = series.season(1).unwrap().unwrap();
    assert_eq!(season.episodes().unwrap().len(), 1);
    let built = season.built_at();

    // A write without a version bump is not visible to the cached view.
    catalog
        .store()
        .write(|tx| db::upsert_episode(tx, &episode(1, 5000, 1, 2)).map_err(CatalogError::from))
        .unwrap();
    assert_eq!(season.episodes().unwrap().len(), 1);

    catalog.store().notify_resync().unwrap();
    assert_eq!(season.episodes().unwrap().len(), 2);
    assert_ne!(season.built_at(), built);
}

#[tokio::test]
async fn sync_refreshes_existing_handles() {
    let dir = tempfile::tempdir().unwrap();
    let tree = series_tree(1, "Lost", &[(1, 1)]);
    let (catalog, mock) = catalog_with(&dir, tree, MatchPolicy::immediate()).await;
    let series = catalog.series(1).await.unwrap().unwrap();
    assert_eq!(series.name().unwrap(), "Lost");

    mock.insert(1, series_tree(1, "LOST", &[(1, 1), (1, 2), (2, 1)]));
    catalog.sync(true).await.unwrap();

    assert_eq!(series.name().unwrap(), "LOST");
    assert_eq!(series.seasons().unwrap().len(), 2);
    assert_eq!(series.episodes().unwrap().len(), 3);
}

#[tokio::test]
async fn held_episode_follows_a_forced_sync() {
    let dir = tempfile::tempdir().unwrap();
    let tree = series_tree(1, "Lost", &[(1, 1)]);
    let (catalog, mock) = catalog_with(&dir, tree, MatchPolicy::immediate()).await;
    let season = catalog.series(1).await.unwrap().unwrap().season(1).unwrap().unwrap();
    let episode = season.episode(1).unwrap().unwrap();
    assert_eq!(episode.name().unwrap().as_deref(), Some("S01E01"));

    let mut renamed = series_tree(1, "Lost", &[(1, 1)]);
    renamed.episodes[0].name = Some("Pilot".to_string());
    mock.insert(1, renamed);
    catalog.sync(true).await.unwrap();

    assert_eq!(episode.name().unwrap().as_deref(), Some("Pilot"));
    assert_eq!(Entity::Episode(episode).name().unwrap(), "Pilot");
}

#[tokio::test]
async fn held_episode_reports_its_removal() {
    let dir = tempfile::tempdir().unwrap();
    let tree = series_tree(1, "Lost", &[(1, 1)]);
    let (catalog, _) = catalog_with(&dir, tree, MatchPolicy::immediate()).await;
    let season = catalog.series(1).await.unwrap().unwrap().season(1).unwrap().unwrap();
    let episode = season.episode(1).unwrap().unwrap();

    catalog.delete_series(1).await.unwrap();
    assert!(episode.name().unwrap_err().is_not_found());
}

// ── Back-references and artwork ─────────────────────────────────────────────

#[tokio::test]
async fn episode_knows_its_series_and_season() {
    let dir = tempfile::tempdir().unwrap();
    let tree = series_tree(1, "Lost", &[(2, 4)]);
    let (catalog, _) = catalog_with(&dir, tree, MatchPolicy::immediate()).await;
    let season = catalog.series(1).await.unwrap().unwrap().season(2).unwrap().unwrap();
    let episode = season.episode(4).unwrap().unwrap();

    assert_eq!(episode.series().id(), CatalogId::tvdb(1));
    assert_eq!(episode.season().unwrap().number(), 2);
    assert_eq!(episode.season_number().unwrap(), 2);
    let id = episode.record().unwrap().tvdb_id;
    assert_eq!(
        episode.image().unwrap(),
        Some(format!("{IMAGE_HOST}episodes/1/{id}.jpg"))
    );

    let entity = Entity::Episode(episode);
    assert!(entity.as_episode().is_some());
    assert_eq!(entity.kind(), "episode");
    assert_eq!(entity.name().unwrap(), "S02E04");
}

#[tokio::test]
async fn banners_are_ranked_by_rating() {
    let dir = tempfile::tempdir().unwrap();
    let mut tree = series_tree(1, "Lost", &[(1, 1)]);
    tree.banners = vec![
        banner(1, 10, banner_kind::POSTER, "posters/low.jpg", "3.5"),
        banner(1, 11, banner_kind::POSTER, "posters/high.jpg", "8.0"),
        banner(1, 12, banner_kind::FANART, "fanart/1.jpg", "5.0"),
        banner(1, 13, banner_kind::SERIES, "graphical/1.jpg", ""),
    ];
    let (catalog, _) = catalog_with(&dir, tree, MatchPolicy::immediate()).await;
    let series = catalog.series(1).await.unwrap().unwrap();

    let posters = series.posters().unwrap();
    assert_eq!(posters.len(), 2);
    assert_eq!(posters[0].url, format!("{IMAGE_HOST}posters/high.jpg"));
    assert_eq!(posters[0].thumbnail, posters[0].url);
    assert_eq!(series.poster().unwrap(), Some(posters[0].clone()));
    assert_eq!(series.images().unwrap().len(), 1);
    assert_eq!(series.banners().unwrap()[0].rating, Some(0.0));

    let season = series.season(1).unwrap().unwrap();
    assert_eq!(season.poster().unwrap(), Some(posters[0].clone()));
}

// ── Movies ──────────────────────────────────────────────────────────────────

fn config() -> ImageConfig {
    ImageConfig {
        base_url: "https://image.test/t/p/".to_string(),
        poster_sizes: vec!["w92".into(), "w342".into(), "w500".into()],
        backdrop_sizes: vec!["w300".into(), "w1280".into()],
    }
}

fn store_movie(store: &VersionedStore, details: &MovieDetails) {
    store
        .write(|tx| db::upsert_movie(tx, details).map_err(CatalogError::from))
        .unwrap();
}

fn stored_movie(
    dir: &tempfile::TempDir,
    details: MovieDetails,
    config: Option<ImageConfig>,
) -> (Arc<VersionedStore>, Movie) {
    let store = Arc::new(VersionedStore::open(dir.path(), "themoviedb").unwrap());
    store_movie(&store, &details);
    let movie = Movie::load(Arc::clone(&store), details.id, config)
        .unwrap()
        .unwrap();
    (store, movie)
}

#[test]
fn movie_posters_follow_vote_tiers() {
    let dir = tempfile::tempdir().unwrap();
    let mut details = movie(603, "The Matrix", "tt0133093");
    details.images.posters = vec![
        image("/a.jpg", 15, 3.0),
        image("/b.jpg", 15, 7.0),
        image("/c.jpg", 5, 9.0),
        image("/d.jpg", 1, 2.0),
    ];
    let (_store, movie) = stored_movie(&dir, details, Some(config()));

    let urls: Vec<String> = movie
        .posters("en")
        .unwrap()
        .into_iter()
        .map(|a| a.url)
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://image.test/t/p/w342/a.jpg",
            "https://image.test/t/p/w342/b.jpg",
            "https://image.test/t/p/w342/c.jpg",
            "https://image.test/t/p/w342/d.jpg",
        ]
    );
    let best = movie.best(ImageKind::Poster, "en").unwrap().unwrap();
    assert_eq!(best.thumbnail, "https://image.test/t/p/w92/a.jpg");
    assert_eq!(
        movie.backdrops("en").unwrap()[0].url,
        "https://image.test/t/p/w1280/backdrop.jpg"
    );
}

#[test]
fn movie_attributes_and_local_paths() {
    let dir = tempfile::tempdir().unwrap();
    let (store, movie) = stored_movie(&dir, movie(603, "The Matrix", "tt0133093"), None);

    assert_eq!(movie.name().unwrap(), "The Matrix");
    assert_eq!(movie.year().unwrap(), Some(1999));
    assert_eq!(movie.imdb().unwrap().as_deref(), Some("tt0133093"));
    assert_eq!(movie.runtime().unwrap(), Some(120));
    assert!(movie.posters("en").unwrap().is_empty());
    assert_eq!(movie.poster(), store.image_dir().join("603.poster.jpg"));
    assert_eq!(movie.image(), store.image_dir().join("603.image.jpg"));
    assert_eq!(Entity::Movie(movie).id(), CatalogId::tmdb(603));
}

#[test]
fn held_movie_rereads_its_row_after_notify() {
    let dir = tempfile::tempdir().unwrap();
    let (store, held) = stored_movie(&dir, movie(603, "The Matrix", "tt0133093"), None);

    let mut renamed = movie(603, "Matrix, The", "tt0133093");
    renamed.tagline = Some("Free your mind".to_string());
    store_movie(&store, &renamed);
    assert_eq!(held.name().unwrap(), "The Matrix");

    store.notify_resync().unwrap();
    assert_eq!(held.name().unwrap(), "Matrix, The");
    assert_eq!(held.tagline().unwrap().as_deref(), Some("Free your mind"));
}

#[test]
fn unknown_movie_has_no_view() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(VersionedStore::open(dir.path(), "themoviedb").unwrap());
    assert!(Movie::load(store, 603, None).unwrap().is_none());
}
