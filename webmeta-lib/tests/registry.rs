use std::path::Path;
use std::time::Duration;

use webmeta_core::{CatalogId, FileInfo, MatchCandidate, Provider};
use webmeta_lib::settings::{ProviderSettings, StorageSettings};
use webmeta_lib::{LibError, Registry, Settings};
use webmeta_sync::Resolution;

fn settings(base: &Path, tvdb: Option<&str>, tmdb: Option<&str>) -> Settings {
    Settings {
        storage: StorageSettings {
            base: Some(base.to_path_buf()),
        },
        thetvdb: ProviderSettings {
            api_key: tvdb.map(str::to_string),
        },
        themoviedb: ProviderSettings {
            api_key: tmdb.map(str::to_string),
        },
        policy: webmeta_core::MatchPolicy::immediate(),
    }
}

async fn both(base: &Path) -> Registry {
    Registry::init(&settings(base, Some("tvdb-test"), Some("tmdb-test")))
        .await
        .unwrap()
}

async fn next_version(rx: &mut tokio::sync::broadcast::Receiver<u64>) -> u64 {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no change broadcast")
        .unwrap()
}

#[tokio::test]
async fn init_opens_one_store_per_provider() {
    let dir = tempfile::tempdir().unwrap();
    let registry = both(dir.path()).await;

    assert_eq!(
        registry.providers(),
        vec![Provider::TheTvDb, Provider::TheMovieDb]
    );
    assert!(dir.path().join("thetvdb.db").exists());
    assert!(dir.path().join("themoviedb.db").exists());
    assert!(dir.path().join("themoviedb.db.images").is_dir());
    assert_eq!(registry.db_version(), 0);
    assert_eq!(registry.base(), dir.path());
}

#[tokio::test]
async fn changes_in_either_store_reach_one_channel() {
    let dir = tempfile::tempdir().unwrap();
    let registry = both(dir.path()).await;
    let mut rx = registry.subscribe();

    registry.tv().unwrap().store().notify_resync().unwrap();
    assert_eq!(next_version(&mut rx).await, 1);

    registry.movies().unwrap().store().notify_resync().unwrap();
    assert_eq!(next_version(&mut rx).await, 2);
    assert_eq!(registry.db_version(), 2);
}

#[tokio::test]
async fn metadata_is_written_everywhere_and_read_from_the_first() {
    let dir = tempfile::tempdir().unwrap();
    let registry = both(dir.path()).await;

    registry.set_metadata("lastScan", &1234_i64).await.unwrap();
    assert_eq!(
        registry.get_metadata::<i64>("lastScan").await.unwrap(),
        Some(1234)
    );
    let in_movies: Option<i64> = registry
        .movies()
        .unwrap()
        .store()
        .get_metadata("lastScan")
        .unwrap();
    assert_eq!(in_movies, Some(1234));

    // A key only the second store holds is still found.
    registry
        .movies()
        .unwrap()
        .store()
        .set_metadata("moviesOnly", &"yes")
        .unwrap();
    assert_eq!(
        registry.get_metadata::<String>("moviesOnly").await.unwrap(),
        Some("yes".to_string())
    );
    assert_eq!(registry.get_metadata::<String>("absent").await.unwrap(), None);
}

#[tokio::test]
async fn reopening_keeps_the_catalog() {
    let dir = tempfile::tempdir().unwrap();
    {
        let registry = both(dir.path()).await;
        registry.set_metadata("marker", &true).await.unwrap();
        registry.movies().unwrap().store().notify_resync().unwrap();
    }

    let registry = both(dir.path()).await;
    assert_eq!(registry.get_metadata::<bool>("marker").await.unwrap(), Some(true));
    assert_eq!(registry.db_version(), 1);
}

#[tokio::test]
async fn unknown_movie_file_parses_locally_to_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let registry = both(dir.path()).await;
    let path = dir.path().join("The.Matrix.1999.mkv");
    std::fs::write(&path, b"feature film").unwrap();

    assert!(registry.parse(FileInfo::new(&path)).await.unwrap().is_none());

    // Too short to be a movie and no sidecar: nothing is searched.
    let short = FileInfo::new(&path).with_length(60);
    assert!(registry.search(&short).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_key_leaves_the_provider_out() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::init(&settings(dir.path(), None, Some("tmdb-test")))
        .await
        .unwrap();

    assert_eq!(registry.providers(), vec![Provider::TheMovieDb]);
    assert!(registry.tv().is_none());
    assert!(!dir.path().join("thetvdb.db").exists());

    let path = dir.path().join("lost.s01e01.mkv");
    std::fs::write(&path, b"episode").unwrap();
    let episode = FileInfo::new(&path).with_episode("Lost", 1, 1);

    assert!(registry.parse(episode.clone()).await.unwrap().is_none());
    assert!(registry.search(&episode).await.unwrap().is_empty());
    assert!(matches!(
        registry.identify(episode.clone()).await.unwrap(),
        Resolution::NotFound
    ));
    let candidate = MatchCandidate::new(CatalogId::tvdb(1), "Lost");
    assert!(matches!(
        registry.match_file(episode, &candidate).await,
        Err(LibError::NotConfigured(Provider::TheTvDb))
    ));
}

#[tokio::test]
async fn missing_file_identifies_as_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let registry = both(dir.path()).await;
    let info = FileInfo::new(dir.path().join("gone.mkv"));

    assert!(matches!(
        registry.identify(info).await.unwrap(),
        Resolution::NotFound
    ));
}

#[tokio::test]
async fn sync_without_cursor_reports_per_provider() {
    let dir = tempfile::tempdir().unwrap();
    let registry = both(dir.path()).await;

    let reports = registry.sync(false).await;
    assert_eq!(reports.len(), 2);
    for (_, report) in reports {
        let report = report.unwrap();
        assert!(report.updated.is_empty());
        assert!(report.cursor.is_none());
    }
}
