use super::*;

#[test]
fn search_results_become_candidates() {
    let json = br#"{
        "page": 1,
        "results": [
            {"id": 603, "title": "The Matrix", "overview": "A hacker...", "release_date": "1999-03-30"},
            {"id": 10999, "title": "Matrix", "overview": "", "release_date": ""}
        ],
        "total_pages": 1,
        "total_results": 2
    }"#;
    let results = parse_search(json).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, CatalogId::tmdb(603));
    assert_eq!(results[0].name, "The Matrix");
    assert_eq!(results[0].year, Some(1999));
    assert_eq!(results[1].overview, None);
    assert_eq!(results[1].year, None);
}

#[test]
fn empty_search_response() {
    assert!(parse_search(br#"{"page":1,"results":[]}"#).unwrap().is_empty());
    assert!(parse_search(b"<html>").is_err());
}

#[test]
fn changes_report_ids_and_pages() {
    let json = br#"{"results":[{"id":1,"adult":false},{"id":7}],"page":1,"total_pages":3}"#;
    let (ids, total) = parse_changes(json).unwrap();
    assert_eq!(ids, vec![1, 7]);
    assert_eq!(total, 3);

    let (ids, total) = parse_changes(br#"{"results":[]}"#).unwrap();
    assert!(ids.is_empty());
    assert_eq!(total, 0);
}

#[test]
fn configuration_prefers_secure_base() {
    let json = br#"{
        "images": {
            "base_url": "http://image.tmdb.org/t/p/",
            "secure_base_url": "https://image.tmdb.org/t/p/",
            "poster_sizes": ["w92", "w154", "w342", "w500", "original"],
            "backdrop_sizes": ["w300", "w780", "w1280", "original"]
        },
        "change_keys": ["title"]
    }"#;
    let config = parse_configuration(json).unwrap();
    assert_eq!(config.base_url, "https://image.tmdb.org/t/p/");
    assert_eq!(config.poster_sizes.len(), 5);
    assert!(config.backdrop_sizes.contains(&"w1280".to_string()));
}

#[test]
fn configuration_without_base_is_rejected() {
    assert!(parse_configuration(br#"{"images":{"poster_sizes":[]}}"#).is_err());
}

#[test]
fn movie_document_includes_sub_resources() {
    let details = br#"{
        "id": 603,
        "title": "The Matrix",
        "tagline": "Welcome to the Real World.",
        "overview": "Set in the 22nd century...",
        "vote_average": 7.9,
        "runtime": 136,
        "release_date": "1999-03-30",
        "imdb_id": "tt0133093",
        "budget": 63000000
    }"#;
    let images = MovieImages {
        posters: vec![webmeta_catalog::types::ImageInfo {
            file_path: "/p.jpg".into(),
            iso_639_1: Some("en".into()),
            vote_count: 12,
            vote_average: 5.5,
            width: Some(1000),
            height: Some(1500),
        }],
        backdrops: Vec::new(),
    };
    let casts = serde_json::json!({"cast": [{"name": "Keanu Reeves"}]});

    let movie = parse_movie(details, Some(images), Some(casts.clone()), None).unwrap();
    assert_eq!(movie.id, 603);
    assert_eq!(movie.year(), Some(1999));
    assert_eq!(movie.imdb(), Some("tt0133093"));
    assert_eq!(movie.runtime, Some(136));
    assert_eq!(movie.images.posters.len(), 1);
    assert_eq!(movie.casts, casts);
    assert!(movie.keywords.is_null());
}

#[test]
fn movie_with_nulls_parses() {
    let details = br#"{"id": 5, "title": "X", "runtime": null, "imdb_id": null, "release_date": "2001"}"#;
    let movie = parse_movie(details, None, None, None).unwrap();
    assert_eq!(movie.runtime, None);
    assert_eq!(movie.imdb(), None);
    assert_eq!(movie.year(), None);
}

#[tokio::test]
async fn downloads_wait_for_the_rate_limiter() {
    let client = TmdbClient::new("key", Duration::ZERO).unwrap();
    let permit = client.limiter.acquire().await;

    let waiting = tokio::time::timeout(
        Duration::from_millis(200),
        client.download("http://127.0.0.1:9/art.jpg"),
    )
    .await;
    assert!(waiting.is_err(), "download bypassed the limiter");

    drop(permit);
    assert!(client.download("http://127.0.0.1:9/art.jpg").await.is_err());
}
