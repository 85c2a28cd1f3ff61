use std::io::Write;

use super::*;

const EN_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<Data>
  <Series>
    <id>80379</id>
    <SeriesName>The Big Bang Theory</SeriesName>
    <FirstAired>2007-09-24</FirstAired>
    <IMDB_ID>tt0898266</IMDB_ID>
    <Overview>Physicists and their neighbour.</Overview>
  </Series>
  <Episode>
    <id>332484</id>
    <SeasonNumber>1</SeasonNumber>
    <EpisodeNumber>1</EpisodeNumber>
    <EpisodeName>Pilot</EpisodeName>
    <filename>episodes/80379/332484.jpg</filename>
  </Episode>
  <Episode>
    <id>1000001</id>
    <SeasonNumber>0</SeasonNumber>
    <EpisodeNumber>1</EpisodeNumber>
    <EpisodeName>Unaired Pilot</EpisodeName>
  </Episode>
</Data>"#;

const BANNERS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<Banners>
  <Banner>
    <id>23581</id>
    <BannerPath>posters/80379-1.jpg</BannerPath>
    <BannerType>poster</BannerType>
    <Rating>7.5</Rating>
  </Banner>
</Banners>"#;

fn archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();
        for (name, body) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

#[test]
fn full_archive_builds_tree() {
    let bytes = archive(&[("en.xml", EN_XML), ("banners.xml", BANNERS_XML)]);
    let tree = parse_series_archive(&bytes).unwrap();

    let series = tree.series.unwrap();
    assert_eq!(series.tvdb_id, 80379);
    assert_eq!(series.name, "The Big Bang Theory");
    assert_eq!(series.year(), Some(2007));

    assert_eq!(tree.episodes.len(), 2);
    assert_eq!(tree.episodes[0].series_id, 80379);
    assert_eq!(tree.episodes[0].image_path(), Some("episodes/80379/332484.jpg"));
    assert_eq!(tree.episodes[1].season, 0);

    assert_eq!(tree.banners.len(), 1);
    assert_eq!(tree.banners[0].kind, "poster");
    assert_eq!(tree.banners[0].rating(), 7.5);
}

#[test]
fn archive_without_banners_is_accepted() {
    let bytes = archive(&[("en.xml", EN_XML)]);
    let tree = parse_series_archive(&bytes).unwrap();
    assert!(tree.banners.is_empty());
    assert_eq!(tree.episodes.len(), 2);
}

#[test]
fn episode_before_series_is_corrupt() {
    let xml = r#"<Data>
  <Episode><id>1</id><SeasonNumber>1</SeasonNumber><EpisodeNumber>1</EpisodeNumber></Episode>
  <Series><id>2</id><SeriesName>Late</SeriesName></Series>
</Data>"#;
    let bytes = archive(&[("en.xml", xml)]);
    let err = parse_series_archive(&bytes).unwrap_err();
    assert!(matches!(err, ProviderError::Corrupt(_)));
    assert!(!err.is_transient());
}

#[test]
fn unknown_elements_are_skipped() {
    let xml = r#"<Data><Series><id>2</id><SeriesName>S</SeriesName></Series><Actor><id>9</id></Actor></Data>"#;
    let bytes = archive(&[("en.xml", xml)]);
    let tree = parse_series_archive(&bytes).unwrap();
    assert!(tree.series.is_some());
    assert!(tree.episodes.is_empty());
}

#[test]
fn not_a_zip_is_transient() {
    let err = parse_series_archive(b"<html>maintenance</html>").unwrap_err();
    assert!(matches!(err, ProviderError::Zip(_)));
    assert!(err.is_transient());
}

#[test]
fn search_results_carry_year_and_imdb() {
    let xml = br#"<Data>
  <Series>
    <seriesid>73739</seriesid>
    <SeriesName>Lost</SeriesName>
    <FirstAired>2004-09-22</FirstAired>
    <IMDB_ID>tt0411008</IMDB_ID>
  </Series>
  <Series>
    <seriesid>81234</seriesid>
    <SeriesName>Lost (2001)</SeriesName>
    <FirstAired>2001</FirstAired>
  </Series>
</Data>"#;
    let results = parse_search(xml).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, CatalogId::tvdb(73739));
    assert_eq!(results[0].year, Some(2004));
    assert_eq!(results[0].imdb.as_deref(), Some("tt0411008"));
    assert_eq!(results[1].year, None);
    assert!(!results[0].likely);
}

#[test]
fn updates_give_cursor_and_ids() {
    let xml = br#"<Items>
  <Time>1300000500</Time>
  <Series>80379</Series>
  <Series>73739</Series>
  <Episode>332484</Episode>
</Items>"#;
    let delta = parse_updates(xml).unwrap();
    assert_eq!(delta.cursor, 1300000500);
    assert_eq!(delta.ids, vec![80379, 73739]);
}

#[test]
fn updates_without_time_are_rejected() {
    assert!(parse_updates(b"<Items><Series>1</Series></Items>").is_err());
}

#[test]
fn float_numbers_are_accepted() {
    assert_eq!(parse_number("3.0", "SeasonNumber").unwrap(), 3);
    assert!(parse_number("3.5", "SeasonNumber").is_err());
}

#[test]
fn image_urls_use_banner_tree() {
    let client = TvdbClient::new("KEY", Duration::ZERO)
        .unwrap()
        .with_host("https://example.org/");
    assert_eq!(
        client.image_url("/posters/1.jpg"),
        "https://example.org/banners/posters/1.jpg"
    );
}

#[tokio::test]
async fn downloads_wait_for_the_rate_limiter() {
    let client = TvdbClient::new("key", Duration::ZERO).unwrap();
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
