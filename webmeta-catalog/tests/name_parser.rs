use webmeta_catalog::name_parser::{
    imdb_from_nfo, mark_likely, normalize_name, parse_title_year, search_query, strip_3d,
    year_from_date,
};
use webmeta_core::{CatalogId, MatchCandidate};

#[test]
fn title_and_year_from_release_name() {
    let (title, year) = parse_title_year("The.Matrix.1999.720p.BluRay.mkv", 2024).unwrap();
    assert_eq!(title, "the matrix");
    assert_eq!(year, 1999);
}

#[test]
fn mixed_separators() {
    let (title, year) = parse_title_year("Star_Wars-1977 x264.mkv", 2024).unwrap();
    assert_eq!(title, "star wars");
    assert_eq!(year, 1977);
}

#[test]
fn year_needs_trailing_separator() {
    assert!(parse_title_year("Alien.1979", 2024).is_none());
    assert!(parse_title_year("Alien1979.mkv", 2024).is_none());
}

#[test]
fn implausible_years_are_rejected() {
    assert!(parse_title_year("Metropolis.1900.mkv", 2024).is_none());
    assert!(parse_title_year("Future.2099.mkv", 2024).is_none());
    assert!(parse_title_year("Edge.1901.mkv", 2024).is_some());
}

#[test]
fn normalization_lowercases_and_strips_separators() {
    assert_eq!(normalize_name("The.Big_Bang-Theory"), "the big bang theory");
    assert_eq!(normalize_name("  Lost  "), "lost");
    assert_eq!(search_query("Doctor.Who_2005"), "Doctor Who 2005");
}

#[test]
fn strip_3d_marker() {
    assert_eq!(strip_3d("avatar 3d sbs"), Some("avatar".to_string()));
    assert_eq!(strip_3d("3d"), None);
    assert_eq!(strip_3d("avatar"), None);
}

#[test]
fn imdb_id_from_nfo() {
    let nfo = "Movie info\nhttp://www.imdb.com/title/tt0133093/\n";
    assert_eq!(imdb_from_nfo(nfo), Some("tt0133093".to_string()));
    let nfo = "https://imdb.de/title/0133093";
    assert_eq!(imdb_from_nfo(nfo), Some("tt0133093".to_string()));
    assert_eq!(imdb_from_nfo("no link here"), None);
}

#[test]
fn year_requires_full_date() {
    assert_eq!(year_from_date("2004-09-22"), Some(2004));
    assert_eq!(year_from_date("2004"), None);
    assert_eq!(year_from_date("2004-09"), None);
}

#[test]
fn likely_flag_on_exact_normalized_name() {
    let mut candidates = vec![
        MatchCandidate::new(CatalogId::tvdb(1), "Lost"),
        MatchCandidate::new(CatalogId::tvdb(2), "Lost Girl"),
        MatchCandidate::new(CatalogId::tvdb(3), "LOST"),
    ];
    assert_eq!(mark_likely(&mut candidates, "lost"), 2);
    assert!(candidates[0].likely);
    assert!(!candidates[1].likely);
    assert!(candidates[2].likely);
}
