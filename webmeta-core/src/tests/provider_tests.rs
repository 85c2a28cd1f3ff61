use super::*;

#[test]
fn qualified_ids_round_trip() {
    for &provider in Provider::all() {
        let id = CatalogId::new(provider, 80379);
        let parsed: CatalogId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id, "round-trip failed for {:?}", provider);
    }
}

#[test]
fn short_provider_names_are_accepted() {
    assert_eq!("tvdb:1".parse::<CatalogId>().unwrap(), CatalogId::tvdb(1));
    assert_eq!("TMDB:603".parse::<CatalogId>().unwrap(), CatalogId::tmdb(603));
}

#[test]
fn bare_number_is_rejected() {
    assert_eq!(
        "80379".parse::<CatalogId>(),
        Err(IdParseError::MissingScheme("80379".into()))
    );
}

#[test]
fn unknown_scheme_is_rejected() {
    assert!(matches!(
        "imdb:123".parse::<CatalogId>(),
        Err(IdParseError::UnknownProvider(_))
    ));
}

#[test]
fn non_numeric_id_is_rejected() {
    assert!(matches!(
        "thetvdb:abc".parse::<CatalogId>(),
        Err(IdParseError::InvalidNumber(_))
    ));
}

#[test]
fn only_tvdb_is_episodic() {
    assert!(Provider::TheTvDb.is_episodic());
    assert!(!Provider::TheMovieDb.is_episodic());
}
