use serde::{Deserialize, Serialize};

use crate::provider::CatalogId;

/// An unpersisted search hit returned by a provider.
///
/// Candidates are owned by the caller. They only reach the store when
/// promoted through an explicit add-by-id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub id: CatalogId,
    pub name: String,
    pub overview: Option<String>,
    pub year: Option<i32>,
    /// IMDb cross-reference (`tt0133093`), when the provider reports one.
    pub imdb: Option<String>,
    /// Set when the candidate's normalized name equals the normalized query.
    pub likely: bool,
}

impl MatchCandidate {
    pub fn new(id: CatalogId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            overview: None,
            year: None,
            imdb: None,
            likely: false,
        }
    }

    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = Some(overview.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_imdb(mut self, imdb: impl Into<String>) -> Self {
        self.imdb = Some(imdb.into());
        self
    }
}
