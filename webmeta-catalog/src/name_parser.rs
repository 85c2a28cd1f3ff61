//! Filename and title heuristics used to turn a media file into a search.
//!
//! Release names usually look like
//! ```text
//! The.Matrix.1999.720p.BluRay.x264.mkv
//! ```
//! so the title is everything before the first separator-delimited year.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use webmeta_core::MatchCandidate;

static TITLE_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)[._\- ]([0-9]{4})[._\- ].*").expect("static pattern")
});

static IMDB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[a-z.]*imdb\.[a-z]+/[a-z/]+([0-9]+)").expect("static pattern")
});

/// Earliest year accepted from a filename.
const MIN_YEAR: i32 = 1901;

/// Replace the separator characters release names use with spaces.
pub fn search_query(name: &str) -> String {
    name.replace(['.', '-', '_'], " ")
}

/// Lowercased, separator-free form used for exact name comparison.
pub fn normalize_name(name: &str) -> String {
    search_query(&name.to_lowercase())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract `(normalized title, year)` from a file name.
///
/// The year must be followed by another separator and lie between 1901 and
/// `current_year`; anything else is treated as part of the title and the
/// function returns `None`.
///
/// # Examples
///
/// ```
/// use webmeta_catalog::name_parser::parse_title_year;
///
/// let (title, year) = parse_title_year("The.Matrix.1999.720p.mkv", 2024).unwrap();
/// assert_eq!(title, "the matrix");
/// assert_eq!(year, 1999);
///
/// assert!(parse_title_year("Blade.Runner.2049.mkv", 2010).is_none());
/// ```
pub fn parse_title_year(file_name: &str, current_year: i32) -> Option<(String, i32)> {
    let caps = TITLE_YEAR.captures(file_name)?;
    let year: i32 = caps[2].parse().ok()?;
    if !(MIN_YEAR..=current_year).contains(&year) {
        return None;
    }
    let title = normalize_name(&caps[1]);
    if title.is_empty() {
        return None;
    }
    Some((title, year))
}

/// Calendar year used as the upper bound for filename years.
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Title with a trailing "3d" marker (and everything after it) removed.
///
/// Returns `None` when the title has no "3d" after its first character.
pub fn strip_3d(title: &str) -> Option<String> {
    let pos = title.find("3d").filter(|&p| p > 0)?;
    let stripped = title[..pos].trim();
    (!stripped.is_empty()).then(|| stripped.to_string())
}

/// IMDb id (`tt0133093`) from the first IMDb URL in a `.nfo` sidecar.
pub fn imdb_from_nfo(text: &str) -> Option<String> {
    IMDB_URL
        .captures(text)
        .map(|caps| format!("tt{}", &caps[1]))
}

/// Year of a `YYYY-MM-DD` date. Partial dates yield `None`.
pub fn year_from_date(date: &str) -> Option<i32> {
    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() != 3 {
        return None;
    }
    parts[0].parse().ok()
}

/// Flag candidates whose normalized name equals the normalized query.
///
/// Returns the number of candidates flagged.
pub fn mark_likely(candidates: &mut [MatchCandidate], query: &str) -> usize {
    let query = normalize_name(query);
    let mut count = 0;
    for candidate in candidates.iter_mut() {
        candidate.likely = normalize_name(&candidate.name) == query;
        if candidate.likely {
            count += 1;
        }
    }
    count
}
