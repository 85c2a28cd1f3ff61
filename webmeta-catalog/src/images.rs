//! Image selection policy.
//!
//! TheMovieDB images are bucketed by how many people voted on them, so a
//! poster with a handful of votes never outranks one with hundreds. Callers
//! that need a single image take the first element.

use crate::types::{BannerRecord, ImageInfo};

/// Images with more votes than this are in the most trusted tier.
const TRUSTED_VOTES: u32 = 10;
/// Images with more votes than this (and not trusted) are in the middle tier.
const SOME_VOTES: u32 = 2;

/// Widest poster rendition we bother downloading.
const MAX_POSTER_WIDTH: u32 = 400;

/// Rank images for display.
///
/// Only images without a language or in `lang` are considered. The result is
/// the >10-vote tier, then the 3..=10 tier, then the rest, each sorted
/// ascending by vote average.
pub fn rank_images<'a>(images: &'a [ImageInfo], lang: &str) -> Vec<&'a ImageInfo> {
    let mut tiers: [Vec<&ImageInfo>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for image in images {
        if image.iso_639_1.as_deref().unwrap_or(lang) != lang {
            continue;
        }
        let tier = if image.vote_count > TRUSTED_VOTES {
            0
        } else if image.vote_count > SOME_VOTES {
            1
        } else {
            2
        };
        tiers[tier].push(image);
    }
    tiers
        .into_iter()
        .flat_map(|mut tier| {
            tier.sort_by(|a, b| a.vote_average.total_cmp(&b.vote_average));
            tier
        })
        .collect()
}

/// Order TheTVDB banners by rating, highest first.
pub fn rank_banners(mut banners: Vec<BannerRecord>) -> Vec<BannerRecord> {
    banners.sort_by(|a, b| b.rating().total_cmp(&a.rating()));
    banners
}

/// Largest `w<N>` poster size narrower than 400 pixels, else `original`.
pub fn poster_size(sizes: &[String]) -> &str {
    sizes
        .iter()
        .filter_map(|s| Some((s.as_str(), width_of(s)?)))
        .filter(|&(_, w)| w < MAX_POSTER_WIDTH)
        .max_by_key(|&(_, w)| w)
        .map_or("original", |(s, _)| s)
}

/// `w1280` when offered, else `original`.
pub fn backdrop_size(sizes: &[String]) -> &str {
    sizes
        .iter()
        .find(|s| s.as_str() == "w1280")
        .map_or("original", String::as_str)
}

/// Smallest size in the list, used for thumbnails.
pub fn thumbnail_size(sizes: &[String]) -> &str {
    sizes.first().map_or("original", String::as_str)
}

fn width_of(size: &str) -> Option<u32> {
    size.strip_prefix('w')?.parse().ok()
}
