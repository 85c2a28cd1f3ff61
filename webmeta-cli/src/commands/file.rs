//! Per-file commands: parse, search, match, identify.

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use webmeta_core::{CatalogId, FileInfo, MatchCandidate};
use webmeta_lib::Registry;
use webmeta_sync::{Entity, Resolution};

use crate::CliError;

fn print_entity(entity: &Entity) -> Result<(), CliError> {
    println!(
        "  {} {} {}",
        entity.kind().if_supports_color(Stdout, |t| t.dimmed()),
        entity.id().if_supports_color(Stdout, |t| t.cyan()),
        entity.name()?.if_supports_color(Stdout, |t| t.bold()),
    );
    if let Some(episode) = entity.as_episode() {
        println!(
            "    {} season {}, episode {}",
            episode.series().name()?,
            episode.season_number()?,
            episode.number()?,
        );
    }
    Ok(())
}

fn print_candidate(candidate: &MatchCandidate) {
    let marker = if candidate.likely { "*" } else { " " };
    let year = candidate
        .year
        .map(|y| format!(" ({})", y))
        .unwrap_or_default();
    println!(
        "  {} {} {}{}",
        marker.if_supports_color(Stdout, |t| t.green()),
        candidate.id.if_supports_color(Stdout, |t| t.cyan()),
        candidate.name,
        year.if_supports_color(Stdout, |t| t.dimmed()),
    );
}

/// Show the stored entity a file maps to.
pub(crate) async fn run_parse(registry: &Registry, info: FileInfo) -> Result<(), CliError> {
    match registry.parse(info).await? {
        Some(entity) => print_entity(&entity)?,
        None => println!("  No stored entry for this file"),
    }
    Ok(())
}

/// List remote candidates; likely ones are starred.
pub(crate) async fn run_search(registry: &Registry, info: FileInfo) -> Result<(), CliError> {
    let candidates = registry.search(&info).await?;
    if candidates.is_empty() {
        println!("  No candidates");
        return Ok(());
    }
    for candidate in &candidates {
        print_candidate(candidate);
    }
    Ok(())
}

pub(crate) async fn run_match(
    registry: &Registry,
    info: FileInfo,
    id: &str,
) -> Result<(), CliError> {
    let id: CatalogId = id.parse()?;
    let candidate = MatchCandidate::new(id, String::new());
    if registry.match_file(info, &candidate).await? {
        println!(
            "{} Matched to {}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            id.if_supports_color(Stdout, |t| t.cyan()),
        );
    } else {
        println!(
            "{} {} was not stored",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            id
        );
    }
    Ok(())
}

pub(crate) async fn run_identify(registry: &Registry, info: FileInfo) -> Result<(), CliError> {
    let path = info.path.display().to_string();
    match registry.identify(info).await? {
        Resolution::Known(entity) => {
            println!("{}: already known", path.if_supports_color(Stdout, |t| t.bold()));
            print_entity(&entity)?;
        }
        Resolution::Matched(candidate) => {
            println!("{}: matched", path.if_supports_color(Stdout, |t| t.bold()));
            print_candidate(&candidate);
        }
        Resolution::Ambiguous(candidates) => {
            println!(
                "{}: {} candidates, pick one with 'webmeta match'",
                path.if_supports_color(Stdout, |t| t.bold()),
                candidates.len()
            );
            for candidate in &candidates {
                print_candidate(candidate);
            }
        }
        Resolution::NotFound => {
            println!("{}: no match", path.if_supports_color(Stdout, |t| t.bold()));
        }
        Resolution::NotYet => {
            println!(
                "{}: still being written, try again later",
                path.if_supports_color(Stdout, |t| t.bold())
            );
        }
    }
    Ok(())
}
