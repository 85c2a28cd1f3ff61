use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use webmeta_core::{CatalogError, Provider};
use webmeta_lib::{LibError, Registry, TvBackend};
use webmeta_sync::AddOutcome;

use crate::CliError;

fn tv(registry: &Registry) -> Result<&TvBackend, CliError> {
    Ok(registry
        .tv()
        .ok_or(LibError::NotConfigured(Provider::TheTvDb))?)
}

pub(crate) async fn run_series_list(registry: &Registry) -> Result<(), CliError> {
    let all = tv(registry)?.list_series().await?;
    if all.is_empty() {
        println!("  No series stored");
        return Ok(());
    }
    for series in all {
        // Views read SQLite; keep them off the async workers.
        let line = tokio::task::spawn_blocking(move || -> Result<String, CatalogError> {
            let year = series.year()?.map(|y| format!(" ({})", y)).unwrap_or_default();
            Ok(format!(
                "  {} {}{}, {} season(s)",
                series.id().if_supports_color(Stdout, |t| t.cyan()),
                series.name()?.if_supports_color(Stdout, |t| t.bold()),
                year,
                series.seasons()?.iter().flatten().count(),
            ))
        })
        .await
        .map_err(|e| CliError::runtime(e.to_string()))??;
        println!("{}", line);
    }
    Ok(())
}

pub(crate) async fn run_series_add(
    registry: &Registry,
    id: u64,
    alias: Option<&str>,
) -> Result<(), CliError> {
    let outcome = tv(registry)?.add_series(id, alias).await?;
    let what = match outcome {
        AddOutcome::Fetched => "Stored",
        AddOutcome::AlreadyPresent => "Already stored:",
    };
    println!(
        "{} {} thetvdb:{}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        what,
        id
    );
    Ok(())
}

pub(crate) async fn run_series_delete(registry: &Registry, id: u64) -> Result<(), CliError> {
    if tv(registry)?.delete_series(id).await? {
        println!(
            "{} Deleted thetvdb:{}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            id
        );
    } else {
        println!("  thetvdb:{} was not stored", id);
    }
    Ok(())
}
