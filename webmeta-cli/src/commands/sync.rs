use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use webmeta_lib::{run_with_events, Registry};

use crate::spinner::SyncSpinner;
use crate::CliError;

/// Sync every configured catalog with a spinner showing progress.
pub(crate) async fn run_sync(registry: &Registry, force: bool, quiet: bool) -> Result<(), CliError> {
    let spinner = SyncSpinner::new(quiet);
    let reports = run_with_events(registry.sync(force), registry.events(), |event| {
        spinner.handle(event)
    })
    .await;
    spinner.finish();

    for (provider, result) in reports {
        match result {
            Ok(report) if report.cursor.is_none() => {
                println!(
                    "  {}: nothing to sync yet",
                    provider.if_supports_color(Stdout, |t| t.bold())
                );
            }
            Ok(report) => {
                println!(
                    "  {}: {} updated, {} failed",
                    provider.if_supports_color(Stdout, |t| t.bold()),
                    report.updated.len(),
                    report.failed.len(),
                );
                for (id, e) in &report.failed {
                    println!("    {} {}: {}", "\u{2718}".if_supports_color(Stdout, |t| t.red()), id, e);
                }
            }
            Err(e) => {
                println!(
                    "  {}: {} {}",
                    provider.if_supports_color(Stdout, |t| t.bold()),
                    "failed:".if_supports_color(Stdout, |t| t.red()),
                    e
                );
            }
        }
    }
    Ok(())
}
