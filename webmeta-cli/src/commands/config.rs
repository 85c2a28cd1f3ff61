use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use webmeta_core::Provider;
use webmeta_lib::settings::{self, Settings};
use webmeta_provider::credentials::{key_source, ApiKeySource};

use crate::CliError;

fn mask_value(s: &str) -> String {
    if s.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", s.chars().take(4).collect::<String>())
    }
}

/// Show resolved settings and where each API key came from.
pub(crate) fn run_config_show(settings: &Settings) -> Result<(), CliError> {
    let path = settings::settings_path();

    println!(
        "{}",
        "webmeta Configuration".if_supports_color(Stdout, |t| t.bold())
    );
    println!();
    if path.exists() {
        println!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        );
    } else {
        println!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found)".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    println!(
        "  Storage:       {}",
        settings
            .storage_base()
            .display()
            .if_supports_color(Stdout, |t| t.cyan())
    );
    println!();

    let keys = settings.api_keys();
    for provider in Provider::all() {
        let source = key_source(*provider, settings.config_key(*provider));
        let value = keys.get(*provider).map(mask_value);
        match (&source, value) {
            (ApiKeySource::Missing, _) | (_, None) => println!(
                "  {:<12} {}",
                provider.display_name(),
                "not set".if_supports_color(Stdout, |t| t.red()),
            ),
            (source, Some(value)) => println!(
                "  {:<12} {} {}",
                provider.display_name(),
                value,
                format!("({})", source).if_supports_color(Stdout, |t| t.dimmed()),
            ),
        }
    }

    if let Some(contents) = settings::load_settings_string() {
        println!();
        println!("{}", "Settings file contents".if_supports_color(Stdout, |t| t.bold()));
        for line in contents.lines() {
            // Keys are shown masked above.
            if line.trim_start().starts_with("api_key") {
                continue;
            }
            println!("  {}", line);
        }
    }
    Ok(())
}

pub(crate) fn run_config_path() -> Result<(), CliError> {
    println!("{}", settings::settings_path().display());
    Ok(())
}

pub(crate) fn run_config_set_key(provider: Provider, key: Option<&str>) -> Result<(), CliError> {
    let path = settings::settings_path();
    settings::save_api_key(&path, provider, key)?;
    let action = if key.is_some() { "saved" } else { "removed" };
    println!(
        "{} {} API key {} in {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        provider.display_name(),
        action,
        path.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    Ok(())
}
