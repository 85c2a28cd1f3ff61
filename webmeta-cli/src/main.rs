//! webmeta CLI
//!
//! Command-line interface for matching media files against the local
//! TheTVDB and TheMovieDB catalogs.

mod commands;
mod error;
mod spinner;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

use webmeta_core::{FileInfo, Provider};
use webmeta_lib::{Registry, Settings};

pub(crate) use error::CliError;

#[derive(Parser)]
#[command(name = "webmeta")]
#[command(about = "Match media files against TheTVDB and TheMovieDB", long_about = None)]
struct Cli {
    /// Directory holding the catalog stores (default: ~/.webmeta)
    #[arg(long, global = true)]
    base: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Hide progress spinners
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Attributes of a media file the indexer would normally supply.
#[derive(Args, Clone)]
struct FileArgs {
    /// Path to the media file
    file: PathBuf,

    /// Series name (marks the file as an episode)
    #[arg(long)]
    series: Option<String>,

    #[arg(long, requires = "series")]
    season: Option<u32>,

    #[arg(long, requires = "series")]
    episode: Option<u32>,

    /// Title to search for when the file name gives nothing usable
    #[arg(long)]
    title: Option<String>,

    /// Playback duration in seconds
    #[arg(long)]
    length: Option<u64>,
}

impl FileArgs {
    fn into_info(self) -> FileInfo {
        let mut info = FileInfo::new(self.file);
        info.series = self.series;
        info.season = self.season;
        info.episode = self.episode;
        info.title = self.title;
        info.length = self.length;
        info
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the stored entity a file maps to (no network)
    Parse {
        #[command(flatten)]
        file: FileArgs,
    },

    /// Search the remote catalog for candidates
    Search {
        #[command(flatten)]
        file: FileArgs,
    },

    /// Bind a file to a catalog id (e.g. thetvdb:80379, themoviedb:603)
    Match {
        #[command(flatten)]
        file: FileArgs,

        id: String,
    },

    /// Parse, search and match a file in one go
    Identify {
        #[command(flatten)]
        file: FileArgs,
    },

    /// Refresh stored entries from the remote catalogs
    Sync {
        /// Re-fetch every stored entry instead of only changed ones
        #[arg(long)]
        force: bool,
    },

    /// Manage stored TV series
    Series {
        #[command(subcommand)]
        action: SeriesAction,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum SeriesAction {
    /// List stored series
    List,

    /// Fetch and store a series by TheTVDB id
    Add {
        id: u64,

        /// Extra name that should resolve to this series
        #[arg(long)]
        alias: Option<String>,
    },

    /// Remove a series and everything attached to it
    Delete { id: u64 },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show resolved settings and where each value came from
    Show,

    /// Print the settings file path
    Path,

    /// Store an API key in the settings file (omit KEY to remove it)
    SetKey {
        /// thetvdb or themoviedb
        provider: Provider,

        key: Option<String>,
    },
}

fn init_logger(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Info);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Debug);
        }
    }
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "error:".if_supports_color(Stderr, |t| t.red()), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let quiet = cli.quiet;
    let settings = Settings::resolve(cli.base)?;

    // Configuration commands never open the stores.
    let command = match cli.command {
        Commands::Config { action } => {
            return match action {
                ConfigAction::Show => commands::config::run_config_show(&settings),
                ConfigAction::Path => commands::config::run_config_path(),
                ConfigAction::SetKey { provider, key } => {
                    commands::config::run_config_set_key(provider, key.as_deref())
                }
            };
        }
        other => other,
    };

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let registry = Registry::init(&settings).await?;
        if registry.providers().is_empty() {
            log::warn!("No API keys configured; run 'webmeta config set-key' first");
        }
        match command {
            Commands::Parse { file } => commands::file::run_parse(&registry, file.into_info()).await,
            Commands::Search { file } => {
                commands::file::run_search(&registry, file.into_info()).await
            }
            Commands::Match { file, id } => {
                commands::file::run_match(&registry, file.into_info(), &id).await
            }
            Commands::Identify { file } => {
                commands::file::run_identify(&registry, file.into_info()).await
            }
            Commands::Sync { force } => commands::sync::run_sync(&registry, force, quiet).await,
            Commands::Series { action } => match action {
                SeriesAction::List => commands::series::run_series_list(&registry).await,
                SeriesAction::Add { id, alias } => {
                    commands::series::run_series_add(&registry, id, alias.as_deref()).await
                }
                SeriesAction::Delete { id } => {
                    commands::series::run_series_delete(&registry, id).await
                }
            },
            Commands::Config { .. } => Ok(()),
        }
    })
}
