//! # bgmlink - Anime Release Organizer
//!
//! Parses free-form anime release filenames, reconciles them against the
//! Bangumi title database and hard-links them into a clean library layout.
//!
//! ## Usage
//!
//! ```bash
//! # Show what a filename decomposes into
//! bgmlink parse "[Group][Spy x Family Season 3][1080p] - 05.mkv"
//!
//! # Parse and resolve every media file in a directory
//! bgmlink scan /path/to/downloads
//!
//! # Hard-link everything into a library
//! bgmlink link /path/to/downloads --dest /path/to/library
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bgmlink::commands::{link::LinkCommand, parse::ParseCommand, scan::ScanCommand};
use bgmlink::config::Config;

/// bgmlink - Parse, resolve and link anime releases
#[derive(Parser)]
#[command(
    name = "bgmlink",
    about = "Parse anime release filenames and link them into a clean library",
    long_about = "Extracts title, season, episode and release tags from anime filenames, corrects them against Bangumi (bgm.tv) and hard-links the files into Title/Season N/ folders.",
    version
)]
struct Cli {
    /// JSON file with filename pattern rules (defaults to the built-in rules)
    #[arg(long, short = 'p', global = true)]
    patterns: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Decompose filenames and print the result as JSON lines
    Parse {
        /// Filenames or stems to parse
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Parse and resolve every media file in a directory
    Scan {
        /// Directory to scan
        path: PathBuf,
        /// Skip title database lookups
        #[arg(long)]
        offline: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Number of concurrent title lookups
        #[arg(long, short = 'j')]
        concurrency: Option<usize>,
    },
    /// Hard-link resolved media files into a library
    Link {
        /// Directory to scan
        path: PathBuf,
        /// Library root that receives the links
        #[arg(long, short = 'd')]
        dest: PathBuf,
        /// Filename template, e.g. "{title} S{season}E{episode}.{ext}"
        #[arg(long, short = 't')]
        template: Option<String>,
        /// Skip title database lookups
        #[arg(long)]
        offline: bool,
        /// Show what would be linked without touching the library
        #[arg(long)]
        dry_run: bool,
        /// Number of concurrent title lookups
        #[arg(long, short = 'j')]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bgmlink=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(patterns) = cli.patterns {
        config.patterns_file = Some(patterns);
    }

    let result = match cli.command {
        Commands::Parse { names } => {
            let parse_cmd = ParseCommand::new(names, config);
            parse_cmd
                .execute()
                .and_then(|parsed| parse_cmd.print_json(&parsed))
        }
        Commands::Scan {
            path,
            offline,
            json,
            concurrency,
        } => {
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency.max(1);
            }
            info!(
                "Starting scan command for path: {:?}, offline: {}",
                path, offline
            );
            let scan_cmd = ScanCommand::new(path, config, offline);
            match scan_cmd.execute().await {
                Ok(report) if json => scan_cmd.print_json(&report),
                Ok(report) => {
                    scan_cmd.print_report(&report);
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        Commands::Link {
            path,
            dest,
            template,
            offline,
            dry_run,
            concurrency,
        } => {
            if let Some(template) = template {
                config.filename_template = template;
            }
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency.max(1);
            }
            info!(
                "Starting link command for path: {:?}, dest: {:?}, dry run: {}",
                path, dest, dry_run
            );
            LinkCommand::new(path, dest, config, offline, dry_run)
                .execute()
                .await
                .map(|_| ())
        }
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
