use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use toknav::config::Config;
use toknav::index::build::{self, FsWorkspace};
use toknav::index::stats::{self, IndexStats};
use toknav::output;
use toknav::utils::find_workspace_root;
use toknav::workspace::ScanSummary;

#[derive(Parser)]
#[command(name = "toknav")]
#[command(about = "Index the tokens of a workspace and jump between their occurrences")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to config.json in the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a workspace and print statistics
    Index {
        /// Path to index (auto-detects git root)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Only index files matching these globs (relative to the root)
        #[arg(short, long)]
        glob: Vec<String>,
    },
    /// List every occurrence of a token
    Lookup {
        token: String,

        #[arg(default_value = ".")]
        path: PathBuf,

        #[arg(short, long)]
        glob: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Group occurrences under a file heading
        #[arg(long)]
        heading: bool,

        /// Only print the number of occurrences per file
        #[arg(short, long)]
        count: bool,
    },
    /// Show the most frequent tokens
    Top {
        #[arg(default_value = ".")]
        path: PathBuf,

        #[arg(short, long)]
        glob: Vec<String>,

        /// Number of tokens to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },
    /// Browse tokens and occurrences interactively
    #[cfg(feature = "interactive")]
    Browse {
        #[arg(default_value = ".")]
        path: PathBuf,

        #[arg(short, long)]
        glob: Vec<String>,
    },
    /// Print the effective configuration
    Config,
}

fn init_logging(verbose: u8, interactive: bool) {
    let default = match verbose {
        // stderr belongs to the terminal UI
        0 if interactive => "off",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("TOKNAV_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn index_path(path: &Path, config: &Config, globs: &[String], silent: bool) -> Result<(FsWorkspace, ScanSummary)> {
    let root = find_workspace_root(path)?;
    let runtime = build::runtime()?;
    build::index_workspace(&runtime, &root, config, globs, silent)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "interactive")]
    let interactive = matches!(cli.command, Commands::Browse { .. });
    #[cfg(not(feature = "interactive"))]
    let interactive = false;
    init_logging(cli.verbose, interactive);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Index { path, glob } => {
            let (workspace, summary) = index_path(&path, &config, &glob, false)?;
            let root = workspace.source().root().to_path_buf();
            let stats = IndexStats::collect(&workspace.index());
            println!();
            stats::show_stats(&root, &stats, &summary);
        }
        Commands::Lookup {
            token,
            path,
            glob,
            json,
            no_color,
            heading,
            count,
        } => {
            let (workspace, _) = index_path(&path, &config, &glob, true)?;
            if count {
                let hits = workspace.index().documents_for(&token);
                if json {
                    println!("{}", serde_json::to_string_pretty(&hits)?);
                } else {
                    output::print_document_counts(&hits, !no_color)?;
                }
            } else {
                let occurrences = workspace.occurrences(&token);
                if json {
                    println!("{}", serde_json::to_string_pretty(&occurrences)?);
                } else {
                    output::print_occurrences(&occurrences, !no_color, heading)?;
                }
                if occurrences.is_empty() {
                    std::process::exit(1);
                }
            }
        }
        Commands::Top {
            path,
            glob,
            limit,
            json,
        } => {
            let (workspace, _) = index_path(&path, &config, &glob, true)?;
            let index = workspace.index();
            let tokens: Vec<(&str, usize)> = index.tokens_by_count().into_iter().take(limit).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            } else {
                output::print_token_counts(&tokens, true)?;
            }
        }
        #[cfg(feature = "interactive")]
        Commands::Browse { path, glob } => {
            let root = find_workspace_root(&path)?;
            toknav::tui::run(root, config, glob)?;
        }
        Commands::Config => {
            let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
            println!("{json}");
        }
    }

    Ok(())
}
