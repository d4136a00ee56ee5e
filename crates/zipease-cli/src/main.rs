//! zipease - create, list and extract ZIP archives from the command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use zipease_core::Config;

mod commands;

/// zipease - create, list and extract ZIP archives
#[derive(Parser)]
#[command(name = "zipease")]
#[command(author, version, about = "Create, list and extract ZIP archives", long_about = None)]
struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show a spinner during long operations
    #[arg(long, global = true)]
    progress: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "ZIPEASE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a folder, reopen the archive, extract it and list its entries
    Demo {
        /// Folder to pack
        folder: PathBuf,

        /// Archive to create
        archive: PathBuf,

        /// Folder to extract into
        output: PathBuf,

        /// Where to put the copy of the first entry (default: <OUTPUT>/first.bin)
        #[arg(long)]
        first: Option<PathBuf>,
    },

    /// Pack a folder or a single file into an archive
    Pack {
        /// Input file or directory
        input: PathBuf,

        /// Output archive file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List the entries of an archive
    List {
        /// Archive file to inspect
        archive: PathBuf,

        /// Print full entry metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract entries from an archive
    Extract {
        /// Archive file to extract
        archive: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Extract only this entry
        #[arg(long, conflicts_with = "first")]
        entry: Option<String>,

        /// Extract only the first entry, to this exact file
        #[arg(long)]
        first: Option<PathBuf>,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => Ok(Config::load_or_default()),
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Demo {
            folder,
            archive,
            output,
            first,
        } => {
            let first = first.unwrap_or_else(|| output.join("first.bin"));
            commands::demo(&config, &folder, &archive, &output, &first, cli.progress)
        }
        Commands::Pack { input, output } => commands::pack(&config, &input, &output, cli.progress),
        Commands::List { archive, json } => commands::list(&config, &archive, json),
        Commands::Extract {
            archive,
            output,
            entry,
            first,
        } => {
            let output = output.unwrap_or_else(|| PathBuf::from("."));
            commands::extract(
                &config,
                &archive,
                &output,
                entry.as_deref(),
                first.as_deref(),
                cli.progress,
            )
        }
    }
}
