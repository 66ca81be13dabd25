//! minikv CLI
//!
//! Offline tools for a minikv data directory.
//!
//! # Commands
//!
//! - `inspect` - Display journal statistics and metadata
//! - `get` - Print one value
//! - `dump` - Print every key and value
//! - `compact` - Rewrite the journal with live records only
//! - `clear` - Delete all persisted data

mod commands;
mod error;

use clap::{Parser, Subcommand, ValueEnum};
use commands::OutputFormat;
use minikv_core::{Config, EncryptionKey, Store};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// minikv command-line tools.
#[derive(Parser)]
#[command(name = "minikv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory
    #[arg(global = true, short, long)]
    dir: Option<PathBuf>,

    /// Encryption key, 32 hex characters
    #[arg(global = true, short, long)]
    key: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Display journal statistics and metadata
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Print the value stored under a key
    Get {
        /// Key to read
        #[arg(value_name = "KEY")]
        name: String,
    },

    /// Print every key and value
    Dump {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Rewrite the journal with live records only
    Compact,

    /// Delete the journal, manifest and lock file
    Clear,
}

fn open_store(dir: Option<PathBuf>, key: Option<String>) -> Result<Store, error::CliError> {
    let dir = dir.ok_or(error::CliError::MissingDir)?;
    let mut config = Config::new(dir).from_env_overrides();
    if let Some(key) = key {
        config = config.encryption_key(EncryptionKey::from_hex(&key)?);
    }
    Ok(Store::open(config)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store = open_store(cli.dir, cli.key)?;
    match cli.command {
        Commands::Inspect { format } => commands::inspect::run(&store, format.into())?,
        Commands::Get { name } => commands::get::run(&store, &name)?,
        Commands::Dump { format } => commands::dump::run(&store, format.into())?,
        Commands::Compact => commands::compact::run(&store)?,
        Commands::Clear => commands::clear::run(store)?,
    }

    Ok(())
}
