//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// diagflux -- import Hazelcast diagnostics and dstat logs into a time-series store.
///
/// Use `diagflux <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "diagflux", version, about, long_about = None)]
pub struct Cli {
    /// Path to the diagflux.toml configuration file.
    #[arg(short, long, default_value = "diagflux.toml", global = true)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a directory tree of benchmark logs.
    Import(ImportArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- import ----

/// Import diagnostics logs found under a root directory.
///
/// Flags override values from the configuration file and environment.
#[derive(Args, Debug, Default)]
pub struct ImportArgs {
    /// Root directory to start scanning from.
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Scan subdirectories.
    #[arg(short, long)]
    pub recursive: bool,

    /// Only scan the root directory.
    #[arg(long, conflicts_with = "recursive")]
    pub no_recursive: bool,

    /// Re-import directories previously marked as done.
    #[arg(short, long)]
    pub force: bool,

    /// Records per write request.
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Identifier attached to every record of this run (default: current time in ns).
    #[arg(long)]
    pub import_id: Option<String>,

    /// Shift all dates to 2020-01-01 and hours to 12 for easier comparison.
    #[arg(long)]
    pub normalize: bool,

    /// Also import dstat resource logs (*.csv).
    #[arg(long)]
    pub resources: bool,

    /// Fixed benchmark label instead of the directory name.
    #[arg(long)]
    pub benchmark: Option<String>,

    /// Sink kind (influx, graphite, stdout).
    #[arg(long)]
    pub sink: Option<String>,

    /// Print records as JSON lines instead of writing them (same as `--sink stdout`).
    #[arg(long, conflicts_with = "sink")]
    pub dry_run: bool,

    /// InfluxDB base URL.
    #[arg(long)]
    pub db_url: Option<String>,

    /// InfluxDB database name, created if missing.
    #[arg(long)]
    pub db_name: Option<String>,
}

// ---- config ----

/// Manage diagflux configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, import, sink, derive).
        #[arg(long)]
        section: Option<String>,
    },
}
