//! diagflux -- Hazelcast diagnostics log importer
//!
//! Scans benchmark result directories, parses diagnostics and dstat logs,
//! and writes the resulting points to InfluxDB, Graphite or stdout.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use diagflux_core::config::GeneralConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let writer = OutputWriter::new(cli.output);

    if let Err(e) = run(cli, &writer).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    // 로딩 에러는 import에서만 전파됩니다. config 명령은 직접 다시 로드해 보고합니다.
    let loaded = commands::load_or_default(&cli.config).await;

    let mut general = match &loaded {
        Ok(config) => config.general.clone(),
        Err(_) => GeneralConfig::default(),
    };
    if let Some(level) = cli.log_level {
        general.log_level = level;
    }
    logging::init_tracing(&general).map_err(|e| CliError::Config(e.to_string()))?;
    diagflux_core::metrics::describe_all();

    tracing::debug!(config = %cli.config.display(), "diagflux starting");

    match cli.command {
        Commands::Import(args) => commands::import::execute(args, loaded?, writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, writer).await,
    }
}
