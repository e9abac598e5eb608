//! `diagflux import` command handler

use std::io::Write;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use diagflux_core::config::DiagfluxConfig;
use diagflux_pipeline::{ImportStats, Importer, ImporterConfig, build_sink};

use crate::cli::ImportArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `import` command.
///
/// Flags are layered on top of the loaded configuration, the result is
/// validated again, and a single import run is performed against the
/// configured sink.
pub async fn execute(
    args: ImportArgs,
    mut config: DiagfluxConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    apply_overrides(&mut config, &args);
    config.validate()?;

    let importer_config = ImporterConfig::from_core(&config);
    info!(
        root = %importer_config.root_dir.display(),
        sink = %config.sink.kind,
        import_id = %importer_config.import_id,
        "starting import"
    );

    let sink = build_sink(&config.sink)?;
    let mut importer = Importer::new(importer_config, sink)?;

    let started = Instant::now();
    let stats = importer.run().await?;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let report = ImportReport {
        root_dir: importer.config().root_dir.display().to_string(),
        sink: config.sink.kind.clone(),
        import_id: importer.config().import_id.clone(),
        elapsed_ms,
        stats,
    };
    writer.render(&report)?;

    Ok(())
}

/// Layer command-line flags over the loaded configuration.
pub fn apply_overrides(config: &mut DiagfluxConfig, args: &ImportArgs) {
    if let Some(ref dir) = args.dir {
        config.import.root_dir = dir.display().to_string();
    }
    if args.recursive {
        config.import.recursive = true;
    }
    if args.no_recursive {
        config.import.recursive = false;
    }
    if args.force {
        config.import.force = true;
    }
    if let Some(size) = args.batch_size {
        config.import.batch_size = size;
    }
    if let Some(ref id) = args.import_id {
        config.import.import_id = id.clone();
    }
    if args.normalize {
        config.import.normalize = true;
    }
    if args.resources {
        config.import.include_resource_logs = true;
    }
    if let Some(ref benchmark) = args.benchmark {
        config.import.benchmark = benchmark.clone();
    }
    if let Some(ref sink) = args.sink {
        config.sink.kind = sink.clone();
    }
    if args.dry_run {
        config.sink.kind = "stdout".to_owned();
    }
    if let Some(ref url) = args.db_url {
        config.sink.influx.url = url.clone();
    }
    if let Some(ref name) = args.db_name {
        config.sink.influx.database = name.clone();
    }
}

/// Summary of a finished import run.
#[derive(Debug, Serialize)]
pub struct ImportReport {
    /// Root directory that was scanned
    pub root_dir: String,
    /// Sink kind the records were written to
    pub sink: String,
    /// Identifier tagged on every record of this run
    pub import_id: String,
    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
    /// Counters collected by the importer
    pub stats: ImportStats,
}

impl Render for ImportReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Import: {}", self.root_dir.bold())?;
        writeln!(w, "  Sink:       {}", self.sink)?;
        writeln!(w, "  Import ID:  {}", self.import_id)?;
        writeln!(w, "  Elapsed:    {} ms", self.elapsed_ms)?;
        writeln!(w)?;

        let s = &self.stats;
        writeln!(w, "  Files:      {}", s.files)?;
        if s.failed_files > 0 {
            writeln!(
                w,
                "  Failed:     {}",
                s.failed_files.to_string().yellow()
            )?;
        }
        writeln!(w, "  Skipped:    {} dirs (already scanned)", s.skipped_dirs)?;
        writeln!(w, "  Lines:      {} ({} metric)", s.lines_processed, s.metric_lines)?;
        if s.parse_failures > 0 {
            writeln!(
                w,
                "  Bad lines:  {}",
                s.parse_failures.to_string().yellow()
            )?;
        }
        writeln!(w, "  Cycles:     {}", s.cycles)?;
        writeln!(w, "  Derived:    {}", s.derived_samples)?;
        writeln!(w, "  CSV rows:   {}", s.resource_rows)?;
        writeln!(
            w,
            "  Records:    {} in {} batches",
            s.records_emitted.to_string().green().bold(),
            s.flushes
        )?;
        if s.failed_flushes > 0 {
            writeln!(
                w,
                "  Rejected:   {} batch writes (retried)",
                s.failed_flushes.to_string().red().bold()
            )?;
        }

        Ok(())
    }
}
