//! Run orchestration: output directory, ID exports, per-class export

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, ensure};
use chrono::{NaiveDate, Utc};
use tmdb_core::{ProgressContext, fmt_num};

use crate::config::Config;
use crate::error::{Stage, StageError};
use crate::lookup::RemoteLookup;
use crate::pipeline::{ChunkReport, IdReader, PipelineStats, run_pipeline};
use crate::sink::NdjsonSink;
use crate::snapshot::{SnapshotDescriptor, acquire_snapshot, resolve_export_date};
use crate::state::EntityClass;

/// Resolve the output directory to an absolute path, creating it
/// (mode 0700 on Unix) when missing.
pub fn prepare_output_dir(path: &Path) -> Result<PathBuf> {
    ensure!(!path.as_os_str().is_empty(), "output path is empty");
    let path = std::path::absolute(path)
        .with_context(|| format!("Failed to resolve {}", path.display()))?;

    if path.exists() {
        ensure!(path.is_dir(), "{} is not a directory", path.display());
        return Ok(path);
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    log::debug!("Created output directory {}", path.display());
    Ok(path)
}

/// Run the export: acquire every selected class's ID export, then (unless
/// `ids_only`) look up and write each class in order.
///
/// The first fatal error stops the run.
pub fn run(config: &Config, progress: &ProgressContext) -> Result<RunSummary, StageError> {
    let start = Instant::now();

    let output_dir = prepare_output_dir(&config.output_dir)
        .map_err(|e| StageError::new(Stage::OutputPath, e))?;
    let config = Config {
        output_dir,
        ..config.clone()
    };

    let export_date = resolve_export_date(config.export_date, Utc::now());
    log::info!("Export date: {}", export_date.format("%Y-%m-%d"));

    let mut snapshots = Vec::with_capacity(config.classes.len());
    for &class in &config.classes {
        let line = progress.stage_line(&class.to_string());
        line.set_message("downloading ID export...");
        let result = acquire_snapshot(class, export_date, &config);
        line.finish_and_clear();
        snapshots.push(result.map_err(|e| StageError::new(Stage::Snapshot(class), e))?);
    }

    let mut summary = RunSummary {
        export_date,
        ids_only: config.ids_only,
        classes: snapshots
            .iter()
            .map(|s| ClassSummary {
                class: s.class,
                ids: s.line_count.unwrap_or(0),
                export: None,
                elapsed: Duration::ZERO,
            })
            .collect(),
        elapsed: Duration::ZERO,
    };

    if config.ids_only {
        log::info!("ID exports only, skipping lookups");
        summary.elapsed = start.elapsed();
        return Ok(summary);
    }

    for (snapshot, class_summary) in snapshots.iter().zip(summary.classes.iter_mut()) {
        let class_start = Instant::now();
        let stats = export_class(snapshot, &config, progress)
            .map_err(|e| StageError::new(Stage::Export(snapshot.class), e))?;
        class_summary.export = Some(stats);
        class_summary.elapsed = class_start.elapsed();
    }

    summary.elapsed = start.elapsed();
    Ok(summary)
}

/// Look up every identifier in one snapshot and write the class's data file
pub fn export_class(
    snapshot: &SnapshotDescriptor,
    config: &Config,
    progress: &ProgressContext,
) -> Result<PipelineStats> {
    let class = snapshot.class;
    log::info!("Exporting {class} to {}", snapshot.data_file.display());

    let file = File::open(&snapshot.export_file)
        .with_context(|| format!("Failed to open {}", snapshot.export_file.display()))?;
    let ids = IdReader::new(BufReader::new(file), class.extractor());

    let mut sink = NdjsonSink::new(&snapshot.data_file)
        .with_context(|| format!("Failed to create {}", snapshot.data_file.display()))?;
    let lookup = RemoteLookup::new(class, &config.api_url, &config.api_key, config.retry);

    let pb = progress.rows_bar(&class.to_string(), snapshot.line_count);
    let is_tty = progress.is_tty();
    let total = snapshot.line_count.map(fmt_num);
    let on_chunk = |report: &ChunkReport| {
        pb.set_position(report.total_rows);
        if !is_tty {
            match &total {
                Some(total) => log::info!(
                    "{class}: chunk {} done, {}/{total} rows",
                    report.chunk,
                    fmt_num(report.total_rows)
                ),
                None => log::info!(
                    "{class}: chunk {} done, {} rows",
                    report.chunk,
                    fmt_num(report.total_rows)
                ),
            }
        }
    };

    let fetch = |id: u64| lookup.fetch(id);
    match run_pipeline(ids, &mut sink, &config.pool, &fetch, on_chunk) {
        Ok(stats) => {
            pb.finish_and_clear();
            sink.finalize()
                .with_context(|| format!("Failed to finalize {}", snapshot.data_file.display()))?;
            log::info!("Number of {class} exported: {}", fmt_num(stats.rows));
            if stats.empty_rows > 0 {
                log::warn!(
                    "{class}: {} lookups failed and were written as empty lines",
                    fmt_num(stats.empty_rows)
                );
            }
            Ok(stats)
        }
        Err(e) => {
            pb.abandon();
            sink.abandon();
            Err(e)
        }
    }
}

/// Outcome for one class
#[derive(Debug, Clone)]
pub struct ClassSummary {
    pub class: EntityClass,
    /// Lines in the ID export
    pub ids: u64,
    /// Pipeline totals; `None` when lookups were skipped
    pub export: Option<PipelineStats>,
    pub elapsed: Duration,
}

/// Summary of a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub export_date: NaiveDate,
    pub ids_only: bool,
    pub classes: Vec<ClassSummary>,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Rows written across all classes
    pub fn total_rows(&self) -> u64 {
        self.classes
            .iter()
            .filter_map(|c| c.export.map(|s| s.rows))
            .sum()
    }

    /// Failed lookups across all classes
    pub fn total_failed(&self) -> u64 {
        self.classes
            .iter()
            .filter_map(|c| c.export.map(|s| s.empty_rows))
            .sum()
    }
}
