//! get-tmdb - Bulk export of TMDB entities
//!
//! Downloads the daily ID exports and looks up every listed movie, series,
//! person, collection, network, keyword and company against the TMDB API,
//! writing one NDJSON file per class.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Result, ensure};
use chrono::NaiveDate;
use clap::Parser;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use tmdb_core::{ProgressContext, fmt_num, init_logging};
use tmdb_export::{Config, EntityClass, PoolConfig, RunSummary};

mod config;

use config::FileConfig;

#[derive(Parser, Debug)]
#[command(name = "get-tmdb")]
#[command(about = "Bulk export of TMDB entities via the daily ID exports")]
#[command(version)]
struct Cli {
    /// TMDB API key
    #[arg(short = 'a', long)]
    api_key: String,

    /// Output directory (created with mode 0700 if missing)
    #[arg(short, long)]
    output: PathBuf,

    /// Export date to download (YYYY-MM-DD); defaults to the latest complete export
    #[arg(long)]
    export_date: Option<NaiveDate>,

    /// Only download the daily ID exports
    #[arg(long)]
    ids_only: bool,

    /// Skip movies
    #[arg(long)]
    skip_movie: bool,

    /// Skip TV series
    #[arg(long)]
    skip_tv_series: bool,

    /// Skip people
    #[arg(long)]
    skip_person: bool,

    /// Skip collections
    #[arg(long)]
    skip_collection: bool,

    /// Skip TV networks
    #[arg(long)]
    skip_tv_network: bool,

    /// Skip keywords
    #[arg(long)]
    skip_keyword: bool,

    /// Skip production companies
    #[arg(long)]
    skip_company: bool,

    /// Concurrent lookups per chunk
    #[arg(long)]
    workers: Option<usize>,

    /// Identifiers per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Retries per lookup after the first attempt
    #[arg(long)]
    max_retries: Option<u32>,

    /// Milliseconds between lookup retries
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Config file path (default: ./get-tmdb.toml or ~/.config/get-tmdb/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn is_skipped(&self, class: EntityClass) -> bool {
        match class {
            EntityClass::Movie => self.skip_movie,
            EntityClass::TvSeries => self.skip_tv_series,
            EntityClass::Person => self.skip_person,
            EntityClass::Collection => self.skip_collection,
            EntityClass::TvNetwork => self.skip_tv_network,
            EntityClass::Keyword => self.skip_keyword,
            EntityClass::Company => self.skip_company,
        }
    }

    /// Merge flags over the config file (flags win)
    fn to_config(&self, file: &FileConfig) -> Result<Config> {
        let pool = PoolConfig {
            workers: self.workers.unwrap_or(file.pool.workers),
            chunk_size: self.chunk_size.unwrap_or(file.pool.chunk_size),
        };
        pool.validate()?;

        let mut retry = file.http.retry_policy();
        if let Some(max_retries) = self.max_retries {
            retry.max_retries = max_retries;
        }
        if let Some(ms) = self.retry_delay_ms {
            retry.delay = Duration::from_millis(ms);
        }

        ensure!(!self.api_key.trim().is_empty(), "API key is empty");

        let mut config = Config {
            api_key: self.api_key.clone(),
            output_dir: self.output.clone(),
            export_date: self.export_date,
            ids_only: self.ids_only,
            export_url: file.endpoints.export_url.clone(),
            api_url: file.endpoints.api_url.clone(),
            pool,
            retry,
            ..Config::default()
        };
        for &class in EntityClass::all() {
            if self.is_skipped(class) {
                config.skip(class);
            }
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = ProgressContext::new();
    let multi = if progress.is_tty() {
        Some(progress.multi())
    } else {
        None
    };
    init_logging(cli.verbose, multi);

    match execute(&cli, &progress) {
        Ok(()) => {
            log::info!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli, progress: &ProgressContext) -> Result<()> {
    let file = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::load()?,
    };
    let config = cli.to_config(&file)?;
    log_arguments(&config);

    let summary = tmdb_export::run(&config, progress)?;
    print_summary(progress, &summary);
    Ok(())
}

fn log_arguments(config: &Config) {
    log::info!("API key: configured");
    log::info!("Output directory: {}", config.output_dir.display());
    match config.export_date {
        Some(date) => log::info!("Export date: {} (pinned)", date.format("%Y-%m-%d")),
        None => log::info!("Export date: latest"),
    }
    log::info!("IDs only: {}", config.ids_only);
    let classes: Vec<_> = config.classes.iter().map(|c| c.display_name()).collect();
    log::info!("Classes: {}", classes.join(", "));
    log::info!(
        "Workers: {}, chunk size: {}, max retries: {}, retry delay: {}ms",
        config.pool.workers,
        config.pool.chunk_size,
        config.retry.max_retries,
        config.retry.delay.as_millis()
    );
    log::debug!("API URL: {}", config.api_url);
    log::debug!("Export URL: {}", config.export_url);
}

fn print_summary(progress: &ProgressContext, summary: &RunSummary) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(format!("Export {}", summary.export_date.format("%Y-%m-%d"))).fg(Color::Cyan),
            Cell::new("IDs").fg(Color::Cyan),
            Cell::new("Rows").fg(Color::Cyan),
            Cell::new("Failed").fg(Color::Cyan),
            Cell::new("Time").fg(Color::Cyan),
        ]);

    for class in &summary.classes {
        let (rows, failed) = match class.export {
            Some(stats) => (fmt_num(stats.rows), fmt_num(stats.empty_rows)),
            None => ("-".to_string(), "-".to_string()),
        };
        table.add_row(vec![
            Cell::new(class.class.display_name()),
            Cell::new(fmt_num(class.ids)),
            Cell::new(rows),
            Cell::new(failed),
            Cell::new(format_duration(class.elapsed)),
        ]);
    }
    if !summary.ids_only {
        table.add_row(vec![
            Cell::new("Total"),
            Cell::new(fmt_num(summary.classes.iter().map(|c| c.ids).sum())),
            Cell::new(fmt_num(summary.total_rows())),
            Cell::new(fmt_num(summary.total_failed())),
            Cell::new(format_duration(summary.elapsed)),
        ]);
    }

    progress.println(format!("\n{table}"));
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}
