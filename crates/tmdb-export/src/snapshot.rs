//! Daily ID export acquisition
//!
//! TMDB publishes one gzip-compressed NDJSON list of valid IDs per entity
//! class per day. The export job starts around 07:00 UTC and all files are
//! available by 08:00 UTC.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate, Timelike, Utc};
use tmdb_core::{get_bytes, gunzip};

use crate::config::Config;
use crate::state::EntityClass;

/// Hour (UTC) after which the current day's exports are complete
const EXPORTS_READY_HOUR: u32 = 8;

/// Resolve the export date for a run: the override, or today's date in UTC,
/// or yesterday's before the exports are ready.
pub fn resolve_export_date(override_date: Option<NaiveDate>, now: DateTime<Utc>) -> NaiveDate {
    if let Some(date) = override_date {
        return date;
    }
    let today = now.date_naive();
    if now.hour() < EXPORTS_READY_HOUR {
        today.checked_sub_days(Days::new(1)).unwrap_or(today)
    } else {
        today
    }
}

/// Export file name for a class and date, e.g. `movie_ids_05_01_2024.json`
pub fn export_file_name(class: EntityClass, date: NaiveDate) -> String {
    format!("{}_{}.json", class.export_prefix(), date.format("%m_%d_%Y"))
}

/// Where one class's snapshot and output live for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDescriptor {
    pub class: EntityClass,
    /// Snapshot file name (`<prefix>_<MM_DD_YYYY>.json`)
    pub name: String,
    /// Decompressed ID list
    pub export_file: PathBuf,
    /// Final NDJSON data file
    pub data_file: PathBuf,
    /// Lines in the ID list, known once acquired
    pub line_count: Option<u64>,
}

impl SnapshotDescriptor {
    /// Resolve paths under `output_dir` (expected to be absolute)
    pub fn new(class: EntityClass, date: NaiveDate, output_dir: &Path) -> Self {
        let name = export_file_name(class, date);
        Self {
            class,
            export_file: output_dir.join(&name),
            data_file: output_dir.join(class.data_file_name()),
            name,
            line_count: None,
        }
    }

    /// Download URL without the API key
    pub fn download_url(&self, export_base_url: &str) -> String {
        format!(
            "{}/p/exports/{}.gz",
            export_base_url.trim_end_matches('/'),
            self.name
        )
    }
}

/// Download, decompress and persist one class's daily ID export.
///
/// A single attempt: any failure is fatal for the run. An existing file for
/// the same date is overwritten.
pub fn acquire_snapshot(
    class: EntityClass,
    date: NaiveDate,
    config: &Config,
) -> Result<SnapshotDescriptor> {
    let mut snapshot = SnapshotDescriptor::new(class, date, &config.output_dir);
    let url = snapshot.download_url(&config.export_url);
    log::debug!("{class}: GET {url}");

    let compressed = get_bytes(&url, &[("api_key", config.api_key.as_str())])
        .with_context(|| format!("{class}: ID export download failed"))?;

    let data = gunzip(&compressed).with_context(|| format!("{class}: GZIP decompress failed"))?;

    write_private(&snapshot.export_file, &data).with_context(|| {
        format!(
            "{class}: writing {} failed",
            snapshot.export_file.display()
        )
    })?;

    let lines = count_lines(&data);
    snapshot.line_count = Some(lines);
    log::info!(
        "{class}: {} ({} IDs, {} bytes compressed)",
        snapshot.name,
        tmdb_core::fmt_num(lines),
        tmdb_core::fmt_num(compressed.len() as u64)
    );
    Ok(snapshot)
}

/// Create or truncate `path` (mode 0600 on Unix when created) and write `data`
fn write_private(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// Newline-terminated lines plus an unterminated last line
fn count_lines(data: &[u8]) -> u64 {
    let newlines = data.iter().filter(|&&b| b == b'\n').count() as u64;
    match data.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn before_eight_uses_yesterday() {
        assert_eq!(resolve_export_date(None, utc(2024, 5, 2, 7)), date(2024, 5, 1));
    }

    #[test]
    fn after_eight_uses_today() {
        assert_eq!(resolve_export_date(None, utc(2024, 5, 2, 8)), date(2024, 5, 2));
        assert_eq!(resolve_export_date(None, utc(2024, 5, 2, 23)), date(2024, 5, 2));
    }

    #[test]
    fn early_new_year_rolls_back_a_year() {
        assert_eq!(resolve_export_date(None, utc(2024, 1, 1, 0)), date(2023, 12, 31));
    }

    #[test]
    fn override_wins() {
        let pinned = date(2020, 2, 29);
        assert_eq!(resolve_export_date(Some(pinned), utc(2024, 5, 2, 3)), pinned);
    }

    #[test]
    fn file_name_format() {
        assert_eq!(
            export_file_name(EntityClass::Movie, date(2024, 5, 1)),
            "movie_ids_05_01_2024.json"
        );
        assert_eq!(
            export_file_name(EntityClass::Company, date(2023, 12, 31)),
            "production_company_ids_12_31_2023.json"
        );
    }

    #[test]
    fn descriptor_paths() {
        let out = Path::new("/data/tmdb");
        let snap = SnapshotDescriptor::new(EntityClass::TvSeries, date(2024, 5, 1), out);
        assert_eq!(snap.name, "tv_series_ids_05_01_2024.json");
        assert_eq!(
            snap.export_file,
            PathBuf::from("/data/tmdb/tv_series_ids_05_01_2024.json")
        );
        assert_eq!(snap.data_file, PathBuf::from("/data/tmdb/tv_series.json"));
        assert!(snap.line_count.is_none());
    }

    #[test]
    fn download_url_format() {
        let snap = SnapshotDescriptor::new(EntityClass::Keyword, date(2024, 5, 1), Path::new("/o"));
        assert_eq!(
            snap.download_url("http://files.tmdb.org/"),
            "http://files.tmdb.org/p/exports/keyword_ids_05_01_2024.json.gz"
        );
    }

    #[test]
    fn write_private_overwrites() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("movie_ids_05_01_2024.json");
        write_private(&path, b"old contents, longer\n").unwrap();
        write_private(&path, b"{\"id\":1}\n").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{\"id\":1}\n");
    }

    #[cfg(unix)]
    #[test]
    fn write_private_creates_owner_only_file() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("keyword_ids_05_01_2024.json");
        write_private(&path, b"{\"id\":1}\n").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn count_lines_handles_trailing_newline() {
        assert_eq!(count_lines(b""), 0);
        assert_eq!(count_lines(b"a\nb\n"), 2);
        assert_eq!(count_lines(b"a\nb"), 2);
    }
}
