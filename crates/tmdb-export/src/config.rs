//! Run configuration

use std::path::PathBuf;

use chrono::NaiveDate;
use tmdb_core::RetryPolicy;

use crate::pipeline::PoolConfig;
use crate::state::EntityClass;

/// Daily export host
pub const DEFAULT_EXPORT_URL: &str = "http://files.tmdb.org";

/// Lookup API host
pub const DEFAULT_API_URL: &str = "https://api.themoviedb.org";

/// Everything one export run needs
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    /// Absolute output directory
    pub output_dir: PathBuf,
    /// Pinned export date; resolved from the clock when `None`
    pub export_date: Option<NaiveDate>,
    /// Stop after acquiring the daily ID exports
    pub ids_only: bool,
    /// Selected classes, in export order
    pub classes: Vec<EntityClass>,
    pub export_url: String,
    pub api_url: String,
    pub pool: PoolConfig,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            output_dir: PathBuf::new(),
            export_date: None,
            ids_only: false,
            classes: EntityClass::all().to_vec(),
            export_url: DEFAULT_EXPORT_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            pool: PoolConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Remove a class from the selection (`--skip-<class>`), keeping the
    /// order of the rest
    pub fn skip(&mut self, class: EntityClass) {
        self.classes.retain(|&c| c != class);
    }
}
