//! Snapshot line parsing

use serde::Deserialize;

/// One line of a daily ID export.
///
/// Only `id` is used downstream. The other fields differ per class
/// (`original_title` for movies, `original_name` for series, `name`
/// elsewhere); each is accepted on its own when present, and unknown keys
/// are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IdentifierRecord {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub adult: Option<bool>,
    #[serde(default)]
    pub video: Option<bool>,
}

/// Parse a snapshot line. Blank lines, non-JSON and records without a
/// numeric `id` are errors.
pub fn parse_record(line: &str) -> Result<IdentifierRecord, sonic_rs::Error> {
    sonic_rs::from_str::<IdentifierRecord>(line.trim_end_matches('\r'))
}

/// Pulls the identifier out of one snapshot line
pub type ExtractFn = fn(&str) -> Result<u64, sonic_rs::Error>;

/// Identifier extraction shared by every class's export shape
pub fn extract_id(line: &str) -> Result<u64, sonic_rs::Error> {
    parse_record(line).map(|r| r.id)
}
