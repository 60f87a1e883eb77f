//! Entity classes exported from TMDB

use std::fmt;

use crate::record::{ExtractFn, extract_id};

/// TMDB entity classes with a daily ID export and a per-item lookup endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityClass {
    /// Feature films
    Movie,
    /// Television series
    TvSeries,
    /// Cast and crew
    Person,
    /// Movie collections (franchises)
    Collection,
    /// Broadcasters and streaming networks
    TvNetwork,
    /// Keywords attached to movies and series
    Keyword,
    /// Production companies
    Company,
}

impl EntityClass {
    /// Parse a class from its CLI name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "movie" => Some(Self::Movie),
            "tv-series" => Some(Self::TvSeries),
            "person" => Some(Self::Person),
            "collection" => Some(Self::Collection),
            "tv-network" => Some(Self::TvNetwork),
            "keyword" => Some(Self::Keyword),
            "company" => Some(Self::Company),
            _ => None,
        }
    }

    /// CLI name (`--skip-<name>`)
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::TvSeries => "tv-series",
            Self::Person => "person",
            Self::Collection => "collection",
            Self::TvNetwork => "tv-network",
            Self::Keyword => "keyword",
            Self::Company => "company",
        }
    }

    /// Human-readable plural name used in logs and summaries
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Movie => "Movies",
            Self::TvSeries => "TV Series",
            Self::Person => "People",
            Self::Collection => "Collections",
            Self::TvNetwork => "TV Networks",
            Self::Keyword => "Keywords",
            Self::Company => "Production Companies",
        }
    }

    /// Daily export file prefix on the snapshot host
    pub fn export_prefix(&self) -> &'static str {
        match self {
            Self::Movie => "movie_ids",
            Self::TvSeries => "tv_series_ids",
            Self::Person => "person_ids",
            Self::Collection => "collection_ids",
            Self::TvNetwork => "tv_network_ids",
            Self::Keyword => "keyword_ids",
            Self::Company => "production_company_ids",
        }
    }

    /// Lookup path template; `{id}` is replaced by the identifier
    pub fn lookup_template(&self) -> &'static str {
        match self {
            Self::Movie => "/3/movie/{id}",
            Self::TvSeries => "/3/tv/{id}",
            Self::Person => "/3/person/{id}",
            Self::Collection => "/3/collection/{id}",
            Self::TvNetwork => "/3/network/{id}",
            Self::Keyword => "/3/keyword/{id}",
            Self::Company => "/3/company/{id}",
        }
    }

    /// Lookup path for one identifier
    pub fn lookup_path(&self, id: u64) -> String {
        self.lookup_template().replace("{id}", &id.to_string())
    }

    /// Identifier extraction for this class's export lines
    pub fn extractor(&self) -> ExtractFn {
        extract_id
    }

    /// Output data file name (display name, lowercased, spaces → underscores)
    pub fn data_file_name(&self) -> String {
        format!(
            "{}.json",
            self.display_name().to_lowercase().replace(' ', "_")
        )
    }

    /// All classes, in export order
    pub fn all() -> &'static [EntityClass] {
        &[
            Self::Movie,
            Self::TvSeries,
            Self::Person,
            Self::Collection,
            Self::TvNetwork,
            Self::Keyword,
            Self::Company,
        ]
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
