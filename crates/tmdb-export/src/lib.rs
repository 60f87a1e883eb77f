//! tmdb-export - Bulk export of TMDB entities
//!
//! For each entity class, downloads the daily ID export and looks up every
//! listed identifier against the TMDB API, writing one NDJSON line per
//! identifier.
//!
//! # Pipeline
//!
//! 1. Resolve the export date and acquire each selected class's ID export
//! 2. Stream identifiers through a chunked worker pool ([`pipeline`])
//! 3. Write responses in completion order, chunk after chunk, to
//!    `<output>/<class>.json`

pub mod config;
pub mod error;
pub mod lookup;
pub mod pipeline;
pub mod record;
pub mod runner;
pub mod sink;
pub mod snapshot;
pub mod state;

pub use config::{Config, DEFAULT_API_URL, DEFAULT_EXPORT_URL};
pub use error::{Stage, StageError};
pub use lookup::RemoteLookup;
pub use pipeline::{
    ChunkReport, DEFAULT_CHUNK_SIZE, DEFAULT_WORKERS, IdReader, PipelineStats, PoolConfig,
    run_pipeline,
};
pub use record::{IdentifierRecord, extract_id, parse_record};
pub use runner::{ClassSummary, RunSummary, export_class, prepare_output_dir, run};
pub use sink::NdjsonSink;
pub use snapshot::{SnapshotDescriptor, acquire_snapshot, export_file_name, resolve_export_date};
pub use state::EntityClass;
