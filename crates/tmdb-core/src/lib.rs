//! tmdb-core - Common infrastructure for the TMDB bulk exporter
//!
//! Shared HTTP client and runtime, retry policy, logging bridge and
//! progress display used by the export pipeline and the CLI.

pub mod http;
pub mod logging;
pub mod progress;
pub mod retry;

// Re-exports for convenience
pub use http::{HttpError, SHARED_RUNTIME, get_bytes, get_text, gunzip, http_client};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, fmt_num};
pub use retry::{RetryPolicy, retry_fixed};
