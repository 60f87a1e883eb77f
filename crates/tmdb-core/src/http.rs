//! Blocking HTTP helpers over a shared async client.
//!
//! Uses async reqwest internally on a shared tokio runtime, but presents a
//! sync interface so plain worker threads can call it directly.

use std::io::{self, Read};
use std::sync::LazyLock;
use std::time::Duration;

use flate2::read::GzDecoder;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-request timeout; a stalled lookup counts as a transport error
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Idle connections kept per host (sized for a full worker pool)
const POOL_MAX_IDLE_PER_HOST: usize = 64;

/// Error types for HTTP operations
#[derive(Debug)]
pub enum HttpError {
    /// HTTP error with optional status code (`None` = transport failure)
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Response body could not be decoded
    Decode(io::Error),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
        }
    }
}

impl std::error::Error for HttpError {}

impl HttpError {
    /// Create HTTP error from reqwest error.
    ///
    /// The URL is stripped first: request URLs carry the API key as a query
    /// parameter and must never reach the logs.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        let e = e.without_url();
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Status code of the failed response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            Self::Decode(_) => None,
        }
    }

    /// Rate limiting (429), server errors (5xx), transport failures and
    /// zero/absent status codes are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => {
                matches!(status, None | Some(0) | Some(429) | Some(500..=599))
            }
            Self::Decode(_) => false,
        }
    }
}

impl From<io::Error> for HttpError {
    fn from(e: io::Error) -> Self {
        Self::Decode(e)
    }
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

async fn send(url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, HttpError> {
    http_client()
        .get(url)
        .query(query)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(HttpError::from_reqwest)
}

/// HTTP GET returning the body as text. Non-2xx statuses are errors.
///
/// Must not be called from inside an async context.
pub fn get_text(url: &str, query: &[(&str, &str)]) -> Result<String, HttpError> {
    SHARED_RUNTIME.handle().block_on(async {
        send(url, query)
            .await?
            .text()
            .await
            .map_err(HttpError::from_reqwest)
    })
}

/// HTTP GET returning the raw body bytes. Non-2xx statuses are errors.
pub fn get_bytes(url: &str, query: &[(&str, &str)]) -> Result<Vec<u8>, HttpError> {
    SHARED_RUNTIME.handle().block_on(async {
        let body = send(url, query)
            .await?
            .bytes()
            .await
            .map_err(HttpError::from_reqwest)?;
        Ok(body.to_vec())
    })
}

/// Decompress a complete gzip response body into memory.
///
/// A corrupt stream is an [`HttpError::Decode`].
pub fn gunzip(compressed: &[u8]) -> Result<Vec<u8>, HttpError> {
    let mut out = Vec::with_capacity(compressed.len() * 4);
    GzDecoder::new(compressed).read_to_end(&mut out)?;
    Ok(out)
}
