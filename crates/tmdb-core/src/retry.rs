//! Fixed-interval retry for remote lookups

use std::time::Duration;

use crate::http::HttpError;

/// Retry budget and spacing for a single remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = `max_retries + 1`)
    pub max_retries: u32,
    /// Pause between attempts; constant, not exponential
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 20,
            delay: Duration::from_millis(100),
        }
    }
}

/// Retry a fallible HTTP operation at a fixed interval.
///
/// On retryable errors (see [`HttpError::is_retryable`]), logs the failure,
/// sleeps for `policy.delay` and tries again, up to `policy.max_retries`
/// times. Returns the first success, or the final error on exhaustion or on
/// a non-retryable error.
pub fn retry_fixed<T>(
    label: &str,
    policy: &RetryPolicy,
    mut attempt_fn: impl FnMut() -> Result<T, HttpError>,
) -> Result<T, HttpError> {
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => {
                if attempt > 0 {
                    log::debug!("{label}: succeeded after {attempt} retries");
                }
                return Ok(v);
            }
            Err(e) if attempt < policy.max_retries && e.is_retryable() => {
                attempt += 1;
                log::debug!(
                    "{label}: attempt {attempt}/{} failed: {e}, retrying...",
                    policy.max_retries
                );
                std::thread::sleep(policy.delay);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            delay: Duration::from_millis(1),
        }
    }

    fn status(code: u16) -> HttpError {
        HttpError::Http {
            status: Some(code),
            message: "test".to_string(),
        }
    }

    #[test]
    fn default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_retries, 20);
        assert_eq!(p.delay, Duration::from_millis(100));
    }

    #[test]
    fn first_success_no_retry() {
        let mut calls = 0;
        let out = retry_fixed("t", &quick(3), || {
            calls += 1;
            Ok::<_, HttpError>(5)
        });
        assert_eq!(out.unwrap(), 5);
        assert_eq!(calls, 1);
    }

    #[test]
    fn recovers_after_rate_limit() {
        let mut calls = 0;
        let out = retry_fixed("t", &quick(3), || {
            calls += 1;
            if calls <= 2 { Err(status(429)) } else { Ok("body") }
        });
        assert_eq!(out.unwrap(), "body");
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_after_cap() {
        let mut calls = 0;
        let out: Result<(), _> = retry_fixed("t", &quick(4), || {
            calls += 1;
            Err(status(500))
        });
        assert_eq!(out.unwrap_err().status(), Some(500));
        assert_eq!(calls, 5);
    }

    #[test]
    fn non_retryable_fails_immediately() {
        let mut calls = 0;
        let out: Result<(), _> = retry_fixed("t", &quick(10), || {
            calls += 1;
            Err(status(404))
        });
        assert!(out.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn zero_retries_single_attempt() {
        let mut calls = 0;
        let out: Result<(), _> = retry_fixed("t", &quick(0), || {
            calls += 1;
            Err(status(503))
        });
        assert!(out.is_err());
        assert_eq!(calls, 1);
    }
}
