//! HTTP retry helpers for transient errors.
//!
//! All fetchers should use [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so every request gets
//! automatic retry with exponential backoff for transient failures
//! (timeouts, connection resets, server errors, rate limiting).
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&params), &options.retry).await?;
//! ```
//!
//! Retries are kept short: the aggregator bounds every source call with
//! its own timeout, and a retry still in flight when that fires is simply
//! dropped.

use std::time::Duration;

use crate::SourceError;

/// Retry behaviour for a single logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each subsequent one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// The default backoff with `max_retries` extra attempts, or
    /// [`Self::none`] for zero.
    #[must_use]
    pub fn with_retries(max_retries: u32) -> Self {
        if max_retries == 0 {
            Self::none()
        } else {
            Self {
                max_retries,
                ..Self::default()
            }
        }
    }

    /// Backoff before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// Retries connection errors, timeouts, HTTP 429 and HTTP 5xx. HTTP 4xx
/// (other than 429) is permanent and returned immediately.
///
/// # Errors
///
/// Returns [`SourceError`] if the request still fails after all retries,
/// the server answers with a non-retryable status, or the body is not
/// valid JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    build_request: F,
    policy: &RetryPolicy,
) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, policy).await?;
    let url = response.url().to_string();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        log::error!(
            "JSON parse failed for {url} ({} bytes received): {e}",
            text.len()
        );
        SourceError::Json(e)
    })
}

/// Core retry loop. Returns the first successful (2xx/3xx) response.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let max_retries = policy.max_retries;
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(SourceError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if is_retryable_status(status) {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status} from {}", response.url());
                        attempt += 1;
                        continue;
                    }
                    return Err(SourceError::Normalization {
                        message: format!("HTTP {status} after {max_retries} retries"),
                    });
                }

                if status.is_client_error() {
                    return Err(SourceError::Normalization {
                        message: format!("HTTP {status}"),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Returns `true` for 429 Too Many Requests and any 5xx.
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
