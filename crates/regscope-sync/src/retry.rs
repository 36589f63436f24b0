//! Retry with exponential backoff for eCFR HTTP calls.
//!
//! Retries transport failures (connection refused, timeouts) and the
//! transient statuses 429/500/502/503/504. Anything else is returned on the
//! first attempt.

use std::time::Duration;

use reqwest::StatusCode;

/// Status codes worth another attempt.
const RETRY_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// How many times to retry and how long to wait first.
///
/// Delays double per attempt: with the default policy 1s → 2s → 4s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

pub(crate) fn is_retryable(status: StatusCode) -> bool {
    RETRY_STATUSES.contains(&status)
}

/// Send an HTTP request, retrying per `policy`.
///
/// The closure `f` is called up to `max_retries + 1` times. The final
/// attempt's outcome is returned as-is, so a response carrying a retryable
/// status can still come back; the caller inspects the status code.
pub(crate) async fn send_with_retry<F, Fut>(
    policy: RetryPolicy,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..policy.max_retries {
        let delay = policy.delay(attempt);
        match f().await {
            Ok(resp) if !is_retryable(resp.status()) => return Ok(resp),
            Ok(resp) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    status = resp.status().as_u16(),
                    "eCFR returned transient status, retrying in {delay:?}"
                );
            }
            Err(e) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    "eCFR request failed, retrying in {delay:?}: {e}"
                );
            }
        }
        tokio::time::sleep(delay).await;
    }
    f().await
}
