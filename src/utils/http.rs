//! Bounded retry for outbound HTTP requests.

use reqwest::{Response, StatusCode};
use std::future::Future;
use std::time::Duration;

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry `task` on network errors, 429 and 5xx responses with doubling
/// backoff, honoring a numeric `Retry-After` header when present.
/// Non-retryable statuses are returned as-is for the caller to interpret;
/// so is the final response/error once retries are exhausted.
pub async fn request_with_retry<F, Fut>(
    mut task: F,
    max_retries: u32,
) -> Result<Response, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 0;
    loop {
        match task().await {
            Ok(response) => {
                let status = response.status();
                let retryable =
                    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                if !retryable || attempt >= max_retries {
                    return Ok(response);
                }
                let wait = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(backoff);
                tracing::warn!(
                    "[HTTP] status {}, retrying in {:?} ({}/{})",
                    status,
                    wait,
                    attempt + 1,
                    max_retries
                );
                tokio::time::sleep(wait).await;
            }
            Err(e) => {
                if attempt >= max_retries {
                    return Err(e);
                }
                tracing::warn!(
                    "[HTTP] network error: {}, retrying in {:?} ({}/{})",
                    e,
                    backoff,
                    attempt + 1,
                    max_retries
                );
                tokio::time::sleep(backoff).await;
            }
        }
        attempt += 1;
        backoff = std::cmp::min(backoff * 2, MAX_BACKOFF);
    }
}
