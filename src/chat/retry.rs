use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use tokio::time::sleep;

use crate::chat::error::ChatError;

/// Outbound request tuning shared by both transport paths.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub timeout_secs: Option<u64>,
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            retries: 0,
            retry_delay_ms: 500,
        }
    }
}

/// Posts `payload` to `url`, retrying transient failures with capped
/// exponential backoff. Returns the raw response on first success; the
/// caller decides how to read the body.
pub(crate) async fn post_with_retry<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    payload: &T,
    policy: RetryPolicy,
) -> Result<reqwest::Response, ChatError> {
    let max_attempts = policy.retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        let mut request = client.post(url).bearer_auth(api_key).json(payload);
        if let Some(timeout_secs) = policy.timeout_secs {
            request = request.timeout(Duration::from_secs(timeout_secs));
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();

                if is_retryable_status(status) && attempt + 1 < max_attempts {
                    sleep(retry_delay(attempt, policy.retry_delay_ms)).await;
                    attempt += 1;
                    continue;
                }

                return Err(ChatError::Api { status, body });
            }
            Err(source) => {
                if is_retryable_request_error(&source) && attempt + 1 < max_attempts {
                    sleep(retry_delay(attempt, policy.retry_delay_ms)).await;
                    attempt += 1;
                    continue;
                }

                return Err(ChatError::Request { source });
            }
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_request_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

fn retry_delay(attempt: u32, base_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(factor).min(30_000);
    Duration::from_millis(delay_ms)
}
