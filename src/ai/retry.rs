use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};

use crate::error::AppError;

/// Rate limits, gateway hiccups and Anthropic's 529 "overloaded".
const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 529];

/// Longest single wait, reached on the seventh retry.
const MAX_BACKOFF_EXPONENT: u32 = 6;

fn is_transient(status: StatusCode) -> bool {
    TRANSIENT_STATUSES.contains(&status.as_u16())
}

/// Wait before HTTP retry number `retry` (0-based): 1s, 2s, 4s, ...
pub fn backoff_delay(retry: u32) -> Duration {
    Duration::from_secs(1 << retry.min(MAX_BACKOFF_EXPONENT))
}

fn api_error(provider: &str, status: StatusCode, body: &str) -> String {
    format!("{} API error ({}): {}", provider, status, body)
}

/// POST through `build_request` until a success status, retrying only the
/// transient statuses up to `max_retries` extra times.
///
/// Connection failures surface immediately; the generation policy above decides
/// whether to try again.
pub async fn send_with_retry(
    build_request: impl Fn() -> RequestBuilder,
    provider: &str,
    max_retries: u32,
) -> Result<Response, AppError> {
    let mut retry = 0;
    loop {
        let response = build_request()
            .send()
            .await
            .map_err(|e| AppError::AiProviderError(format!("{} request failed: {}", provider, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !is_transient(status) || retry >= max_retries {
            return Err(AppError::AiProviderError(api_error(provider, status, &body)));
        }

        let delay = backoff_delay(retry);
        retry += 1;
        log::warn!(
            "[{}] HTTP {} on try {}/{}, waiting {:?}",
            provider,
            status,
            retry,
            max_retries + 1,
            delay
        );
        tokio::time::sleep(delay).await;
    }
}
