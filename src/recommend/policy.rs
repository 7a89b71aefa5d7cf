use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppError;

/// Literal markers a response must contain before it is worth parsing.
pub const REQUIRED_MARKERS: [&str; 3] = ["BEST SIZE:", "CONFIDENCE:", "REASONING:"];

pub fn has_required_markers(response: &str) -> bool {
    REQUIRED_MARKERS.iter().all(|m| response.contains(m))
}

/// Bounded retry for structurally invalid or failed generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Pause between attempts. Swapped out in tests so no real time passes.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Call `generate` until it returns text carrying every required marker.
///
/// `generate` is invoked fresh for each attempt. A response missing markers
/// counts as a failed attempt; fatal errors (cancellation) return immediately.
/// After the last attempt the most recent failure is returned.
pub async fn generate_with_retry<F, Fut>(
    mut generate: F,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<String, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, AppError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        let error = match generate().await {
            Ok(response) if has_required_markers(&response) => return Ok(response),
            Ok(response) => AppError::InvalidAiResponseFormat(format!(
                "response missing required sections ({} chars)",
                response.len()
            )),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => e,
        };

        log::warn!(
            "[generate] Attempt {}/{} failed: {}",
            attempt,
            max_attempts,
            error
        );
        last_error = Some(error);

        if attempt < max_attempts {
            sleeper.sleep(policy.delay).await;
        }
    }

    Err(last_error.unwrap_or_else(|| {
        AppError::InvalidAiResponseFormat("all generation attempts exhausted".into())
    }))
}
