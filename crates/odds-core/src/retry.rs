use std::future::Future;
use std::time::Duration;

use odds_client::ClientError;
use serde::{Deserialize, Serialize};

const RETRY_BACKOFF_MS: &[u64] = &[250, 1_000, 4_000, 10_000];

pub fn retry_backoff_ms(consecutive_errors: u32) -> u64 {
    let idx = (consecutive_errors.saturating_sub(1) as usize).min(RETRY_BACKOFF_MS.len() - 1);
    RETRY_BACKOFF_MS[idx]
}

fn default_max_attempts() -> u32 {
    1
}

/// Bounded retry for idempotent reads. Only retryable errors (rate limits,
/// server errors, timeouts, connection failures) are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

impl RetryPolicy {
    pub fn single_attempt() -> Self {
        Self::default()
    }

    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = retry_backoff_ms(attempt);
                    tracing::warn!(
                        request = label,
                        attempt,
                        delay_ms = delay,
                        "retrying after error: {e}"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
