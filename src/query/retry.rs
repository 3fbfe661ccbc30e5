//! Retry policy for cache-backed reads.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::api::ApiError;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Bounded retry with exponential backoff.
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
  pub fn new(max_retries: u32, base_delay: Duration) -> Self {
    Self {
      max_retries,
      base_delay,
    }
  }

  /// Never retry.
  pub fn none() -> Self {
    Self::new(0, Duration::ZERO)
  }

  /// Whether a failure is worth another attempt.
  ///
  /// Missing entities, rejected credentials and malformed payloads will not
  /// change on retry.
  pub fn should_retry(&self, err: &ApiError) -> bool {
    !matches!(
      err,
      ApiError::NotFound { .. }
        | ApiError::Unauthorized
        | ApiError::IntegrationNotConnected { .. }
        | ApiError::InvalidAccessKey
        | ApiError::Validation(_)
        | ApiError::Decode(_)
        | ApiError::Session(_)
    )
  }

  /// Delay before retry number `attempt` (0-based).
  pub fn delay(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
  }

  /// Run `op` until it succeeds, fails permanently or runs out of retries.
  pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, ApiError>
  where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
  {
    let mut attempt = 0;
    loop {
      match op().await {
        Ok(value) => return Ok(value),
        Err(err) if attempt < self.max_retries && self.should_retry(&err) => {
          let delay = self.delay(attempt);
          warn!(attempt = attempt + 1, ?delay, "Request failed, retrying: {}", err);
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(err) => return Err(err),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  #[test]
  fn test_backoff_doubles_and_caps() {
    let policy = RetryPolicy::new(10, Duration::from_secs(1));
    assert_eq!(policy.delay(0), Duration::from_secs(1));
    assert_eq!(policy.delay(1), Duration::from_secs(2));
    assert_eq!(policy.delay(3), Duration::from_secs(8));
    assert_eq!(policy.delay(10), MAX_BACKOFF);
  }

  #[tokio::test]
  async fn test_not_found_is_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let policy = RetryPolicy::new(3, Duration::ZERO);

    let result: Result<(), _> = policy
      .run(|| {
        let calls = calls.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          Err(ApiError::NotFound {
            resource: "Technician",
            id: "t1".to_string(),
          })
        }
      })
      .await;

    assert!(result.unwrap_err().is_not_found());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_transient_failure_retried_until_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let policy = RetryPolicy::new(3, Duration::ZERO);

    let result = policy
      .run(|| {
        let calls = calls.clone();
        async move {
          if calls.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(ApiError::Network("reset".to_string()))
          } else {
            Ok(7)
          }
        }
      })
      .await;

    assert_eq!(result.unwrap(), 7);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_retries_are_bounded() {
    let calls = Arc::new(AtomicU32::new(0));
    let policy = RetryPolicy::new(2, Duration::ZERO);

    let result: Result<(), _> = policy
      .run(|| {
        let calls = calls.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          Err(ApiError::Status {
            status: 503,
            message: None,
          })
        }
      })
      .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }
}
