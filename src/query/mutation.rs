//! Write side: run a single remote write and reconcile the cache afterwards.

use std::future::Future;
use tracing::{info, warn};

use super::cache::QueryCache;
use super::key::QueryKey;
use crate::api::ApiError;
use crate::event::Notifier;

/// What a write touches and how to report it.
#[derive(Debug, Clone)]
pub struct MutationSpec {
  /// Key prefixes to mark stale once the write succeeds
  pub invalidates: Vec<QueryKey>,
  /// Toast shown on success
  pub success: String,
  /// Resource-specific fallback toast when the server gives no message
  pub error: String,
}

impl MutationSpec {
  pub fn new(success: impl Into<String>, error: impl Into<String>) -> Self {
    Self {
      invalidates: Vec::new(),
      success: success.into(),
      error: error.into(),
    }
  }

  pub fn invalidates(mut self, key: QueryKey) -> Self {
    self.invalidates.push(key);
    self
  }
}

/// Message for a failed write: the server's text, then the resource default,
/// then whatever the transport said.
pub fn mutation_error_message(err: &ApiError, default: &str) -> String {
  if let ApiError::Validation(message) = err {
    return message.clone();
  }
  if let Some(message) = err.server_message() {
    return message.to_string();
  }
  if !default.trim().is_empty() {
    return default.to_string();
  }
  err.user_message()
}

/// Run `op`; on success invalidate every key in `spec` and notify, on failure
/// notify and leave the cache alone.
pub async fn mutate<T, Fut>(
  cache: &QueryCache,
  notifier: &Notifier,
  spec: &MutationSpec,
  op: Fut,
) -> Result<T, ApiError>
where
  Fut: Future<Output = Result<T, ApiError>>,
{
  match op.await {
    Ok(value) => {
      for key in &spec.invalidates {
        cache.invalidate(key);
      }
      info!(message = %spec.success, "Write succeeded");
      if !spec.success.is_empty() {
        notifier.success(spec.success.clone());
      }
      Ok(value)
    }
    Err(err) => {
      warn!("Write failed: {}", err);
      notifier.error(mutation_error_message(&err, &spec.error));
      Err(err)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::event::{self, Event, Notification, NotificationLevel};

  fn spec() -> MutationSpec {
    MutationSpec::new("Item updated", "Failed to update item")
      .invalidates(QueryKey::new("inventory-items"))
  }

  #[tokio::test]
  async fn test_success_invalidates_and_notifies() {
    let cache = QueryCache::new();
    let (notifier, mut events) = event::channel();
    let key = QueryKey::new("inventory-items").with("category", "c1");
    cache.set_query_data(&key, vec![1u32]);

    let result = mutate(&cache, &notifier, &spec(), async { Ok::<_, ApiError>(5) }).await;

    assert_eq!(result.unwrap(), 5);
    assert!(cache.is_stale(&key));
    assert_eq!(
      events.try_next(),
      Some(Event::Notification(Notification {
        level: NotificationLevel::Success,
        message: "Item updated".to_string(),
      }))
    );
  }

  #[tokio::test]
  async fn test_failure_keeps_cache_and_uses_server_message() {
    let cache = QueryCache::new();
    let (notifier, mut events) = event::channel();
    let key = QueryKey::new("inventory-items");
    cache.set_query_data(&key, vec![1u32]);

    let result: Result<(), _> = mutate(&cache, &notifier, &spec(), async {
      Err(ApiError::Status {
        status: 409,
        message: Some("Item is referenced by a purchase".to_string()),
      })
    })
    .await;

    assert!(result.is_err());
    assert!(!cache.is_stale(&key));
    assert_eq!(cache.get_query_data::<Vec<u32>>(&key), Some(vec![1]));
    assert_eq!(
      events.try_next(),
      Some(Event::Notification(Notification {
        level: NotificationLevel::Error,
        message: "Item is referenced by a purchase".to_string(),
      }))
    );
  }

  #[test]
  fn test_error_message_fallback_chain() {
    let bare = ApiError::Status {
      status: 500,
      message: None,
    };
    assert_eq!(mutation_error_message(&bare, "Failed to save"), "Failed to save");
    assert_eq!(
      mutation_error_message(&bare, ""),
      "Request failed with status 500"
    );
    assert_eq!(
      mutation_error_message(&ApiError::Validation("Name is required".to_string()), "x"),
      "Name is required"
    );
  }
}
