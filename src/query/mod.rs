//! Async query abstraction for data fetching with caching support.
//!
//! Inspired by TanStack Query: a `Query<T>` is the read side of a resource,
//! bound to a [`QueryKey`] in the shared [`QueryCache`]. Writes go through
//! [`mutate`], which invalidates keys on success; queries observing an
//! invalidated key refetch on their next `poll`.
//!
//! # Example
//!
//! ```ignore
//! let mut items = dashboard.inventory().items(None);
//! items.fetch();
//!
//! // In event loop tick
//! if items.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! match items.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle | QueryState::Disabled => {}
//! }
//! ```

mod cache;
mod key;
mod mutation;
mod optimistic;
mod retry;

pub use cache::{CacheEvent, CacheResult, CacheSource, ObserverGuard, QueryCache};
pub use key::QueryKey;
pub use mutation::{mutate, mutation_error_message, MutationSpec};
pub use optimistic::{Optimistic, ToggleOutcome};
pub use retry::RetryPolicy;

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::api::ApiError;

/// The state of a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// A required parameter is missing; the query will not run
  Disabled,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with a human-readable message
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn is_disabled(&self) -> bool {
    matches!(self, QueryState::Disabled)
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// Cached, invalidation-aware read of one resource key.
pub struct Query<T> {
  key: QueryKey,
  cache: QueryCache,
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ApiError>>>,
  events: broadcast::Receiver<CacheEvent>,
  _observer: ObserverGuard,
}

impl<T: Clone + Send + Sync + 'static> Query<T> {
  /// Create a query for `key`. The fetcher runs whenever the cache has no
  /// trusted entry for the key.
  pub fn new<F, Fut>(cache: &QueryCache, key: QueryKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Self {
      _observer: cache.observe(&key),
      events: cache.subscribe(),
      key,
      cache: cache.clone(),
      state: QueryState::Idle,
      fetcher: Arc::new(move || fetcher().boxed()),
      receiver: None,
    }
  }

  /// Disable the query when a required parameter is missing, so no
  /// partially-specified request is ever issued.
  pub fn enabled(mut self, enabled: bool) -> Self {
    self.state = if enabled {
      QueryState::Idle
    } else {
      QueryState::Disabled
    };
    self
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the data if the query succeeded.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn is_disabled(&self) -> bool {
    self.state.is_disabled()
  }

  /// Get the error message if the query failed.
  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Start fetching data if not already loading.
  ///
  /// No-op while loading or disabled.
  pub fn fetch(&mut self) {
    if self.state.is_loading() || self.state.is_disabled() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, dropping any pending result.
  pub fn refetch(&mut self) {
    if self.state.is_disabled() {
      return;
    }
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results and cache events without blocking.
  ///
  /// Returns `true` if the state changed. If this query's key was
  /// invalidated since the last poll, a refetch is started.
  pub fn poll(&mut self) -> bool {
    let mut changed = self.poll_result();

    if self.was_invalidated() {
      self.refetch();
      changed = true;
    }

    changed
  }

  /// Wait for the in-flight fetch, if any, and return the resulting state.
  pub async fn wait(&mut self) -> &QueryState<T> {
    if let Some(receiver) = self.receiver.as_mut() {
      let result = receiver.recv().await;
      self.receiver = None;
      self.apply(result);
    }
    &self.state
  }

  /// Fetch (or refetch when invalidated) and wait for the result.
  pub async fn load(&mut self) -> &QueryState<T> {
    self.poll();
    if !self.state.is_loading() && (self.cache.is_stale(&self.key) || !self.state.is_success()) {
      self.fetch();
    }
    self.wait().await
  }

  fn poll_result(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(result) => {
        self.receiver = None;
        self.apply(Some(result));
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.receiver = None;
        self.apply(None);
        true
      }
    }
  }

  fn apply(&mut self, result: Option<Result<T, ApiError>>) {
    self.state = match result {
      Some(Ok(data)) => QueryState::Success(data),
      Some(Err(error)) => QueryState::Error(error.user_message()),
      // Sender dropped without sending
      None => QueryState::Error("Query was cancelled".to_string()),
    };
  }

  fn was_invalidated(&mut self) -> bool {
    let mut invalidated = false;
    loop {
      match self.events.try_recv() {
        Ok(CacheEvent::Invalidated(prefix)) if self.key.starts_with(&prefix) => invalidated = true,
        Ok(_) => {}
        // Missed events may have included ours
        Err(broadcast::error::TryRecvError::Lagged(_)) => invalidated = true,
        Err(_) => break,
      }
    }

    // Never-started and disabled queries stay put
    invalidated && !matches!(self.state, QueryState::Idle | QueryState::Disabled)
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let cache = self.cache.clone();
    let key = self.key.clone();
    let fetcher = Arc::clone(&self.fetcher);
    // Taken now, while this query still observes the key
    let ticket = cache.begin_fetch(&key);
    tokio::spawn(async move {
      let result = cache
        .fetch_with(&key, ticket, || fetcher())
        .await
        .map(|r| r.data);
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  #[tokio::test]
  async fn test_query_success() {
    let cache = QueryCache::new();
    let mut query = Query::new(&cache, QueryKey::new("numbers"), || async {
      Ok::<_, ApiError>(vec![1, 2, 3])
    });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    // Wait for the result
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_success());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error_message() {
    let cache = QueryCache::new().with_retry(RetryPolicy::none());
    let mut query: Query<i32> = Query::new(&cache, QueryKey::new("broken"), || async {
      Err(ApiError::Status {
        status: 500,
        message: Some("Database unavailable".to_string()),
      })
    });

    query.fetch();
    query.wait().await;

    assert!(query.is_error());
    assert_eq!(query.error(), Some("Database unavailable"));
  }

  #[tokio::test]
  async fn test_disabled_query_never_fetches() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let mut query = Query::new(&cache, QueryKey::new("notes").with("member", ""), move || {
      let counter = counter.clone();
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, ApiError>(0)
      }
    })
    .enabled(false);

    query.fetch();
    query.refetch();
    query.load().await;

    assert!(query.is_disabled());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let cache = QueryCache::new();
    let mut query = Query::new(&cache, QueryKey::new("slow"), || async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok::<_, ApiError>(42)
    });

    query.fetch();
    assert!(query.is_loading());

    // Second fetch should be no-op
    query.fetch();
    assert!(query.is_loading());
  }

  #[tokio::test]
  async fn test_invalidation_triggers_refetch_on_poll() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let mut query = Query::new(&cache, QueryKey::new("items").with("category", "c1"), move || {
      let counter = counter.clone();
      async move { Ok::<_, ApiError>(counter.fetch_add(1, Ordering::SeqCst)) }
    });

    query.load().await;
    assert_eq!(query.data(), Some(&0));

    cache.invalidate(&QueryKey::new("items"));
    assert!(query.poll());
    assert!(query.is_loading());

    query.wait().await;
    assert_eq!(query.data(), Some(&1));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_unrelated_invalidation_is_ignored() {
    let cache = QueryCache::new();
    let mut query = Query::new(&cache, QueryKey::new("items"), || async {
      Ok::<_, ApiError>(1)
    });

    query.load().await;
    cache.invalidate(&QueryKey::new("notes"));

    assert!(!query.poll());
    assert!(query.is_success());
  }

  #[tokio::test]
  async fn test_read_in_flight_during_invalidation_is_refetched() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    let make = |calls: Arc<AtomicU32>| {
      Query::new(&cache, QueryKey::new("inventory-items"), move || {
        let calls = calls.clone();
        async move {
          let n = calls.fetch_add(1, Ordering::SeqCst);
          tokio::time::sleep(Duration::from_millis(50)).await;
          Ok::<_, ApiError>(n)
        }
      })
    };

    let mut first = make(calls.clone());
    first.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.invalidate(&QueryKey::new("inventory-items"));

    first.wait().await;
    assert_eq!(first.data(), Some(&0));
    assert!(cache.is_stale(first.key()));

    // A reader that missed the invalidation event still goes to the network
    let mut second = make(calls.clone());
    assert_eq!(second.load().await.data(), Some(&1));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_dropped_query_leaves_no_entry_behind() {
    let cache = QueryCache::new();
    let mut query = Query::new(&cache, QueryKey::new("inventory-stores"), || async {
      tokio::time::sleep(Duration::from_millis(30)).await;
      Ok::<_, ApiError>(1)
    });

    query.fetch();
    drop(query);
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert!(cache.is_empty());
  }

  #[tokio::test]
  async fn test_two_queries_share_one_entry() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    let make = |calls: Arc<AtomicU32>| {
      Query::new(&cache, QueryKey::new("stores"), move || {
        let calls = calls.clone();
        async move { Ok::<_, ApiError>(calls.fetch_add(1, Ordering::SeqCst)) }
      })
    };

    let mut first = make(calls.clone());
    let mut second = make(calls.clone());

    first.load().await;
    second.load().await;

    assert_eq!(first.data(), second.data());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    drop(first);
    drop(second);
    assert!(cache.is_empty());
  }
}
