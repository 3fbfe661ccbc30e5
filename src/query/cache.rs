//! The query cache: an explicit key → entry map shared by every resource.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::retry::RetryPolicy;
use crate::api::ApiError;

/// Capacity of the cache event channel. Slow observers that fall further
/// behind than this just refetch on the lag notification.
const EVENT_CAPACITY: usize = 256;

/// Something that happened to a cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
  /// Every entry whose key starts with this prefix was marked stale
  Invalidated(QueryKey),
  /// Fresh data was stored under this exact key
  Updated(QueryKey),
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from the network
  Network,
  /// Served from a trusted cache entry
  Cache,
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
}

struct CacheEntry {
  data: Option<Arc<dyn Any + Send + Sync>>,
  fetched_at: Option<Instant>,
  invalidated: bool,
  /// Bumped on every invalidation
  generation: u64,
  observers: usize,
}

impl CacheEntry {
  fn empty() -> Self {
    Self {
      data: None,
      fetched_at: None,
      invalidated: false,
      generation: 0,
      observers: 0,
    }
  }
}

/// State of an entry when a fetch for it started.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FetchTicket {
  generation: u64,
  observed: bool,
}

/// Process-wide cache manager.
///
/// Cloning is cheap and every clone shares the same entries, so a single
/// instance is created at startup and handed to each resource.
#[derive(Clone)]
pub struct QueryCache {
  entries: Arc<Mutex<HashMap<QueryKey, CacheEntry>>>,
  events: broadcast::Sender<CacheEvent>,
  stale_time: Option<Duration>,
  retry: RetryPolicy,
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new()
  }
}

impl QueryCache {
  pub fn new() -> Self {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    Self {
      entries: Arc::new(Mutex::new(HashMap::new())),
      events,
      stale_time: None,
      retry: RetryPolicy::default(),
    }
  }

  /// Refetch entries older than `stale_time` even without an invalidation.
  pub fn with_stale_time(mut self, stale_time: Option<Duration>) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    self.retry
  }

  /// Subscribe to invalidation / update events.
  pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
    self.events.subscribe()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
    // Entries hold plain data, a panic elsewhere cannot leave them half-written
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn is_trusted(&self, entry: &CacheEntry) -> bool {
    if entry.data.is_none() || entry.invalidated {
      return false;
    }
    match (self.stale_time, entry.fetched_at) {
      (Some(stale_time), Some(fetched_at)) => fetched_at.elapsed() <= stale_time,
      (None, Some(_)) => true,
      (_, None) => false,
    }
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Trusted entry (fetched, not invalidated, not expired) → return it
  /// 2. Otherwise run `fetcher` through the retry policy
  /// 3. On success store the result; on failure leave the entry untouched
  ///
  /// A result that started before the latest invalidation of `key` is stored
  /// but stays stale, so the next read goes back to the network.
  pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<CacheResult<T>, ApiError>
  where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
  {
    let ticket = self.begin_fetch(key);
    self.fetch_with(key, ticket, fetcher).await
  }

  /// Take the ticket for a fetch that will run later, e.g. on a spawned task.
  pub(crate) fn begin_fetch(&self, key: &QueryKey) -> FetchTicket {
    let mut entries = self.lock();
    let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
    FetchTicket {
      generation: entry.generation,
      observed: entry.observers > 0,
    }
  }

  pub(crate) async fn fetch_with<T, F, Fut>(
    &self,
    key: &QueryKey,
    ticket: FetchTicket,
    fetcher: F,
  ) -> Result<CacheResult<T>, ApiError>
  where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
  {
    if let Some(data) = self.trusted_data::<T>(key) {
      debug!(%key, "Cache hit");
      return Ok(CacheResult {
        data,
        source: CacheSource::Cache,
      });
    }

    debug!(%key, "Cache miss, fetching");
    let data = match self.retry.run(fetcher).await {
      Ok(data) => data,
      Err(e) => {
        self.discard_unused(key);
        return Err(e);
      }
    };
    self.store_fetched(key, data.clone(), ticket);

    Ok(CacheResult {
      data,
      source: CacheSource::Network,
    })
  }

  fn trusted_data<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
    let entries = self.lock();
    let entry = entries.get(key)?;
    if !self.is_trusted(entry) {
      return None;
    }
    downcast(key, entry)
  }

  /// Last-known data for `key`, trusted or not.
  pub fn get_query_data<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
    let entries = self.lock();
    entries.get(key).and_then(|entry| downcast(key, entry))
  }

  /// Store data under `key` as freshly fetched.
  pub fn set_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey, data: T) {
    {
      let mut entries = self.lock();
      let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
      entry.data = Some(Arc::new(data));
      entry.fetched_at = Some(Instant::now());
      entry.invalidated = false;
    }
    let _ = self.events.send(CacheEvent::Updated(key.clone()));
  }

  fn store_fetched<T>(&self, key: &QueryKey, data: T, ticket: FetchTicket)
  where
    T: Send + Sync + 'static,
  {
    {
      let mut entries = self.lock();
      let observers = entries.get(key).map(|e| e.observers).unwrap_or(0);
      if ticket.observed && observers == 0 {
        debug!(%key, "Every observer left during the fetch, dropping result");
        entries.remove(key);
        return;
      }

      let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
      if entry.generation != ticket.generation {
        if !entry.invalidated {
          debug!(%key, "Newer data already stored, dropping result");
          return;
        }
        debug!(%key, "Fetched data predates the last invalidation, keeping entry stale");
      } else {
        entry.invalidated = false;
      }
      entry.data = Some(Arc::new(data));
      entry.fetched_at = Some(Instant::now());
    }
    let _ = self.events.send(CacheEvent::Updated(key.clone()));
  }

  /// Drop an entry that holds nothing and that nobody observes.
  fn discard_unused(&self, key: &QueryKey) {
    let mut entries = self.lock();
    if let Some(entry) = entries.get(key) {
      if entry.observers == 0 && entry.data.is_none() {
        entries.remove(key);
      }
    }
  }

  /// Mark every entry whose key starts with `prefix` as stale.
  ///
  /// Returns the number of entries marked. Observers of those keys are
  /// notified so they can refetch.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut count = 0;
    for (key, entry) in self.lock().iter_mut() {
      if key.starts_with(prefix) {
        entry.invalidated = true;
        entry.generation += 1;
        count += 1;
      }
    }
    debug!(%prefix, count, "Invalidated cache entries");
    let _ = self.events.send(CacheEvent::Invalidated(prefix.clone()));
    count
  }

  /// Whether `key` has no trusted data (missing, invalidated or expired).
  pub fn is_stale(&self, key: &QueryKey) -> bool {
    let entries = self.lock();
    entries.get(key).map(|e| !self.is_trusted(e)).unwrap_or(true)
  }

  pub fn remove(&self, key: &QueryKey) {
    self.lock().remove(key);
  }

  pub fn clear(&self) {
    self.lock().clear();
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  /// Register interest in `key`. The entry lives at least as long as the
  /// returned guard; when the last guard for a key drops, the entry is
  /// discarded.
  pub fn observe(&self, key: &QueryKey) -> ObserverGuard {
    {
      let mut entries = self.lock();
      let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
      entry.observers += 1;
    }
    ObserverGuard {
      cache: self.clone(),
      key: key.clone(),
    }
  }

  /// Number of live observers of `key`.
  pub fn observer_count(&self, key: &QueryKey) -> usize {
    self.lock().get(key).map(|e| e.observers).unwrap_or(0)
  }

  fn release(&self, key: &QueryKey) {
    let mut entries = self.lock();
    let remove = match entries.get_mut(key) {
      Some(entry) => {
        entry.observers = entry.observers.saturating_sub(1);
        entry.observers == 0
      }
      None => false,
    };
    if remove {
      debug!(%key, "Last observer gone, discarding entry");
      entries.remove(key);
    }
  }
}

fn downcast<T: Clone + 'static>(key: &QueryKey, entry: &CacheEntry) -> Option<T> {
  let data = entry.data.as_ref()?;
  match data.downcast_ref::<T>() {
    Some(value) => Some(value.clone()),
    None => {
      warn!(%key, "Cached data has a different type than requested");
      None
    }
  }
}

/// Keeps a cache entry alive while held.
pub struct ObserverGuard {
  cache: QueryCache,
  key: QueryKey,
}

impl ObserverGuard {
  pub fn key(&self) -> &QueryKey {
    &self.key
  }
}

impl Drop for ObserverGuard {
  fn drop(&mut self) {
    self.cache.release(&self.key);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  fn counting_fetcher(
    calls: &Arc<AtomicU32>,
  ) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = Result<Vec<u32>, ApiError>> + Send>> {
    let calls = calls.clone();
    move || {
      let calls = calls.clone();
      Box::pin(async move {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![n])
      })
    }
  }

  #[tokio::test]
  async fn test_second_read_served_from_cache() {
    let cache = QueryCache::new();
    let key = QueryKey::new("inventory-items");
    let calls = Arc::new(AtomicU32::new(0));

    let first = cache.fetch(&key, counting_fetcher(&calls)).await.unwrap();
    let second = cache.fetch(&key, counting_fetcher(&calls)).await.unwrap();

    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, vec![0]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_invalidate_forces_refetch() {
    let cache = QueryCache::new();
    let key = QueryKey::new("purchases").with("technician", "t1");
    let calls = Arc::new(AtomicU32::new(0));

    cache.fetch(&key, counting_fetcher(&calls)).await.unwrap();
    assert!(!cache.is_stale(&key));

    assert_eq!(cache.invalidate(&QueryKey::new("purchases")), 1);
    assert!(cache.is_stale(&key));

    let refreshed = cache.fetch(&key, counting_fetcher(&calls)).await.unwrap();
    assert_eq!(refreshed.source, CacheSource::Network);
    assert_eq!(refreshed.data, vec![1]);
    assert!(!cache.is_stale(&key));
  }

  #[tokio::test]
  async fn test_invalidate_only_touches_matching_prefix() {
    let cache = QueryCache::new();
    let t1 = QueryKey::new("purchases").with("technician", "t1");
    let t2 = QueryKey::new("purchases").with("technician", "t2");
    cache.set_query_data(&t1, 1u32);
    cache.set_query_data(&t2, 2u32);

    assert_eq!(cache.invalidate(&t1), 1);
    assert!(cache.is_stale(&t1));
    assert!(!cache.is_stale(&t2));
  }

  #[tokio::test]
  async fn test_failed_fetch_keeps_previous_data() {
    let cache = QueryCache::new().with_retry(RetryPolicy::none());
    let key = QueryKey::new("kpi-metrics");
    cache.set_query_data(&key, vec!["revenue".to_string()]);
    cache.invalidate(&key);

    let result = cache
      .fetch(&key, || async {
        Err::<Vec<String>, _>(ApiError::Network("down".to_string()))
      })
      .await;

    assert!(result.is_err());
    assert_eq!(
      cache.get_query_data::<Vec<String>>(&key),
      Some(vec!["revenue".to_string()])
    );
  }

  #[tokio::test]
  async fn test_zero_stale_time_always_refetches() {
    let cache = QueryCache::new().with_stale_time(Some(Duration::ZERO));
    let key = QueryKey::new("settings");
    let calls = Arc::new(AtomicU32::new(0));

    cache.fetch(&key, counting_fetcher(&calls)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    cache.fetch(&key, counting_fetcher(&calls)).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn test_type_mismatch_is_a_miss() {
    let cache = QueryCache::new();
    let key = QueryKey::new("columns");
    cache.set_query_data(&key, 5u32);
    assert_eq!(cache.get_query_data::<String>(&key), None);
    assert_eq!(cache.get_query_data::<u32>(&key), Some(5));
  }

  #[test]
  fn test_entry_discarded_when_last_observer_drops() {
    let cache = QueryCache::new();
    let key = QueryKey::new("inventory-stores");

    let a = cache.observe(&key);
    let b = cache.observe(&key);
    cache.set_query_data(&key, vec![1u32]);
    assert_eq!(cache.observer_count(&key), 2);

    drop(a);
    assert_eq!(cache.get_query_data::<Vec<u32>>(&key), Some(vec![1]));

    drop(b);
    assert_eq!(cache.get_query_data::<Vec<u32>>(&key), None);
    assert!(cache.is_empty());
  }

  #[tokio::test]
  async fn test_response_older_than_invalidation_stays_stale() {
    let cache = QueryCache::new();
    let key = QueryKey::new("inventory-items");

    let slow = {
      let cache = cache.clone();
      let key = key.clone();
      tokio::spawn(async move {
        cache
          .fetch(&key, || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, ApiError>(0u32)
          })
          .await
      })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(cache.invalidate(&key), 1);

    let landed = slow.await.unwrap().unwrap();
    assert_eq!(landed.data, 0);
    assert!(cache.is_stale(&key));

    let refreshed = cache
      .fetch(&key, || async { Ok::<_, ApiError>(1u32) })
      .await
      .unwrap();
    assert_eq!(refreshed.source, CacheSource::Network);
    assert_eq!(refreshed.data, 1);
    assert!(!cache.is_stale(&key));
  }

  #[test]
  fn test_older_response_never_replaces_newer_data() {
    let cache = QueryCache::new();
    let key = QueryKey::new("kpi-metrics");
    let ticket = cache.begin_fetch(&key);

    cache.invalidate(&key);
    cache.set_query_data(&key, 2u32);
    cache.store_fetched(&key, 1u32, ticket);

    assert_eq!(cache.get_query_data::<u32>(&key), Some(2));
    assert!(!cache.is_stale(&key));
  }

  #[tokio::test]
  async fn test_result_for_abandoned_key_is_dropped() {
    let cache = QueryCache::new();
    let key = QueryKey::new("inventory-stores");
    let guard = cache.observe(&key);
    let ticket = cache.begin_fetch(&key);
    drop(guard);

    let result = cache
      .fetch_with(&key, ticket, || async { Ok::<_, ApiError>(1u32) })
      .await
      .unwrap();

    assert_eq!(result.data, 1);
    assert!(cache.is_empty());
  }

  #[tokio::test]
  async fn test_failed_first_fetch_leaves_no_entry() {
    let cache = QueryCache::new().with_retry(RetryPolicy::none());
    let key = QueryKey::new("columns");

    let result = cache
      .fetch(&key, || async {
        Err::<u32, _>(ApiError::Network("down".to_string()))
      })
      .await;

    assert!(result.is_err());
    assert!(cache.is_empty());
  }

  #[tokio::test]
  async fn test_invalidate_broadcasts_event() {
    let cache = QueryCache::new();
    let mut events = cache.subscribe();
    let prefix = QueryKey::new("inventory-notes");

    cache.invalidate(&prefix);

    assert_eq!(events.recv().await.unwrap(), CacheEvent::Invalidated(prefix));
  }
}
