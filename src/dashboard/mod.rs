//! Per-resource read and write operations for the operations backend.
//!
//! Every resource follows the same shape: reads are [`Query`]s keyed in the
//! shared cache, writes go through [`mutate`] and invalidate the keys they
//! affect, reporting the outcome as a notification.

pub mod columns;
pub mod form;
pub mod integrations;
pub mod inventory;
pub mod keys;
pub mod kpi;
pub mod notes;
pub mod settings;
pub mod team;
pub mod technicians;
pub mod types;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::api::{ApiClient, ApiError};
use crate::config::Config;
use crate::event::Notifier;
use crate::query::{mutate, MutationSpec, Query, QueryCache, QueryKey, RetryPolicy};
use crate::session::SessionStore;

use keys::ResourceKey;

/// Owned query-string parameters captured by a fetcher
type OwnedParams = Vec<(&'static str, String)>;

/// Entry point to every dashboard resource.
///
/// Cheap to clone; all clones share one cache and one HTTP client.
#[derive(Clone)]
pub struct Dashboard {
  client: ApiClient,
  cache: QueryCache,
  notifier: Notifier,
}

impl Dashboard {
  pub fn new(client: ApiClient, cache: QueryCache, notifier: Notifier) -> Self {
    Self {
      client,
      cache,
      notifier,
    }
  }

  /// Build the client and cache from configuration.
  pub fn from_config(
    config: &Config,
    session: Arc<dyn SessionStore>,
    notifier: Notifier,
  ) -> Result<Self, ApiError> {
    let client = ApiClient::new(&config.api, session, notifier.clone())?;
    let cache = QueryCache::new()
      .with_stale_time(config.cache.stale_time())
      .with_retry(RetryPolicy::new(
        config.cache.max_retries,
        config.cache.retry_base(),
      ));
    Ok(Self::new(client, cache, notifier))
  }

  pub fn client(&self) -> &ApiClient {
    &self.client
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  pub fn notifier(&self) -> &Notifier {
    &self.notifier
  }

  pub fn inventory(&self) -> inventory::Inventory<'_> {
    inventory::Inventory::new(self)
  }

  pub fn technicians(&self) -> technicians::Technicians<'_> {
    technicians::Technicians::new(self)
  }

  pub fn notes(&self) -> notes::Notes<'_> {
    notes::Notes::new(self)
  }

  pub fn form(&self) -> form::InventoryForm<'_> {
    form::InventoryForm::new(self)
  }

  pub fn kpi(&self) -> kpi::Kpi<'_> {
    kpi::Kpi::new(self)
  }

  pub fn team(&self) -> team::TeamOptions<'_> {
    team::TeamOptions::new(self)
  }

  pub fn columns(&self) -> columns::Columns<'_> {
    columns::Columns::new(self)
  }

  pub fn settings(&self) -> settings::Settings<'_> {
    settings::Settings::new(self)
  }

  pub fn integrations(&self) -> integrations::Integrations<'_> {
    integrations::Integrations::new(self)
  }

  /// Query for a list endpoint; non-array bodies read as empty lists.
  pub(crate) fn list_query<T>(&self, key: ResourceKey, path: String, params: OwnedParams) -> Query<Vec<T>>
  where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
  {
    debug!(resource = %key.description(), "Building list query");
    let client = self.client.clone();
    Query::new(&self.cache, key.query_key(), move || {
      let client = client.clone();
      let path = path.clone();
      let params = params.clone();
      async move { client.get_list(&path, &params).await }
    })
  }

  /// Query for a single entity; a 404 is reported as `NotFound` naming `id`.
  pub(crate) fn entity_query<T>(
    &self,
    key: ResourceKey,
    resource: &'static str,
    id: String,
    path: String,
  ) -> Query<T>
  where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
  {
    debug!(resource = %key.description(), "Building entity query");
    let client = self.client.clone();
    Query::new(&self.cache, key.query_key(), move || {
      let client = client.clone();
      let id = id.clone();
      let path = path.clone();
      async move { client.get_one(resource, &id, &path).await }
    })
  }

  /// Query for a single JSON document
  pub(crate) fn value_query<T>(&self, key: ResourceKey, path: String) -> Query<T>
  where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
  {
    debug!(resource = %key.description(), "Building query");
    let client = self.client.clone();
    Query::new(&self.cache, key.query_key(), move || {
      let client = client.clone();
      let path = path.clone();
      async move { client.get(&path, &[]).await }
    })
  }

  /// Query that cannot run because a required parameter is missing.
  pub(crate) fn disabled_query<T>(&self, resource: &str) -> Query<T>
  where
    T: Clone + Send + Sync + 'static,
  {
    debug!(%resource, "Query disabled, missing parameters");
    Query::new(&self.cache, QueryKey::new(resource).with("disabled", ""), || async {
      Err(ApiError::Validation("Missing query parameters".to_string()))
    })
    .enabled(false)
  }

  /// Run a write that answers with the stored entity.
  ///
  /// Success is the HTTP status alone: the cache is invalidated and the toast
  /// shown before the body is read. A body that is empty or shaped
  /// differently yields `None`.
  pub(crate) async fn write<T, Fut>(
    &self,
    spec: MutationSpec,
    op: Fut,
  ) -> Result<Option<T>, ApiError>
  where
    T: DeserializeOwned,
    Fut: Future<Output = Result<Value, ApiError>>,
  {
    let body = mutate(&self.cache, &self.notifier, &spec, op).await?;
    Ok(written_entity(body))
  }

  /// Run a write whose response body is ignored.
  pub(crate) async fn write_ack<R, Fut>(
    &self,
    spec: MutationSpec,
    op: Fut,
  ) -> Result<(), ApiError>
  where
    Fut: Future<Output = Result<R, ApiError>>,
  {
    mutate(&self.cache, &self.notifier, &spec, op).await.map(|_| ())
  }
}

fn written_entity<T: DeserializeOwned>(body: Value) -> Option<T> {
  if body.is_null() {
    return None;
  }
  match serde_json::from_value(body) {
    Ok(entity) => Some(entity),
    Err(e) => {
      debug!("Write response did not hold the entity: {}", e);
      None
    }
  }
}

/// Reject blank required text before any request is made.
pub(crate) fn require(value: Option<&str>, what: &str) -> Result<(), ApiError> {
  match value.map(str::trim) {
    Some(v) if !v.is_empty() => Ok(()),
    _ => Err(ApiError::Validation(format!("{} is required", what))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_written_entity_tolerates_other_bodies() {
    let body = serde_json::json!({"id": "s1", "name": "Depot"});
    let store: Option<types::Store> = written_entity(body);
    assert_eq!(store.map(|s| s.id), Some("s1".to_string()));

    assert!(written_entity::<types::Store>(Value::Null).is_none());
    assert!(written_entity::<types::Store>(serde_json::json!({"ok": true})).is_none());
  }

  #[test]
  fn test_require_rejects_blank() {
    assert!(require(Some("Gloves"), "Name").is_ok());
    assert_eq!(
      require(Some("   "), "Name"),
      Err(ApiError::Validation("Name is required".to_string()))
    );
    assert!(require(None, "Name").is_err());
  }
}
