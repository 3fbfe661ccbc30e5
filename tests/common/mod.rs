#![allow(dead_code)]

use std::sync::Arc;
use wiremock::MockServer;

use opsdash::api::ApiClient;
use opsdash::config::ApiConfig;
use opsdash::dashboard::Dashboard;
use opsdash::event::{self, Event, EventReceiver, Notification, NotificationLevel};
use opsdash::query::{QueryCache, RetryPolicy};
use opsdash::session::{MemorySessionStore, SessionStore};

pub const TOKEN: &str = "test-token";

pub struct Harness {
  pub dash: Dashboard,
  pub events: EventReceiver,
  pub session: Arc<MemorySessionStore>,
}

/// Dashboard pointed at `server`, signed in, without retry delays.
pub fn harness(server: &MockServer) -> Harness {
  harness_with(ApiConfig {
    base_url: server.uri(),
    ..Default::default()
  })
}

pub fn harness_with(config: ApiConfig) -> Harness {
  let session = Arc::new(MemorySessionStore::with_token(TOKEN));
  let (notifier, events) = event::channel();

  let store: Arc<dyn SessionStore> = session.clone();
  let client = ApiClient::new(&config, store, notifier.clone()).unwrap();
  let cache = QueryCache::new().with_retry(RetryPolicy::none());

  Harness {
    dash: Dashboard::new(client, cache, notifier),
    events,
    session,
  }
}

pub fn notifications(events: &mut EventReceiver) -> Vec<Notification> {
  events
    .drain()
    .into_iter()
    .filter_map(|e| match e {
      Event::Notification(n) => Some(n),
      Event::SignInRequired => None,
    })
    .collect()
}

pub fn success(message: &str) -> Notification {
  Notification {
    level: NotificationLevel::Success,
    message: message.to_string(),
  }
}

pub fn error(message: &str) -> Notification {
  Notification {
    level: NotificationLevel::Error,
    message: message.to_string(),
  }
}
