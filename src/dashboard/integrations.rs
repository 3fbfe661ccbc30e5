//! Third-party integration status.
//!
//! The backend answers 401 on an integration path when the account has not
//! connected that provider. That is a normal state here, not a failure.

use serde::Deserialize;
use tracing::debug;

use crate::api::ApiError;
use crate::query::Query;

use super::keys::ResourceKey;
use super::types::IntegrationStatus;
use super::Dashboard;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
  #[serde(default)]
  connected: bool,
  account: Option<String>,
}

impl From<StatusBody> for IntegrationStatus {
  fn from(body: StatusBody) -> Self {
    if body.connected {
      IntegrationStatus::Connected {
        account: body.account,
      }
    } else {
      IntegrationStatus::NotConnected
    }
  }
}

pub struct Integrations<'a> {
  dash: &'a Dashboard,
}

impl<'a> Integrations<'a> {
  pub(super) fn new(dash: &'a Dashboard) -> Self {
    Self { dash }
  }

  pub fn status(&self, provider: &str) -> Query<IntegrationStatus> {
    let key = ResourceKey::Integration {
      provider: provider.to_string(),
    };
    let client = self.dash.client().clone();
    let path = client.integration_path(provider, "status");

    Query::new(self.dash.cache(), key.query_key(), move || {
      let client = client.clone();
      let path = path.clone();
      async move {
        match client.get::<StatusBody>(&path, &[]).await {
          Ok(body) => Ok(body.into()),
          Err(ApiError::IntegrationNotConnected { path }) => {
            debug!(%path, "Integration not connected");
            Ok(IntegrationStatus::NotConnected)
          }
          Err(err) => Err(err),
        }
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_status_body_maps_to_status() {
    let body: StatusBody =
      serde_json::from_value(json!({"connected": true, "account": "shop@example.com"})).unwrap();
    assert_eq!(
      IntegrationStatus::from(body),
      IntegrationStatus::Connected {
        account: Some("shop@example.com".to_string())
      }
    );

    let body: StatusBody = serde_json::from_value(json!({})).unwrap();
    assert_eq!(IntegrationStatus::from(body), IntegrationStatus::NotConnected);
  }
}
