use reqwest::{header, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::api_types::{extract_server_message, normalize_list, parse_body};
use crate::api::error::ApiError;
use crate::config::{ApiConfig, DEFAULT_INTEGRATION_PREFIX};
use crate::event::Notifier;
use crate::session::SessionStore;

/// Query-string parameters for a request
pub type Params<'a> = &'a [(&'a str, String)];

/// How a request is authenticated
#[derive(Clone, Copy)]
enum Auth<'a> {
  /// Bearer token from the session store
  Session,
  /// Public form endpoints: access key in the query string, no token
  AccessKey(&'a str),
}

/// What a 404 should turn into
struct NotFoundAs<'a> {
  resource: &'static str,
  id: &'a str,
}

/// REST client for the operations backend
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: String,
  integration_prefixes: Arc<Vec<String>>,
  session: Arc<dyn SessionStore>,
  notifier: Notifier,
}

impl ApiClient {
  pub fn new(
    config: &ApiConfig,
    session: Arc<dyn SessionStore>,
    notifier: Notifier,
  ) -> Result<Self, ApiError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let http = builder
      .build()
      .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      http,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      integration_prefixes: Arc::new(config.integration_prefixes.clone()),
      session,
      notifier,
    })
  }

  /// The session store this client reads its token from
  pub fn session(&self) -> &Arc<dyn SessionStore> {
    &self.session
  }

  /// GET a JSON document
  pub async fn get<T: DeserializeOwned>(
    &self,
    path: &str,
    params: Params<'_>,
  ) -> Result<T, ApiError> {
    let value = self
      .send::<()>(Method::GET, path, params, None, Auth::Session, None)
      .await?;
    decode(value)
  }

  /// GET a list endpoint, normalizing non-array bodies to an empty list
  pub async fn get_list<T: DeserializeOwned>(
    &self,
    path: &str,
    params: Params<'_>,
  ) -> Result<Vec<T>, ApiError> {
    let value = self
      .send::<()>(Method::GET, path, params, None, Auth::Session, None)
      .await?;
    normalize_list(value)
  }

  /// GET a single entity; a 404 becomes `ApiError::NotFound` naming `id`
  pub async fn get_one<T: DeserializeOwned>(
    &self,
    resource: &'static str,
    id: &str,
    path: &str,
  ) -> Result<T, ApiError> {
    let value = self
      .send::<()>(
        Method::GET,
        path,
        &[],
        None,
        Auth::Session,
        Some(NotFoundAs { resource, id }),
      )
      .await?;
    decode(value)
  }

  /// Write helpers return the raw body: a 2xx is success whatever it holds
  pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
    self
      .send(Method::POST, path, &[], Some(body), Auth::Session, None)
      .await
  }

  pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
    self
      .send(Method::PUT, path, &[], Some(body), Auth::Session, None)
      .await
  }

  pub async fn patch<B: Serialize + ?Sized>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<Value, ApiError> {
    self
      .send(Method::PATCH, path, &[], Some(body), Auth::Session, None)
      .await
  }

  pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
    self
      .send::<()>(Method::DELETE, path, &[], None, Auth::Session, None)
      .await?;
    Ok(())
  }

  /// GET a public, key-authenticated endpoint
  pub async fn public_get<T: DeserializeOwned>(
    &self,
    path: &str,
    access_key: &str,
  ) -> Result<T, ApiError> {
    let value = self
      .send::<()>(Method::GET, path, &[], None, Auth::AccessKey(access_key), None)
      .await?;
    decode(value)
  }

  /// POST to a public, key-authenticated endpoint
  pub async fn public_post<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    path: &str,
    access_key: &str,
    body: &B,
  ) -> Result<T, ApiError> {
    let value = self
      .send(
        Method::POST,
        path,
        &[],
        Some(body),
        Auth::AccessKey(access_key),
        None,
      )
      .await?;
    decode(value)
  }

  async fn send<B: Serialize + ?Sized>(
    &self,
    method: Method,
    path: &str,
    params: Params<'_>,
    body: Option<&B>,
    auth: Auth<'_>,
    not_found: Option<NotFoundAs<'_>>,
  ) -> Result<Value, ApiError> {
    let url = format!("{}{}", self.base_url, path);
    debug!(%method, %path, "Sending request");

    let mut request = self
      .http
      .request(method.clone(), &url)
      .header(header::ACCEPT, "application/json")
      .query(params);

    match auth {
      Auth::Session => {
        let token = self
          .session
          .token()
          .map_err(|e| ApiError::Session(e.to_string()))?;
        if let Some(token) = token {
          request = request.bearer_auth(token);
        }
      }
      Auth::AccessKey(key) => {
        request = request.query(&[("key", key)]);
      }
    }

    if let Some(body) = body {
      request = request.json(body);
    }

    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
      return match parse_body(&text) {
        // A write's status is its answer; the body is only a courtesy
        Err(e) if method != Method::GET => {
          debug!(%path, "Write response body is not JSON: {}", e);
          Ok(Value::Null)
        }
        parsed => parsed,
      };
    }

    Err(self.classify_failure(path, status, &text, auth, not_found))
  }

  fn classify_failure(
    &self,
    path: &str,
    status: StatusCode,
    body: &str,
    auth: Auth<'_>,
    not_found: Option<NotFoundAs<'_>>,
  ) -> ApiError {
    match (status, auth) {
      (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, Auth::AccessKey(_)) => {
        ApiError::InvalidAccessKey
      }
      (StatusCode::UNAUTHORIZED, Auth::Session) => {
        if self.is_integration_path(path) {
          debug!(%path, "Integration endpoint reports not connected");
          return ApiError::IntegrationNotConnected {
            path: path.to_string(),
          };
        }
        self.expire_session();
        ApiError::Unauthorized
      }
      (StatusCode::NOT_FOUND, _) => match not_found {
        Some(NotFoundAs { resource, id }) => ApiError::NotFound {
          resource,
          id: id.to_string(),
        },
        None => status_error(status, body),
      },
      _ => status_error(status, body),
    }
  }

  /// Path of `endpoint` for `provider` under the first configured
  /// integration prefix, so its 401s read as "not connected".
  pub fn integration_path(&self, provider: &str, endpoint: &str) -> String {
    let prefix = self
      .integration_prefixes
      .first()
      .map(String::as_str)
      .unwrap_or(DEFAULT_INTEGRATION_PREFIX);
    format!("{}/{}/{}", prefix.trim_end_matches('/'), provider, endpoint)
  }

  fn is_integration_path(&self, path: &str) -> bool {
    self
      .integration_prefixes
      .iter()
      .any(|prefix| path.starts_with(prefix.as_str()))
  }

  /// Drop the stored token and ask the front end to send the user to sign-in.
  fn expire_session(&self) {
    warn!("Session rejected by server, clearing stored token");
    if let Err(e) = self.session.clear() {
      warn!("Failed to clear session token: {}", e);
    }
    self.notifier.sign_in_required();
  }
}

fn status_error(status: StatusCode, body: &str) -> ApiError {
  ApiError::Status {
    status: status.as_u16(),
    message: extract_server_message(body),
  }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
  serde_json::from_value(value).map_err(ApiError::from)
}
