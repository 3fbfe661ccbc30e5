use thiserror::Error;

/// Generic fallback shown when neither the server nor the transport gives
/// anything more useful.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Errors surfaced by the HTTP layer and everything built on top of it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  /// The request never produced an HTTP response (DNS, connect, timeout...)
  #[error("Network error: {0}")]
  Network(String),

  /// A single-entity fetch came back 404
  #[error("{resource} {id} not found")]
  NotFound { resource: &'static str, id: String },

  /// The session token was rejected; the stored token has been cleared
  #[error("Session expired, please sign in again")]
  Unauthorized,

  /// 401 from a third-party integration endpoint
  #[error("Integration not connected ({path})")]
  IntegrationNotConnected { path: String },

  /// The public form access key was rejected
  #[error("Invalid or expired access key")]
  InvalidAccessKey,

  /// Any other non-success status
  #[error("Request failed with status {status}{}", detail(.message))]
  Status { status: u16, message: Option<String> },

  #[error("Failed to decode response: {0}")]
  Decode(String),

  #[error("Session storage error: {0}")]
  Session(String),

  /// Client-side validation failed; no request was made
  #[error("{0}")]
  Validation(String),
}

fn detail(message: &Option<String>) -> String {
  match message {
    Some(m) if !m.trim().is_empty() => format!(": {}", m),
    _ => String::new(),
  }
}

impl ApiError {
  /// Message text provided by the server, if the response carried one.
  pub fn server_message(&self) -> Option<&str> {
    match self {
      ApiError::Status { message, .. } => message.as_deref().filter(|m| !m.trim().is_empty()),
      _ => None,
    }
  }

  /// Human-readable message for read failures.
  pub fn user_message(&self) -> String {
    if let Some(message) = self.server_message() {
      return message.to_string();
    }
    let text = self.to_string();
    if text.trim().is_empty() {
      GENERIC_ERROR_MESSAGE.to_string()
    } else {
      text
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, ApiError::NotFound { .. })
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      ApiError::Decode(err.to_string())
    } else {
      ApiError::Network(err.to_string())
    }
  }
}

impl From<serde_json::Error> for ApiError {
  fn from(err: serde_json::Error) -> Self {
    ApiError::Decode(err.to_string())
  }
}
