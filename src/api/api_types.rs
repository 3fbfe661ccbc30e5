//! Helpers for shaping raw JSON responses before they reach domain types.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::error::ApiError;

/// Deserialize a list endpoint's body.
///
/// Anything that is not a JSON array (null, an error envelope, a bare object)
/// becomes an empty list so consumers never have to handle a missing list.
pub fn normalize_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ApiError> {
  match value {
    Value::Array(items) => items
      .into_iter()
      .map(|item| serde_json::from_value(item).map_err(ApiError::from))
      .collect(),
    other => {
      debug!(kind = value_kind(&other), "List endpoint returned a non-array body");
      Ok(Vec::new())
    }
  }
}

/// Pull a human-readable message out of an error response body.
///
/// Backends report errors as `{"message": "..."}` or `{"error": "..."}`.
pub fn extract_server_message(body: &str) -> Option<String> {
  let value: Value = serde_json::from_str(body).ok()?;
  ["message", "error"]
    .iter()
    .filter_map(|field| value.get(field).and_then(|v| v.as_str()))
    .map(str::trim)
    .find(|m| !m.is_empty())
    .map(String::from)
}

/// Parse a response body, treating an empty body as `null`.
pub fn parse_body(body: &str) -> Result<Value, ApiError> {
  if body.trim().is_empty() {
    return Ok(Value::Null);
  }
  serde_json::from_str(body).map_err(ApiError::from)
}

fn value_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_normalize_array() {
    let items: Vec<u32> = normalize_list(json!([1, 2, 3])).unwrap();
    assert_eq!(items, vec![1, 2, 3]);
  }

  #[test]
  fn test_normalize_non_array_is_empty() {
    let items: Vec<u32> = normalize_list(json!({"error": "boom"})).unwrap();
    assert!(items.is_empty());
    let items: Vec<u32> = normalize_list(Value::Null).unwrap();
    assert!(items.is_empty());
  }

  #[test]
  fn test_normalize_bad_element_is_decode_error() {
    let result: Result<Vec<u32>, _> = normalize_list(json!([1, "two"]));
    assert!(matches!(result, Err(ApiError::Decode(_))));
  }

  #[test]
  fn test_extract_message_then_error() {
    assert_eq!(
      extract_server_message(r#"{"message": "Duplicate name"}"#).as_deref(),
      Some("Duplicate name")
    );
    assert_eq!(
      extract_server_message(r#"{"message": "", "error": "Bad input"}"#).as_deref(),
      Some("Bad input")
    );
    assert_eq!(extract_server_message("<html>oops</html>"), None);
  }

  #[test]
  fn test_parse_empty_body() {
    assert_eq!(parse_body("").unwrap(), Value::Null);
    assert_eq!(parse_body(r#"{"ok":true}"#).unwrap(), json!({"ok": true}));
  }
}
