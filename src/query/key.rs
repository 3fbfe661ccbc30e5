use std::fmt;

/// Cache key: an ordered tuple of the resource name followed by its filter
/// parameters, e.g. `purchases / technician=t1 / month=3 / year=2024`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
  segments: Vec<String>,
}

impl QueryKey {
  /// Key for a resource with no parameters
  pub fn new(resource: &str) -> Self {
    Self {
      segments: vec![resource.to_string()],
    }
  }

  /// Append a named parameter segment
  pub fn with(mut self, name: &str, value: impl fmt::Display) -> Self {
    self.segments.push(format!("{}={}", name, value));
    self
  }

  /// Resource name (first segment)
  pub fn resource(&self) -> &str {
    &self.segments[0]
  }

  pub fn segments(&self) -> &[String] {
    &self.segments
  }

  /// Whether `prefix` matches the leading segments of this key.
  ///
  /// Invalidating `inventory-notes` hits every notes key; invalidating
  /// `purchases / technician=t1` only hits that technician's entries.
  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.segments.len() >= prefix.segments.len()
      && self.segments.iter().zip(&prefix.segments).all(|(a, b)| a == b)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.segments.join(" / "))
  }
}
