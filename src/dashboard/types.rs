//! Resource types exchanged with the backend.
//!
//! Field names follow the backend's camelCase JSON. Identifiers are issued by
//! the server; timestamps are optional because list endpoints omit them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::reorder::Orderable;

/// A calendar month used to scope monthly resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthYear {
  pub month: u32,
  pub year: i32,
}

impl MonthYear {
  /// `None` unless `month` is 1-12.
  pub fn new(month: u32, year: i32) -> Option<Self> {
    (1..=12).contains(&month).then_some(Self { month, year })
  }

  /// Both parts are needed; a missing one disables the query.
  pub fn from_parts(month: Option<u32>, year: Option<i32>) -> Option<Self> {
    Self::new(month?, year?)
  }
}

impl fmt::Display for MonthYear {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{:02}", self.year, self.month)
  }
}

// ============================================================================
// Inventory
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
  pub id: String,
  pub name: String,
  pub category_id: Option<String>,
  #[serde(default)]
  pub quantity: i64,
  pub ideal_quantity: Option<i64>,
  pub unit_cost: Option<f64>,
  pub store_id: Option<String>,
  #[serde(default)]
  pub display_order: i64,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

/// Create / partial-update payload for an inventory item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub quantity: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ideal_quantity: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub unit_cost: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
  Product,
  Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCategory {
  pub id: String,
  pub name: String,
  pub kind: CategoryKind,
  #[serde(default)]
  pub display_order: i64,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub kind: Option<CategoryKind>,
}

/// Store / supplier that purchases are made from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
  pub id: String,
  pub name: String,
  pub website: Option<String>,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub website: Option<String>,
}

// ============================================================================
// Technicians and purchases
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Technician {
  pub id: String,
  pub name: String,
  pub email: Option<String>,
  pub phone: Option<String>,
  #[serde(default = "default_true")]
  pub is_active: bool,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
  pub id: String,
  pub technician_id: String,
  pub item_id: Option<String>,
  pub item_name: String,
  #[serde(default)]
  pub quantity: i64,
  pub unit_cost: Option<f64>,
  pub store_id: Option<String>,
  #[serde(default)]
  pub delivered: bool,
  pub purchased_on: Option<NaiveDate>,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

impl Purchase {
  pub fn total_cost(&self) -> Option<f64> {
    self.unit_cost.map(|cost| cost * self.quantity as f64)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub item_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub item_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub quantity: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub unit_cost: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delivered: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub purchased_on: Option<NaiveDate>,
}

// ============================================================================
// Notes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryNote {
  pub id: String,
  pub team_member_id: Option<String>,
  pub month: Option<u32>,
  pub year: Option<i32>,
  pub content: String,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub team_member_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub month: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub year: Option<i32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
}

// ============================================================================
// Inventory request form
// ============================================================================

/// Configuration of one requestable item on the inventory form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFieldConfig {
  pub id: String,
  pub category_id: String,
  pub name: String,
  #[serde(default = "default_true")]
  pub is_visible: bool,
  #[serde(default)]
  pub is_required: bool,
  #[serde(default)]
  pub display_order: i64,
  pub max_quantity: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFieldInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_visible: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_required: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_quantity: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
  Pending,
  Fulfilled,
  Cancelled,
}

/// One requested quantity in a form submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionItem {
  pub field_id: String,
  pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
  pub id: String,
  pub technician_id: String,
  pub submitter_name: String,
  #[serde(default)]
  pub items: Vec<SubmissionItem>,
  pub notes: Option<String>,
  pub status: SubmissionStatus,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

/// Payload posted by the public form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFormSubmission {
  pub technician_id: String,
  pub submitter_name: String,
  pub items: Vec<SubmissionItem>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

/// Technician as exposed to the public form (no contact details)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianSummary {
  pub id: String,
  pub name: String,
}

/// Everything the public form needs, fetched in one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicFormData {
  #[serde(default)]
  pub categories: Vec<InventoryCategory>,
  #[serde(default)]
  pub fields: Vec<FormFieldConfig>,
  #[serde(default)]
  pub technicians: Vec<TechnicianSummary>,
}

// ============================================================================
// KPIs
// ============================================================================

/// Which payload a custom metric records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
  Dollar,
  Text,
  Date,
  Image,
}

/// Recorded value of a custom metric; the variant matches the metric's kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetricValue {
  Dollar {
    #[serde(rename = "dollarValue")]
    amount: f64,
  },
  Text {
    text: String,
  },
  Date {
    date: NaiveDate,
  },
  Image {
    url: String,
  },
}

impl MetricValue {
  pub fn kind(&self) -> MetricKind {
    match self {
      MetricValue::Dollar { .. } => MetricKind::Dollar,
      MetricValue::Text { .. } => MetricKind::Text,
      MetricValue::Date { .. } => MetricKind::Date,
      MetricValue::Image { .. } => MetricKind::Image,
    }
  }
}

impl fmt::Display for MetricValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MetricValue::Dollar { amount } => write!(f, "${:.2}", amount),
      MetricValue::Text { text } => write!(f, "{}", text),
      MetricValue::Date { date } => write!(f, "{}", date),
      MetricValue::Image { url } => write!(f, "{}", url),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMetric {
  pub id: String,
  pub name: String,
  #[serde(rename = "type")]
  pub kind: MetricKind,
  #[serde(default = "default_true")]
  pub is_active: bool,
  #[serde(default)]
  pub display_order: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
  pub kind: Option<MetricKind>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
}

/// A team member's recorded KPI values for one month, keyed by metric id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiEntry {
  pub id: String,
  pub team_member_id: String,
  pub month: u32,
  pub year: i32,
  #[serde(default)]
  pub values: BTreeMap<String, MetricValue>,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiEntryInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub team_member_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub month: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub year: Option<i32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub values: Option<BTreeMap<String, MetricValue>>,
}

// ============================================================================
// Team-member options, columns, settings
// ============================================================================

/// The two user-managed option lists for team members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
  Type,
  Status,
}

impl OptionKind {
  pub fn path_segment(&self) -> &'static str {
    match self {
      OptionKind::Type => "types",
      OptionKind::Status => "statuses",
    }
  }
}

impl fmt::Display for OptionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      OptionKind::Type => "type",
      OptionKind::Status => "status",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberOption {
  pub id: String,
  pub name: String,
  pub color: Option<String>,
  #[serde(default)]
  pub display_order: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberOptionInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
}

/// User-customizable table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
  pub id: String,
  pub table: String,
  pub key: String,
  pub label: String,
  #[serde(default)]
  pub display_order: i64,
  #[serde(default = "default_true")]
  pub is_visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInput {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_visible: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultIdealInventory {
  pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
  pub kind: String,
  pub body: String,
}

/// Connection state of a third-party integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntegrationStatus {
  Connected {
    #[serde(default)]
    account: Option<String>,
  },
  NotConnected,
}

fn default_true() -> bool {
  true
}

// ============================================================================
// Ordering
// ============================================================================

macro_rules! impl_orderable {
  ($($ty:ty),* $(,)?) => {
    $(
      impl Orderable for $ty {
        fn id(&self) -> &str {
          &self.id
        }

        fn display_order(&self) -> i64 {
          self.display_order
        }
      }
    )*
  };
}

impl_orderable!(
  InventoryItem,
  InventoryCategory,
  FormFieldConfig,
  CustomMetric,
  TeamMemberOption,
  ColumnDefinition,
);

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  #[test]
  fn test_metric_kind_travels_as_type() {
    let metric: CustomMetric =
      serde_json::from_value(json!({"id": "m1", "name": "Revenue", "type": "dollar"})).unwrap();
    assert_eq!(metric.kind, MetricKind::Dollar);
    assert!(metric.is_active);

    let input = MetricInput {
      name: Some("Photo".to_string()),
      kind: Some(MetricKind::Image),
      ..Default::default()
    };
    assert_eq!(
      serde_json::to_value(&input).unwrap(),
      json!({"name": "Photo", "type": "image"})
    );
  }

  #[test]
  fn test_month_year_bounds() {
    assert!(MonthYear::new(0, 2024).is_none());
    assert!(MonthYear::new(13, 2024).is_none());
    assert_eq!(MonthYear::new(3, 2024).unwrap().to_string(), "2024-03");
    assert!(MonthYear::from_parts(Some(3), None).is_none());
  }

  #[test]
  fn test_metric_value_tagged_by_type() {
    let value: MetricValue = serde_json::from_value(json!({"type": "dollar", "dollarValue": 12.5})).unwrap();
    assert_eq!(value, MetricValue::Dollar { amount: 12.5 });
    assert_eq!(value.kind(), MetricKind::Dollar);
    assert_eq!(value.to_string(), "$12.50");

    let value: MetricValue =
      serde_json::from_value(json!({"type": "date", "date": "2024-02-29"})).unwrap();
    assert_eq!(value.kind(), MetricKind::Date);
  }

  #[test]
  fn test_kpi_entry_values_are_structured() {
    let entry: KpiEntry = serde_json::from_value(json!({
      "id": "k1",
      "teamMemberId": "m1",
      "month": 4,
      "year": 2024,
      "values": {
        "revenue": {"type": "dollar", "dollarValue": 1000.0},
        "comment": {"type": "text", "text": "Great month"}
      }
    }))
    .unwrap();

    assert_eq!(entry.values.len(), 2);
    assert_eq!(
      entry.values.get("comment"),
      Some(&MetricValue::Text {
        text: "Great month".to_string()
      })
    );
  }

  #[test]
  fn test_partial_input_skips_unset_fields() {
    let input = InventoryItemInput {
      quantity: Some(4),
      ..Default::default()
    };
    assert_eq!(serde_json::to_value(input).unwrap(), json!({"quantity": 4}));
  }

  #[test]
  fn test_form_field_defaults() {
    let field: FormFieldConfig = serde_json::from_value(json!({
      "id": "f1",
      "categoryId": "c1",
      "name": "Gloves"
    }))
    .unwrap();
    assert!(field.is_visible);
    assert!(!field.is_required);
  }
}
