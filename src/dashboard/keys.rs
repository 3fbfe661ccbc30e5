//! Cache keys for every dashboard resource.
//!
//! Each read builds its key from a [`ResourceKey`]; writes invalidate by
//! resource prefix (see [`scope`]) so both list and detail entries refresh.

use crate::query::QueryKey;

use super::types::{MonthYear, OptionKind};

pub const INVENTORY_ITEMS: &str = "inventory-items";
pub const INVENTORY_CATEGORIES: &str = "inventory-categories";
pub const INVENTORY_STORES: &str = "inventory-stores";
pub const TECHNICIANS: &str = "inventory-technicians";
pub const PURCHASES: &str = "purchases";
pub const NOTES: &str = "inventory-notes";
pub const FORM_CONFIG: &str = "inventory-form-config";
pub const FORM_SUBMISSIONS: &str = "inventory-form-submissions";
pub const KPI_ENTRIES: &str = "kpi-entries";
pub const KPI_METRICS: &str = "kpi-metrics";
pub const TEAM_OPTIONS: &str = "team-member-options";
pub const COLUMNS: &str = "columns";
pub const SETTINGS: &str = "settings";
pub const INTEGRATIONS: &str = "integrations";

/// Read keys for the dashboard's resources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceKey {
  InventoryItems { category: Option<String> },
  InventoryItem { id: String },
  Categories,
  Stores,
  Technicians,
  Technician { id: String },
  Purchases { technician: String, period: MonthYear },
  NotesByMember { member: String },
  NotesByMonth { period: MonthYear },
  FormConfig,
  FormSubmissions { period: MonthYear },
  FormSubmission { id: String },
  KpiEntries { member: String, period: MonthYear },
  Metrics,
  TeamOptions { kind: OptionKind },
  Columns { table: String },
  Setting { name: &'static str },
  Integration { provider: String },
}

impl ResourceKey {
  pub fn query_key(&self) -> QueryKey {
    match self {
      Self::InventoryItems { category } => QueryKey::new(INVENTORY_ITEMS)
        .with("list", "")
        .with("category", category.as_deref().unwrap_or("")),
      Self::InventoryItem { id } => QueryKey::new(INVENTORY_ITEMS).with("id", id),
      Self::Categories => QueryKey::new(INVENTORY_CATEGORIES),
      Self::Stores => QueryKey::new(INVENTORY_STORES),
      Self::Technicians => QueryKey::new(TECHNICIANS).with("list", ""),
      Self::Technician { id } => QueryKey::new(TECHNICIANS).with("id", id),
      Self::Purchases { technician, period } => scope::purchases_of(technician).with("period", period),
      Self::NotesByMember { member } => QueryKey::new(NOTES).with("member", member),
      Self::NotesByMonth { period } => QueryKey::new(NOTES).with("period", period),
      Self::FormConfig => QueryKey::new(FORM_CONFIG),
      Self::FormSubmissions { period } => QueryKey::new(FORM_SUBMISSIONS)
        .with("list", "")
        .with("period", period),
      Self::FormSubmission { id } => QueryKey::new(FORM_SUBMISSIONS).with("id", id),
      Self::KpiEntries { member, period } => scope::kpi_entries_of(member).with("period", period),
      Self::Metrics => QueryKey::new(KPI_METRICS),
      Self::TeamOptions { kind } => scope::team_options(*kind),
      Self::Columns { table } => scope::columns(table),
      Self::Setting { name } => QueryKey::new(SETTINGS).with("name", name),
      Self::Integration { provider } => QueryKey::new(INTEGRATIONS).with("provider", provider),
    }
  }

  /// Human-readable description, used in logs
  pub fn description(&self) -> String {
    match self {
      Self::InventoryItems { category } => match category {
        Some(c) => format!("inventory items in category {}", c),
        None => "all inventory items".to_string(),
      },
      Self::InventoryItem { id } => format!("inventory item {}", id),
      Self::Categories => "inventory categories".to_string(),
      Self::Stores => "stores".to_string(),
      Self::Technicians => "technicians".to_string(),
      Self::Technician { id } => format!("technician {}", id),
      Self::Purchases { technician, period } => {
        format!("purchases of technician {} in {}", technician, period)
      }
      Self::NotesByMember { member } => format!("notes for team member {}", member),
      Self::NotesByMonth { period } => format!("notes for {}", period),
      Self::FormConfig => "inventory form configuration".to_string(),
      Self::FormSubmissions { period } => format!("form submissions for {}", period),
      Self::FormSubmission { id } => format!("form submission {}", id),
      Self::KpiEntries { member, period } => format!("KPI entries of {} in {}", member, period),
      Self::Metrics => "custom metrics".to_string(),
      Self::TeamOptions { kind } => format!("team member {} options", kind),
      Self::Columns { table } => format!("columns of {}", table),
      Self::Setting { name } => format!("setting {}", name),
      Self::Integration { provider } => format!("{} integration status", provider),
    }
  }
}

/// Invalidation prefixes.
pub mod scope {
  use super::*;

  pub fn all(resource: &str) -> QueryKey {
    QueryKey::new(resource)
  }

  pub fn purchases_of(technician: &str) -> QueryKey {
    QueryKey::new(PURCHASES).with("technician", technician)
  }

  pub fn kpi_entries_of(member: &str) -> QueryKey {
    QueryKey::new(KPI_ENTRIES).with("member", member)
  }

  pub fn team_options(kind: OptionKind) -> QueryKey {
    QueryKey::new(TEAM_OPTIONS).with("kind", kind)
  }

  pub fn columns(table: &str) -> QueryKey {
    QueryKey::new(COLUMNS).with("table", table)
  }

  pub fn setting(name: &'static str) -> QueryKey {
    ResourceKey::Setting { name }.query_key()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn march() -> MonthYear {
    MonthYear::new(3, 2024).unwrap()
  }

  #[test]
  fn test_technician_scope_covers_only_that_technician() {
    let t1 = ResourceKey::Purchases {
      technician: "t1".to_string(),
      period: march(),
    }
    .query_key();
    let t2 = ResourceKey::Purchases {
      technician: "t2".to_string(),
      period: march(),
    }
    .query_key();

    assert!(t1.starts_with(&scope::purchases_of("t1")));
    assert!(!t2.starts_with(&scope::purchases_of("t1")));
    assert!(t2.starts_with(&scope::all(PURCHASES)));
  }

  #[test]
  fn test_both_note_keys_share_the_notes_prefix() {
    let by_member = ResourceKey::NotesByMember {
      member: "m1".to_string(),
    }
    .query_key();
    let by_month = ResourceKey::NotesByMonth { period: march() }.query_key();

    assert_ne!(by_member, by_month);
    assert!(by_member.starts_with(&scope::all(NOTES)));
    assert!(by_month.starts_with(&scope::all(NOTES)));
  }

  #[test]
  fn test_list_and_detail_keys_are_distinct() {
    let list = ResourceKey::Technicians.query_key();
    let one = ResourceKey::Technician {
      id: "t1".to_string(),
    }
    .query_key();
    assert_ne!(list, one);
    assert!(one.starts_with(&scope::all(TECHNICIANS)));
  }

  #[test]
  fn test_descriptions() {
    assert_eq!(
      ResourceKey::InventoryItems { category: None }.description(),
      "all inventory items"
    );
    assert_eq!(
      ResourceKey::Purchases {
        technician: "t9".to_string(),
        period: march()
      }
      .description(),
      "purchases of technician t9 in 2024-03"
    );
  }
}
