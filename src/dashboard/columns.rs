//! Customizable table columns.

use crate::api::ApiError;
use crate::query::{MutationSpec, Query};
use crate::reorder::MoveDirection;

use super::inventory::reorder_payload;
use super::keys::{scope, ResourceKey};
use super::types::{ColumnDefinition, ColumnInput};
use super::Dashboard;

pub struct Columns<'a> {
  dash: &'a Dashboard,
}

impl<'a> Columns<'a> {
  pub(super) fn new(dash: &'a Dashboard) -> Self {
    Self { dash }
  }

  pub fn list(&self, table: &str) -> Query<Vec<ColumnDefinition>> {
    self.dash.list_query(
      ResourceKey::Columns {
        table: table.to_string(),
      },
      "/columns".to_string(),
      vec![("table", table.to_string())],
    )
  }

  pub async fn update(
    &self,
    table: &str,
    id: &str,
    input: &ColumnInput,
  ) -> Result<Option<ColumnDefinition>, ApiError> {
    let spec = MutationSpec::new("Column updated", "Failed to update column")
      .invalidates(scope::columns(table));
    let path = format!("/columns/{}", id);
    self
      .dash
      .write(spec, self.dash.client().patch(&path, input))
      .await
  }

  pub async fn move_column(
    &self,
    table: &str,
    columns: &[ColumnDefinition],
    index: usize,
    direction: MoveDirection,
  ) -> Result<(), ApiError> {
    let updates = reorder_payload(columns, index, direction)?;
    let spec = MutationSpec::new("Column order updated", "Failed to reorder columns")
      .invalidates(scope::columns(table));
    self
      .dash
      .write_ack(spec, self.dash.client().put("/columns/reorder", &updates))
      .await
  }
}
