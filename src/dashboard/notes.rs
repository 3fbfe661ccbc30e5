//! Inventory notes, readable per team member or per month.
//!
//! Both views hit the same endpoint with different filters and share the
//! `inventory-notes` key prefix, so any note write refreshes both.

use crate::api::ApiError;
use crate::query::{MutationSpec, Query};

use super::keys::{scope, ResourceKey, NOTES};
use super::types::{InventoryNote, MonthYear, NoteInput};
use super::{require, Dashboard};

pub struct Notes<'a> {
  dash: &'a Dashboard,
}

impl<'a> Notes<'a> {
  pub(super) fn new(dash: &'a Dashboard) -> Self {
    Self { dash }
  }

  pub fn for_member(&self, member: Option<&str>) -> Query<Vec<InventoryNote>> {
    let Some(member) = member.filter(|m| !m.is_empty()) else {
      return self.dash.disabled_query(NOTES);
    };

    self.dash.list_query(
      ResourceKey::NotesByMember {
        member: member.to_string(),
      },
      "/inventory/notes".to_string(),
      vec![("teamMemberId", member.to_string())],
    )
  }

  pub fn for_month(&self, period: Option<MonthYear>) -> Query<Vec<InventoryNote>> {
    let Some(period) = period else {
      return self.dash.disabled_query(NOTES);
    };

    self.dash.list_query(
      ResourceKey::NotesByMonth { period },
      "/inventory/notes".to_string(),
      vec![
        ("month", period.month.to_string()),
        ("year", period.year.to_string()),
      ],
    )
  }

  pub async fn create(&self, input: &NoteInput) -> Result<Option<InventoryNote>, ApiError> {
    require(input.content.as_deref(), "Note text")?;
    let spec = MutationSpec::new("Note added", "Failed to add note").invalidates(scope::all(NOTES));
    self
      .dash
      .write(spec, self.dash.client().post("/inventory/notes", input))
      .await
  }

  pub async fn update(
    &self,
    id: &str,
    input: &NoteInput,
  ) -> Result<Option<InventoryNote>, ApiError> {
    let spec =
      MutationSpec::new("Note updated", "Failed to update note").invalidates(scope::all(NOTES));
    let path = format!("/inventory/notes/{}", id);
    self
      .dash
      .write(spec, self.dash.client().patch(&path, input))
      .await
  }

  pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
    let spec =
      MutationSpec::new("Note deleted", "Failed to delete note").invalidates(scope::all(NOTES));
    let path = format!("/inventory/notes/{}", id);
    self.dash.write_ack(spec, self.dash.client().delete(&path)).await
  }
}
