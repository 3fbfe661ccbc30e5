//! Inventory request form: field configuration and received submissions.

use serde_json::json;

use crate::api::ApiError;
use crate::query::{MutationSpec, Query};
use crate::reorder::MoveDirection;

use super::inventory::reorder_payload;
use super::keys::{scope, ResourceKey, FORM_CONFIG, FORM_SUBMISSIONS};
use super::types::{FormFieldConfig, FormFieldInput, FormSubmission, MonthYear, SubmissionStatus};
use super::Dashboard;

pub struct InventoryForm<'a> {
  dash: &'a Dashboard,
}

impl<'a> InventoryForm<'a> {
  pub(super) fn new(dash: &'a Dashboard) -> Self {
    Self { dash }
  }

  pub fn fields(&self) -> Query<Vec<FormFieldConfig>> {
    self.dash.list_query(
      ResourceKey::FormConfig,
      "/inventory/form-config/fields".to_string(),
      Vec::new(),
    )
  }

  pub async fn update_field(
    &self,
    id: &str,
    input: &FormFieldInput,
  ) -> Result<Option<FormFieldConfig>, ApiError> {
    let spec = MutationSpec::new("Form field updated", "Failed to update form field")
      .invalidates(scope::all(FORM_CONFIG));
    let path = format!("/inventory/form-config/fields/{}", id);
    self
      .dash
      .write(spec, self.dash.client().patch(&path, input))
      .await
  }

  /// Move a field within its category.
  pub async fn move_field(
    &self,
    category_fields: &[FormFieldConfig],
    index: usize,
    direction: MoveDirection,
  ) -> Result<(), ApiError> {
    let updates = reorder_payload(category_fields, index, direction)?;
    let spec = MutationSpec::new("Field order updated", "Failed to reorder form fields")
      .invalidates(scope::all(FORM_CONFIG));
    self
      .dash
      .write_ack(spec, self.dash.client().put("/inventory/form-config/fields/reorder", &updates))
      .await
  }

  pub fn submissions(&self, period: Option<MonthYear>) -> Query<Vec<FormSubmission>> {
    let Some(period) = period else {
      return self.dash.disabled_query(FORM_SUBMISSIONS);
    };

    self.dash.list_query(
      ResourceKey::FormSubmissions { period },
      "/inventory/form-submissions".to_string(),
      vec![
        ("month", period.month.to_string()),
        ("year", period.year.to_string()),
      ],
    )
  }

  pub fn submission(&self, id: &str) -> Query<FormSubmission> {
    self.dash.entity_query(
      ResourceKey::FormSubmission { id: id.to_string() },
      "Form submission",
      id.to_string(),
      format!("/inventory/form-submissions/{}", id),
    )
  }

  pub async fn set_status(
    &self,
    id: &str,
    status: SubmissionStatus,
  ) -> Result<Option<FormSubmission>, ApiError> {
    let spec = MutationSpec::new("Submission updated", "Failed to update submission")
      .invalidates(scope::all(FORM_SUBMISSIONS));
    let path = format!("/inventory/form-submissions/{}", id);
    self
      .dash
      .write(
        spec,
        self.dash.client().patch(&path, &json!({ "status": status })),
      )
      .await
  }

  pub async fn delete_submission(&self, id: &str) -> Result<(), ApiError> {
    let spec = MutationSpec::new("Submission deleted", "Failed to delete submission")
      .invalidates(scope::all(FORM_SUBMISSIONS));
    let path = format!("/inventory/form-submissions/{}", id);
    self.dash.write_ack(spec, self.dash.client().delete(&path)).await
  }
}
