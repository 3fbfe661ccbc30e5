//! Public inventory request form.
//!
//! Technicians fill the form in stages without signing in: their name first,
//! then one stage per category that has something to request, then free-text
//! notes. The form is gated by an access key instead of a session and keeps
//! everything in memory until it is submitted.

use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError};
use crate::dashboard::types::{
  FormFieldConfig, InventoryCategory, NewFormSubmission, PublicFormData, SubmissionItem,
  TechnicianSummary,
};

pub const FORM_PATH: &str = "/public/inventory-form";
pub const SUBMISSIONS_PATH: &str = "/public/inventory-form/submissions";

/// Typed characters needed before the roster is searched
pub const MIN_MATCH_LEN: usize = 4;

/// Fetch categories, field configuration and the technician roster.
pub async fn fetch_form(client: &ApiClient, access_key: &str) -> Result<PublicFormData, ApiError> {
  client.public_get(FORM_PATH, access_key).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Name,
  /// Index into [`PublicForm::categories`]
  Category(usize),
  Notes,
  Submitted,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormError {
  #[error("Please enter your name")]
  NameRequired,

  #[error("Please select your name from the list")]
  TechnicianNotSelected,

  #[error("Please fill in the required items: {}", .0.join(", "))]
  MissingRequired(Vec<String>),

  #[error("The form cannot be submitted from this step")]
  NotReady,

  #[error(transparent)]
  Api(#[from] ApiError),
}

/// A category stage: the category and its visible fields in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStage {
  pub category: InventoryCategory,
  pub fields: Vec<FormFieldConfig>,
}

impl CategoryStage {
  /// Names of required fields that have no quantity yet
  fn missing(&self, quantities: &HashMap<String, u32>) -> Vec<String> {
    self
      .fields
      .iter()
      .filter(|f| f.is_required && quantities.get(&f.id).copied().unwrap_or(0) == 0)
      .map(|f| f.name.clone())
      .collect()
  }
}

pub struct PublicForm {
  categories: Vec<CategoryStage>,
  technicians: Vec<TechnicianSummary>,
  stage: Stage,
  name: String,
  technician: Option<TechnicianSummary>,
  quantities: HashMap<String, u32>,
  notes: String,
}

impl PublicForm {
  pub fn new(data: PublicFormData) -> Self {
    let mut categories = data.categories;
    categories.sort_by_key(|c| c.display_order);

    let stages = categories
      .into_iter()
      .filter_map(|category| {
        let mut fields: Vec<_> = data
          .fields
          .iter()
          .filter(|f| f.category_id == category.id && f.is_visible)
          .cloned()
          .collect();
        if fields.is_empty() {
          return None;
        }
        fields.sort_by_key(|f| f.display_order);
        Some(CategoryStage { category, fields })
      })
      .collect();

    Self {
      categories: stages,
      technicians: data.technicians,
      stage: Stage::Name,
      name: String::new(),
      technician: None,
      quantities: HashMap::new(),
      notes: String::new(),
    }
  }

  pub fn stage(&self) -> Stage {
    self.stage
  }

  /// Number of stages before submission: name, one per category, notes.
  pub fn stage_count(&self) -> usize {
    self.categories.len() + 2
  }

  /// 1-based position of the current stage, `None` once submitted.
  pub fn stage_number(&self) -> Option<usize> {
    match self.stage {
      Stage::Name => Some(1),
      Stage::Category(i) => Some(i + 2),
      Stage::Notes => Some(self.stage_count()),
      Stage::Submitted => None,
    }
  }

  pub fn categories(&self) -> &[CategoryStage] {
    &self.categories
  }

  pub fn current_category(&self) -> Option<&CategoryStage> {
    match self.stage {
      Stage::Category(i) => self.categories.get(i),
      _ => None,
    }
  }

  // ==========================================================================
  // Name stage
  // ==========================================================================

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Update the typed name. A selected technician the text no longer matches
  /// is cleared.
  pub fn set_name(&mut self, name: &str) {
    self.name = name.to_string();
    let still_matches = self
      .technician
      .as_ref()
      .is_some_and(|t| matches_name(&t.name, &self.name));
    if !still_matches {
      self.technician = None;
    }
  }

  /// Roster entries matching the typed name, once it is long enough.
  pub fn candidates(&self) -> Vec<&TechnicianSummary> {
    if self.name.trim().chars().count() < MIN_MATCH_LEN {
      return Vec::new();
    }
    self
      .technicians
      .iter()
      .filter(|t| matches_name(&t.name, &self.name))
      .collect()
  }

  /// Select one of the current candidates; the name becomes theirs.
  pub fn select_technician(&mut self, id: &str) -> bool {
    let Some(found) = self.candidates().into_iter().find(|t| t.id == id).cloned() else {
      return false;
    };
    debug!(technician = %found.id, "Technician selected");
    self.name = found.name.clone();
    self.technician = Some(found);
    true
  }

  pub fn technician(&self) -> Option<&TechnicianSummary> {
    self.technician.as_ref()
  }

  // ==========================================================================
  // Category stages
  // ==========================================================================

  /// Set a requested quantity, capped at the field's maximum.
  pub fn set_quantity(&mut self, field_id: &str, quantity: u32) {
    let max = self
      .categories
      .iter()
      .flat_map(|c| &c.fields)
      .find(|f| f.id == field_id)
      .and_then(|f| f.max_quantity);
    let quantity = max.map_or(quantity, |m| quantity.min(m));
    if quantity == 0 {
      self.quantities.remove(field_id);
    } else {
      self.quantities.insert(field_id.to_string(), quantity);
    }
  }

  pub fn quantity(&self, field_id: &str) -> u32 {
    self.quantities.get(field_id).copied().unwrap_or(0)
  }

  /// Required items of the current category stage still without a quantity.
  pub fn missing_required(&self) -> Vec<String> {
    self
      .current_category()
      .map(|c| c.missing(&self.quantities))
      .unwrap_or_default()
  }

  // ==========================================================================
  // Notes
  // ==========================================================================

  pub fn notes(&self) -> &str {
    &self.notes
  }

  pub fn set_notes(&mut self, notes: &str) {
    self.notes = notes.to_string();
  }

  // ==========================================================================
  // Transitions
  // ==========================================================================

  /// Why the current stage cannot be left forward, if it cannot.
  pub fn check_stage(&self) -> Result<(), FormError> {
    match self.stage {
      Stage::Name => {
        if self.name.trim().is_empty() {
          Err(FormError::NameRequired)
        } else if self.technician.is_none() {
          Err(FormError::TechnicianNotSelected)
        } else {
          Ok(())
        }
      }
      Stage::Category(_) => {
        let missing = self.missing_required();
        if missing.is_empty() {
          Ok(())
        } else {
          Err(FormError::MissingRequired(missing))
        }
      }
      Stage::Notes | Stage::Submitted => Err(FormError::NotReady),
    }
  }

  pub fn can_advance(&self) -> bool {
    self.check_stage().is_ok()
  }

  /// Move to the next stage. The notes stage is left only by submitting.
  pub fn next(&mut self) -> Result<Stage, FormError> {
    self.check_stage()?;
    self.stage = match self.stage {
      Stage::Name if self.categories.is_empty() => Stage::Notes,
      Stage::Name => Stage::Category(0),
      Stage::Category(i) if i + 1 < self.categories.len() => Stage::Category(i + 1),
      Stage::Category(_) => Stage::Notes,
      other => other,
    };
    debug!(stage = ?self.stage, "Form advanced");
    Ok(self.stage)
  }

  /// Move to the previous stage. Does nothing on the first stage or after
  /// submission.
  pub fn back(&mut self) -> Stage {
    self.stage = match self.stage {
      Stage::Name => Stage::Name,
      Stage::Category(0) => Stage::Name,
      Stage::Category(i) => Stage::Category(i - 1),
      Stage::Notes if self.categories.is_empty() => Stage::Name,
      Stage::Notes => Stage::Category(self.categories.len() - 1),
      Stage::Submitted => Stage::Submitted,
    };
    self.stage
  }

  /// Payload for the current answers.
  pub fn submission(&self) -> Result<NewFormSubmission, FormError> {
    let technician = self
      .technician
      .as_ref()
      .ok_or(FormError::TechnicianNotSelected)?;

    let items = self
      .categories
      .iter()
      .flat_map(|c| &c.fields)
      .filter_map(|f| {
        let quantity = self.quantity(&f.id);
        (quantity > 0).then(|| SubmissionItem {
          field_id: f.id.clone(),
          quantity,
        })
      })
      .collect();

    let notes = self.notes.trim();
    Ok(NewFormSubmission {
      technician_id: technician.id.clone(),
      submitter_name: self.name.trim().to_string(),
      items,
      notes: (!notes.is_empty()).then(|| notes.to_string()),
    })
  }

  /// Send the form. On failure the stage and answers are kept.
  pub async fn submit(&mut self, client: &ApiClient, access_key: &str) -> Result<(), FormError> {
    if self.stage != Stage::Notes {
      return Err(FormError::NotReady);
    }
    let payload = self.submission()?;
    client
      .public_post::<serde_json::Value, _>(SUBMISSIONS_PATH, access_key, &payload)
      .await?;

    info!(items = payload.items.len(), "Inventory request submitted");
    self.stage = Stage::Submitted;
    Ok(())
  }

  /// Start over with an empty form.
  pub fn submit_another(&mut self) {
    self.stage = Stage::Name;
    self.name.clear();
    self.technician = None;
    self.quantities.clear();
    self.notes.clear();
  }
}

fn matches_name(candidate: &str, typed: &str) -> bool {
  let typed = typed.trim().to_lowercase();
  !typed.is_empty() && candidate.to_lowercase().contains(&typed)
}
