//! Account-wide settings.

use crate::api::ApiError;
use crate::query::{MutationSpec, Query};

use super::keys::{scope, ResourceKey};
use super::types::{DefaultIdealInventory, MessageTemplate};
use super::{require, Dashboard};

const DEFAULT_IDEAL_INVENTORY: &str = "default-ideal-inventory";
const MESSAGE_TEMPLATES: &str = "message-templates";

pub struct Settings<'a> {
  dash: &'a Dashboard,
}

impl<'a> Settings<'a> {
  pub(super) fn new(dash: &'a Dashboard) -> Self {
    Self { dash }
  }

  pub fn default_ideal_inventory(&self) -> Query<DefaultIdealInventory> {
    self.dash.value_query(
      ResourceKey::Setting {
        name: DEFAULT_IDEAL_INVENTORY,
      },
      format!("/settings/{}", DEFAULT_IDEAL_INVENTORY),
    )
  }

  pub async fn set_default_ideal_inventory(
    &self,
    value: i64,
  ) -> Result<Option<DefaultIdealInventory>, ApiError> {
    if value < 0 {
      return Err(ApiError::Validation(
        "Default ideal inventory cannot be negative".to_string(),
      ));
    }
    let spec = MutationSpec::new("Default ideal inventory saved", "Failed to save setting")
      .invalidates(scope::setting(DEFAULT_IDEAL_INVENTORY));
    let path = format!("/settings/{}", DEFAULT_IDEAL_INVENTORY);
    self
      .dash
      .write(
        spec,
        self
          .dash
          .client()
          .put(&path, &DefaultIdealInventory { value }),
      )
      .await
  }

  pub fn message_templates(&self) -> Query<Vec<MessageTemplate>> {
    self.dash.list_query(
      ResourceKey::Setting {
        name: MESSAGE_TEMPLATES,
      },
      format!("/settings/{}", MESSAGE_TEMPLATES),
      Vec::new(),
    )
  }

  pub async fn update_template(
    &self,
    kind: &str,
    body: &str,
  ) -> Result<Option<MessageTemplate>, ApiError> {
    require(Some(body), "Template text")?;
    let spec = MutationSpec::new("Template saved", "Failed to save template")
      .invalidates(scope::setting(MESSAGE_TEMPLATES));
    let path = format!("/settings/{}/{}", MESSAGE_TEMPLATES, kind);
    let template = MessageTemplate {
      kind: kind.to_string(),
      body: body.to_string(),
    };
    self
      .dash
      .write(spec, self.dash.client().put(&path, &template))
      .await
  }
}
