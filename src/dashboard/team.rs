//! User-managed team member types and statuses.

use crate::api::ApiError;
use crate::query::{MutationSpec, Query};
use crate::reorder::MoveDirection;

use super::inventory::reorder_payload;
use super::keys::{scope, ResourceKey};
use super::types::{OptionKind, TeamMemberOption, TeamMemberOptionInput};
use super::{require, Dashboard};

pub struct TeamOptions<'a> {
  dash: &'a Dashboard,
}

impl<'a> TeamOptions<'a> {
  pub(super) fn new(dash: &'a Dashboard) -> Self {
    Self { dash }
  }

  fn base_path(kind: OptionKind) -> String {
    format!("/team-members/{}", kind.path_segment())
  }

  pub fn list(&self, kind: OptionKind) -> Query<Vec<TeamMemberOption>> {
    self
      .dash
      .list_query(ResourceKey::TeamOptions { kind }, Self::base_path(kind), Vec::new())
  }

  pub async fn create(
    &self,
    kind: OptionKind,
    input: &TeamMemberOptionInput,
  ) -> Result<Option<TeamMemberOption>, ApiError> {
    require(input.name.as_deref(), "Name")?;
    let spec = MutationSpec::new("Option added", "Failed to add option")
      .invalidates(scope::team_options(kind));
    self
      .dash
      .write(spec, self.dash.client().post(&Self::base_path(kind), input))
      .await
  }

  pub async fn update(
    &self,
    kind: OptionKind,
    id: &str,
    input: &TeamMemberOptionInput,
  ) -> Result<Option<TeamMemberOption>, ApiError> {
    let spec = MutationSpec::new("Option updated", "Failed to update option")
      .invalidates(scope::team_options(kind));
    let path = format!("{}/{}", Self::base_path(kind), id);
    self
      .dash
      .write(spec, self.dash.client().patch(&path, input))
      .await
  }

  pub async fn delete(&self, kind: OptionKind, id: &str) -> Result<(), ApiError> {
    let spec = MutationSpec::new("Option removed", "Failed to remove option")
      .invalidates(scope::team_options(kind));
    let path = format!("{}/{}", Self::base_path(kind), id);
    self.dash.write_ack(spec, self.dash.client().delete(&path)).await
  }

  pub async fn move_option(
    &self,
    kind: OptionKind,
    options: &[TeamMemberOption],
    index: usize,
    direction: MoveDirection,
  ) -> Result<(), ApiError> {
    let updates = reorder_payload(options, index, direction)?;
    let spec = MutationSpec::new("Order updated", "Failed to reorder options")
      .invalidates(scope::team_options(kind));
    let path = format!("{}/reorder", Self::base_path(kind));
    self
      .dash
      .write_ack(spec, self.dash.client().put(&path, &updates))
      .await
  }
}
