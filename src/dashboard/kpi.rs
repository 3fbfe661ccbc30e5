//! Monthly KPI entries and the custom metrics they record.

use crate::api::ApiError;
use crate::query::{MutationSpec, Query};
use crate::reorder::MoveDirection;

use super::inventory::reorder_payload;
use super::keys::{scope, ResourceKey, KPI_ENTRIES, KPI_METRICS};
use super::types::{CustomMetric, KpiEntry, KpiEntryInput, MetricInput, MonthYear};
use super::{require, Dashboard};

pub struct Kpi<'a> {
  dash: &'a Dashboard,
}

impl<'a> Kpi<'a> {
  pub(super) fn new(dash: &'a Dashboard) -> Self {
    Self { dash }
  }

  /// Entries of one team member in one month. Disabled until both are known.
  pub fn entries(&self, member: Option<&str>, period: Option<MonthYear>) -> Query<Vec<KpiEntry>> {
    let (member, period) = match (member.filter(|m| !m.is_empty()), period) {
      (Some(m), Some(p)) => (m, p),
      _ => return self.dash.disabled_query(KPI_ENTRIES),
    };

    self.dash.list_query(
      ResourceKey::KpiEntries {
        member: member.to_string(),
        period,
      },
      "/kpi/entries".to_string(),
      vec![
        ("teamMemberId", member.to_string()),
        ("month", period.month.to_string()),
        ("year", period.year.to_string()),
      ],
    )
  }

  pub async fn create_entry(&self, input: &KpiEntryInput) -> Result<Option<KpiEntry>, ApiError> {
    let member = input.team_member_id.as_deref();
    require(member, "Team member")?;
    let spec = MutationSpec::new("KPI entry saved", "Failed to save KPI entry")
      .invalidates(scope::kpi_entries_of(member.unwrap_or_default()));
    self
      .dash
      .write(spec, self.dash.client().post("/kpi/entries", input))
      .await
  }

  pub async fn update_entry(
    &self,
    member: &str,
    id: &str,
    input: &KpiEntryInput,
  ) -> Result<Option<KpiEntry>, ApiError> {
    let spec = MutationSpec::new("KPI entry updated", "Failed to update KPI entry")
      .invalidates(scope::kpi_entries_of(member));
    let path = format!("/kpi/entries/{}", id);
    self
      .dash
      .write(spec, self.dash.client().patch(&path, input))
      .await
  }

  pub async fn delete_entry(&self, member: &str, id: &str) -> Result<(), ApiError> {
    let spec = MutationSpec::new("KPI entry deleted", "Failed to delete KPI entry")
      .invalidates(scope::kpi_entries_of(member));
    let path = format!("/kpi/entries/{}", id);
    self.dash.write_ack(spec, self.dash.client().delete(&path)).await
  }

  // ==========================================================================
  // Custom metrics
  // ==========================================================================

  pub fn metrics(&self) -> Query<Vec<CustomMetric>> {
    self
      .dash
      .list_query(ResourceKey::Metrics, "/kpi/metrics".to_string(), Vec::new())
  }

  /// Metric changes alter how every entry renders, so entries refresh too.
  fn metric_spec(success: &'static str, error: &'static str) -> MutationSpec {
    MutationSpec::new(success, error)
      .invalidates(scope::all(KPI_METRICS))
      .invalidates(scope::all(KPI_ENTRIES))
  }

  pub async fn create_metric(&self, input: &MetricInput) -> Result<Option<CustomMetric>, ApiError> {
    require(input.name.as_deref(), "Metric name")?;
    if input.kind.is_none() {
      return Err(ApiError::Validation("Metric type is required".to_string()));
    }
    let spec = Self::metric_spec("Metric created", "Failed to create metric");
    self
      .dash
      .write(spec, self.dash.client().post("/kpi/metrics", input))
      .await
  }

  pub async fn update_metric(
    &self,
    id: &str,
    input: &MetricInput,
  ) -> Result<Option<CustomMetric>, ApiError> {
    let spec = Self::metric_spec("Metric updated", "Failed to update metric");
    let path = format!("/kpi/metrics/{}", id);
    self
      .dash
      .write(spec, self.dash.client().patch(&path, input))
      .await
  }

  pub async fn delete_metric(&self, id: &str) -> Result<(), ApiError> {
    let spec = Self::metric_spec("Metric deleted", "Failed to delete metric");
    let path = format!("/kpi/metrics/{}", id);
    self.dash.write_ack(spec, self.dash.client().delete(&path)).await
  }

  pub async fn move_metric(
    &self,
    metrics: &[CustomMetric],
    index: usize,
    direction: MoveDirection,
  ) -> Result<(), ApiError> {
    let updates = reorder_payload(metrics, index, direction)?;
    let spec = Self::metric_spec("Metric order updated", "Failed to reorder metrics");
    self
      .dash
      .write_ack(spec, self.dash.client().put("/kpi/metrics/reorder", &updates))
      .await
  }
}
