//! Technicians and their monthly purchases.

use futures::future::{BoxFuture, FutureExt};

use crate::api::ApiError;
use crate::query::{MutationSpec, Query};

use super::keys::{scope, ResourceKey, PURCHASES, TECHNICIANS};
use super::types::{MonthYear, Purchase, PurchaseInput, Technician, TechnicianInput};
use super::{require, Dashboard};

pub struct Technicians<'a> {
  dash: &'a Dashboard,
}

impl<'a> Technicians<'a> {
  pub(super) fn new(dash: &'a Dashboard) -> Self {
    Self { dash }
  }

  pub fn list(&self) -> Query<Vec<Technician>> {
    self.dash.list_query(
      ResourceKey::Technicians,
      "/inventory/technicians".to_string(),
      Vec::new(),
    )
  }

  pub fn get(&self, id: &str) -> Query<Technician> {
    self.dash.entity_query(
      ResourceKey::Technician { id: id.to_string() },
      "Technician",
      id.to_string(),
      format!("/inventory/technicians/{}", id),
    )
  }

  pub async fn create(&self, input: &TechnicianInput) -> Result<Option<Technician>, ApiError> {
    require(input.name.as_deref(), "Technician name")?;
    let spec = MutationSpec::new("Technician added", "Failed to add technician")
      .invalidates(scope::all(TECHNICIANS));
    self
      .dash
      .write(spec, self.dash.client().post("/inventory/technicians", input))
      .await
  }

  pub async fn update(
    &self,
    id: &str,
    input: &TechnicianInput,
  ) -> Result<Option<Technician>, ApiError> {
    let spec = MutationSpec::new("Technician updated", "Failed to update technician")
      .invalidates(scope::all(TECHNICIANS));
    let path = format!("/inventory/technicians/{}", id);
    self
      .dash
      .write(spec, self.dash.client().patch(&path, input))
      .await
  }

  /// Removing a technician also drops their purchases.
  pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
    let spec = MutationSpec::new("Technician removed", "Failed to remove technician")
      .invalidates(scope::all(TECHNICIANS))
      .invalidates(scope::purchases_of(id));
    let path = format!("/inventory/technicians/{}", id);
    self.dash.write_ack(spec, self.dash.client().delete(&path)).await
  }

  // ==========================================================================
  // Purchases
  // ==========================================================================

  /// A technician's purchases in one month. Disabled until both the
  /// technician and the month are known.
  pub fn purchases(&self, technician: Option<&str>, period: Option<MonthYear>) -> Query<Vec<Purchase>> {
    let (technician, period) = match (technician.filter(|t| !t.is_empty()), period) {
      (Some(t), Some(p)) => (t, p),
      _ => return self.dash.disabled_query(PURCHASES),
    };

    self.dash.list_query(
      ResourceKey::Purchases {
        technician: technician.to_string(),
        period,
      },
      format!("/inventory/technicians/{}/purchases", technician),
      vec![
        ("month", period.month.to_string()),
        ("year", period.year.to_string()),
      ],
    )
  }

  pub async fn create_purchase(
    &self,
    technician: &str,
    input: &PurchaseInput,
  ) -> Result<Option<Purchase>, ApiError> {
    require(input.item_name.as_deref(), "Item name")?;
    let spec = MutationSpec::new("Purchase recorded", "Failed to record purchase")
      .invalidates(scope::purchases_of(technician));
    let path = format!("/inventory/technicians/{}/purchases", technician);
    self
      .dash
      .write(spec, self.dash.client().post(&path, input))
      .await
  }

  pub async fn update_purchase(
    &self,
    technician: &str,
    id: &str,
    input: &PurchaseInput,
  ) -> Result<Option<Purchase>, ApiError> {
    let spec = MutationSpec::new("Purchase updated", "Failed to update purchase")
      .invalidates(scope::purchases_of(technician));
    let path = format!("/inventory/purchases/{}", id);
    self
      .dash
      .write(spec, self.dash.client().patch(&path, input))
      .await
  }

  pub async fn delete_purchase(&self, technician: &str, id: &str) -> Result<(), ApiError> {
    let spec = MutationSpec::new("Purchase deleted", "Failed to delete purchase")
      .invalidates(scope::purchases_of(technician));
    let path = format!("/inventory/purchases/{}", id);
    self.dash.write_ack(spec, self.dash.client().delete(&path)).await
  }

  /// Write for the delivered checkbox, owned so it can run detached behind
  /// an [`Optimistic`](crate::query::Optimistic) value.
  pub fn set_delivered(
    &self,
    technician: &str,
    id: &str,
  ) -> impl FnOnce(bool) -> BoxFuture<'static, Result<(), ApiError>> {
    let dash = self.dash.clone();
    let technician = technician.to_string();
    let id = id.to_string();
    move |delivered| {
      async move {
        let spec = MutationSpec::new(
          if delivered {
            "Marked as delivered"
          } else {
            "Marked as not delivered"
          },
          "Failed to update delivery status",
        )
        .invalidates(scope::purchases_of(&technician));
        let input = PurchaseInput {
          delivered: Some(delivered),
          ..Default::default()
        };
        let path = format!("/inventory/purchases/{}", id);
        dash
          .write_ack(spec, dash.client().patch(&path, &input))
          .await
      }
      .boxed()
    }
  }
}
