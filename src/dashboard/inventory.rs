//! Inventory items, categories and stores.

use crate::api::ApiError;
use crate::query::{MutationSpec, Query};
use crate::reorder::{move_item, MoveDirection, OrderUpdate};

use super::keys::{scope, ResourceKey, INVENTORY_CATEGORIES, INVENTORY_ITEMS, INVENTORY_STORES};
use super::types::{
  CategoryInput, InventoryCategory, InventoryItem, InventoryItemInput, Store, StoreInput,
};
use super::{require, Dashboard};

pub struct Inventory<'a> {
  dash: &'a Dashboard,
}

impl<'a> Inventory<'a> {
  pub(super) fn new(dash: &'a Dashboard) -> Self {
    Self { dash }
  }

  // ==========================================================================
  // Items
  // ==========================================================================

  /// All items, or only those in `category`.
  pub fn items(&self, category: Option<&str>) -> Query<Vec<InventoryItem>> {
    let params = category
      .map(|c| vec![("categoryId", c.to_string())])
      .unwrap_or_default();
    self.dash.list_query(
      ResourceKey::InventoryItems {
        category: category.map(String::from),
      },
      "/inventory/items".to_string(),
      params,
    )
  }

  pub fn item(&self, id: &str) -> Query<InventoryItem> {
    self.dash.entity_query(
      ResourceKey::InventoryItem { id: id.to_string() },
      "Inventory item",
      id.to_string(),
      format!("/inventory/items/{}", id),
    )
  }

  pub async fn create_item(
    &self,
    input: &InventoryItemInput,
  ) -> Result<Option<InventoryItem>, ApiError> {
    require(input.name.as_deref(), "Item name")?;
    let spec = MutationSpec::new("Inventory item created", "Failed to create inventory item")
      .invalidates(scope::all(INVENTORY_ITEMS));
    self
      .dash
      .write(spec, self.dash.client().post("/inventory/items", input))
      .await
  }

  pub async fn update_item(
    &self,
    id: &str,
    input: &InventoryItemInput,
  ) -> Result<Option<InventoryItem>, ApiError> {
    let spec = MutationSpec::new("Inventory item updated", "Failed to update inventory item")
      .invalidates(scope::all(INVENTORY_ITEMS));
    let path = format!("/inventory/items/{}", id);
    self
      .dash
      .write(spec, self.dash.client().patch(&path, input))
      .await
  }

  pub async fn delete_item(&self, id: &str) -> Result<(), ApiError> {
    let spec = MutationSpec::new("Inventory item deleted", "Failed to delete inventory item")
      .invalidates(scope::all(INVENTORY_ITEMS));
    let path = format!("/inventory/items/{}", id);
    self.dash.write_ack(spec, self.dash.client().delete(&path)).await
  }

  /// Move `items[index]` one position and persist the new order.
  pub async fn move_item(
    &self,
    items: &[InventoryItem],
    index: usize,
    direction: MoveDirection,
  ) -> Result<(), ApiError> {
    let updates = reorder_payload(items, index, direction)?;
    let spec = MutationSpec::new("Item order updated", "Failed to reorder items")
      .invalidates(scope::all(INVENTORY_ITEMS));
    self
      .dash
      .write_ack(spec, self.dash.client().put("/inventory/items/reorder", &updates))
      .await
  }

  // ==========================================================================
  // Categories
  // ==========================================================================
  //
  // Item lists carry category names and ordering, so every category write
  // also invalidates them.

  pub fn categories(&self) -> Query<Vec<InventoryCategory>> {
    self.dash.list_query(
      ResourceKey::Categories,
      "/inventory/categories".to_string(),
      Vec::new(),
    )
  }

  pub async fn create_category(
    &self,
    input: &CategoryInput,
  ) -> Result<Option<InventoryCategory>, ApiError> {
    require(input.name.as_deref(), "Category name")?;
    let spec = MutationSpec::new("Category created", "Failed to create category")
      .invalidates(scope::all(INVENTORY_CATEGORIES))
      .invalidates(scope::all(INVENTORY_ITEMS));
    self
      .dash
      .write(spec, self.dash.client().post("/inventory/categories", input))
      .await
  }

  pub async fn update_category(
    &self,
    id: &str,
    input: &CategoryInput,
  ) -> Result<Option<InventoryCategory>, ApiError> {
    let spec = MutationSpec::new("Category updated", "Failed to update category")
      .invalidates(scope::all(INVENTORY_CATEGORIES))
      .invalidates(scope::all(INVENTORY_ITEMS));
    let path = format!("/inventory/categories/{}", id);
    self
      .dash
      .write(spec, self.dash.client().patch(&path, input))
      .await
  }

  pub async fn delete_category(&self, id: &str) -> Result<(), ApiError> {
    let spec = MutationSpec::new("Category deleted", "Failed to delete category")
      .invalidates(scope::all(INVENTORY_CATEGORIES))
      .invalidates(scope::all(INVENTORY_ITEMS));
    let path = format!("/inventory/categories/{}", id);
    self.dash.write_ack(spec, self.dash.client().delete(&path)).await
  }

  pub async fn move_category(
    &self,
    categories: &[InventoryCategory],
    index: usize,
    direction: MoveDirection,
  ) -> Result<(), ApiError> {
    let updates = reorder_payload(categories, index, direction)?;
    let spec = MutationSpec::new("Category order updated", "Failed to reorder categories")
      .invalidates(scope::all(INVENTORY_CATEGORIES))
      .invalidates(scope::all(INVENTORY_ITEMS));
    self
      .dash
      .write_ack(spec, self.dash.client().put("/inventory/categories/reorder", &updates))
      .await
  }

  // ==========================================================================
  // Stores
  // ==========================================================================

  pub fn stores(&self) -> Query<Vec<Store>> {
    self
      .dash
      .list_query(ResourceKey::Stores, "/inventory/stores".to_string(), Vec::new())
  }

  pub async fn create_store(&self, input: &StoreInput) -> Result<Option<Store>, ApiError> {
    require(input.name.as_deref(), "Store name")?;
    let spec = MutationSpec::new("Store added", "Failed to add store")
      .invalidates(scope::all(INVENTORY_STORES));
    self
      .dash
      .write(spec, self.dash.client().post("/inventory/stores", input))
      .await
  }

  pub async fn update_store(
    &self,
    id: &str,
    input: &StoreInput,
  ) -> Result<Option<Store>, ApiError> {
    let spec = MutationSpec::new("Store updated", "Failed to update store")
      .invalidates(scope::all(INVENTORY_STORES));
    let path = format!("/inventory/stores/{}", id);
    self
      .dash
      .write(spec, self.dash.client().patch(&path, input))
      .await
  }

  pub async fn delete_store(&self, id: &str) -> Result<(), ApiError> {
    let spec = MutationSpec::new("Store removed", "Failed to remove store")
      .invalidates(scope::all(INVENTORY_STORES));
    let path = format!("/inventory/stores/{}", id);
    self.dash.write_ack(spec, self.dash.client().delete(&path)).await
  }
}

/// Reorder payload, or a validation error for a move off either end.
pub(crate) fn reorder_payload<T: crate::reorder::Orderable>(
  items: &[T],
  index: usize,
  direction: MoveDirection,
) -> Result<Vec<OrderUpdate>, ApiError> {
  move_item(items, index, direction)
    .ok_or_else(|| ApiError::Validation("Item cannot be moved further".to_string()))
}
