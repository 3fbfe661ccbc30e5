//! Move-by-one reordering for lists with a server-side display order.
//!
//! The backend only accepts absolute `{id, displayOrder}` assignments, so a
//! "move up" is computed here by exchanging the order values of the item and
//! its neighbour.

use serde::{Deserialize, Serialize};

/// Anything shown in a user-orderable list
pub trait Orderable {
  fn id(&self) -> &str;
  fn display_order(&self) -> i64;
}

/// One entry of a reorder payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
  pub id: String,
  pub display_order: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
  Up,
  Down,
}

/// `items` in display order. The sort is stable, so ties keep server order.
pub fn sorted_by_order<T: Orderable + Clone>(items: &[T]) -> Vec<T> {
  let mut sorted = items.to_vec();
  sorted.sort_by_key(|item| item.display_order());
  sorted
}

/// Compute the payload for moving `items[index]` one position.
///
/// `items` is the list as currently displayed. The result lists every item in
/// that same order; only the moved item and its neighbour have their order
/// values exchanged. Returns `None` when the move would leave the list.
pub fn move_item<T: Orderable>(
  items: &[T],
  index: usize,
  direction: MoveDirection,
) -> Option<Vec<OrderUpdate>> {
  if index >= items.len() {
    return None;
  }
  let neighbour = match direction {
    MoveDirection::Up => index.checked_sub(1)?,
    MoveDirection::Down => Some(index + 1).filter(|&i| i < items.len())?,
  };

  let updates = items
    .iter()
    .enumerate()
    .map(|(i, item)| {
      let display_order = if i == index {
        items[neighbour].display_order()
      } else if i == neighbour {
        items[index].display_order()
      } else {
        item.display_order()
      };
      OrderUpdate {
        id: item.id().to_string(),
        display_order,
      }
    })
    .collect();

  Some(updates)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[derive(Debug, Clone, PartialEq)]
  struct Row(&'static str, i64);

  impl Orderable for Row {
    fn id(&self) -> &str {
      self.0
    }

    fn display_order(&self) -> i64 {
      self.1
    }
  }

  fn update(id: &str, display_order: i64) -> OrderUpdate {
    OrderUpdate {
      id: id.to_string(),
      display_order,
    }
  }

  fn rows() -> Vec<Row> {
    vec![Row("A", 0), Row("B", 1), Row("C", 2)]
  }

  #[test]
  fn test_move_up_swaps_with_previous() {
    let updates = move_item(&rows(), 1, MoveDirection::Up).unwrap();
    assert_eq!(updates, vec![update("A", 1), update("B", 0), update("C", 2)]);
  }

  #[test]
  fn test_move_down_swaps_with_next() {
    let updates = move_item(&rows(), 1, MoveDirection::Down).unwrap();
    assert_eq!(updates, vec![update("A", 0), update("B", 2), update("C", 1)]);
  }

  #[test]
  fn test_sparse_order_values_are_exchanged_not_renumbered() {
    let items = vec![Row("A", 10), Row("B", 20), Row("C", 35)];
    let updates = move_item(&items, 2, MoveDirection::Up).unwrap();
    assert_eq!(updates, vec![update("A", 10), update("B", 35), update("C", 20)]);
  }

  #[test]
  fn test_moves_off_the_ends_are_rejected() {
    assert_eq!(move_item(&rows(), 0, MoveDirection::Up), None);
    assert_eq!(move_item(&rows(), 2, MoveDirection::Down), None);
    assert_eq!(move_item(&rows(), 7, MoveDirection::Up), None);
    assert_eq!(move_item::<Row>(&[], 0, MoveDirection::Down), None);
  }

  #[test]
  fn test_index_refers_to_display_order() {
    let served = vec![Row("C", 2), Row("A", 0), Row("B", 1), Row("D", 1)];
    let shown = sorted_by_order(&served);
    assert_eq!(shown, vec![Row("A", 0), Row("B", 1), Row("D", 1), Row("C", 2)]);

    let updates = move_item(&shown, 3, MoveDirection::Up).unwrap();
    assert_eq!(
      updates,
      vec![update("A", 0), update("B", 1), update("D", 2), update("C", 1)]
    );
  }

  #[test]
  fn test_payload_wire_shape() {
    let json = serde_json::to_value(update("A", 1)).unwrap();
    assert_eq!(json, serde_json::json!({"id": "A", "displayOrder": 1}));
  }
}
