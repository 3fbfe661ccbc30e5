mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use opsdash::query::{Optimistic, ToggleOutcome};

use common::harness;

fn purchase(delivered: bool) -> serde_json::Value {
  json!({
    "id": "p1",
    "technicianId": "t1",
    "itemName": "Degreaser",
    "quantity": 2,
    "delivered": delivered
  })
}

#[tokio::test]
async fn test_delivered_toggle_keeps_value_on_success() {
  let server = MockServer::start().await;
  Mock::given(method("PATCH"))
    .and(path("/inventory/purchases/p1"))
    .and(body_json(json!({"delivered": true})))
    .respond_with(ResponseTemplate::new(200).set_body_json(purchase(true)))
    .expect(1)
    .mount(&server)
    .await;

  let mut h = harness(&server);
  let mut delivered = Optimistic::new(false);
  assert!(delivered.toggle(h.dash.technicians().set_delivered("t1", "p1")));
  assert!(*delivered.value());

  assert_eq!(delivered.settle().await, Some(ToggleOutcome::Committed(true)));
  assert!(*delivered.value());
  assert_eq!(
    common::notifications(&mut h.events),
    vec![common::success("Marked as delivered")]
  );
}

#[tokio::test]
async fn test_delivered_toggle_commits_on_no_content() {
  let server = MockServer::start().await;
  Mock::given(method("PATCH"))
    .and(path("/inventory/purchases/p1"))
    .respond_with(ResponseTemplate::new(204))
    .expect(1)
    .mount(&server)
    .await;

  let mut h = harness(&server);
  let mut delivered = Optimistic::new(true);
  delivered.toggle(h.dash.technicians().set_delivered("t1", "p1"));

  assert_eq!(delivered.settle().await, Some(ToggleOutcome::Committed(false)));
  assert!(!*delivered.value());
  assert_eq!(
    common::notifications(&mut h.events),
    vec![common::success("Marked as not delivered")]
  );
}

#[tokio::test]
async fn test_delivered_toggle_rolls_back_on_failure() {
  let server = MockServer::start().await;
  Mock::given(method("PATCH"))
    .and(path("/inventory/purchases/p1"))
    .respond_with(ResponseTemplate::new(500))
    .expect(1)
    .mount(&server)
    .await;

  let mut h = harness(&server);
  let mut delivered = Optimistic::new(true);
  delivered.toggle(h.dash.technicians().set_delivered("t1", "p1"));
  assert!(!*delivered.value());

  match delivered.settle().await {
    Some(ToggleOutcome::RolledBack { value, .. }) => assert!(value),
    other => panic!("expected rollback, got {:?}", other),
  }
  assert!(*delivered.value());
  assert_eq!(
    common::notifications(&mut h.events),
    vec![common::error("Failed to update delivery status")]
  );
}
