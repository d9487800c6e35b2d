mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use sea_orm::EntityTrait;
use uuid::Uuid;

use common::TestApp;
use dispatch_api::{
    entities::inventory_item::{Entity as InventoryItemEntity, ItemKind},
    errors::ServiceError,
    services::dispatch::{CreateDispatchInput, DispatchLineInput, UpdateDispatchInput},
};

fn dispatch_input(lines: Vec<(Uuid, i32)>) -> CreateDispatchInput {
    CreateDispatchInput {
        destination: "Pune Plant".to_string(),
        customer_name: Some("Acme Industries".to_string()),
        address: None,
        contact_number: None,
        dispatch_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        delivery_date: None,
        transport_mode: None,
        vehicle_number: Some("MH12AB1234".to_string()),
        driver_name: None,
        driver_contact: None,
        dispatched_by: Some("tester".to_string()),
        remarks: None,
        lines: lines
            .into_iter()
            .map(|(item_id, quantity)| DispatchLineInput {
                item_id,
                item_code: None,
                item_name: None,
                item_type: None,
                quantity,
            })
            .collect(),
    }
}

// Scenario A: create consumes stock, delete restores it exactly.
#[tokio::test]
async fn create_then_delete_restores_stock() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("BO-001", "Hex Bolt M8", ItemKind::BoughtOut, 10)
        .await;

    let (header, lines) = app
        .state
        .services
        .dispatches
        .create_dispatch(dispatch_input(vec![(item, 4)]))
        .await
        .expect("create dispatch");

    assert_eq!(app.available(item).await, 6);
    assert_eq!(lines.len(), 1);
    assert_eq!(header.status, "Dispatched");

    let outcome = app
        .state
        .services
        .dispatches
        .delete_dispatch(header.id)
        .await
        .expect("delete dispatch");

    assert_eq!(outcome.restored_items, 1);
    assert_eq!(outcome.total_items, 1);
    assert!(outcome.warnings.is_empty());
    assert_eq!(app.available(item).await, 10);

    let gone = app
        .state
        .services
        .dispatches
        .get_dispatch(header.id)
        .await
        .expect("get");
    assert!(gone.is_none());
}

// Scenario B: insufficient WIP stock fails with the exact quantities and
// leaves stock untouched.
#[tokio::test]
async fn insufficient_stock_reports_quantities_and_leaves_stock() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("MF-001", "Gear Housing", ItemKind::Manufacturing, 5)
        .await;

    let err = app
        .state
        .services
        .dispatches
        .create_dispatch(dispatch_input(vec![(item, 8)]))
        .await
        .expect_err("create should fail");

    assert_matches!(
        err,
        ServiceError::InsufficientStock {
            available: 5,
            requested: 8,
            ..
        }
    );
    assert_eq!(app.available(item).await, 5);
}

// Scenario C: second line fails, the first line's reservation is rolled back.
#[tokio::test]
async fn failed_line_rolls_back_earlier_reservations() {
    let app = TestApp::new().await;
    let first = app
        .seed_item("BO-002", "Bearing 6204", ItemKind::BoughtOut, 10)
        .await;
    let second = app
        .seed_item("MF-002", "Shaft Assembly", ItemKind::Manufacturing, 2)
        .await;

    let err = app
        .state
        .services
        .dispatches
        .create_dispatch(dispatch_input(vec![(first, 4), (second, 5)]))
        .await
        .expect_err("create should fail on second line");

    assert_matches!(err, ServiceError::InsufficientStock { .. });
    assert_eq!(app.available(first).await, 10);
    assert_eq!(app.available(second).await, 2);
}

// Scenario D: delete proceeds even when a referenced item has vanished and
// reports the gap.
#[tokio::test]
async fn delete_with_vanished_item_reports_gap() {
    let app = TestApp::new().await;
    let kept = app
        .seed_item("BO-003", "Oil Seal", ItemKind::BoughtOut, 10)
        .await;
    let doomed = app
        .seed_item("MF-003", "Pump Rotor", ItemKind::Manufacturing, 10)
        .await;

    let (header, _) = app
        .state
        .services
        .dispatches
        .create_dispatch(dispatch_input(vec![(kept, 2), (doomed, 3)]))
        .await
        .expect("create dispatch");

    InventoryItemEntity::delete_by_id(doomed)
        .exec(&*app.state.db)
        .await
        .expect("remove inventory record");

    let outcome = app
        .state
        .services
        .dispatches
        .delete_dispatch(header.id)
        .await
        .expect("delete dispatch");

    assert_eq!(outcome.total_items, 2);
    assert_eq!(outcome.restored_items, 1);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].item_code, "MF-003");
    assert_eq!(outcome.warnings[0].quantity, 3);

    assert_eq!(app.available(kept).await, 10);
    assert!(app
        .state
        .services
        .dispatches
        .get_dispatch(header.id)
        .await
        .expect("get")
        .is_none());
}

// Scenario E: two concurrent creates competing for the same stock; exactly
// one wins and the loser leaves no trace.
#[tokio::test]
async fn concurrent_creates_serialize_on_stock() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("BO-004", "V-Belt B42", ItemKind::BoughtOut, 10)
        .await;

    let service_a = app.state.services.dispatches.clone();
    let service_b = app.state.services.dispatches.clone();

    let task_a =
        tokio::spawn(async move { service_a.create_dispatch(dispatch_input(vec![(item, 6)])).await });
    let task_b =
        tokio::spawn(async move { service_b.create_dispatch(dispatch_input(vec![(item, 6)])).await });

    let result_a = task_a.await.expect("task a");
    let result_b = task_b.await.expect("task b");

    let successes = [&result_a, &result_b]
        .iter()
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(successes, 1, "exactly one concurrent create must succeed");

    let failure = if result_a.is_err() { result_a } else { result_b };
    assert_matches!(
        failure.expect_err("one must fail"),
        ServiceError::InsufficientStock { .. }
    );

    assert_eq!(app.available(item).await, 4);
}

#[tokio::test]
async fn create_with_unknown_item_is_not_found() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .dispatches
        .create_dispatch(dispatch_input(vec![(Uuid::new_v4(), 1)]))
        .await
        .expect_err("create should fail");

    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn create_rejects_empty_line_list() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .dispatches
        .create_dispatch(dispatch_input(vec![]))
        .await
        .expect_err("create should fail");

    assert_matches!(err, ServiceError::ValidationError(_));
}

// Snapshot fields come from the ledger, not from caller-supplied values.
#[tokio::test]
async fn line_snapshot_comes_from_ledger() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("BO-005", "Grease Nipple", ItemKind::BoughtOut, 10)
        .await;

    let mut input = dispatch_input(vec![(item, 1)]);
    input.lines[0].item_code = Some("WRONG-CODE".to_string());
    input.lines[0].item_name = Some("Wrong Name".to_string());
    input.lines[0].item_type = Some("manufacturing".to_string());

    let (_, lines) = app
        .state
        .services
        .dispatches
        .create_dispatch(input)
        .await
        .expect("create dispatch");

    assert_eq!(lines[0].item_code, "BO-005");
    assert_eq!(lines[0].item_name, "Grease Nipple");
    assert_eq!(lines[0].item_kind, "bought_out");
}

#[tokio::test]
async fn metadata_update_is_applied_and_lines_stay_immutable() {
    let app = TestApp::new().await;
    let item = app
        .seed_item("BO-006", "Clamp Ring", ItemKind::BoughtOut, 10)
        .await;

    let (header, _) = app
        .state
        .services
        .dispatches
        .create_dispatch(dispatch_input(vec![(item, 2)]))
        .await
        .expect("create dispatch");

    let (updated, lines) = app
        .state
        .services
        .dispatches
        .update_dispatch(
            header.id,
            UpdateDispatchInput {
                status: Some("Delivered".to_string()),
                delivery_date: NaiveDate::from_ymd_opt(2025, 6, 3),
                driver_name: Some("R. Kulkarni".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update dispatch");

    assert_eq!(updated.status, "Delivered");
    assert_eq!(updated.driver_name, "R. Kulkarni");
    assert_eq!(lines.len(), 1);
    // Stock is untouched by metadata updates.
    assert_eq!(app.available(item).await, 8);

    // Attempting to change the line list is rejected, not ignored.
    let err = app
        .state
        .services
        .dispatches
        .update_dispatch(
            header.id,
            UpdateDispatchInput {
                items: Some(serde_json::json!([{ "item_id": item, "quantity": 99 }])),
                ..Default::default()
            },
        )
        .await
        .expect_err("line mutation must be rejected");
    assert_matches!(err, ServiceError::UnsupportedOperation(_));

    // Unknown status values are rejected.
    let err = app
        .state
        .services
        .dispatches
        .update_dispatch(
            header.id,
            UpdateDispatchInput {
                status: Some("Teleported".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect_err("unknown status must be rejected");
    assert_matches!(err, ServiceError::ValidationError(_));

    // Delivery date before the dispatch date is rejected.
    let err = app
        .state
        .services
        .dispatches
        .update_dispatch(
            header.id,
            UpdateDispatchInput {
                delivery_date: NaiveDate::from_ymd_opt(2025, 5, 1),
                ..Default::default()
            },
        )
        .await
        .expect_err("early delivery date must be rejected");
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn update_and_delete_missing_dispatch_are_not_found() {
    let app = TestApp::new().await;
    let missing = Uuid::new_v4();

    let err = app
        .state
        .services
        .dispatches
        .update_dispatch(missing, UpdateDispatchInput::default())
        .await
        .expect_err("update should fail");
    assert_matches!(err, ServiceError::NotFound(_));

    let err = app
        .state
        .services
        .dispatches
        .delete_dispatch(missing)
        .await
        .expect_err("delete should fail");
    assert_matches!(err, ServiceError::NotFound(_));
}

// Conservation: across a create/delete lifecycle the net stock change is
// zero for every item that still exists.
#[tokio::test]
async fn lifecycle_conserves_stock_across_items() {
    let app = TestApp::new().await;
    let a = app
        .seed_item("BO-007", "Spacer 5mm", ItemKind::BoughtOut, 25)
        .await;
    let b = app
        .seed_item("MF-007", "Bracket Weldment", ItemKind::Manufacturing, 14)
        .await;

    let mut dispatch_ids = Vec::new();
    for quantity in [3, 5, 2] {
        let (header, _) = app
            .state
            .services
            .dispatches
            .create_dispatch(dispatch_input(vec![(a, quantity), (b, quantity)]))
            .await
            .expect("create dispatch");
        dispatch_ids.push(header.id);
    }

    assert_eq!(app.available(a).await, 15);
    assert_eq!(app.available(b).await, 4);

    for id in dispatch_ids {
        app.state
            .services
            .dispatches
            .delete_dispatch(id)
            .await
            .expect("delete dispatch");
    }

    assert_eq!(app.available(a).await, 25);
    assert_eq!(app.available(b).await, 14);
}
