//! Run-state store behavior: merge-on-reimport, fresh-wipe imports and the
//! operation log.

mod common;

use common::{scenario_records, scenario_target, test_store};
use sparepart_core::constants::status;
use sparepart_core::hierarchy::resolve;
use sparepart_core::models::OperationLogEntry;

#[tokio::test]
async fn reimport_without_execution_is_idempotent() {
    let harness = test_store().await;
    let target = scenario_target();

    let items = resolve(&scenario_records(), &target);
    harness
        .store
        .import(&target.asset_item, &target.asset_serial, items.clone())
        .await
        .unwrap();
    let first = harness
        .store
        .read_all(&target.asset_item, &target.asset_serial)
        .await
        .unwrap();

    harness
        .store
        .import(&target.asset_item, &target.asset_serial, items)
        .await
        .unwrap();
    let second = harness
        .store
        .read_all(&target.asset_item, &target.asset_serial)
        .await
        .unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.hierarchy_path, b.hierarchy_path);
        assert_eq!(a.sequence_number, b.sequence_number);
        assert_eq!(a.parent_item, b.parent_item);
        assert_eq!(a.parent_serial, b.parent_serial);
    }
}

#[tokio::test]
async fn merge_preserves_completed_steps_and_generated_values() {
    let harness = test_store().await;
    let target = scenario_target();

    harness
        .store
        .import(
            &target.asset_item,
            &target.asset_serial,
            resolve(&scenario_records(), &target),
        )
        .await
        .unwrap();

    let rows = harness
        .store
        .read_all(&target.asset_item, &target.asset_serial)
        .await
        .unwrap();
    let done = &rows[0];
    harness
        .store
        .update_column(done.id, "remove_status", status::OK)
        .await
        .unwrap();
    harness
        .store
        .update_column(done.id, "planned_operation", "990001")
        .await
        .unwrap();
    let errored = &rows[1];
    harness
        .store
        .update_column(errored.id, "remove_status", "ERROR: Serial number does not exist")
        .await
        .unwrap();

    harness
        .store
        .import(
            &target.asset_item,
            &target.asset_serial,
            resolve(&scenario_records(), &target),
        )
        .await
        .unwrap();

    let merged = harness
        .store
        .read_all(&target.asset_item, &target.asset_serial)
        .await
        .unwrap();
    let done_after = merged
        .iter()
        .find(|r| r.hierarchy_path == done.hierarchy_path)
        .unwrap();
    assert_eq!(done_after.remove_status.as_deref(), Some(status::OK));
    assert_eq!(done_after.planned_operation.as_deref(), Some("990001"));

    // Errored steps get another chance after a re-import.
    let errored_after = merged
        .iter()
        .find(|r| r.hierarchy_path == errored.hierarchy_path)
        .unwrap();
    assert_eq!(errored_after.remove_status, None);
}

#[tokio::test]
async fn empty_import_wipes_the_run() {
    let harness = test_store().await;
    let target = scenario_target();

    harness
        .store
        .import(
            &target.asset_item,
            &target.asset_serial,
            resolve(&scenario_records(), &target),
        )
        .await
        .unwrap();
    assert_eq!(
        harness
            .store
            .read_all(&target.asset_item, &target.asset_serial)
            .await
            .unwrap()
            .len(),
        3
    );

    harness
        .store
        .import(&target.asset_item, &target.asset_serial, Vec::new())
        .await
        .unwrap();
    assert!(harness
        .store
        .read_all(&target.asset_item, &target.asset_serial)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn imports_of_different_assets_are_disjoint() {
    let harness = test_store().await;
    let target_a = scenario_target();
    let mut target_b = scenario_target();
    target_b.asset_item = "WAGY".to_string();
    target_b.asset_serial = "OLD456".to_string();

    harness
        .store
        .import(
            &target_a.asset_item,
            &target_a.asset_serial,
            resolve(&scenario_records(), &target_a),
        )
        .await
        .unwrap();
    harness
        .store
        .import(
            &target_b.asset_item,
            &target_b.asset_serial,
            resolve(&scenario_records(), &target_b),
        )
        .await
        .unwrap();

    // Wiping one asset's run leaves the other untouched.
    harness
        .store
        .import(&target_a.asset_item, &target_a.asset_serial, Vec::new())
        .await
        .unwrap();
    assert_eq!(
        harness
            .store
            .read_all(&target_b.asset_item, &target_b.asset_serial)
            .await
            .unwrap()
            .len(),
        3
    );
}

#[tokio::test]
async fn unknown_columns_are_rejected() {
    let harness = test_store().await;
    let err = harness
        .store
        .update_column(1, "component_item; DROP TABLE renumber_items_test", "x")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not writable"));
}

#[tokio::test]
async fn operation_log_is_append_only() {
    let harness = test_store().await;
    let entry = OperationLogEntry::now(
        "test",
        "remove-component",
        "1-1",
        "WAGX",
        "OLD123",
        false,
        "MOS125MI",
        "Remove",
        true,
        None,
        Some("{\"results\":[]}".to_string()),
    );
    harness.store.append_log(&entry).await.unwrap();
    harness.store.append_log(&entry).await.unwrap();
    assert_eq!(harness.store.log_count().await.unwrap(), 2);
}
