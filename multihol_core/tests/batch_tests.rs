//! Batch controller tests: pagination, filtering, backup and execution

use multihol_core::catalog::CatalogError;
use multihol_core::{
    BackupWriter, BatchController, Error, HoldingDescriptor, Item, MoveConfig, MoveFailure,
    MoveOutcome,
};
use multihol_test_utils::{ItemBuilder, MockCatalogService, errors, holding_marcxml};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

const BIB: &str = "990006489880203339";
const TARGET: &str = "22312549980003339";

fn depot_items(count: usize) -> Vec<Item> {
    (0..count)
        .map(|i| ItemBuilder::new(&format!("A{i:04}")).build())
        .collect()
}

fn mock_with(items: Vec<Item>) -> MockCatalogService {
    MockCatalogService::new()
        .with_holding(BIB, TARGET, holding_marcxml("BDEPO", "DHB40", "II 140137"))
        .with_items(items)
}

fn controller(mock: &MockCatalogService, backups: &TempDir) -> BatchController {
    BatchController::new(
        Arc::new(mock.clone()),
        MoveConfig::immediate(),
        BackupWriter::new(backups.path()),
    )
}

#[tokio::test]
async fn test_pagination_fetches_exactly_the_reported_pages() {
    let temp = TempDir::new().unwrap();
    let mock = mock_with(depot_items(106));

    let plan = controller(&mock, &temp).prepare(BIB, TARGET).await.unwrap();

    assert_eq!(mock.fetch_offsets(), vec![0, 100]);
    assert_eq!(plan.fetched, 106);
    let barcodes: HashSet<_> = plan.candidates.iter().map(|i| i.barcode()).collect();
    assert_eq!(barcodes.len(), 106);
}

#[tokio::test]
async fn test_single_page_when_total_fits() {
    for count in [0, 1, 100] {
        let temp = TempDir::new().unwrap();
        let mock = mock_with(depot_items(count));

        let plan = controller(&mock, &temp).prepare(BIB, TARGET).await.unwrap();

        assert_eq!(mock.fetch_offsets(), vec![0], "total {count}");
        assert_eq!(plan.fetched, count);
    }
}

#[tokio::test]
async fn test_reported_total_drives_page_count() {
    let temp = TempDir::new().unwrap();
    let mock = mock_with(depot_items(50)).with_reported_total(250);

    controller(&mock, &temp).prepare(BIB, TARGET).await.unwrap();

    assert_eq!(mock.fetch_offsets(), vec![0, 100, 200]);
}

#[tokio::test]
async fn test_only_matching_items_become_candidates() {
    let temp = TempDir::new().unwrap();
    let items = vec![
        ItemBuilder::new("MATCH").build(),
        ItemBuilder::new("OTHER-LIB").library("BZENT").build(),
        ItemBuilder::new("OTHER-LOC").location("DHB41").build(),
        ItemBuilder::new("OTHER-CN").holding("22200000000003339", "II 14013").build(),
        ItemBuilder::new("ALT-MATCH")
            .holding("22200000000003339", "X 1")
            .alternative_call_number("Y 2 ; II 140137/5")
            .build(),
    ];
    let mock = mock_with(items);

    let plan = controller(&mock, &temp).prepare(BIB, TARGET).await.unwrap();

    let barcodes: Vec<_> = plan.candidates.iter().map(|i| i.barcode()).collect();
    assert_eq!(barcodes, vec!["MATCH", "ALT-MATCH"]);
    assert_eq!(plan.fetched, 5);
    assert_eq!(
        plan.descriptor,
        HoldingDescriptor::new("BDEPO", "DHB40", "II 140137")
    );
}

#[tokio::test]
async fn test_backup_holds_unmodified_candidates() {
    let temp = TempDir::new().unwrap();
    let mock = mock_with(vec![ItemBuilder::new("A0001").build()]);
    let controller = controller(&mock, &temp);

    let plan = controller.prepare(BIB, TARGET).await.unwrap();
    let backup_path = plan.backup_path.clone();
    controller.execute(plan, |_| {}).await;

    let backed_up: Vec<Item> =
        serde_json::from_slice(&std::fs::read(&backup_path).unwrap()).unwrap();
    assert_eq!(backed_up, vec![ItemBuilder::new("A0001").build()]);
    assert_eq!(backed_up[0].item_data.policy.value, "07");
}

#[tokio::test]
async fn test_execute_updates_and_moves_candidates() {
    let temp = TempDir::new().unwrap();
    let mock = mock_with(vec![
        ItemBuilder::new("A0001").build(),
        ItemBuilder::new("A0002")
            .alternative_call_number("HB20-918")
            .holding("22200000000003339", "II 140137, 220")
            .build(),
    ]);

    let report = controller(&mock, &temp).run(BIB, TARGET).await.unwrap();

    assert_eq!(report.moved(), 2);
    assert!(!report.has_failures());

    let created = mock.created_items();
    assert_eq!(created[0].item_data.alternative_call_number, "II 140137/219");
    assert_eq!(created[0].item_data.alternative_call_number_type.value, "8");
    assert_eq!(
        created[1].item_data.alternative_call_number,
        "HB20-918 ; II 140137/220"
    );
    for item in &created {
        assert!(item.item_data.policy.is_empty());
        assert_eq!(item.item_data.physical_material_type.value, "ISSBD");
    }
}

#[tokio::test]
async fn test_item_failure_does_not_stop_batch() {
    let temp = TempDir::new().unwrap();
    let mock = mock_with(depot_items(3));
    mock.push_delete(Err(errors::unexpected()));
    let controller = controller(&mock, &temp);

    let plan = controller.prepare(BIB, TARGET).await.unwrap();
    let mut observed = Vec::new();
    let report = controller
        .execute(plan, |result| observed.push(result.barcode.clone()))
        .await;

    assert_eq!(observed, vec!["A0000", "A0001", "A0002"]);
    assert_eq!(report.moved(), 2);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.results[0].outcome,
        MoveOutcome::Failed {
            reason: MoveFailure::Unexpected,
            ..
        }
    ));
    assert_eq!(report.orphaned().count(), 0);
}

#[tokio::test]
async fn test_orphaned_items_are_reported() {
    let temp = TempDir::new().unwrap();
    let mock = mock_with(depot_items(1));
    mock.fail_creates(5, errors::barcode_conflict());

    let report = controller(&mock, &temp).run(BIB, TARGET).await.unwrap();

    let orphaned: Vec<_> = report.orphaned().map(|r| r.barcode.as_str()).collect();
    assert_eq!(orphaned, vec!["A0000"]);
}

#[tokio::test]
async fn test_malformed_holding_is_fatal() {
    let temp = TempDir::new().unwrap();
    let mock = MockCatalogService::new()
        .with_holding(BIB, TARGET, "<holding><record/></holding>")
        .with_items(depot_items(3));

    let error = controller(&mock, &temp)
        .prepare(BIB, TARGET)
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Descriptor { .. }));
    assert!(error.is_fatal());
    assert!(mock.fetch_offsets().is_empty());
}

#[tokio::test]
async fn test_unreachable_holding_is_a_catalog_error() {
    let temp = TempDir::new().unwrap();
    let mock = MockCatalogService::new().with_holding_error(
        BIB,
        TARGET,
        CatalogError::transport("connection refused"),
    );

    let error = controller(&mock, &temp)
        .prepare(BIB, TARGET)
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Catalog(CatalogError::Transport { .. })));
}

#[tokio::test]
async fn test_page_failure_is_fatal_and_nothing_is_backed_up() {
    let temp = TempDir::new().unwrap();
    let mock = mock_with(depot_items(150)).with_page_error(100, errors::unexpected());

    let error = controller(&mock, &temp)
        .prepare(BIB, TARGET)
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Fetch { offset: 100, .. }));
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    assert_eq!(mock.delete_count(), 0);
}
