use std::collections::HashSet;
use std::sync::Arc;
use chrono::NaiveDateTime;

use container_tracker::errors::TrackerError;
use container_tracker::models::{ContainerId, ContainerSize, Destination, NewShipment, ShipmentRecord, ShipmentStatus, TIMESTAMP_FORMAT};
use container_tracker::repositories::{header_row, Repository, ShipmentRepository};
use container_tracker::services::{MemorySheets, Row, SheetClient};

const SHEET: &str = "current_data";

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
}

fn row(cells: &[&str]) -> Row {
    cells.iter().map(|c| c.to_string()).collect()
}

fn create_mock_record(container_id: &str) -> ShipmentRecord {
    ShipmentRecord::register(
        NewShipment {
            container_id: container_id.to_string(),
            destination: Destination::BacNinh,
            size_feet: ContainerSize::Forty,
            seal_id: "SL-100".to_string(),
            registered_at: None,
        },
        at("2024-06-01 09:00:00"),
    ).unwrap()
}

fn create_store(rows: Vec<Row>) -> (Arc<MemorySheets>, ShipmentRepository) {
    let sheets = Arc::new(MemorySheets::with_sheets([(SHEET, rows)]));
    let client: Arc<dyn SheetClient> = sheets.clone();
    (sheets, ShipmentRepository::new(client, SHEET))
}

fn ids(records: &[ShipmentRecord]) -> Vec<&str> {
    records.iter().map(|r| r.container_id.as_str()).collect()
}

#[tokio::test]
async fn test_append_writes_header_into_empty_sheet() {
    let (sheets, store) = create_store(vec![]);
    store.append(&create_mock_record("ABCD1234567")).await.unwrap();

    let rows = sheets.rows(SHEET).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], header_row());
    assert_eq!(rows[1][0], "ABCD1234567");
}

#[tokio::test]
async fn test_list_all_keeps_sheet_order() {
    let (_, store) = create_store(vec![header_row()]);
    for id in ["BBBB0000002", "AAAA0000001", "CCCC0000003"] {
        store.append(&create_mock_record(id)).await.unwrap();
    }
    let records = store.list_all().await.unwrap();
    assert_eq!(ids(&records), vec!["BBBB0000002", "AAAA0000001", "CCCC0000003"]);
}

#[tokio::test]
async fn test_duplicate_append_changes_nothing() {
    let (sheets, store) = create_store(vec![header_row()]);
    store.append(&create_mock_record("ABCD1234567")).await.unwrap();
    let before = sheets.rows(SHEET).unwrap();

    let mut again = create_mock_record("ABCD1234567");
    again.seal_id = "OTHER".to_string();
    let err = store.append(&again).await.unwrap_err();

    assert!(matches!(err, TrackerError::DuplicateKey(id) if id == "ABCD1234567"));
    assert_eq!(sheets.rows(SHEET).unwrap(), before);
}

#[tokio::test]
async fn test_update_and_delete_by_position() {
    let (_, store) = create_store(vec![header_row()]);
    for id in ["AAAA0000001", "BBBB0000002", "CCCC0000003"] {
        store.append(&create_mock_record(id)).await.unwrap();
    }

    let mut second = create_mock_record("BBBB0000002");
    second.mark_completed(at("2024-06-01 12:00:00")).unwrap();
    store.update(1, &second).await.unwrap();
    store.delete(0).await.unwrap();

    let records = store.list_all().await.unwrap();
    assert_eq!(ids(&records), vec!["BBBB0000002", "CCCC0000003"]);
    assert_eq!(records[0].status(), ShipmentStatus::Completed);
    assert_eq!(records[0].completed_at(), Some(at("2024-06-01 12:00:00")));
}

#[tokio::test]
async fn test_positions_past_the_end_are_rejected() {
    let (sheets, store) = create_store(vec![header_row()]);
    store.append(&create_mock_record("AAAA0000001")).await.unwrap();
    let before = sheets.rows(SHEET).unwrap();

    let err = store.update(1, &create_mock_record("BBBB0000002")).await.unwrap_err();
    assert!(matches!(err, TrackerError::PositionOutOfRange { position: 1, len: 1 }));
    let err = store.delete(5).await.unwrap_err();
    assert!(matches!(err, TrackerError::PositionOutOfRange { position: 5, len: 1 }));
    assert_eq!(sheets.rows(SHEET).unwrap(), before);
}

#[tokio::test]
async fn test_update_rejects_key_of_another_row() {
    let (sheets, store) = create_store(vec![header_row()]);
    store.append(&create_mock_record("AAAA0000001")).await.unwrap();
    store.append(&create_mock_record("BBBB0000002")).await.unwrap();
    let before = sheets.rows(SHEET).unwrap();

    let err = store.update(1, &create_mock_record("AAAA0000001")).await.unwrap_err();
    assert!(matches!(err, TrackerError::DuplicateKey(ref id) if id == "AAAA0000001"));
    assert_eq!(sheets.rows(SHEET).unwrap(), before);

    // rewriting a row with its own key is still allowed
    let mut first = create_mock_record("AAAA0000001");
    first.seal_id = "SL-200".to_string();
    store.update(0, &first).await.unwrap();
    let records = store.list_all().await.unwrap();
    assert_eq!(ids(&records), vec!["AAAA0000001", "BBBB0000002"]);
    assert_eq!(records[0].seal_id, "SL-200");
}

#[tokio::test]
async fn test_key_addressed_writes_follow_shifted_rows() {
    let (_, store) = create_store(vec![header_row()]);
    for id in ["AAAA0000001", "BBBB0000002", "CCCC0000003"] {
        store.append(&create_mock_record(id)).await.unwrap();
    }
    let (position, mut third) = store.find(&ContainerId::parse("CCCC0000003").unwrap()).await.unwrap().unwrap();
    assert_eq!(position, 2);

    // another session removes a row above; the cached position is now stale
    store.delete(0).await.unwrap();

    third.seal_id = "NEW-SEAL".to_string();
    store.update_by_id(&third).await.unwrap();

    let records = store.list_all().await.unwrap();
    assert_eq!(ids(&records), vec!["BBBB0000002", "CCCC0000003"]);
    assert_eq!(records[0].seal_id, "SL-100");
    assert_eq!(records[1].seal_id, "NEW-SEAL");

    store.delete_by_id(&third.container_id).await.unwrap();
    assert_eq!(ids(&store.list_all().await.unwrap()), vec!["BBBB0000002"]);

    let err = store.delete_by_id(&third.container_id).await.unwrap_err();
    assert!(matches!(err, TrackerError::RecordNotFound(_)));
}

#[tokio::test]
async fn test_malformed_rows_are_skipped_but_kept() {
    let (sheets, store) = create_store(vec![
        header_row(),
        row(&["AAAA0000001", "베트남", "40", "S1", "pending", "2024-06-01 08:00:00"]),
        row(&["BROKEN-ID", "nowhere", "40", "S2", "pending", "2024-06-01 08:00:00"]),
        row(&["CCCC0000003", "북경", "20", "S3", "completed", "2024-06-01 08:00:00", "2024-06-01 10:00:00"]),
    ]);

    let records = store.list_all().await.unwrap();
    assert_eq!(ids(&records), vec!["AAAA0000001", "CCCC0000003"]);

    // the undecodable row still blocks its key and survives a rewrite
    let removed = store.remove_ids(&HashSet::from(["CCCC0000003".to_string()])).await.unwrap();
    assert_eq!(removed, 1);
    let rows = sheets.rows(SHEET).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2][0], "BROKEN-ID");
}

#[tokio::test]
async fn test_failed_remove_leaves_rows_in_place() {
    let (sheets, store) = create_store(vec![header_row()]);
    for id in ["AAAA0000001", "BBBB0000002", "CCCC0000003"] {
        store.append(&create_mock_record(id)).await.unwrap();
    }
    let before = sheets.rows(SHEET).unwrap();

    sheets.fail_writes_to(SHEET);
    let gone = HashSet::from(["BBBB0000002".to_string()]);
    assert!(store.remove_ids(&gone).await.is_err());
    assert_eq!(sheets.rows(SHEET).unwrap(), before);

    sheets.restore_writes();
    assert_eq!(store.remove_ids(&gone).await.unwrap(), 1);
    assert_eq!(ids(&store.list_all().await.unwrap()), vec!["AAAA0000001", "CCCC0000003"]);
    assert_eq!(sheets.rows(SHEET).unwrap().len(), 3);
}

#[tokio::test]
async fn test_legacy_rows_decode() {
    let (_, store) = create_store(vec![
        header_row(),
        row(&["AAAA0000001", "Hatack", "40.0", "0012", "선적완료", "2024-05-30"]),
        row(&["BBBB0000002", "흥옌", "20", "0013", "선적중", "2024-05-30 07:00:00", "2024-05-30 09:00:00"]),
    ]);

    let records = store.list_all().await.unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].destination, Destination::Hatack);
    assert_eq!(records[0].size_feet, ContainerSize::Forty);
    assert_eq!(records[0].seal_id, "0012");
    assert_eq!(records[0].status(), ShipmentStatus::Completed);
    assert_eq!(records[0].registered_at, at("2024-05-30 00:00:00"));
    assert_eq!(records[0].completed_at(), Some(at("2024-05-30 00:00:00")));

    assert_eq!(records[1].destination, Destination::HungYen);
    assert_eq!(records[1].status(), ShipmentStatus::Pending);
    assert_eq!(records[1].completed_at(), None);
}

#[tokio::test]
async fn test_replace_all_and_ensure_header() {
    let (sheets, store) = create_store(vec![]);
    store.ensure_header().await.unwrap();
    assert_eq!(sheets.rows(SHEET).unwrap(), vec![header_row()]);

    store.append(&create_mock_record("AAAA0000001")).await.unwrap();
    store.append(&create_mock_record("BBBB0000002")).await.unwrap();
    store.replace_all(&[create_mock_record("CCCC0000003")]).await.unwrap();

    assert_eq!(ids(&store.list_all().await.unwrap()), vec!["CCCC0000003"]);
    store.ensure_header().await.unwrap();
    assert_eq!(sheets.rows(SHEET).unwrap().len(), 2);
}
