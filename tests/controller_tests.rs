use std::sync::Arc;
use chrono::{Duration, NaiveDateTime};

use container_tracker::config::{SheetBackend, Settings};
use container_tracker::controllers::ShipmentController;
use container_tracker::errors::TrackerError;
use container_tracker::models::{ContainerSize, Destination, NewShipment, ShipmentEdit, ShipmentStatus, TIMESTAMP_FORMAT};
use container_tracker::repositories::header_row;
use container_tracker::services::{FixedClock, MemorySheets, SheetClient};

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
}

fn create_mock_settings() -> Settings {
    let mut settings = Settings::default();
    settings.sheets.backend = SheetBackend::Memory;
    settings
}

fn create_form(container_id: &str) -> NewShipment {
    NewShipment {
        container_id: container_id.to_string(),
        destination: Destination::Weihai,
        size_feet: ContainerSize::Twenty,
        seal_id: " 000123 ".to_string(),
        registered_at: None,
    }
}

async fn create_controller() -> (Arc<MemorySheets>, Arc<FixedClock>, ShipmentController) {
    let sheets = Arc::new(MemorySheets::new());
    let clock = Arc::new(FixedClock::new(at("2024-06-01 09:00:00")));
    let client: Arc<dyn SheetClient> = sheets.clone();
    let controller = ShipmentController::new(Arc::new(create_mock_settings()), client, clock.clone());
    controller.ensure_ready().await.unwrap();
    (sheets, clock, controller)
}

fn log_messages(sheets: &MemorySheets) -> Vec<String> {
    sheets.rows("update_log")
        .unwrap_or_default()
        .into_iter()
        .skip(1)
        .map(|row| row[1].clone())
        .collect()
}

#[tokio::test]
async fn test_ensure_ready_creates_main_sheet_once() {
    let (sheets, _, controller) = create_controller().await;
    assert_eq!(sheets.rows("current_data").unwrap(), vec![header_row()]);

    controller.ensure_ready().await.unwrap();
    assert_eq!(sheets.rows("current_data").unwrap(), vec![header_row()]);
}

#[tokio::test]
async fn test_register_complete_reopen_lifecycle() {
    let (_, clock, controller) = create_controller().await;

    let record = controller.register(create_form("ABCD1234567")).await.unwrap();
    assert_eq!(record.status(), ShipmentStatus::Pending);
    assert_eq!(record.registered_at, at("2024-06-01 09:00:00"));
    assert_eq!(record.completed_at(), None);
    assert_eq!(record.seal_id, "000123");

    let listed = controller.list().await.unwrap();
    assert_eq!(listed, vec![record.clone()]);

    clock.advance(Duration::hours(2));
    let completed = controller.complete("ABCD1234567").await.unwrap();
    assert_eq!(completed.status(), ShipmentStatus::Completed);
    assert_eq!(completed.completed_at(), Some(at("2024-06-01 11:00:00")));
    assert_eq!(controller.get("ABCD1234567").await.unwrap(), completed);

    clock.advance(Duration::minutes(5));
    let reopened = controller.reopen("ABCD1234567").await.unwrap();
    assert_eq!(reopened.status(), ShipmentStatus::Pending);
    assert_eq!(reopened.completed_at(), None);
    assert_eq!(reopened.registered_at, record.registered_at);
}

#[tokio::test]
async fn test_toggle_stamps_and_clears_completion() {
    let (_, clock, controller) = create_controller().await;
    controller.register(create_form("ABCD1234567")).await.unwrap();

    clock.set(at("2024-06-01 15:30:00"));
    let record = controller.toggle("ABCD1234567").await.unwrap();
    assert_eq!(record.completed_at(), Some(at("2024-06-01 15:30:00")));

    let record = controller.toggle("ABCD1234567").await.unwrap();
    assert_eq!(record.status(), ShipmentStatus::Pending);
    assert_eq!(record.completed_at(), None);
}

#[tokio::test]
async fn test_invalid_container_ids_are_rejected() {
    let (sheets, _, controller) = create_controller().await;

    for bad in ["abcd1234567", "ABC1234567", "ABCD123456", "ABCD12345678", "ABCD 1234567", "ＡＢＣＤ1234567"] {
        let err = controller.register(create_form(bad)).await.unwrap_err();
        assert!(matches!(err, TrackerError::InvalidContainerId(_)), "{:?} should be rejected", bad);
        assert!(err.is_validation());
    }
    let err = controller.register(create_form("")).await.unwrap_err();
    assert!(matches!(err, TrackerError::MissingField("container_id")));

    let mut form = create_form("ABCD1234567");
    form.seal_id = "   ".to_string();
    let err = controller.register(form).await.unwrap_err();
    assert!(matches!(err, TrackerError::MissingField("seal_id")));

    assert_eq!(sheets.rows("current_data").unwrap(), vec![header_row()]);
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let (sheets, _, controller) = create_controller().await;
    controller.register(create_form("ABCD1234567")).await.unwrap();
    let before = sheets.rows("current_data").unwrap();

    let err = controller.register(create_form("ABCD1234567")).await.unwrap_err();
    assert!(matches!(err, TrackerError::DuplicateKey(_)));
    assert_eq!(sheets.rows("current_data").unwrap(), before);
}

#[tokio::test]
async fn test_same_status_transition_is_rejected() {
    let (_, _, controller) = create_controller().await;
    controller.register(create_form("ABCD1234567")).await.unwrap();

    let err = controller.reopen("ABCD1234567").await.unwrap_err();
    assert!(matches!(err, TrackerError::InvalidTransition { from: ShipmentStatus::Pending, to: ShipmentStatus::Pending, .. }));

    controller.complete("ABCD1234567").await.unwrap();
    let err = controller.complete("ABCD1234567").await.unwrap_err();
    assert!(matches!(err, TrackerError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_edit_updates_fields_and_status() {
    let (_, clock, controller) = create_controller().await;
    controller.register(create_form("ABCD1234567")).await.unwrap();
    controller.register(create_form("EFGH7654321")).await.unwrap();

    clock.set(at("2024-06-01 10:15:00"));
    let edit = ShipmentEdit {
        destination: Some(Destination::Beijing),
        size_feet: Some(ContainerSize::Forty),
        seal_id: Some("S-9".to_string()),
        status: Some(ShipmentStatus::Completed),
        registered_at: None,
    };
    let edited = controller.edit("EFGH7654321", edit).await.unwrap();
    assert_eq!(edited.destination, Destination::Beijing);
    assert_eq!(edited.size_feet, ContainerSize::Forty);
    assert_eq!(edited.seal_id, "S-9");
    assert_eq!(edited.completed_at(), Some(at("2024-06-01 10:15:00")));

    // the other record is untouched
    let first = controller.get("ABCD1234567").await.unwrap();
    assert_eq!(first.destination, Destination::Weihai);

    let err = controller
        .edit("EFGH7654321", ShipmentEdit { seal_id: Some(String::new()), ..ShipmentEdit::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::MissingField("seal_id")));
}

#[tokio::test]
async fn test_registration_date_can_be_given_and_edited() {
    let (sheets, _, controller) = create_controller().await;
    let form = NewShipment { registered_at: Some(at("2024-05-30 08:00:00")), ..create_form("ABCD1234567") };
    let record = controller.register(form).await.unwrap();
    assert_eq!(record.registered_at, at("2024-05-30 08:00:00"));

    let edit = ShipmentEdit { registered_at: Some(at("2024-05-29 00:00:00")), ..ShipmentEdit::default() };
    let edited = controller.edit("ABCD1234567", edit).await.unwrap();
    assert_eq!(edited.registered_at, at("2024-05-29 00:00:00"));
    assert_eq!(sheets.rows("current_data").unwrap()[1][5], "2024-05-29 00:00:00");
}

#[tokio::test]
async fn test_delete_and_missing_records() {
    let (_, _, controller) = create_controller().await;
    controller.register(create_form("ABCD1234567")).await.unwrap();
    controller.register(create_form("EFGH7654321")).await.unwrap();

    controller.delete("ABCD1234567").await.unwrap();
    let ids: Vec<String> = controller.list().await.unwrap().iter().map(|r| r.container_id.to_string()).collect();
    assert_eq!(ids, vec!["EFGH7654321"]);

    assert!(matches!(controller.delete("ABCD1234567").await, Err(TrackerError::RecordNotFound(_))));
    assert!(matches!(controller.complete("ZZZZ0000000").await, Err(TrackerError::RecordNotFound(_))));
}

#[tokio::test]
async fn test_summary_and_barcode_candidates() {
    let (_, _, controller) = create_controller().await;
    for id in ["AAAA0000001", "BBBB0000002", "CCCC0000003"] {
        controller.register(create_form(id)).await.unwrap();
    }
    controller.complete("BBBB0000002").await.unwrap();

    let summary = controller.summary().await.unwrap();
    assert_eq!((summary.total, summary.pending, summary.completed), (3, 2, 1));

    let labels = controller.barcode_candidates().await.unwrap();
    let payloads: Vec<&str> = labels.iter().map(|l| l.payload.as_str()).collect();
    assert_eq!(payloads, vec!["AAAA0000001", "CCCC0000003"]);
    assert_eq!(labels[0].destination, "위해");
    assert_eq!(labels[0].size_feet, 20);
}

#[tokio::test]
async fn test_change_log_records_each_change() {
    let (sheets, clock, controller) = create_controller().await;
    controller.register(create_form("ABCD1234567")).await.unwrap();
    clock.advance(Duration::minutes(1));
    controller.complete("ABCD1234567").await.unwrap();
    controller.delete("ABCD1234567").await.unwrap();

    let log = sheets.rows("update_log").unwrap();
    assert_eq!(log[0], vec!["timestamp".to_string(), "message".to_string()]);
    assert_eq!(log[1][0], "2024-06-01 09:00:00");
    assert_eq!(log_messages(&sheets), vec![
        "register: ABCD1234567",
        "status: ABCD1234567 pending -> completed",
        "delete: ABCD1234567",
    ]);

    let history = controller.history(2).await.unwrap();
    let messages: Vec<&str> = history.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["status: ABCD1234567 pending -> completed", "delete: ABCD1234567"]);
    assert_eq!(history[0].logged_at, at("2024-06-01 09:01:00"));
}

#[tokio::test]
async fn test_change_log_failure_does_not_fail_the_change() {
    let (sheets, _, controller) = create_controller().await;
    sheets.fail_writes_to("update_log");

    controller.register(create_form("ABCD1234567")).await.unwrap();
    assert_eq!(controller.list().await.unwrap().len(), 1);
    assert!(sheets.rows("update_log").is_none());
}

#[tokio::test]
async fn test_store_failure_surfaces() {
    let (sheets, _, controller) = create_controller().await;
    sheets.fail_writes_to("current_data");

    let err = controller.register(create_form("ABCD1234567")).await.unwrap_err();
    assert!(matches!(err, TrackerError::SheetApi { status: 503, .. }));
    assert!(!err.is_validation());
}

#[tokio::test]
async fn test_export_writes_csv() {
    let (_, _, controller) = create_controller().await;
    controller.register(create_form("ABCD1234567")).await.unwrap();
    controller.register(create_form("EFGH7654321")).await.unwrap();
    controller.complete("EFGH7654321").await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("containers.csv");
    let written = controller.export(&path).await.unwrap();
    assert_eq!(written, 2);

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "container_id,destination,size_feet,seal_id,status,registered_at,completed_at");
    assert_eq!(lines[1], "ABCD1234567,위해,20,000123,pending,2024-06-01 09:00:00,");
    assert_eq!(lines[2], "EFGH7654321,위해,20,000123,completed,2024-06-01 09:00:00,2024-06-01 09:00:00");
}
