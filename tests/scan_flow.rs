mod support;

use chrono::{NaiveDate, NaiveDateTime};
use safepass::alerts::{notify_unscanned, unscanned_students, MissedType};
use safepass::backend::MemoryBackend;
use safepass::cache::DomainCache;
use safepass::clock::SchoolClock;
use safepass::error::ApiError;
use safepass::models::ScanAction;
use safepass::scan::{submit_scan, AllergyBoard, ScanRequest};
use safepass::session::demo_user;
use safepass::settings::NotificationSettings;
use std::sync::Arc;
use support::{student, RecordingFunctions};

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 2)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn request(student_id: &str, location: &str, action: ScanAction) -> ScanRequest {
    ScanRequest {
        student_id: student_id.to_string(),
        location: location.to_string(),
        action,
        notes: None,
    }
}

async fn cache_with(students: Vec<safepass::models::Student>) -> (Arc<MemoryBackend>, DomainCache) {
    let backend = Arc::new(MemoryBackend::with_students(students));
    let cache = DomainCache::new(backend.clone());
    cache.refresh().await.unwrap();
    (backend, cache)
}

#[tokio::test]
async fn allergic_student_gets_one_alert_and_one_notification() {
    let (_, cache) = cache_with(vec![student("STU001", "Sam Lee", &["Peanuts"])]).await;
    let functions = RecordingFunctions::default();
    let board = AllergyBoard::new();
    let teacher = demo_user("teacher").unwrap();

    let outcome = submit_scan(
        &cache,
        &functions,
        &board,
        &NotificationSettings::default(),
        &teacher,
        request("STU001", "Bus #1", ScanAction::In),
        at(7, 0),
    )
    .await
    .unwrap();

    assert_eq!(cache.scan_logs().await.len(), 1);
    assert_eq!(outcome.event.scanned_by, "Teacher User");
    let alert = outcome.allergy_alert.expect("allergy alert");
    assert_eq!(alert.allergies, vec!["Peanuts"]);
    assert!(outcome.nurse_notified);

    assert_eq!(board.active(at(7, 0)).await.len(), 1);
    let calls = functions.allergy_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].student_name, "Sam Lee");
    assert_eq!(calls[0].location, "Bus #1");
    assert_eq!(calls[0].scanned_by, "Teacher User");
}

#[tokio::test]
async fn student_without_allergies_checks_out_quietly() {
    let (_, cache) = cache_with(vec![student("STU001", "Sam Lee", &[])]).await;
    let functions = RecordingFunctions::default();
    let board = AllergyBoard::new();

    let outcome = submit_scan(
        &cache,
        &functions,
        &board,
        &NotificationSettings::default(),
        &demo_user("driver").unwrap(),
        request("STU001", "Main Entrance", ScanAction::Out),
        at(17, 0),
    )
    .await
    .unwrap();

    assert_eq!(outcome.event.action, ScanAction::Out);
    assert!(outcome.allergy_alert.is_none());
    assert_eq!(cache.scan_logs().await.len(), 1);
    assert!(functions.allergy_calls().is_empty());
    assert!(board.active(at(17, 0)).await.is_empty());
}

#[tokio::test]
async fn failed_notification_keeps_the_scan() {
    let (_, cache) = cache_with(vec![student("STU001", "Sam Lee", &["Latex"])]).await;
    let functions = RecordingFunctions::failing();

    let outcome = submit_scan(
        &cache,
        &functions,
        &AllergyBoard::new(),
        &NotificationSettings::default(),
        &demo_user("nurse").unwrap(),
        request("STU001", "Cafeteria", ScanAction::In),
        at(11, 45),
    )
    .await
    .unwrap();

    assert!(!outcome.nurse_notified);
    assert!(outcome.allergy_alert.is_some());
    assert_eq!(functions.allergy_calls().len(), 1);
    assert_eq!(cache.scan_logs().await.len(), 1);
}

#[tokio::test]
async fn disabled_channels_skip_the_notification() {
    let (_, cache) = cache_with(vec![student("STU001", "Sam Lee", &["Peanuts"])]).await;
    let functions = RecordingFunctions::default();
    let off = NotificationSettings {
        email_enabled: false,
        sms_enabled: false,
        push_enabled: false,
    };

    let outcome = submit_scan(
        &cache,
        &functions,
        &AllergyBoard::new(),
        &off,
        &demo_user("monitor").unwrap(),
        request("STU001", "Bus #2", ScanAction::In),
        at(7, 10),
    )
    .await
    .unwrap();

    assert!(outcome.allergy_alert.is_some());
    assert!(!outcome.nurse_notified);
    assert!(functions.allergy_calls().is_empty());
}

#[tokio::test]
async fn unknown_student_records_nothing() {
    let (_, cache) = cache_with(vec![student("STU001", "Sam Lee", &["Peanuts"])]).await;
    let functions = RecordingFunctions::default();

    let err = submit_scan(
        &cache,
        &functions,
        &AllergyBoard::new(),
        &NotificationSettings::default(),
        &demo_user("teacher").unwrap(),
        request("STU999", "Bus #1", ScanAction::In),
        at(7, 0),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::NotFound(_)));
    assert!(cache.scan_logs().await.is_empty());
    assert!(functions.allergy_calls().is_empty());
}

#[tokio::test]
async fn backend_failure_leaves_cache_and_board_untouched() {
    let (backend, cache) = cache_with(vec![student("STU001", "Sam Lee", &["Peanuts"])]).await;
    backend.set_fail_writes(true);
    let functions = RecordingFunctions::default();
    let board = AllergyBoard::new();

    let err = submit_scan(
        &cache,
        &functions,
        &board,
        &NotificationSettings::default(),
        &demo_user("teacher").unwrap(),
        request("STU001", "Bus #1", ScanAction::In),
        at(7, 0),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::Internal(_)));
    assert!(cache.scan_logs().await.is_empty());
    assert!(board.active(at(7, 0)).await.is_empty());
    assert!(functions.allergy_calls().is_empty());
}

#[tokio::test]
async fn scanned_students_leave_the_unscanned_list() {
    let (_, cache) = cache_with(vec![
        student("STU001", "Sam Lee", &[]),
        student("STU002", "Ana Cruz", &[]),
    ])
    .await;
    let functions = RecordingFunctions::default();
    let clock = SchoolClock::default();

    submit_scan(
        &cache,
        &functions,
        &AllergyBoard::new(),
        &NotificationSettings::default(),
        &demo_user("driver").unwrap(),
        request("STU001", "Bus #1", ScanAction::In),
        at(7, 20),
    )
    .await
    .unwrap();

    let (students, scans) = cache.snapshot().await;
    let unscanned = unscanned_students(&students, &scans, &clock, at(9, 0));
    assert_eq!(unscanned.len(), 1);
    assert_eq!(unscanned[0].student.id, "STU002");
    assert_eq!(unscanned[0].missed_type, MissedType::Morning);

    let sent = notify_unscanned(
        &unscanned[0].student,
        &scans,
        &clock,
        at(9, 0),
        &functions,
        &NotificationSettings::default(),
    )
    .await
    .unwrap();
    assert!(sent);
    let calls = functions.attendance_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].notification_type, "morning");
    assert!(calls[0].message.contains("Ana Cruz"));

    let scanned = notify_unscanned(
        &students[1],
        &scans,
        &clock,
        at(9, 0),
        &functions,
        &NotificationSettings::default(),
    )
    .await;
    assert!(matches!(scanned, Err(ApiError::Validation(_))));
}
