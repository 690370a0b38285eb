use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::json;

use super::common::*;

use crate::assessment::dispatch::{Dispatcher, FixedSlotPicker};
use crate::assessment::domain::UserId;
use crate::assessment::service::AssessmentService;
use crate::assessment::scoring::WellnessScore;
use crate::assessment::store::{
    HelperCertificationRecord, InMemoryStore, JsonFileStore, StoreError, StoreKey, UserStore,
    UserStoreExt, WellnessScoreRecord,
};

static FILE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn scratch_path() -> std::path::PathBuf {
    let id = FILE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "mindhelp-store-{}-{id}/store.json",
        std::process::id()
    ))
}

fn sessions_for_zero_score() -> Vec<crate::assessment::dispatch::SessionRecord> {
    Dispatcher::new(0.8, Arc::new(FixedSlotPicker(0)))
        .dispatch_wellness(WellnessScore::new(0).expect("valid"), morning())
        .sessions
}

#[test]
fn missing_values_read_as_absent() {
    let store = InMemoryStore::default();

    assert!(store.wellness_score(&user()).expect("readable").is_none());
    assert!(store.sessions(&user()).expect("readable").is_empty());
    assert!(store.helper_certification(&user()).expect("readable").is_none());
}

#[test]
fn wellness_score_overwrites_the_previous_value() {
    let store = InMemoryStore::default();
    let first = WellnessScoreRecord {
        score: WellnessScore::new(40).expect("valid"),
        completed_at: morning(),
    };
    let second = WellnessScoreRecord {
        score: WellnessScore::new(90).expect("valid"),
        completed_at: seconds_after(morning(), 60),
    };

    store.record_wellness_score(&user(), &first).expect("writable");
    store.record_wellness_score(&user(), &second).expect("writable");

    assert_eq!(store.wellness_score(&user()).expect("readable"), Some(second));
}

#[test]
fn sessions_append_in_order_and_keep_duplicates() {
    let store = InMemoryStore::default();
    let booked = sessions_for_zero_score();

    store.append_sessions(&user(), &booked).expect("writable");
    store.append_sessions(&user(), &booked[..1]).expect("writable");

    let stored = store.sessions(&user()).expect("readable");
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0], booked[0]);
    assert_eq!(stored[1], booked[1]);
    assert_eq!(stored[2], booked[0]);
}

#[test]
fn users_are_isolated() {
    let store = InMemoryStore::default();
    let other = UserId("student-7".to_string());

    store
        .append_sessions(&user(), &sessions_for_zero_score())
        .expect("writable");

    assert!(store.sessions(&other).expect("readable").is_empty());
}

#[test]
fn append_onto_a_scalar_is_rejected() {
    let store = InMemoryStore::default();
    store
        .set(&user(), StoreKey::Sessions, json!("not a list"))
        .expect("writable");

    let error = store
        .append(&user(), StoreKey::Sessions, vec![json!({})])
        .expect_err("scalar cannot be appended to");
    assert!(matches!(
        error,
        StoreError::NotAList {
            key: StoreKey::Sessions,
            ..
        }
    ));
}

#[test]
fn store_keys_use_stable_names() {
    assert_eq!(StoreKey::WellnessScore.to_string(), "wellness_score");
    assert_eq!(StoreKey::Sessions.as_str(), "sessions");
    assert_eq!(StoreKey::HelperCertification.as_str(), "helper_certification");
}

#[test]
fn json_file_store_survives_reopening() {
    let path = scratch_path();
    let booked = sessions_for_zero_score();
    let certification = HelperCertificationRecord {
        correct: 18,
        total: 20,
        percentage: 90,
        certified_at: morning(),
    };

    {
        let store = JsonFileStore::new(&path);
        store.append_sessions(&user(), &booked).expect("writable");
        store
            .record_helper_certification(&user(), &certification)
            .expect("writable");
    }

    let reopened = JsonFileStore::new(&path);
    assert_eq!(reopened.sessions(&user()).expect("readable"), booked);
    assert_eq!(
        reopened.helper_certification(&user()).expect("readable"),
        Some(certification)
    );

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn services_sharing_a_file_never_reuse_session_ids() {
    let path = scratch_path();

    for start in [morning(), seconds_after(morning(), 3_600)] {
        let service = AssessmentService::with_slot_picker(
            bank(),
            Arc::new(JsonFileStore::new(&path)),
            &assessment_config(),
            Arc::new(FixedSlotPicker(0)),
        );
        complete_wellness(&service, &user(), &[0, 0, 0, 0, 0], start);
    }

    let stored = JsonFileStore::new(&path).sessions(&user()).expect("readable");
    let mut ids: Vec<&str> = stored.iter().map(|session| session.id.as_str()).collect();
    assert_eq!(ids.len(), 4);
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4, "duplicate session ids in {stored:?}");

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn json_file_store_treats_a_missing_file_as_empty() {
    let store = JsonFileStore::new(scratch_path());

    assert!(store.sessions(&user()).expect("readable").is_empty());
    assert!(!store.path().exists());
}

#[test]
fn json_file_store_reports_corrupt_documents() {
    let path = scratch_path();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).expect("scratch dir");
    }
    std::fs::write(&path, b"{ not json").expect("scratch file");

    let store = JsonFileStore::new(&path);
    let error = store.wellness_score(&user()).expect_err("corrupt");
    assert!(matches!(error, StoreError::Serialization(_)));

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}
