use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::assessment::dispatch::FixedSlotPicker;
use crate::assessment::domain::{AssessmentKind, UserId, WellnessLevel};
use crate::assessment::service::AssessmentService;
use crate::assessment::store::{InMemoryStore, StoreError, StoreKey, UserStore};
use crate::assessment::{assessment_router, QuestionBank};
use crate::config::AssessmentConfig;

/// Answer key of the bundled certification bank.
pub(super) const CERTIFICATION_KEY: [usize; 20] =
    [1, 1, 1, 2, 2, 2, 1, 2, 1, 1, 2, 2, 1, 1, 2, 1, 2, 2, 2, 2];

pub(super) fn bank() -> Arc<QuestionBank> {
    Arc::new(QuestionBank::standard().expect("bundled bank loads"))
}

pub(super) fn assessment_config() -> AssessmentConfig {
    AssessmentConfig {
        wellness_time_limit_secs: 300,
        certification_time_limit_secs: 900,
        passing_score: 0.8,
        question_bank_dir: None,
        store_path: None,
        session_utc_offset_minutes: 0,
    }
}

pub(super) fn user() -> UserId {
    UserId("student-42".to_string())
}

/// 2025-03-14 09:00:00 UTC.
pub(super) fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn seconds_after(start: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    start + chrono::Duration::seconds(seconds)
}

/// Option index presenting `value` on the wellness scale.
pub(super) fn wellness_option(value: u8) -> usize {
    let level = WellnessLevel::from_value(value).expect("value on the wellness scale");
    WellnessLevel::ordered()
        .iter()
        .position(|candidate| *candidate == level)
        .expect("level is ordered")
}

/// Certification answers with exactly `correct` keyed hits, misses at the end.
pub(super) fn certification_answers(correct: usize) -> Vec<usize> {
    CERTIFICATION_KEY
        .iter()
        .enumerate()
        .map(|(index, key)| if index < correct { *key } else { (key + 1) % 4 })
        .collect()
}

pub(super) fn build_service() -> (Arc<AssessmentService<InMemoryStore>>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::default());
    let service = AssessmentService::with_slot_picker(
        bank(),
        Arc::clone(&store),
        &assessment_config(),
        Arc::new(FixedSlotPicker(1)),
    );
    (Arc::new(service), store)
}

pub(super) fn router_with_service(service: Arc<AssessmentService<InMemoryStore>>) -> axum::Router {
    assessment_router(service)
}

/// Answers a wellness run one question per second, starting at `start`.
pub(super) fn complete_wellness<S: UserStore + 'static>(
    service: &AssessmentService<S>,
    user: &UserId,
    values: &[u8],
    start: DateTime<Utc>,
) {
    service.start(user, AssessmentKind::Wellness, start);
    for (offset, value) in values.iter().enumerate() {
        service
            .answer(user, wellness_option(*value), seconds_after(start, offset as i64 + 1))
            .expect("answer accepted");
    }
}

/// Store that always fails, to exercise error paths.
#[derive(Debug, Default)]
pub(super) struct UnavailableStore;

impl UserStore for UnavailableStore {
    fn get(&self, _user: &UserId, _key: StoreKey) -> Result<Option<Value>, StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }

    fn set(&self, _user: &UserId, _key: StoreKey, _value: Value) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }

    fn append(&self, _user: &UserId, _key: StoreKey, _values: Vec<Value>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }
}

/// Wraps the in-memory store and counts writes.
#[derive(Debug, Default)]
pub(super) struct CountingStore {
    pub inner: InMemoryStore,
    pub sets: AtomicUsize,
    pub appends: AtomicUsize,
}

impl CountingStore {
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }
}

impl UserStore for CountingStore {
    fn get(&self, user: &UserId, key: StoreKey) -> Result<Option<Value>, StoreError> {
        self.inner.get(user, key)
    }

    fn set(&self, user: &UserId, key: StoreKey, value: Value) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(user, key, value)
    }

    fn append(&self, user: &UserId, key: StoreKey, values: Vec<Value>) -> Result<(), StoreError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.inner.append(user, key, values)
    }
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
