use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;

use crate::assessment::dispatch::FixedSlotPicker;
use crate::assessment::domain::AssessmentKind;
use crate::assessment::router::{sessions_handler, wellness_handler};
use crate::assessment::service::AssessmentService;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("json")))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn questions_route_lists_the_questionnaire() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(get("/api/v1/assessments/wellness/questions"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["kind"], "wellness");
    assert_eq!(payload["questions"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn unknown_kind_is_not_found() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(get("/api/v1/assessments/mood/questions"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn guidelines_are_served_for_certification_only() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(get("/api/v1/assessments/certification/guidelines"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert!(payload["guidelines"].as_str().is_some_and(|text| !text.is_empty()));

    let response = router
        .oneshot(get("/api/v1/assessments/wellness/guidelines"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn start_route_creates_a_run() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(post_json(
            "/api/v1/users/student-42/assessment",
            json!({ "kind": "certification" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["kind"], "certification");
    assert_eq!(payload["remaining_seconds"], 900);
    assert_eq!(payload["current_question"]["position"], 1);
    assert!(payload["current_question"].get("correct_option").is_none());
}

#[tokio::test]
async fn answer_route_walks_a_full_wellness_run() {
    let (service, _) = build_service();
    let router = router_with_service(Arc::clone(&service));
    service.start(&user(), AssessmentKind::Wellness, chrono::Utc::now());

    let mut last = Value::Null;
    for _ in 0..5 {
        let response = router
            .clone()
            .oneshot(post_json(
                "/api/v1/users/student-42/assessment/answer",
                json!({ "option": 4 }),
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        last = read_json_body(response).await;
    }

    assert_eq!(last["step"]["step"], "completed");
    assert_eq!(last["run"]["report"]["kind"], "wellness");
    assert_eq!(last["run"]["report"]["dispatch"]["band"], "critical");
    assert_eq!(last["run"]["report"]["dispatch"]["show_emergency_resources"], true);

    let response = router
        .oneshot(get("/api/v1/users/student-42/sessions"))
        .await
        .expect("route executes");
    let sessions = read_json_body(response).await;
    assert_eq!(sessions.as_array().map(Vec::len), Some(2));
    assert_eq!(sessions[0]["status"], "auto-scheduled");
}

#[tokio::test]
async fn advance_without_selection_reports_no_selection() {
    let (service, _) = build_service();
    let router = router_with_service(Arc::clone(&service));
    service.start(&user(), AssessmentKind::Wellness, chrono::Utc::now());

    let response = router
        .oneshot(post_json("/api/v1/users/student-42/assessment/advance", json!({})))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["step"]["step"], "no_selection");
    assert_eq!(payload["run"]["answered"], 0);
}

#[tokio::test]
async fn select_route_rejects_unknown_options() {
    let (service, _) = build_service();
    let router = router_with_service(Arc::clone(&service));
    service.start(&user(), AssessmentKind::Wellness, chrono::Utc::now());

    let response = router
        .oneshot(post_json(
            "/api/v1/users/student-42/assessment/select",
            json!({ "option": 9 }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn status_and_abandon_without_run_are_not_found() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(get("/api/v1/users/nobody/assessment"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .oneshot(
            Request::delete("/api/v1/users/nobody/assessment")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn abandon_route_drops_the_run() {
    let (service, _) = build_service();
    let router = router_with_service(Arc::clone(&service));
    service.start(&user(), AssessmentKind::Wellness, chrono::Utc::now());

    let response = router
        .oneshot(
            Request::delete("/api/v1/users/student-42/assessment")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(service.status(&user(), chrono::Utc::now()).is_err());
}

#[tokio::test]
async fn wellness_handler_returns_not_found_before_any_run() {
    let (service, _) = build_service();

    let response = wellness_handler::<crate::assessment::store::InMemoryStore>(
        State(service),
        Path("student-42".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sessions_handler_returns_internal_error_when_store_is_down() {
    let service = Arc::new(AssessmentService::with_slot_picker(
        bank(),
        Arc::new(UnavailableStore),
        &assessment_config(),
        Arc::new(FixedSlotPicker(0)),
    ));

    let response =
        sessions_handler::<UnavailableStore>(State(service), Path("student-42".to_string())).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .is_some_and(|message| message.contains("unavailable")));
}
