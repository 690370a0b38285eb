use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{AssessmentKind, UserId};
use super::service::{AssessmentService, AssessmentServiceError, StepView};
use super::store::UserStore;

/// Router builder exposing the presenter, questionnaires and per-user results.
pub fn assessment_router<S>(service: Arc<AssessmentService<S>>) -> Router
where
    S: UserStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/assessments/:kind/questions",
            get(questions_handler::<S>),
        )
        .route(
            "/api/v1/assessments/:kind/guidelines",
            get(guidelines_handler::<S>),
        )
        .route(
            "/api/v1/users/:user_id/assessment",
            post(start_handler::<S>)
                .get(status_handler::<S>)
                .delete(abandon_handler::<S>),
        )
        .route(
            "/api/v1/users/:user_id/assessment/select",
            post(select_handler::<S>),
        )
        .route(
            "/api/v1/users/:user_id/assessment/advance",
            post(advance_handler::<S>),
        )
        .route(
            "/api/v1/users/:user_id/assessment/answer",
            post(answer_handler::<S>),
        )
        .route(
            "/api/v1/users/:user_id/wellness",
            get(wellness_handler::<S>),
        )
        .route(
            "/api/v1/users/:user_id/sessions",
            get(sessions_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartRequest {
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OptionRequest {
    pub option: usize,
}

fn unknown_kind(kind: &str) -> Response {
    let payload = json!({
        "error": format!("unknown assessment kind `{kind}`"),
    });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn error_response(error: AssessmentServiceError) -> Response {
    let status = match &error {
        AssessmentServiceError::NoActiveRun(_) => StatusCode::NOT_FOUND,
        AssessmentServiceError::Presenter(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AssessmentServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn step_response(result: Result<StepView, AssessmentServiceError>) -> Response {
    match result {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn questions_handler<S>(
    State(service): State<Arc<AssessmentService<S>>>,
    Path(kind): Path<String>,
) -> Response
where
    S: UserStore + 'static,
{
    match AssessmentKind::from_slug(&kind) {
        Some(kind) => {
            let view = service.bank().questionnaire(kind).view();
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        None => unknown_kind(&kind),
    }
}

pub(crate) async fn guidelines_handler<S>(
    State(service): State<Arc<AssessmentService<S>>>,
    Path(kind): Path<String>,
) -> Response
where
    S: UserStore + 'static,
{
    let Some(kind) = AssessmentKind::from_slug(&kind) else {
        return unknown_kind(&kind);
    };

    match service.bank().questionnaire(kind).guidelines() {
        Some(guidelines) => {
            let payload = json!({
                "kind": kind,
                "guidelines": guidelines,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        None => {
            let payload = json!({
                "error": format!("{} has no guidelines", kind.label()),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn start_handler<S>(
    State(service): State<Arc<AssessmentService<S>>>,
    Path(user_id): Path<String>,
    axum::Json(request): axum::Json<StartRequest>,
) -> Response
where
    S: UserStore + 'static,
{
    let Some(kind) = AssessmentKind::from_slug(&request.kind) else {
        return unknown_kind(&request.kind);
    };
    let view = service.start(&UserId(user_id), kind, Utc::now());
    (StatusCode::CREATED, axum::Json(view)).into_response()
}

pub(crate) async fn status_handler<S>(
    State(service): State<Arc<AssessmentService<S>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: UserStore + 'static,
{
    match service.status(&UserId(user_id), Utc::now()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn abandon_handler<S>(
    State(service): State<Arc<AssessmentService<S>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: UserStore + 'static,
{
    match service.abandon(&UserId(user_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn select_handler<S>(
    State(service): State<Arc<AssessmentService<S>>>,
    Path(user_id): Path<String>,
    axum::Json(request): axum::Json<OptionRequest>,
) -> Response
where
    S: UserStore + 'static,
{
    step_response(service.select(&UserId(user_id), request.option, Utc::now()))
}

pub(crate) async fn advance_handler<S>(
    State(service): State<Arc<AssessmentService<S>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: UserStore + 'static,
{
    step_response(service.advance(&UserId(user_id), Utc::now()))
}

pub(crate) async fn answer_handler<S>(
    State(service): State<Arc<AssessmentService<S>>>,
    Path(user_id): Path<String>,
    axum::Json(request): axum::Json<OptionRequest>,
) -> Response
where
    S: UserStore + 'static,
{
    step_response(service.answer(&UserId(user_id), request.option, Utc::now()))
}

pub(crate) async fn wellness_handler<S>(
    State(service): State<Arc<AssessmentService<S>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: UserStore + 'static,
{
    let user = UserId(user_id);
    match service.wellness_score(&user) {
        Ok(Some(record)) => (StatusCode::OK, axum::Json(record)).into_response(),
        Ok(None) => {
            let payload = json!({
                "user_id": user,
                "error": "no wellness score recorded",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn sessions_handler<S>(
    State(service): State<Arc<AssessmentService<S>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: UserStore + 'static,
{
    match service.sessions(&UserId(user_id)) {
        Ok(sessions) => (StatusCode::OK, axum::Json(sessions)).into_response(),
        Err(error) => error_response(error),
    }
}
