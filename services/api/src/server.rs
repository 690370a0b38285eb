use crate::cli::ServeArgs;
use crate::infra::{AppState, ConfiguredStore};
use crate::routes::with_assessment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use mindhelp::assessment::{run_expiry_sweeper, AssessmentKind, AssessmentService, QuestionBank};
use mindhelp::config::AppConfig;
use mindhelp::error::AppError;
use mindhelp::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let bank = Arc::new(QuestionBank::load(&config.assessment)?);
    let store = ConfiguredStore::from_config(&config.assessment);
    info!(
        store = %store.describe(),
        wellness_questions = bank.questionnaire(AssessmentKind::Wellness).len(),
        certification_questions = bank.questionnaire(AssessmentKind::Certification).len(),
        "question bank loaded"
    );

    let assessment_service = Arc::new(AssessmentService::new(
        bank,
        Arc::new(store),
        &config.assessment,
    ));
    tokio::spawn(run_expiry_sweeper(
        assessment_service.clone(),
        Duration::from_secs(args.sweep_interval_secs.max(1)),
    ));

    let app = with_assessment_routes(assessment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "mindhelp assessment engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
