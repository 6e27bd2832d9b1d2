use crate::cli::ServeArgs;
use crate::infra::{load_directory, AppState, LoggingPublisher};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use campus_hub::config::AppConfig;
use campus_hub::error::AppError;
use campus_hub::telemetry;
use campus_hub::workflows::applications::{
    ApplicationWorkflowService, InMemoryApplicationRepository,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(directory) = args.directory.take() {
        config.workflow.directory_path = Some(directory);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = Arc::new(load_directory(config.workflow.directory_path.as_deref())?);
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let application_service = Arc::new(ApplicationWorkflowService::new(
        repository,
        directory,
        Arc::new(LoggingPublisher),
        &config.workflow,
    ));

    let app = with_application_routes(application_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        require_rejection_comment = config.workflow.require_rejection_comment,
        "campus approval service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
