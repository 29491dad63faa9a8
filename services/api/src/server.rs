use crate::cli::ServeArgs;
use crate::infra::{
    seed_dev_fixtures, AppState, InMemoryNotificationHub, InMemoryOpportunityDirectory,
    InMemoryProfileDirectory, InMemorySubmissionRepository,
};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use grantlink::config::{AppConfig, AppEnvironment};
use grantlink::error::AppError;
use grantlink::telemetry;
use grantlink::workflows::funding::applications::IntegratedApplicationService;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let opportunities = Arc::new(InMemoryOpportunityDirectory::default());
    let profiles = Arc::new(InMemoryProfileDirectory::default());
    let submissions = Arc::new(InMemorySubmissionRepository::default());
    let hub = Arc::new(InMemoryNotificationHub::default());

    if config.environment != AppEnvironment::Production {
        seed_dev_fixtures(&opportunities, &profiles);
    }

    let application_service = Arc::new(IntegratedApplicationService::new(
        opportunities,
        profiles,
        submissions,
        hub.clone(),
        config.platform.base_url.clone(),
    ));

    let app = with_application_routes(application_service, hub)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "integrated application service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
