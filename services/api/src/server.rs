use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryEventSink, InMemorySessionGateway, QuizCatalogs};
use crate::routes::with_quiz_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use style_quiz::config::AppConfig;
use style_quiz::discovery::{DiscoveryService, EngineSettings};
use style_quiz::error::AppError;
use style_quiz::telemetry;
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

    let catalogs = Arc::new(QuizCatalogs::from_config(config.quiz.catalog_path.clone())?);
    let gateway = Arc::new(InMemorySessionGateway::default());
    let events = Arc::new(InMemoryEventSink::default());
    let discovery = Arc::new(
        DiscoveryService::new(catalogs, gateway, events, EngineSettings::default())
            .with_seed(config.quiz.random_seed),
    );

    let app = with_quiz_routes(discovery)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        catalog = ?config.quiz.catalog_path,
        "style quiz service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
