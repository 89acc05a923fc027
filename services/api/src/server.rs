use crate::cli::ServeArgs;
use crate::infra::{access_log, AppState};
use crate::routes::with_shift_routes;
use axum::middleware;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use shift_gate::config::AppConfig;
use shift_gate::error::AppError;
use shift_gate::telemetry;
use shift_gate::workflows::shiftcheck::{BitrixPortal, ShiftCheckService};
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

    let portal = Arc::new(BitrixPortal::new());
    let service = Arc::new(ShiftCheckService::new(portal, config.workflow.clone()));

    let app = with_shift_routes(service)
        .layer(middleware::from_fn(access_log))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "shift checker listening");

    axum::serve(listener, app).await?;
    Ok(())
}
