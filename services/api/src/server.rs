use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use clearance_core::clearance::ExpiryJob;
use clearance_core::config::AppConfig;
use clearance_core::error::AppError;
use clearance_core::telemetry;

use crate::cli::ServeArgs;
use crate::infra::{build_workflow, AppState};
use crate::routes::with_clearance_routes;

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

    let workflow = build_workflow(config.clearance.clone());

    let sweep = ExpiryJob::new(
        workflow.clone(),
        Duration::from_secs(config.clearance.expiry_sweep_seconds),
    );
    tokio::spawn(sweep.run());

    let app = with_clearance_routes(workflow)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "clearance service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
