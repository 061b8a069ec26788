use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryRecordStore};
use crate::routes::with_blood_bank_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hemoconnect::bloodbank::{
    BloodBankService, DonorRosterImporter, EligibilityConfig, SystemClock,
};
use hemoconnect::config::AppConfig;
use hemoconnect::error::AppError;
use hemoconnect::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let store = Arc::new(InMemoryRecordStore::default());
    let service = Arc::new(BloodBankService::new(
        store.clone(),
        Arc::new(SystemClock),
        EligibilityConfig::default(),
    ));

    if let Some(path) = config.data.roster_csv.as_ref() {
        let report = DonorRosterImporter::from_path(path, service.as_ref())?;
        for rejected in &report.rejected {
            warn!(row = rejected.row, reason = %rejected.reason, "roster row skipped");
        }
        info!(
            roster = %path.display(),
            donors = store.donor_count().unwrap_or_default(),
            "donor roster loaded"
        );
    }

    let app = with_blood_bank_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        environment = config.environment.label(),
        %addr,
        "hemoconnect blood-bank service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
