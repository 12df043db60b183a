use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use domain_info_service::{
    config::Config,
    dns::SystemDnsResolver,
    errors::LookupError,
    metrics,
    service::DomainLookupService,
    store::MemoryDomainStore,
    validation,
    view::DomainRecordView,
    whois::TcpWhoisResolver,
};

#[derive(Clone)]
pub struct AppState {
    lookup_service: Arc<DomainLookupService>,
    config: Arc<Config>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "domain_info_service=info,tower_http=debug".into()),
        )
        .init();

    // Load configuration
    let config = Arc::new(Config::load()?);
    info!("Configuration loaded successfully");

    // Wire the production collaborators into the lookup service
    let dns = Arc::new(SystemDnsResolver::new(config.clone())?);
    let whois = Arc::new(TcpWhoisResolver::new(config.clone()));
    let store = Arc::new(MemoryDomainStore::new());
    let lookup_service = Arc::new(DomainLookupService::new(dns, whois, store));

    // Initialize metrics
    metrics::init_metrics();

    let app_state = AppState {
        lookup_service,
        config: config.clone(),
    };

    // Build the application
    let app = Router::new()
        .route("/api/domain/:name", get(domain_lookup))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Domain info service listening on {}", addr);
    info!("Lookup endpoint: http://{}/api/domain/{{name}}", addr);
    info!("Health check: http://{}/health", addr);
    info!("Metrics: http://{}/metrics", addr);

    // Graceful shutdown handling
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, gracefully shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

async fn domain_lookup(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DomainRecordView>, LookupError> {
    let start_time = std::time::Instant::now();

    // Reject bad input at the edge; the service re-validates for callers
    // that bypass HTTP
    if !validation::is_valid(&name) {
        metrics::increment_errors("invalid_domain");
        return Err(LookupError::InvalidDomain(name.trim().to_string()));
    }
    let domain = validation::normalize(&name);

    metrics::increment_requests(&domain);

    let record = match state.lookup_service.resolve(&domain).await {
        Ok(record) => record,
        Err(e) => {
            track_lookup_error(&e);
            return Err(e);
        }
    };

    metrics::record_resolve_time(start_time.elapsed().as_millis() as u64);

    Ok(Json(DomainRecordView::from(&record)))
}

// Helper function to track different error types
fn track_lookup_error(error: &LookupError) {
    match error {
        LookupError::Timeout => metrics::increment_errors("timeout"),
        LookupError::UnsupportedTld(_) => metrics::increment_errors("unsupported_tld"),
        LookupError::Dns(_) => metrics::increment_errors("dns_error"),
        LookupError::Whois(_) => metrics::increment_errors("whois_error"),
        LookupError::LookupFailed(_) => metrics::increment_errors("lookup_failed"),
        LookupError::Storage(_) => metrics::increment_errors("storage_error"),
        LookupError::IoError(_) => metrics::increment_errors("io_error"),
        _ => metrics::increment_errors("other"),
    }
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.config.start_time.elapsed().as_secs(),
    })
}
