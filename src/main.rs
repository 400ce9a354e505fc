use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use defect_inspect::app_state::AppState;
use defect_inspect::config::AppConfig;
use defect_inspect::routes;
use defect_inspect::services::{
    processing::ProcessingClient, reconcile, snapshot::SnapshotWriter, storage::ImageStore,
};
use defect_inspect::store::TaskStore;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing defect-inspect server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("tasks_created_total", "Total survey tasks created");
    metrics::describe_counter!("tasks_deleted_total", "Total survey tasks deleted");
    metrics::describe_counter!(
        "images_uploaded_total",
        "Total images uploaded and forwarded for processing"
    );
    metrics::describe_counter!(
        "reconcile_passes_total",
        "Total reconciliation passes executed"
    );
    metrics::describe_counter!(
        "reconcile_images_completed_total",
        "Total image results completed by reconciliation"
    );
    metrics::describe_counter!(
        "reconcile_tasks_completed_total",
        "Total tasks completed by reconciliation"
    );

    // Initialize the local image store
    tracing::info!(dir = %config.images_dir, "Initializing image store");
    let images = ImageStore::new(&config.images_dir)
        .await
        .expect("Failed to initialize image store");

    // Initialize the external processing client
    tracing::info!(url = %config.processor_url, "Initializing processing client");
    let processor = ProcessingClient::new(&config.processor_url);

    // Snapshot writer for task list dumps
    let snapshots = SnapshotWriter::new(&config.snapshot_dir, &config.snapshot_prefix);

    // In-memory task store
    let store = TaskStore::new();

    // Create shared application state
    let state = AppState::new(store, images, processor, snapshots);

    // Start the background reconciliation job
    tokio::spawn(reconcile::run_loop(
        state.clone(),
        Duration::from_secs(config.reconcile_interval_secs),
    ));

    // Build API routes
    let app = routes::router(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES));

    tracing::info!("Starting defect-inspect on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
