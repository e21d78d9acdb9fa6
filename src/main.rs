//! This file defines the xray binary entry point.

use xray::app;
use xray::app_state::AppState;
use xray::cli;
use xray::metrics;
use xray::server;
use xray::tracing;

use std::sync::Arc;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing(&args);
    metrics::register_metrics();
    app::init(&args);
    let state = Arc::new(AppState::new(&args).expect("Failed to open the record store"));
    let service = app::service(state.clone());
    server::serve(&args, service).await;
    state
        .store
        .flush()
        .await
        .expect("Failed to flush the record store");
    tracing::shutdown_tracing();
}
