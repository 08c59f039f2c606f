use std::sync::Arc;

use ledger::consensus::Engine;
use ledger::healing;
use ledger::metrics::MetricsRegistry;
use ledger::peer::PeerClient;
use ledger::store::LedgerStore;
use ledger::NodeConfig;
use tokio::signal;
use tokio_util::sync::CancellationToken;

mod error;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let config = NodeConfig::from_env();
    tracing::info!(node_id = %config.node_id, port = config.port, peers = ?config.peers, "starting node");

    let metrics = Arc::new(MetricsRegistry::new().expect("metrics registry should register cleanly"));
    spawn_metrics_server(metrics.clone());

    let store = LedgerStore::new(config.consensus.difficulty);
    let peer_client = Arc::new(PeerClient::new(
        config.consensus.peer_timeout,
        config.consensus.chain_fetch_timeout,
    ));
    let engine = Engine::new(
        store,
        peer_client,
        config.peers.clone(),
        config.self_url(),
        config.consensus.clone(),
        Some(metrics.clone()),
    );

    let cancel = CancellationToken::new();
    let state = Arc::new(AppState::new(engine, metrics, config.clone(), cancel.clone()));

    spawn_background_loops(&state, cancel.clone());

    let app = routes::router(state.clone());
    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {addr}: {err}"));
    tracing::info!(%addr, "node HTTP surface listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .expect("HTTP server exited unexpectedly");
}

fn spawn_metrics_server(metrics: Arc<MetricsRegistry>) {
    let addr: std::net::SocketAddr = "0.0.0.0:9000".parse().expect("fixed, valid address literal");
    tokio::spawn(async move {
        if let Err(err) = ledger::metrics::prometheus::run_prometheus_http_server(metrics, addr).await {
            tracing::error!(error = %err, "metrics server exited");
        }
    });
}

/// Starts the self-healing supervisor: an initial sync attempt, then the
/// three 30-second periodic loops, each stoppable via `cancel`.
fn spawn_background_loops(state: &Arc<AppState>, cancel: CancellationToken) {
    let engine = state.engine.clone();
    tokio::spawn(async move {
        healing::initial_sync(&engine).await;
    });

    let engine = state.engine.clone();
    let interval = state.config.health_check_interval;
    tokio::spawn(healing::health_check_loop(engine, interval, cancel.clone()));

    let engine = state.engine.clone();
    let interval = state.config.verify_interval;
    tokio::spawn(healing::hash_verification_loop(engine, interval, cancel.clone()));

    let engine = state.engine.clone();
    let interval = state.config.verify_interval;
    tokio::spawn(healing::data_verification_loop(engine, interval, cancel));
}

async fn shutdown_signal(cancel: CancellationToken) {
    signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    tracing::info!("shutdown signal received, stopping background loops");
    cancel.cancel();
}
