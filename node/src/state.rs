//! Shared application state handed to every route handler.

use std::sync::Arc;

use ledger::metrics::MetricsRegistry;
use ledger::{Engine, NodeConfig};
use tokio_util::sync::CancellationToken;

pub struct AppState {
    pub engine: Arc<Engine>,
    pub metrics: Arc<MetricsRegistry>,
    pub config: NodeConfig,
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(engine: Engine, metrics: Arc<MetricsRegistry>, config: NodeConfig, cancel: CancellationToken) -> Self {
        Self {
            engine: Arc::new(engine),
            metrics,
            config,
            cancel,
        }
    }
}

pub type SharedState = Arc<AppState>;
