//! Metric definitions and the small HTTP server that exposes them.

use std::convert::Infallible;
use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tokio::net::TcpListener;

/// Counters and histograms tracking the ledger's consensus activity.
pub struct LedgerMetrics {
    pub mining_duration_seconds: Histogram,
    pub blocks_mined_total: IntCounter,
    pub blocks_rejected_total: IntCounter,
    pub transactions_admitted_total: IntCounter,
    pub transactions_rejected_total: IntCounter,
    pub peer_failures_total: IntCounterVec,
    pub repairs_total: IntCounterVec,
    pub chain_length: IntGauge,
}

impl LedgerMetrics {
    fn new() -> prometheus::Result<Self> {
        Ok(Self {
            mining_duration_seconds: Histogram::with_opts(HistogramOpts::new(
                "ledger_mining_duration_seconds",
                "Time spent proof-of-work mining a single block.",
            ))?,
            blocks_mined_total: IntCounter::with_opts(Opts::new(
                "ledger_blocks_mined_total",
                "Blocks this node has successfully mined and broadcast.",
            ))?,
            blocks_rejected_total: IntCounter::with_opts(Opts::new(
                "ledger_blocks_rejected_total",
                "Blocks rejected during validation, either local or remote.",
            ))?,
            transactions_admitted_total: IntCounter::with_opts(Opts::new(
                "ledger_transactions_admitted_total",
                "Transactions that reached admission quorum.",
            ))?,
            transactions_rejected_total: IntCounter::with_opts(Opts::new(
                "ledger_transactions_rejected_total",
                "Transactions that failed CRC or did not reach admission quorum.",
            ))?,
            peer_failures_total: IntCounterVec::new(
                Opts::new("ledger_peer_failures_total", "Peer RPC failures by peer URL."),
                &["peer"],
            )?,
            repairs_total: IntCounterVec::new(
                Opts::new("ledger_repairs_total", "Self-healing repairs applied, by kind."),
                &["kind"],
            )?,
            chain_length: IntGauge::new("ledger_chain_length", "Number of blocks in the local chain.")?,
        })
    }
}

/// Owns the `prometheus::Registry` and the metric handles registered to it.
pub struct MetricsRegistry {
    registry: Registry,
    pub metrics: LedgerMetrics,
}

impl MetricsRegistry {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let metrics = LedgerMetrics::new()?;
        registry.register(Box::new(metrics.mining_duration_seconds.clone()))?;
        registry.register(Box::new(metrics.blocks_mined_total.clone()))?;
        registry.register(Box::new(metrics.blocks_rejected_total.clone()))?;
        registry.register(Box::new(metrics.transactions_admitted_total.clone()))?;
        registry.register(Box::new(metrics.transactions_rejected_total.clone()))?;
        registry.register(Box::new(metrics.peer_failures_total.clone()))?;
        registry.register(Box::new(metrics.repairs_total.clone()))?;
        registry.register(Box::new(metrics.chain_length.clone()))?;
        Ok(Self { registry, metrics })
    }

    pub fn gather_text(&self) -> String {
        let families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .expect("prometheus text encoding cannot fail for well-formed metric families");
        String::from_utf8(buffer).expect("prometheus text encoder only emits valid UTF-8")
    }
}

async fn serve_metrics(registry: &MetricsRegistry, _req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let body = registry.gather_text();
    Ok(Response::builder()
        .status(200)
        .header("content-type", "text/plain; version=0.0.4")
        .body(Full::new(Bytes::from(body)))
        .expect("response with a fixed, valid status and header always builds"))
}

/// Runs a tiny `GET /metrics` server, forever, bound to `addr`.
pub async fn run_prometheus_http_server(
    registry: std::sync::Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics server listening");
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let registry = registry.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let registry = registry.clone();
                async move { serve_metrics(&registry, req).await }
            });
            if let Err(err) = hyper::server::conn::http1::Builder::new().serve_connection(io, service).await {
                tracing::warn!(error = %err, "metrics connection error");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_metrics_register_without_collision() {
        MetricsRegistry::new().expect("metrics should register cleanly");
    }

    #[test]
    fn gathered_text_contains_metric_names() {
        let registry = MetricsRegistry::new().expect("metrics should register cleanly");
        registry.metrics.blocks_mined_total.inc();
        let text = registry.gather_text();
        assert!(text.contains("ledger_blocks_mined_total"));
    }
}
