//! Periodic peer health check (every 30s by convention): pings every peer,
//! tracks newly-failed peers, and opportunistically re-syncs with peers
//! that are reachable (running a targeted sync the moment a previously
//! failed peer recovers).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

use crate::consensus::engine::Engine;
use crate::consensus::validator::is_chain_valid;
use crate::types::{reconstruct_chain, Block};

pub async fn health_check_loop(engine: std::sync::Arc<Engine>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("health check loop stopped");
                return;
            }
            _ = ticker.tick() => {
                check_nodes_health(&engine).await;
            }
        }
    }
}

async fn check_nodes_health(engine: &Engine) {
    for peer in &engine.peers {
        match engine.peer_client.health(peer).await {
            Ok(true) => {
                let was_failed = engine.store.is_failed(peer).await;
                let synced = sync_with_peer(engine, peer).await;
                if was_failed && synced {
                    tracing::info!(%peer, "peer recovered");
                    engine.store.clear_failed(peer).await;
                }
            }
            _ => {
                if let Some(metrics) = &engine.metrics {
                    metrics.metrics.peer_failures_total.with_label_values(&[peer.as_str()]).inc();
                }
                engine.store.mark_failed(peer, unix_now()).await;
            }
        }
    }
}

/// Fetches `peer`'s chain and adopts it if it is both longer and valid.
/// Returns whether the peer was reachable at all (not whether its chain
/// was adopted) — that reachability is what "synced successfully" means
/// for clearing a peer's failed status.
async fn sync_with_peer(engine: &Engine, peer: &str) -> bool {
    match engine.peer_client.fetch_chain(peer).await {
        Ok(resp) => {
            if let Ok(blocks) = reconstruct_chain(resp.chain) {
                let local_len = engine.store.chain_len().await;
                if longer_and_valid(&blocks, local_len, engine.config.difficulty) {
                    let _ = engine.store.replace_chain(blocks).await;
                }
            }
            true
        }
        Err(_) => false,
    }
}

/// The adopt-if-longer-and-valid rule applied by [`sync_with_peer`] once a
/// peer's chain has been fetched and decoded.
fn longer_and_valid(blocks: &[Block], local_len: usize, difficulty: usize) -> bool {
    blocks.len() > local_len && is_chain_valid(blocks, difficulty)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::config::ConsensusConfig;
    use crate::integrity::pow::mine;
    use crate::peer::PeerClient;
    use crate::store::LedgerStore;
    use crate::types::{Transaction, TransactionData};
    use std::sync::Arc;
    use std::time::Duration;

    fn chain_of_length(n: usize, difficulty: usize) -> Vec<Block> {
        let mut chain = vec![Block::genesis()];
        for i in 1..n as u64 {
            let tx = Transaction::new(TransactionData::Generic(format!("tx-{i}")));
            let mut block = Block::new(i, chain.last().unwrap().hash.clone(), vec![tx]);
            mine(&mut block, difficulty);
            chain.push(block);
        }
        chain
    }

    #[test]
    fn longer_and_valid_chain_is_adopted() {
        let candidate = chain_of_length(3, 1);
        assert!(longer_and_valid(&candidate, 1, 1));
    }

    #[test]
    fn chain_no_longer_than_local_is_not_adopted() {
        let candidate = chain_of_length(2, 1);
        assert!(!longer_and_valid(&candidate, 2, 1));
    }

    #[test]
    fn longer_but_invalid_chain_is_not_adopted() {
        let mut candidate = chain_of_length(3, 1);
        candidate[2].hash = "ffffffff".to_string();
        assert!(!longer_and_valid(&candidate, 1, 1));
    }

    fn test_engine(peers: Vec<String>) -> Engine {
        Engine::new(
            LedgerStore::new(1),
            Arc::new(PeerClient::new(Duration::from_millis(50), Duration::from_millis(50))),
            peers,
            "http://node1:5001".to_string(),
            ConsensusConfig {
                difficulty: 1,
                admit_quorum: 1,
                ..ConsensusConfig::default()
            },
            None,
        )
    }

    #[tokio::test]
    async fn sync_with_unreachable_peer_reports_unsynced_and_leaves_chain_unchanged() {
        let engine = test_engine(vec!["http://127.0.0.1:1".to_string()]);
        let synced = sync_with_peer(&engine, "http://127.0.0.1:1").await;
        assert!(!synced);
        assert_eq!(engine.store.chain_len().await, 1);
    }
}
