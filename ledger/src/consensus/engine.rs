//! The admission and mining engine: ties the store, peer client, and
//! validator together into `submit`, `verify_transaction`, `mine`, and
//! `verify_mined_block`.

use std::collections::HashSet;
use std::sync::Arc;

use crate::concurrency::bounded_map;
use crate::consensus::config::ConsensusConfig;
use crate::consensus::error::ConsensusError;
use crate::consensus::validator;
use crate::integrity::pow;
use crate::metrics::MetricsRegistry;
use crate::peer::PeerClient;
use crate::store::LedgerStore;
use crate::types::{reconstruct_chain, Block, BlockWire, Transaction, TransactionData, TransactionWire};

/// Width of the bounded worker pool used to fan peer RPCs out concurrently.
const BROADCAST_CONCURRENCY: usize = 10;

pub struct MineOutcome {
    pub block: Block,
    pub confirmations: usize,
}

#[derive(Clone)]
pub struct Engine {
    pub store: LedgerStore,
    pub peer_client: Arc<PeerClient>,
    pub peers: Vec<String>,
    pub self_url: String,
    pub config: ConsensusConfig,
    pub metrics: Option<Arc<MetricsRegistry>>,
}

impl Engine {
    pub fn new(
        store: LedgerStore,
        peer_client: Arc<PeerClient>,
        peers: Vec<String>,
        self_url: String,
        config: ConsensusConfig,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> Self {
        Self {
            store,
            peer_client,
            peers,
            self_url,
            config,
            metrics,
        }
    }

    /// Broadcast-and-confirm admission (§4.4). Builds a transaction, asks
    /// every peer to verify its CRC, and admits it to the pending pool only
    /// if confirmations (including self) reach `Q_admit`.
    pub async fn submit(&self, data: TransactionData) -> Result<Transaction, ConsensusError> {
        let mut tx = Transaction::new(data);
        if !tx.verify_crc() {
            return Err(ConsensusError::CrcInvalid);
        }
        self.collect_transaction_confirmations(&mut tx).await;
        tx.confirmations.insert(self.self_url.clone());

        if tx.confirmations.len() >= self.config.admit_quorum {
            self.store.append_transaction(tx.clone()).await?;
            if let Some(metrics) = &self.metrics {
                metrics.metrics.transactions_admitted_total.inc();
            }
            Ok(tx)
        } else {
            if let Some(metrics) = &self.metrics {
                metrics.metrics.transactions_rejected_total.inc();
            }
            Err(ConsensusError::QuorumNotReached {
                have: tx.confirmations.len(),
                need: self.config.admit_quorum,
            })
        }
    }

    async fn collect_transaction_confirmations(&self, tx: &mut Transaction) {
        let wire = TransactionWire::from(&*tx);
        let peer_client = self.peer_client.clone();
        let results = bounded_map(&self.peers, BROADCAST_CONCURRENCY, move |peer| {
            let peer_client = peer_client.clone();
            let wire = wire.clone();
            async move {
                let confirmed = peer_client.verify_transaction(&peer, &wire).await.unwrap_or(false);
                (peer, confirmed)
            }
        })
        .await;
        for (peer, confirmed) in results {
            if confirmed {
                tx.confirmations.insert(peer);
            }
        }
    }

    /// Handles an incoming `POST /verify_transaction` from a peer: if the
    /// transaction's CRC holds, adds this node as a confirmer and appends it
    /// to this node's own pending pool, so it is available here for
    /// selection once it separately reaches `Q_mine`.
    pub async fn verify_transaction(&self, wire: TransactionWire) -> Result<(), ConsensusError> {
        let mut tx = Transaction::try_from(wire).map_err(|_| ConsensusError::CrcInvalid)?;
        if !tx.verify_crc() {
            return Err(ConsensusError::CrcInvalid);
        }
        tx.confirmations.insert(self.self_url.clone());
        self.store.append_transaction(tx).await?;
        Ok(())
    }

    /// Builds, mines, and broadcasts a block from pending transactions that
    /// have reached `Q_mine` confirmations. Holds the ledger lock for the
    /// entire attempt, including proof-of-work and peer broadcast — a
    /// deliberate simplification (see `DESIGN.md`).
    pub async fn mine(&self) -> Result<MineOutcome, ConsensusError> {
        let mut guard = self.store.lock().await;
        if guard.mining_status.is_mining {
            return Err(ConsensusError::AlreadyMining);
        }
        if guard.pending.is_empty() {
            return Err(ConsensusError::Idle);
        }
        guard.mining_status.is_mining = true;
        guard.mining_status.progress = 0;

        let outcome = self.mine_while_locked(&mut guard).await;

        guard.mining_status.is_mining = false;
        guard.mining_status.progress = 0;
        drop(guard);

        if outcome.is_ok() {
            self.resolve_and_notify_peers().await;
        }

        outcome
    }

    /// Step 7 of the mining protocol: run conflict resolution locally, then
    /// notify every peer to do the same so the newly mined block propagates
    /// a converged view across the cluster, not just a broadcast copy.
    async fn resolve_and_notify_peers(&self) {
        if let Err(err) = self.resolve_conflicts().await {
            tracing::warn!(error = %err, "conflict resolution after mining failed");
        }
        let peer_client = self.peer_client.clone();
        bounded_map(&self.peers, BROADCAST_CONCURRENCY, move |peer| {
            let peer_client = peer_client.clone();
            async move {
                if let Err(err) = peer_client.notify_resolve(&peer).await {
                    tracing::debug!(%peer, error = %err, "peer did not acknowledge post-mine resolve nudge");
                }
            }
        })
        .await;
    }

    async fn mine_while_locked(&self, guard: &mut crate::store::LedgerState) -> Result<MineOutcome, ConsensusError> {
        let mine_quorum = self.config.mine_quorum(self.peers.len());
        let selected: Vec<Transaction> = guard
            .pending
            .iter()
            .filter(|tx| tx.confirmations.len() >= mine_quorum)
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(ConsensusError::WaitingForConfirmations);
        }

        let index = guard.chain.len() as u64;
        let previous_hash = guard
            .chain
            .last()
            .expect("chain always has at least the genesis block")
            .hash
            .clone();
        let mut block = Block::new(index, previous_hash, selected.clone());
        guard.mining_status.progress = 50;

        let started = std::time::Instant::now();
        pow::mine(&mut block, self.config.difficulty);
        if let Some(metrics) = &self.metrics {
            metrics.metrics.mining_duration_seconds.observe(started.elapsed().as_secs_f64());
        }

        let confirmations = self.broadcast_mined_block(&block).await;
        if confirmations < mine_quorum {
            if let Some(metrics) = &self.metrics {
                metrics.metrics.blocks_rejected_total.inc();
            }
            return Err(ConsensusError::ConsensusFailed);
        }

        guard.chain.push(block.clone());
        let selected_crcs: HashSet<String> = selected.iter().map(|tx| tx.crc.clone()).collect();
        guard.pending.retain(|tx| !selected_crcs.contains(&tx.crc));
        guard.mining_status.progress = 100;
        if let Some(metrics) = &self.metrics {
            metrics.metrics.blocks_mined_total.inc();
            metrics.metrics.chain_length.set(guard.chain.len() as i64);
        }

        Ok(MineOutcome { block, confirmations })
    }

    async fn broadcast_mined_block(&self, block: &Block) -> usize {
        let wire = BlockWire::from(block);
        let peer_client = self.peer_client.clone();
        let results = bounded_map(&self.peers, BROADCAST_CONCURRENCY, move |peer| {
            let peer_client = peer_client.clone();
            let wire = wire.clone();
            async move {
                let confirmed = peer_client.verify_mined_block(&peer, &wire).await.unwrap_or(false);
                confirmed
            }
        })
        .await;
        // +1 for self: the proposer always counts its own confirmation.
        results.into_iter().filter(|ok| *ok).count() + 1
    }

    /// Handles an incoming `POST /verify_mined_block` from a peer. Per the
    /// original protocol (Design Notes §9(b)), this does not check
    /// `previous_hash` against this node's own tip — a block from a fork
    /// ahead of this node is still structurally valid and gets appended;
    /// re-convergence is left to conflict resolution and self-healing.
    pub async fn verify_mined_block(&self, wire: BlockWire) -> Result<(), ConsensusError> {
        let block = Block::try_from(wire).map_err(|_| ConsensusError::BlockRejected("malformed block".to_string()))?;
        if block.hash != block.compute_hash() {
            return Err(ConsensusError::BlockRejected("hash does not match block contents".to_string()));
        }
        if !validator::verify_block(&block, self.config.difficulty) {
            return Err(ConsensusError::BlockRejected(
                "block failed difficulty or transaction CRC check".to_string(),
            ));
        }
        let mut guard = self.store.lock().await;
        guard.chain.push(block);
        Ok(())
    }

    /// Longest-valid-chain conflict resolution (§4.5): asks every peer for
    /// its chain and adopts the longest one that validates and is strictly
    /// longer than the local chain. Returns whether the local chain changed.
    pub async fn resolve_conflicts(&self) -> Result<bool, ConsensusError> {
        let local_len = self.store.chain_len().await;
        let mut candidates = Vec::new();
        for peer in &self.peers {
            if let Ok(resp) = self.peer_client.fetch_chain(peer).await {
                if let Ok(blocks) = reconstruct_chain(resp.chain) {
                    candidates.push(crate::consensus::fork_choice::PeerChain {
                        peer: peer.clone(),
                        blocks,
                    });
                }
            }
        }
        match crate::consensus::fork_choice::select_longest_valid(local_len, candidates, self.config.difficulty) {
            Some(new_chain) => {
                self.store.replace_chain(new_chain).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
