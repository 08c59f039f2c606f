//! The ledger's mutable state: chain, pending pool, mining status, and the
//! failed-peer bookkeeping the health checker maintains — all behind a
//! single `tokio::sync::Mutex`.
//!
//! A single mutex (rather than one per field) is a deliberate
//! simplification: the mining routine holds it across block construction,
//! proof-of-work, and peer broadcast, serializing mining with every other
//! mutation. See `DESIGN.md` for the tradeoff.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::consensus::validator::is_chain_valid;
use crate::types::{Block, Transaction};

#[derive(Clone, Copy, Debug, Default)]
pub struct MiningStatus {
    pub is_mining: bool,
    /// Coarse progress indicator (0, 50, 100) surfaced by `/mine`'s status
    /// response; not meant to be precise.
    pub progress: u8,
}

/// A block's index and hash without its transactions, returned by
/// `latest()` so callers don't pay to clone every transaction in the tip
/// just to read its hash.
#[derive(Clone, Debug)]
pub struct BlockHead {
    pub index: u64,
    pub hash: String,
}

pub struct LedgerState {
    pub chain: Vec<Block>,
    pub pending: Vec<Transaction>,
    pub mining_status: MiningStatus,
    /// peer URL -> unix timestamp of first observed failure since last
    /// recovery.
    pub failed_nodes: HashMap<String, u64>,
}

#[derive(Clone)]
pub struct LedgerStore {
    inner: Arc<Mutex<LedgerState>>,
    difficulty: usize,
}

impl LedgerStore {
    pub fn new(difficulty: usize) -> Self {
        let genesis = Block::genesis();
        Self {
            inner: Arc::new(Mutex::new(LedgerState {
                chain: vec![genesis],
                pending: Vec::new(),
                mining_status: MiningStatus::default(),
                failed_nodes: HashMap::new(),
            })),
            difficulty,
        }
    }

    /// Acquires the state lock directly. Used by the mining routine, which
    /// needs to hold it across proof-of-work and peer broadcast; everything
    /// else should prefer the narrower methods below.
    pub async fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.inner.lock().await
    }

    pub async fn append_transaction(&self, tx: Transaction) -> Result<(), crate::consensus::error::ConsensusError> {
        if !tx.verify_crc() {
            return Err(crate::consensus::error::ConsensusError::CrcInvalid);
        }
        let mut guard = self.inner.lock().await;
        guard.pending.push(tx);
        Ok(())
    }

    pub async fn latest(&self) -> BlockHead {
        let guard = self.inner.lock().await;
        let tip = guard.chain.last().expect("chain always has at least the genesis block");
        BlockHead {
            index: tip.index,
            hash: tip.hash.clone(),
        }
    }

    pub async fn chain_len(&self) -> usize {
        self.inner.lock().await.chain.len()
    }

    pub async fn snapshot_chain(&self) -> Vec<Block> {
        self.inner.lock().await.chain.clone()
    }

    pub async fn get_block(&self, index: usize) -> Option<Block> {
        self.inner.lock().await.chain.get(index).cloned()
    }

    pub async fn mining_status(&self) -> MiningStatus {
        self.inner.lock().await.mining_status
    }

    /// Atomically replaces the chain, provided it validates and is at least
    /// as long as the current one.
    pub async fn replace_chain(&self, new_chain: Vec<Block>) -> Result<(), crate::consensus::error::ConsensusError> {
        if !is_chain_valid(&new_chain, self.difficulty) {
            return Err(crate::consensus::error::ConsensusError::ChainInvalid);
        }
        let mut guard = self.inner.lock().await;
        if new_chain.len() < guard.chain.len() {
            return Err(crate::consensus::error::ConsensusError::ChainInvalid);
        }
        guard.chain = new_chain;
        Ok(())
    }

    /// Adopts `new_chain` pushed by a peer, provided it validates and is
    /// either strictly longer than the current chain or the current chain
    /// is still just the genesis block. On adoption, the pending pool is
    /// replaced by `candidate_pending` filtered down to transactions whose
    /// CRC still verifies and that are not already recorded in the adopted
    /// chain. Returns whether the chain was adopted.
    pub async fn adopt_chain_and_pending(
        &self,
        new_chain: Vec<Block>,
        candidate_pending: Vec<Transaction>,
    ) -> Result<bool, crate::consensus::error::ConsensusError> {
        if !is_chain_valid(&new_chain, self.difficulty) {
            return Err(crate::consensus::error::ConsensusError::ChainInvalid);
        }
        let mut guard = self.inner.lock().await;
        if !(new_chain.len() > guard.chain.len() || guard.chain.len() <= 1) {
            return Ok(false);
        }
        let chain_crcs: std::collections::HashSet<String> = new_chain
            .iter()
            .flat_map(|block| block.transactions.iter().map(|tx| tx.crc.clone()))
            .collect();
        guard.chain = new_chain;
        guard.pending = candidate_pending
            .into_iter()
            .filter(|tx| tx.verify_crc() && !chain_crcs.contains(&tx.crc))
            .collect();
        Ok(true)
    }

    pub async fn is_failed(&self, peer: &str) -> bool {
        self.inner.lock().await.failed_nodes.contains_key(peer)
    }

    pub async fn mark_failed(&self, peer: &str, now: u64) {
        self.inner
            .lock()
            .await
            .failed_nodes
            .entry(peer.to_string())
            .or_insert(now);
    }

    pub async fn clear_failed(&self, peer: &str) {
        self.inner.lock().await.failed_nodes.remove(peer);
    }

    pub async fn failed_nodes_snapshot(&self) -> HashMap<String, u64> {
        self.inner.lock().await.failed_nodes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionData;

    #[tokio::test]
    async fn new_store_starts_with_only_genesis() {
        let store = LedgerStore::new(2);
        assert_eq!(store.chain_len().await, 1);
        let head = store.latest().await;
        assert_eq!(head.index, 0);
    }

    #[tokio::test]
    async fn append_transaction_rejects_tampered_crc() {
        let store = LedgerStore::new(2);
        let mut tx = Transaction::new(TransactionData::Generic("hi".to_string()));
        tx.crc = "00000000".to_string();
        assert!(store.append_transaction(tx).await.is_err());
    }

    #[tokio::test]
    async fn append_transaction_accepts_valid_crc() {
        let store = LedgerStore::new(2);
        let tx = Transaction::new(TransactionData::Generic("hi".to_string()));
        store.append_transaction(tx).await.expect("valid tx");
        assert_eq!(store.inner.lock().await.pending.len(), 1);
    }

    #[tokio::test]
    async fn replace_chain_rejects_a_chain_shorter_than_current() {
        let store = LedgerStore::new(1);
        let genesis = store.get_block(0).await.unwrap();
        let mut next = Block::new(1, genesis.hash.clone(), vec![]);
        crate::integrity::pow::mine(&mut next, 1);
        store
            .replace_chain(vec![genesis.clone(), next])
            .await
            .expect("two-block chain should be accepted");
        assert_eq!(store.chain_len().await, 2);

        let result = store.replace_chain(vec![genesis]).await;
        assert!(result.is_err());
        assert_eq!(store.chain_len().await, 2);
    }

    #[tokio::test]
    async fn failed_nodes_track_first_failure_timestamp() {
        let store = LedgerStore::new(2);
        store.mark_failed("http://node2:5002", 100).await;
        store.mark_failed("http://node2:5002", 200).await;
        let snapshot = store.failed_nodes_snapshot().await;
        assert_eq!(snapshot["http://node2:5002"], 100);
        store.clear_failed("http://node2:5002").await;
        assert!(store.failed_nodes_snapshot().await.is_empty());
    }
}
