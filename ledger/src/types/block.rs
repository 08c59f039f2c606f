//! Blocks and their canonical hash.

use serde::{Deserialize, Serialize};

use crate::integrity::hash::{canonical_bytes, sha256_hex};
use crate::types::transaction::{Transaction, TransactionData, TransactionDecodeError, TransactionWire};

/// A block in the ledger's append-only chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    pub hash: String,
}

/// The subset of a block's fields that feed its hash. `hash` itself is
/// excluded, and `timestamp` is carried as given rather than recomputed, so
/// that re-hashing a block (to verify B1) reproduces the same bytes that
/// were hashed when it was built or mined.
#[derive(Serialize)]
struct HashInput {
    index: u64,
    previous_hash: String,
    transactions: Vec<TransactionWire>,
    timestamp: u64,
    nonce: u64,
}

impl Block {
    /// Builds an unmined block (`nonce = 0`, `hash` left unset) for the
    /// given transactions on top of `previous_hash`.
    pub fn new(index: u64, previous_hash: String, transactions: Vec<Transaction>) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_secs();
        let mut block = Block {
            index,
            previous_hash,
            timestamp,
            transactions,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// The first block of every node's chain: index 0, `previous_hash`
    /// `"0"`, a single `"Genesis Block"` transaction, unmined (genesis is
    /// exempt from the difficulty invariant, B2).
    pub fn genesis() -> Self {
        let tx = Transaction::new(TransactionData::Generic("Genesis Block".to_string()));
        Self::new(0, "0".to_string(), vec![tx])
    }

    /// Recomputes this block's hash from its current fields. Invariant B1
    /// holds exactly when this equals `self.hash`.
    pub fn compute_hash(&self) -> String {
        let input = HashInput {
            index: self.index,
            previous_hash: self.previous_hash.clone(),
            transactions: self.transactions.iter().map(TransactionWire::from).collect(),
            timestamp: self.timestamp,
            nonce: self.nonce,
        };
        sha256_hex(&canonical_bytes(&input))
    }
}

/// On-the-wire representation of a [`Block`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockWire {
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: u64,
    pub transactions: Vec<TransactionWire>,
    pub hash: String,
    pub nonce: u64,
}

impl From<&Block> for BlockWire {
    fn from(block: &Block) -> Self {
        BlockWire {
            index: block.index,
            previous_hash: block.previous_hash.clone(),
            timestamp: block.timestamp,
            transactions: block.transactions.iter().map(TransactionWire::from).collect(),
            hash: block.hash.clone(),
            nonce: block.nonce,
        }
    }
}

impl TryFrom<BlockWire> for Block {
    type Error = TransactionDecodeError;

    /// Reconstructs a block exactly as received: `hash` and `nonce` are
    /// preserved, not recomputed. Callers that need B1 to hold call
    /// `compute_hash` themselves and compare.
    fn try_from(wire: BlockWire) -> Result<Self, Self::Error> {
        let transactions = wire
            .transactions
            .into_iter()
            .map(Transaction::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Block {
            index: wire.index,
            previous_hash: wire.previous_hash,
            timestamp: wire.timestamp,
            transactions,
            nonce: wire.nonce,
            hash: wire.hash,
        })
    }
}

/// Reconstructs a whole chain from its wire form, preserving each block's
/// `hash`/`nonce` as received. Returns the first decode error encountered.
pub fn reconstruct_chain(wire: Vec<BlockWire>) -> Result<Vec<Block>, TransactionDecodeError> {
    wire.into_iter().map(Block::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_block_has_index_zero_and_sentinel_previous_hash() {
        let genesis = Block::genesis();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "0");
        assert_eq!(genesis.hash, genesis.compute_hash());
    }

    #[test]
    fn compute_hash_is_stable_across_calls() {
        let genesis = Block::genesis();
        assert_eq!(genesis.compute_hash(), genesis.compute_hash());
    }

    #[test]
    fn changing_nonce_changes_hash() {
        let mut block = Block::genesis();
        let original = block.compute_hash();
        block.nonce += 1;
        assert_ne!(original, block.compute_hash());
    }

    #[test]
    fn wire_roundtrip_preserves_hash_and_nonce() {
        let block = Block::genesis();
        let wire = BlockWire::from(&block);
        let back = Block::try_from(wire).expect("decode");
        assert_eq!(back.hash, block.hash);
        assert_eq!(back.nonce, block.nonce);
        assert_eq!(back.transactions.len(), block.transactions.len());
    }
}
