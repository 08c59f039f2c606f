//! Errors surfaced by the admission and mining engine.

use crate::peer::PeerError;

#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error("transaction CRC verification failed")]
    CrcInvalid,

    #[error("received chain failed validation")]
    ChainInvalid,

    #[error("quorum not reached: {have}/{need} confirmations")]
    QuorumNotReached { have: usize, need: usize },

    #[error("block rejected: {0}")]
    BlockRejected(String),

    #[error("peer unreachable: {0}")]
    PeerUnreachable(#[from] PeerError),

    #[error("mining already in progress")]
    AlreadyMining,

    #[error("no block at that index")]
    NotFound,

    #[error("no pending transactions to mine")]
    Idle,

    #[error("no pending transactions have reached mining quorum")]
    WaitingForConfirmations,

    #[error("mined block did not reach broadcast quorum")]
    ConsensusFailed,
}
