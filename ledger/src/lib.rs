//! Core engine for a permissioned image ledger: an append-only, hash-linked
//! proof-of-work chain with broadcast-and-confirm transaction admission and
//! longest-valid-chain consensus across a fixed peer cluster.
//!
//! This crate has no HTTP surface of its own — the `node` binary crate
//! wires [`Engine`] and [`LedgerStore`] to routes.

pub mod concurrency;
pub mod config;
pub mod consensus;
pub mod healing;
pub mod integrity;
pub mod metrics;
pub mod peer;
pub mod store;
pub mod types;

pub use config::NodeConfig;
pub use consensus::{ConsensusConfig, ConsensusError, Engine, MineOutcome};
pub use peer::{PeerClient, PeerError};
pub use store::{BlockHead, LedgerState, LedgerStore, MiningStatus};
pub use types::{Block, BlockWire, Transaction, TransactionData, TransactionWire};
