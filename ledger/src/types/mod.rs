//! Wire and in-memory data model: transactions and blocks.

pub mod block;
pub mod transaction;

pub use block::{reconstruct_chain, Block, BlockWire};
pub use transaction::{Transaction, TransactionData, TransactionDecodeError, TransactionWire};
