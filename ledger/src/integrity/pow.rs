//! Proof-of-work mining: incrementing a block's nonce until its hash carries
//! `difficulty` leading zero hex digits (invariant B2).

use crate::types::block::Block;

/// Mines `block` in place: resets its nonce to zero and increments it until
/// `block.hash` starts with `difficulty` zeros.
pub fn mine(block: &mut Block, difficulty: usize) {
    let target = "0".repeat(difficulty);
    block.nonce = 0;
    block.hash = block.compute_hash();
    let mut iterations: u64 = 0;
    while !block.hash.starts_with(&target) {
        block.nonce += 1;
        block.hash = block.compute_hash();
        iterations += 1;
        if iterations % 100_000 == 0 {
            tracing::debug!(iterations, nonce = block.nonce, "still mining");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mined_hash_satisfies_difficulty() {
        let mut block = Block::genesis();
        block.index = 1;
        block.previous_hash = "deadbeef".to_string();
        mine(&mut block, 2);
        assert!(block.hash.starts_with("00"));
        assert_eq!(block.hash, block.compute_hash());
    }

    #[test]
    fn zero_difficulty_mines_immediately() {
        let mut block = Block::genesis();
        mine(&mut block, 0);
        assert_eq!(block.nonce, 0);
    }
}
