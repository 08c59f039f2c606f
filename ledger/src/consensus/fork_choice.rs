//! Longest-valid-chain fork choice (§4.5).

use crate::consensus::validator::is_chain_valid;
use crate::types::Block;

/// A chain fetched from a peer, paired with the peer it came from (kept
/// around for logging; not used to break ties).
pub struct PeerChain {
    pub peer: String,
    pub blocks: Vec<Block>,
}

/// Picks the longest valid candidate strictly longer than `local_len`.
/// Ties among multiple candidates of the same (longer) length are broken by
/// whichever was reached first in `candidates`, since a later candidate only
/// replaces the current best when it is strictly longer.
pub fn select_longest_valid(local_len: usize, candidates: Vec<PeerChain>, difficulty: usize) -> Option<Vec<Block>> {
    let mut best_len = local_len;
    let mut best: Option<Vec<Block>> = None;
    for candidate in candidates {
        if candidate.blocks.len() > best_len && is_chain_valid(&candidate.blocks, difficulty) {
            best_len = candidate.blocks.len();
            best = Some(candidate.blocks);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::pow::mine;
    use crate::types::{Transaction, TransactionData};

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
    fn picks_the_longer_valid_candidate() {
        let short = chain_of_length(1, 1);
        let long = chain_of_length(3, 1);
        let candidates = vec![PeerChain {
            peer: "http://node2:5002".to_string(),
            blocks: long.clone(),
        }];
        let chosen = select_longest_valid(short.len(), candidates, 1).expect("should adopt");
        assert_eq!(chosen.len(), long.len());
    }

    #[test]
    fn never_adopts_a_chain_no_longer_than_local() {
        let local = chain_of_length(3, 1);
        let candidates = vec![PeerChain {
            peer: "http://node2:5002".to_string(),
            blocks: chain_of_length(3, 1),
        }];
        assert!(select_longest_valid(local.len(), candidates, 1).is_none());
    }

    #[test]
    fn rejects_a_longer_but_invalid_candidate() {
        let local = chain_of_length(1, 1);
        let mut invalid = chain_of_length(3, 1);
        invalid[2].hash = "ffffffff".to_string();
        let candidates = vec![PeerChain {
            peer: "http://node2:5002".to_string(),
            blocks: invalid,
        }];
        assert!(select_longest_valid(local.len(), candidates, 1).is_none());
    }

    #[test]
    fn first_candidate_wins_a_length_tie() {
        let local = chain_of_length(1, 1);
        let first = chain_of_length(3, 1);
        let second = chain_of_length(3, 1);
        let candidates = vec![
            PeerChain {
                peer: "http://node2:5002".to_string(),
                blocks: first.clone(),
            },
            PeerChain {
                peer: "http://node3:5003".to_string(),
                blocks: second,
            },
        ];
        let chosen = select_longest_valid(local.len(), candidates, 1).expect("should adopt");
        assert_eq!(chosen[1].hash, first[1].hash);
    }
}
