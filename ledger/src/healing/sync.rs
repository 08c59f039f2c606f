//! Startup chain synchronization: up to three attempts, five seconds apart,
//! retried only while no peer has answered at all (riding out the race of
//! peers still starting up in the same cluster launch).

use std::time::Duration;

use crate::consensus::engine::Engine;
use crate::consensus::fork_choice::{select_longest_valid, PeerChain};
use crate::types::reconstruct_chain;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub async fn initial_sync(engine: &Engine) {
    for attempt in 1..=MAX_ATTEMPTS {
        let (candidate, any_peer_reachable) = attempt_sync(engine).await;

        if let Some(chain) = candidate {
            let adopted_len = chain.len();
            match engine.store.replace_chain(chain).await {
                Ok(()) => tracing::info!(chain_length = adopted_len, "initial sync adopted a longer chain"),
                Err(err) => tracing::warn!(error = %err, "failed to adopt longer chain found during initial sync"),
            }
            crate::healing::verify::verify_chain_integrity(engine).await;
            return;
        }

        if any_peer_reachable || attempt == MAX_ATTEMPTS {
            tracing::info!("initial sync found no longer valid chain, keeping local chain");
            crate::healing::verify::verify_chain_integrity(engine).await;
            return;
        }

        tracing::warn!(attempt, "no peers reachable yet, retrying initial sync");
        tokio::time::sleep(RETRY_DELAY).await;
    }
}

/// One round of polling every peer for its chain. Returns the longest valid
/// candidate strictly longer than the local chain (if any), and whether at
/// least one peer answered at all (used to decide whether a retry is a
/// cluster still starting up, or genuinely no peers reachable).
async fn attempt_sync(engine: &Engine) -> (Option<Vec<crate::types::Block>>, bool) {
    let local_len = engine.store.chain_len().await;
    let mut candidates = Vec::new();
    let mut any_peer_reachable = false;

    for peer in &engine.peers {
        match engine.peer_client.fetch_chain(peer).await {
            Ok(resp) => {
                any_peer_reachable = true;
                match reconstruct_chain(resp.chain) {
                    Ok(blocks) => candidates.push(PeerChain {
                        peer: peer.clone(),
                        blocks,
                    }),
                    Err(err) => tracing::warn!(%peer, error = %err, "peer sent an undecodable chain"),
                }
            }
            Err(err) => tracing::warn!(%peer, error = %err, "peer unreachable during initial sync"),
        }
    }

    (
        select_longest_valid(local_len, candidates, engine.config.difficulty),
        any_peer_reachable,
    )
}
