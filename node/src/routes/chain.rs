use axum::extract::{Path, State};
use axum::Json;
use ledger::{BlockWire, ConsensusError};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::SharedState;

/// A block as reported by `GET /chain`: the wire form plus a client-facing
/// confirmation count for its first transaction. Purely informational —
/// not part of any invariant, and never fails to compute.
#[derive(Serialize)]
pub struct ChainBlockView {
    #[serde(flatten)]
    pub block: BlockWire,
    pub confirmations: usize,
}

#[derive(Serialize)]
pub struct ChainResponse {
    pub chain: Vec<ChainBlockView>,
    pub length: usize,
}

pub async fn get_chain(State(state): State<SharedState>) -> Json<ChainResponse> {
    let chain = state.engine.store.snapshot_chain().await;
    let views: Vec<ChainBlockView> = chain
        .iter()
        .map(|block| ChainBlockView {
            confirmations: block.transactions.first().map(|tx| tx.confirmations.len()).unwrap_or(0),
            block: BlockWire::from(block),
        })
        .collect();
    Json(ChainResponse {
        length: views.len(),
        chain: views,
    })
}

pub async fn get_block(State(state): State<SharedState>, Path(index): Path<u64>) -> Result<Json<BlockWire>, ApiError> {
    let block = state
        .engine
        .store
        .get_block(index as usize)
        .await
        .ok_or(ConsensusError::NotFound)?;
    Ok(Json(BlockWire::from(&block)))
}
