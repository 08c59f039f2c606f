use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ledger::types::{reconstruct_chain, BlockWire, Transaction, TransactionWire};
use serde::Deserialize;
use serde_json::json;

use crate::state::SharedState;

/// Body pushed by a peer: its full chain and pending pool, per §4.5's
/// push-synchronization contract.
#[derive(Deserialize)]
pub struct SynchronizeRequest {
    pub chain: Vec<BlockWire>,
    pub pending_transactions: Vec<TransactionWire>,
}

/// Accepts a peer's chain and pending pool and adopts them if the incoming
/// chain is longer than this node's, or this node's chain is still just the
/// genesis block. Unlike `/nodes/resolve`, this is a push target: the
/// caller supplies the candidate state rather than this node pulling it.
pub async fn synchronize(
    State(state): State<SharedState>,
    Json(req): Json<SynchronizeRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let blocks = match reconstruct_chain(req.chain) {
        Ok(blocks) => blocks,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": format!("block reconstruction failed: {err}") })),
            )
        }
    };

    let pending: Vec<Transaction> = req
        .pending_transactions
        .into_iter()
        .filter_map(|wire| Transaction::try_from(wire).ok())
        .collect();

    match state.engine.store.adopt_chain_and_pending(blocks, pending).await {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({
                "message": "synchronization successful",
                "length": state.engine.store.chain_len().await,
            })),
        ),
        Ok(false) => (StatusCode::OK, Json(json!({ "message": "current chain is up to date" }))),
        Err(err) => (StatusCode::BAD_REQUEST, Json(json!({ "message": err.to_string() }))),
    }
}
