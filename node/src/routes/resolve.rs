use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ledger::BlockWire;
use serde_json::json;

use crate::error::ApiError;
use crate::state::SharedState;

/// Longest-valid-chain conflict resolution (§4.5), run on demand. Returns
/// whether the chain was replaced alongside the resulting authoritative
/// chain, so a caller never has to follow up with a separate `/chain` call.
pub async fn resolve(State(state): State<SharedState>) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let replaced = state.engine.resolve_conflicts().await?;
    let chain = state.engine.store.snapshot_chain().await;
    let wire: Vec<BlockWire> = chain.iter().map(BlockWire::from).collect();
    let length = wire.len();
    Ok((
        StatusCode::OK,
        Json(json!({
            "replaced": replaced,
            "chain": wire,
            "length": length,
        })),
    ))
}
