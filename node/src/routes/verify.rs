use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ledger::healing::hash_verification_pass;
use ledger::{BlockWire, TransactionWire};
use serde_json::json;

use crate::error::ApiError;
use crate::state::SharedState;

pub async fn verify_transaction(
    State(state): State<SharedState>,
    Json(wire): Json<TransactionWire>,
) -> Result<StatusCode, ApiError> {
    state.engine.verify_transaction(wire).await?;
    Ok(StatusCode::OK)
}

pub async fn verify_mined_block(
    State(state): State<SharedState>,
    Json(wire): Json<BlockWire>,
) -> Result<StatusCode, ApiError> {
    state.engine.verify_mined_block(wire).await?;
    Ok(StatusCode::OK)
}

/// Triggers the periodic hash-verification pass on demand, rather than
/// waiting for its next scheduled tick.
pub async fn verify_hashes(State(state): State<SharedState>) -> (StatusCode, Json<serde_json::Value>) {
    hash_verification_pass(&state.engine).await;
    (StatusCode::OK, Json(json!({ "status": "verified" })))
}
