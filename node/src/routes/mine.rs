use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ledger::{BlockWire, ConsensusError};
use serde_json::json;

use crate::error::ApiError;
use crate::state::SharedState;

/// Triggers mining. Successful mining and the two "nothing to do yet"
/// outcomes (`idle`, `waiting_for_confirmations`) all report 200; only
/// `AlreadyMining` and genuine failures go through [`ApiError`].
pub async fn mine(State(state): State<SharedState>) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    match state.engine.mine().await {
        Ok(outcome) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "mined",
                "block": BlockWire::from(&outcome.block),
                "confirmations": outcome.confirmations,
            })),
        )),
        Err(ConsensusError::Idle) => Ok((StatusCode::OK, Json(json!({ "status": "idle" })))),
        Err(ConsensusError::WaitingForConfirmations) => {
            Ok((StatusCode::OK, Json(json!({ "status": "waiting_for_confirmations" }))))
        }
        Err(err) => Err(ApiError::from(err)),
    }
}
