use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ledger::TransactionData;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct NewTransactionRequest {
    pub data: String,
}

#[derive(Serialize)]
pub struct NewTransactionResponse {
    pub crc: String,
    pub confirmations: usize,
}

pub async fn new_transaction(
    State(state): State<SharedState>,
    Json(req): Json<NewTransactionRequest>,
) -> Result<(StatusCode, Json<NewTransactionResponse>), ApiError> {
    let tx = state.engine.submit(TransactionData::Generic(req.data)).await?;
    Ok((
        StatusCode::CREATED,
        Json(NewTransactionResponse {
            crc: tx.crc.clone(),
            confirmations: tx.confirmations.len(),
        }),
    ))
}
