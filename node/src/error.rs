//! Maps engine errors onto HTTP status codes, once, at the route boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ledger::ConsensusError;
use serde_json::json;

pub struct ApiError(pub ConsensusError);

impl From<ConsensusError> for ApiError {
    fn from(err: ConsensusError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ConsensusError::CrcInvalid => StatusCode::BAD_REQUEST,
            ConsensusError::ChainInvalid => StatusCode::CONFLICT,
            ConsensusError::QuorumNotReached { .. } => StatusCode::BAD_REQUEST,
            ConsensusError::BlockRejected(_) => StatusCode::BAD_REQUEST,
            ConsensusError::PeerUnreachable(_) => StatusCode::BAD_GATEWAY,
            ConsensusError::AlreadyMining => StatusCode::CONFLICT,
            ConsensusError::NotFound => StatusCode::NOT_FOUND,
            // Idle/WaitingForConfirmations are non-error outcomes of `/mine`
            // and are handled there as 200-with-status-field; this arm only
            // matters if one of those variants reaches `ApiError` from
            // elsewhere, and 409 is a safe conservative fallback.
            ConsensusError::Idle => StatusCode::CONFLICT,
            ConsensusError::WaitingForConfirmations => StatusCode::CONFLICT,
            ConsensusError::ConsensusFailed => StatusCode::CONFLICT,
        };
        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}
