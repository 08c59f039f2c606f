use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::state::SharedState;

pub async fn health(State(state): State<SharedState>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "node_id": state.config.node_id })),
    )
}
