use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ledger::TransactionData;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;

use crate::state::SharedState;

#[derive(Deserialize)]
pub struct SimulateFailureRequest {
    #[serde(rename = "type", default = "default_failure_type")]
    pub failure_type: String,
    /// Only consulted for `network_delay`; milliseconds to stall the
    /// response by. Defaults to a fixed, noticeable delay.
    pub delay_ms: Option<u64>,
}

fn default_failure_type() -> String {
    "node_down".to_string()
}

/// Test hook for exercising the self-healing supervisor on demand: forces
/// one of the four failure modes the design notes' scenarios drive against.
/// `data_corruption` and `hash_corruption` mutate a random non-genesis
/// block directly, bypassing the mutex-guarded invariants the rest of the
/// engine upholds, so the next verification pass has something to repair.
pub async fn simulate_failure(
    State(state): State<SharedState>,
    body: Option<Json<SimulateFailureRequest>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let req = body.map(|Json(req)| req).unwrap_or(SimulateFailureRequest {
        failure_type: default_failure_type(),
        delay_ms: None,
    });

    match req.failure_type.as_str() {
        "node_down" => {
            tracing::error!("simulating node-down failure, exiting process");
            std::process::exit(1);
        }
        "data_corruption" => {
            let mut guard = state.engine.store.lock().await;
            match pick_non_genesis_index(guard.chain.len()) {
                Some(index) => {
                    if let Some(tx) = guard.chain[index].transactions.first_mut() {
                        tx.data = TransactionData::Generic("corrupted_data".to_string());
                        (StatusCode::OK, Json(json!({ "message": "data corruption simulated" })))
                    } else {
                        (StatusCode::OK, Json(json!({ "message": "no transaction to corrupt" })))
                    }
                }
                None => (StatusCode::OK, Json(json!({ "message": "chain too short to corrupt" }))),
            }
        }
        "hash_corruption" => {
            let mut guard = state.engine.store.lock().await;
            match pick_non_genesis_index(guard.chain.len()) {
                Some(index) => {
                    guard.chain[index].hash = "corrupted_hash".to_string();
                    (StatusCode::OK, Json(json!({ "message": "hash corruption simulated" })))
                }
                None => (StatusCode::OK, Json(json!({ "message": "chain too short to corrupt" }))),
            }
        }
        "network_delay" => {
            let delay = Duration::from_millis(req.delay_ms.unwrap_or(3_000));
            tracing::warn!(delay_ms = delay.as_millis() as u64, "simulating network delay");
            tokio::time::sleep(delay).await;
            (StatusCode::OK, Json(json!({ "message": "network delay simulated" })))
        }
        other => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": format!("unknown failure type {other:?}") })),
        ),
    }
}

fn pick_non_genesis_index(chain_len: usize) -> Option<usize> {
    if chain_len <= 1 {
        return None;
    }
    Some(rand::thread_rng().gen_range(1..chain_len))
}
