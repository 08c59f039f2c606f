//! The node's HTTP surface: every path named in the external interfaces.

pub mod chain;
pub mod health;
pub mod image;
pub mod mine;
pub mod resolve;
pub mod simulate;
pub mod synchronize;
pub mod transaction;
pub mod verify;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/simulate/failure", post(simulate::simulate_failure))
        .route("/synchronize", post(synchronize::synchronize))
        .route("/nodes/resolve", get(resolve::resolve))
        .route("/block/{index}", get(chain::get_block))
        .route("/chain", get(chain::get_chain))
        .route("/transaction/new", post(transaction::new_transaction))
        .route("/verify_transaction", post(verify::verify_transaction))
        .route("/verify_mined_block", post(verify::verify_mined_block))
        .route("/verify_hashes", post(verify::verify_hashes))
        .route("/image/process", post(image::process_image))
        .route("/mine", get(mine::mine))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
