use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ledger::{ConsensusError, TransactionData};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Serialize)]
pub struct ImageProcessResponse {
    pub crc: String,
    pub confirmations: usize,
    /// Outcome of the mining attempt run immediately after admission:
    /// `"mined"`, `"idle"`, or `"waiting_for_confirmations"`.
    pub mine_status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ImageRouteError {
    #[error("transaction rejected")]
    Consensus(#[from] ledger::ConsensusError),
    #[error("multipart body could not be read: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
    #[error("no \"image\" field found in the multipart body")]
    MissingField,
}

impl IntoResponse for ImageRouteError {
    fn into_response(self) -> Response {
        match self {
            ImageRouteError::Consensus(err) => ApiError::from(err).into_response(),
            other => (StatusCode::BAD_REQUEST, other.to_string()).into_response(),
        }
    }
}

/// Accepts a multipart upload with an `image` field, submits its bytes as
/// an image transaction through the same broadcast-and-confirm path as
/// `/transaction/new`, then runs the full admit-then-mine pipeline by
/// attempting to mine immediately. A mining attempt that finds nothing
/// ready yet (`Idle`/`WaitingForConfirmations`) is not an error here — the
/// transaction was still admitted.
pub async fn process_image(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageProcessResponse>), ImageRouteError> {
    let mut image_bytes = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("image") {
            image_bytes = Some(field.bytes().await?);
            break;
        }
    }
    let image_bytes = image_bytes.ok_or(ImageRouteError::MissingField)?;

    let tx = state.engine.submit(TransactionData::Image(image_bytes.to_vec())).await?;
    let mine_status = match state.engine.mine().await {
        Ok(_) => "mined",
        Err(ConsensusError::Idle) => "idle",
        Err(ConsensusError::WaitingForConfirmations) => "waiting_for_confirmations",
        Err(err) => return Err(err.into()),
    };
    Ok((
        StatusCode::OK,
        Json(ImageProcessResponse {
            crc: tx.crc.clone(),
            confirmations: tx.confirmations.len(),
            mine_status: mine_status.to_string(),
        }),
    ))
}
