//! HTTP client for talking to the other nodes in the cluster.
//!
//! Every call folds transport failures and non-2xx responses into a single
//! [`PeerError`] that the engine treats as "this peer did not confirm"
//! rather than propagating a fatal error (see the error handling design in
//! `DESIGN.md`).

use std::time::Duration;

use crate::types::{BlockWire, TransactionWire};

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("transport error contacting peer: {0}")]
    Transport(String),
    #[error("peer responded with status {0}")]
    Status(u16),
    #[error("peer response body could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for PeerError {
    fn from(err: reqwest::Error) -> Self {
        PeerError::Transport(err.to_string())
    }
}

/// A peer's response to `GET /chain`.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<BlockWire>,
    pub length: usize,
}

pub struct PeerClient {
    default_client: reqwest::Client,
    chain_client: reqwest::Client,
}

impl PeerClient {
    pub fn new(peer_timeout: Duration, chain_fetch_timeout: Duration) -> Self {
        let default_client = reqwest::Client::builder()
            .timeout(peer_timeout)
            .build()
            .expect("default reqwest client builds with a fixed, valid configuration");
        let chain_client = reqwest::Client::builder()
            .timeout(chain_fetch_timeout)
            .build()
            .expect("chain-fetch reqwest client builds with a fixed, valid configuration");
        Self {
            default_client,
            chain_client,
        }
    }

    pub async fn verify_transaction(&self, peer: &str, tx: &TransactionWire) -> Result<bool, PeerError> {
        let url = format!("{peer}/verify_transaction");
        let resp = self.default_client.post(url).json(tx).send().await?;
        Ok(resp.status().is_success())
    }

    pub async fn verify_mined_block(&self, peer: &str, block: &BlockWire) -> Result<bool, PeerError> {
        let url = format!("{peer}/verify_mined_block");
        let resp = self.default_client.post(url).json(block).send().await?;
        Ok(resp.status().is_success())
    }

    pub async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, PeerError> {
        let url = format!("{peer}/chain");
        let resp = self.chain_client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(PeerError::Status(resp.status().as_u16()));
        }
        resp.json().await.map_err(|e| PeerError::Decode(e.to_string()))
    }

    pub async fn fetch_block(&self, peer: &str, index: u64) -> Result<Option<BlockWire>, PeerError> {
        let url = format!("{peer}/block/{index}");
        let resp = self.default_client.get(url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(PeerError::Status(resp.status().as_u16()));
        }
        let block = resp.json().await.map_err(|e| PeerError::Decode(e.to_string()))?;
        Ok(Some(block))
    }

    pub async fn health(&self, peer: &str) -> Result<bool, PeerError> {
        let url = format!("{peer}/health");
        let resp = self.default_client.get(url).send().await?;
        Ok(resp.status().is_success())
    }

    pub async fn notify_resolve(&self, peer: &str) -> Result<(), PeerError> {
        let url = format!("{peer}/nodes/resolve");
        self.default_client.get(url).send().await?;
        Ok(())
    }
}
