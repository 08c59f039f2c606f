//! Transaction payloads and their wire encoding.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::integrity::crc::crc32_hex;

/// Payload carried by a transaction.
///
/// `Generic` carries the UTF-8 string the client submitted, unchanged.
/// `Image` carries the raw image bytes (base64 on the wire).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionData {
    Generic(String),
    Image(Vec<u8>),
}

impl TransactionData {
    pub fn kind(&self) -> &'static str {
        match self {
            TransactionData::Generic(_) => "generic",
            TransactionData::Image(_) => "image",
        }
    }

    fn payload_bytes(&self) -> Vec<u8> {
        match self {
            TransactionData::Generic(s) => s.as_bytes().to_vec(),
            TransactionData::Image(bytes) => bytes.clone(),
        }
    }
}

/// A single admitted or pending entry in the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub data: TransactionData,
    pub timestamp: u64,
    pub crc: String,
    /// Peer URLs (and this node's own URL) that have confirmed this
    /// transaction's CRC. A `BTreeSet` keeps iteration order deterministic,
    /// which matters once confirmations are folded into a block hash.
    pub confirmations: BTreeSet<String>,
}

impl Transaction {
    pub fn new(data: TransactionData) -> Self {
        let timestamp = unix_now();
        let crc = crc32_hex(&data.payload_bytes());
        Self {
            data,
            timestamp,
            crc,
            confirmations: BTreeSet::new(),
        }
    }

    pub fn calculate_crc(&self) -> String {
        crc32_hex(&self.data.payload_bytes())
    }

    pub fn verify_crc(&self) -> bool {
        self.crc == self.calculate_crc()
    }

    pub fn kind(&self) -> &'static str {
        self.data.kind()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs()
}

/// On-the-wire representation of a [`Transaction`], as exchanged between
/// peers and returned to HTTP clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionWire {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
    pub timestamp: u64,
    pub crc: String,
    pub confirmations: Vec<String>,
}

impl From<&Transaction> for TransactionWire {
    fn from(tx: &Transaction) -> Self {
        let data = match &tx.data {
            TransactionData::Generic(s) => Value::String(s.clone()),
            TransactionData::Image(bytes) => Value::String(BASE64.encode(bytes)),
        };
        TransactionWire {
            kind: tx.kind().to_string(),
            data,
            timestamp: tx.timestamp,
            crc: tx.crc.clone(),
            confirmations: tx.confirmations.iter().cloned().collect(),
        }
    }
}

/// Error reconstructing a [`Transaction`] from its wire form.
#[derive(Debug, thiserror::Error)]
pub enum TransactionDecodeError {
    #[error("unknown transaction type {0:?}")]
    UnknownKind(String),
    #[error("image transaction data was not valid base64")]
    InvalidBase64,
}

impl TryFrom<TransactionWire> for Transaction {
    type Error = TransactionDecodeError;

    fn try_from(wire: TransactionWire) -> Result<Self, Self::Error> {
        let data = match wire.kind.as_str() {
            "generic" => TransactionData::Generic(generic_string_from_value(&wire.data)),
            "image" => {
                let s = match &wire.data {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let bytes = BASE64
                    .decode(s.as_bytes())
                    .map_err(|_| TransactionDecodeError::InvalidBase64)?;
                TransactionData::Image(bytes)
            }
            other => return Err(TransactionDecodeError::UnknownKind(other.to_string())),
        };
        Ok(Transaction {
            data,
            timestamp: wire.timestamp,
            crc: wire.crc,
            confirmations: wire.confirmations.into_iter().collect(),
        })
    }
}

fn generic_string_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
