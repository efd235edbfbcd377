//! Real-time block sample types and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingress::SignedEnvelope;
use crate::signing::SigningError;

/// Metadata of one newly observed block.
///
/// Field order is the canonical serialization order; the signature covers
/// `serde_json::to_string` of this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealTimeTelemetryPayload {
    /// Node client version string.
    pub client: String,
    #[serde(rename = "blocknum")]
    pub block_num: u64,
    #[serde(rename = "blockhash")]
    pub block_hash: String,
    /// Block timestamp, unix seconds.
    #[serde(rename = "blockts")]
    pub block_ts: i64,
    /// When this agent saw the block, unix seconds (UTC).
    #[serde(rename = "blockreceived")]
    pub block_received: i64,
    #[serde(rename = "numpeers")]
    pub num_peers: u16,
    #[serde(rename = "numtxinblock")]
    pub num_tx_in_block: u16,
    #[serde(rename = "gaslimit")]
    pub gas_limit: i64,
    #[serde(rename = "gasused")]
    pub gas_used: i64,
}

/// A signed real-time sample as posted to the ingress.
pub type RealTimeTelemetry = SignedEnvelope<RealTimeTelemetryPayload>;

/// Errors in the real-time pipeline.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Missing or malformed construction parameter.
    #[error("Invalid real-time configuration: {0}")]
    Config(&'static str),

    /// Control-plane RPC failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Control-plane RPC timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Notification could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Signing failed: {0}")]
    Sign(#[from] SigningError),

    #[error("Serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Websocket connect or stream failure; ends the connection cycle.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
