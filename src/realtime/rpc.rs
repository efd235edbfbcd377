//! Control-plane JSON-RPC client for the local node.
//!
//! # Responsibilities
//! - Query `net_peerCount` and `web3_clientVersion`
//! - Bound every call with a timeout
//!
//! # Design Decisions
//! - Raw JSON-RPC over reqwest; the two calls needed do not justify a full
//!   provider stack
//! - [`NodeRpc`] is a trait so the subscriber can be tested without a node

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::timeout;

use crate::realtime::parser::parse_hex_u64;
use crate::realtime::types::RealtimeError;

/// Subscription request sent once per websocket session.
pub const SUBSCRIBE_REQUEST: &str =
    r#"{"method":"parity_subscribe","params":["eth_getBlockByNumber",["latest",true]],"id":1,"jsonrpc":"2.0"}"#;

/// Node queries made for every received block.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// Number of connected peers.
    async fn peer_count(&self) -> Result<u16, RealtimeError>;

    /// Client name and version string.
    async fn client_version(&self) -> Result<String, RealtimeError>;
}

/// HTTP JSON-RPC implementation of [`NodeRpc`].
#[derive(Clone)]
pub struct JsonRpcClient {
    url: String,
    http: reqwest::Client,
    timeout_duration: Duration,
}

impl JsonRpcClient {
    pub fn new(url: &str, timeout_duration: Duration) -> Result<Self, RealtimeError> {
        if url.trim().is_empty() {
            return Err(RealtimeError::Config("RPC URL is empty"));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(timeout_duration)
            .build()
            .map_err(|e| RealtimeError::Rpc(format!("Unable to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.to_string(),
            http,
            timeout_duration,
        })
    }

    /// Issue a parameterless call and return its `result`.
    async fn call(&self, method: &'static str) -> Result<Value, RealtimeError> {
        let request = json!({ "method": method, "params": [], "id": 1, "jsonrpc": "2.0" });
        let secs = self.timeout_duration.as_secs();

        let exchange = async {
            let response = self
                .http
                .post(&self.url)
                .json(&request)
                .send()
                .await
                .map_err(|e| RealtimeError::Rpc(format!("{}: {}", method, e)))?;
            response
                .json::<Value>()
                .await
                .map_err(|e| RealtimeError::Rpc(format!("{}: invalid response: {}", method, e)))
        };

        let body = timeout(self.timeout_duration, exchange)
            .await
            .map_err(|_| RealtimeError::Timeout(secs))??;

        if let Some(error) = body.get("error") {
            return Err(RealtimeError::Rpc(format!("{} returned error: {}", method, error)));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| RealtimeError::Rpc(format!("{} response has no result", method)))
    }
}

#[async_trait]
impl NodeRpc for JsonRpcClient {
    async fn peer_count(&self) -> Result<u16, RealtimeError> {
        let result = self.call("net_peerCount").await?;
        let raw = result
            .as_str()
            .ok_or_else(|| RealtimeError::Rpc("net_peerCount result is not a string".into()))?;
        let peers = parse_hex_u64(raw)?;
        u16::try_from(peers).map_err(|_| RealtimeError::Parse(format!("peer count {} out of range", peers)))
    }

    async fn client_version(&self) -> Result<String, RealtimeError> {
        let result = self.call("web3_clientVersion").await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RealtimeError::Rpc("web3_clientVersion result is not a string".into()))
    }
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("url", &self.url)
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}
