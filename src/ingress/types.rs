//! Wire types and errors for ingress delivery.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path of the batch (collector line) endpoint.
pub const BATCH_PATH: &str = "/api/ingress/influx";

/// Path of the real-time block endpoint.
pub const REALTIME_PATH: &str = "/api/ingress/realtime";

/// The signed unit sent to the ingress, shared by both pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope<P> {
    #[serde(rename = "nodeid")]
    pub node_id: String,
    pub payload: P,
    /// Base64 RSA signature over the pipeline's canonical payload bytes.
    pub signature: String,
}

/// A batch of collector lines.
pub type TelemetryPacket = SignedEnvelope<Vec<String>>;

/// Join an ingress base URL and an endpoint path.
pub fn endpoint_url(host: &str, path: &str) -> String {
    format!("{}{}", host.trim_end_matches('/'), path)
}

/// Errors raised by the ingress channel itself.
///
/// Network failures never show up here; they collapse to `false` in
/// [`IngressClient::send_request`](crate::ingress::IngressClient::send_request).
#[derive(Debug, Error)]
pub enum IngressError {
    /// Endpoint URL is empty or not HTTPS.
    #[error("Invalid ingress endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: &'static str },

    /// Pinned fingerprint is empty.
    #[error("Ingress fingerprint is empty")]
    MissingFingerprint,

    /// Attempted to send an empty body.
    #[error("Payload is empty")]
    EmptyPayload,

    /// TLS configuration could not be built.
    #[error("TLS configuration error: {0}")]
    Tls(#[from] rustls::Error),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
