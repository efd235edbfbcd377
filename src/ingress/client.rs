//! Pinned delivery channel to the ingress service.
//!
//! # Responsibilities
//! - Validate endpoint and fingerprint before any connection exists
//! - POST a JSON body and report success as a boolean
//! - Treat only `202 Accepted` as delivered

use std::sync::Arc;

use reqwest::StatusCode;

use crate::ingress::transport::{
    PinnedHttpsTransport, Transport, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};
use crate::ingress::types::IngressError;

/// Delivery channel for one ingress endpoint.
#[derive(Clone)]
pub struct IngressClient {
    endpoint: String,
    transport: Arc<dyn Transport>,
}

impl IngressClient {
    /// Create a client for `endpoint`, trusting only `fingerprint`.
    ///
    /// `transport` overrides the pinned HTTPS transport, mostly for tests or to
    /// share one connection pool between endpoints.
    pub fn new(
        endpoint: &str,
        fingerprint: &str,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Self, IngressError> {
        if endpoint.trim().is_empty() {
            return Err(IngressError::InvalidEndpoint {
                url: endpoint.to_string(),
                reason: "URL is empty",
            });
        }
        if !endpoint.starts_with("https://") {
            return Err(IngressError::InvalidEndpoint {
                url: endpoint.to_string(),
                reason: "URL is not https",
            });
        }
        if fingerprint.trim().is_empty() {
            return Err(IngressError::MissingFingerprint);
        }

        let transport: Arc<dyn Transport> = match transport {
            Some(transport) => transport,
            None => Arc::new(PinnedHttpsTransport::new(
                fingerprint,
                DEFAULT_CONNECT_TIMEOUT,
                DEFAULT_REQUEST_TIMEOUT,
            )?),
        };

        Ok(Self {
            endpoint: endpoint.to_string(),
            transport,
        })
    }

    /// The endpoint this client posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `json_payload` to the endpoint.
    ///
    /// Returns `Ok(true)` only for `202 Accepted`. Other statuses and transport
    /// failures return `Ok(false)`; only an empty payload is an error.
    pub async fn send_request(&self, json_payload: &str) -> Result<bool, IngressError> {
        if json_payload.trim().is_empty() {
            return Err(IngressError::EmptyPayload);
        }

        match self.transport.post_json(&self.endpoint, json_payload.to_string()).await {
            Ok(status) if status == StatusCode::ACCEPTED => Ok(true),
            Ok(status) => {
                tracing::warn!(endpoint = %self.endpoint, status = %status, "Ingress rejected payload");
                Ok(false)
            }
            Err(e) => {
                tracing::error!(endpoint = %self.endpoint, error = %e, "Unable to send to ingress");
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for IngressClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngressClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
