//! HTTP transport used by the ingress client.
//!
//! The [`Transport`] trait is the seam between delivery policy (which status
//! counts as success, what to do on failure) and the actual network call, so
//! the policy can be exercised without TLS.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use thiserror::Error;

use crate::ingress::pinning::{pin_sha256, pinned_client_config, TrustPredicate};
use crate::ingress::types::IngressError;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default whole-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Any failure below the HTTP status line: DNS, TCP, TLS, timeout.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

/// Posts JSON bodies and reports the response status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &str, body: String) -> Result<StatusCode, TransportError>;
}

/// HTTPS transport trusting only a pinned certificate.
#[derive(Debug, Clone)]
pub struct PinnedHttpsTransport {
    client: reqwest::Client,
}

impl PinnedHttpsTransport {
    /// Transport pinned to the certificate with the given SHA-256 fingerprint.
    pub fn new(
        fingerprint: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, IngressError> {
        if fingerprint.trim().is_empty() {
            return Err(IngressError::MissingFingerprint);
        }
        Self::with_trust(pin_sha256(fingerprint), connect_timeout, request_timeout)
    }

    /// Transport with a custom trust predicate.
    pub fn with_trust(
        trust: TrustPredicate,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, IngressError> {
        let tls = pinned_client_config(trust)?;
        let client = reqwest::Client::builder()
            .use_preconfigured_tls(tls)
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for PinnedHttpsTransport {
    async fn post_json(&self, url: &str, body: String) -> Result<StatusCode, TransportError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        Ok(response.status())
    }
}
