//! Certificate pinning for the ingress TLS connection.
//!
//! The ingress presents a self-managed certificate, so the only trust anchor
//! is the SHA-256 fingerprint of its DER encoding. CA chains, names and
//! validity dates are not checked. Handshake signatures are still verified
//! against the presented certificate, so a peer must own the pinned key.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, SignatureScheme};
use sha2::{Digest, Sha256};

/// Decides whether a certificate with the given SHA-256 digest is trusted.
pub type TrustPredicate = Arc<dyn Fn(&[u8; 32]) -> bool + Send + Sync>;

/// Normalize a fingerprint for comparison: uppercase hex, separators removed.
///
/// `"AA:BB:CC"`, `"aa-bb-cc"` and `"aabbcc"` all normalize to `"AABBCC"`.
pub fn normalize_fingerprint(fingerprint: &str) -> String {
    fingerprint
        .chars()
        .filter(|c| !matches!(c, ':' | '-') && !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// SHA-256 digest of a DER certificate.
pub fn certificate_digest(der: &[u8]) -> [u8; 32] {
    Sha256::digest(der).into()
}

/// Uppercase hex SHA-256 fingerprint of a DER certificate.
pub fn certificate_fingerprint(der: &[u8]) -> String {
    hex::encode_upper(certificate_digest(der))
}

/// Trust exactly the certificate whose fingerprint equals `expected`.
pub fn pin_sha256(expected: &str) -> TrustPredicate {
    let expected = normalize_fingerprint(expected);
    Arc::new(move |digest: &[u8; 32]| hex::encode_upper(digest) == expected)
}

/// rustls verifier that delegates the trust decision to a [`TrustPredicate`].
pub struct PinnedCertVerifier {
    trust: TrustPredicate,
    provider: Arc<CryptoProvider>,
}

impl PinnedCertVerifier {
    pub fn new(trust: TrustPredicate, provider: Arc<CryptoProvider>) -> Self {
        Self { trust, provider }
    }
}

impl std::fmt::Debug for PinnedCertVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinnedCertVerifier").finish_non_exhaustive()
    }
}

impl ServerCertVerifier for PinnedCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let digest = certificate_digest(end_entity.as_ref());
        if (self.trust)(&digest) {
            return Ok(ServerCertVerified::assertion());
        }

        tracing::warn!(
            presented = %hex::encode_upper(digest),
            "Ingress certificate fingerprint does not match pin"
        );
        Err(rustls::Error::InvalidCertificate(
            CertificateError::ApplicationVerificationFailure,
        ))
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

/// Build a rustls client config whose only trust anchor is `trust`.
pub fn pinned_client_config(trust: TrustPredicate) -> Result<rustls::ClientConfig, rustls::Error> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let verifier = PinnedCertVerifier::new(trust, provider.clone());

    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();
    Ok(config)
}
