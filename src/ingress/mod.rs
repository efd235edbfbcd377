//! Ingress delivery subsystem.
//!
//! # Data Flow
//! ```text
//! SignedEnvelope (types.rs)
//!     → serde_json body
//!     → client.rs (validate, POST, 202 == delivered)
//!     → transport.rs (reqwest over rustls)
//!     → pinning.rs (SHA-256 certificate fingerprint is the only trust anchor)
//! ```
//!
//! # Design Decisions
//! - Bad endpoint or fingerprint fails at construction, before any I/O
//! - Network errors degrade to `false`; callers decide on fallback
//! - One transport can be shared by the batch and real-time clients

pub mod client;
pub mod pinning;
pub mod transport;
pub mod types;

pub use client::IngressClient;
pub use pinning::{normalize_fingerprint, pin_sha256, TrustPredicate};
pub use transport::{PinnedHttpsTransport, Transport, TransportError};
pub use types::{endpoint_url, IngressError, SignedEnvelope, TelemetryPacket, BATCH_PATH, REALTIME_PATH};
