//! Telemetry signer library.
//!
//! Collects collector lines and new-block samples from a validator node,
//! signs each outbound unit with the node's RSA key, and delivers it to a
//! certificate-pinned ingress, falling back to a file drop.

// Data sources
pub mod collector;
pub mod realtime;

// Pipelines and delivery
pub mod batch;
pub mod ingress;
pub mod secondary;
pub mod signing;

// Cross-cutting concerns
pub mod config;
pub mod observability;
pub mod resilience;

pub use batch::{BatchOrchestrator, TelemetryQueue};
pub use config::SignerConfig;
pub use ingress::IngressClient;
pub use realtime::RealtimeSubscriber;
pub use signing::PayloadSigner;
