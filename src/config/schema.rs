//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the signer.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a file may set only what it needs.

use serde::{Deserialize, Serialize};

/// Hard ceiling on lines per batch packet.
pub const BATCH_LINE_LIMIT: usize = 50;

/// Root configuration for the telemetry signer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Identity of this node; also the password protecting the signing key.
    pub node_id: String,

    /// Directory holding `signing.salt` and `signing.key`.
    pub key_store_dir: String,

    /// Ingress delivery settings.
    pub ingress: IngressConfig,

    /// Local node RPC and subscription settings.
    pub node: NodeConfig,

    /// Collector feed settings.
    pub collector: CollectorConfig,

    /// Batch flush schedule.
    pub batch: BatchConfig,

    /// Secondary (fallback) channel settings.
    pub secondary: SecondaryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            key_store_dir: "/var/lib/telemetry-signer".to_string(),
            ingress: IngressConfig::default(),
            node: NodeConfig::default(),
            collector: CollectorConfig::default(),
            batch: BatchConfig::default(),
            secondary: SecondaryConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Ingress delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngressConfig {
    /// Base HTTPS URL of the ingress host.
    pub host: String,

    /// SHA-256 fingerprint of the ingress TLS certificate.
    pub fingerprint: String,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            fingerprint: String::new(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

/// Local blockchain node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// HTTP JSON-RPC endpoint.
    pub rpc_url: String,

    /// WebSocket endpoint for block subscriptions.
    pub websocket_url: String,

    /// JSON-RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Delay before reconnecting a dropped subscription, in seconds.
    pub reconnect_delay_secs: u64,

    /// Sender idle wake-up interval, in seconds.
    pub heartbeat_secs: u64,

    /// Upper bound of the random delay before each real-time delivery, in ms.
    pub jitter_max_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            websocket_url: "ws://localhost:8546".to_string(),
            rpc_timeout_secs: 10,
            reconnect_delay_secs: 20,
            heartbeat_secs: 30,
            jitter_max_ms: 500,
        }
    }
}

/// Collector feed configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Unix socket or named pipe the collector writes lines to.
    pub socket_path: String,

    /// Base delay for reopening the feed after EOF or error, in ms.
    pub reopen_base_ms: u64,

    /// Maximum reopen delay, in ms.
    pub reopen_max_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            socket_path: "/var/run/influxdb.sock".to_string(),
            reopen_base_ms: 500,
            reopen_max_ms: 30_000,
        }
    }
}

/// Batch flush schedule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Delay before the first flush tick, in seconds.
    pub initial_delay_secs: u64,

    /// Normal flush period, in seconds.
    pub period_secs: u64,

    /// Flush period while catching up on a large backlog, in seconds.
    pub catchup_period_secs: u64,

    /// Queue length above which the catch-up period is used.
    pub catchup_threshold: usize,

    /// Maximum lines per batch, at most [`BATCH_LINE_LIMIT`].
    pub max_batch_lines: usize,

    /// Ticks are skipped while the queue holds at most this many lines...
    pub min_batch_lines: usize,

    /// ...and the last flush is at most this many seconds old.
    pub max_idle_secs: u64,

    /// Failed batches also go to the secondary channel once the last
    /// successful flush is older than this, in seconds.
    pub fallback_after_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 5,
            period_secs: 10,
            catchup_period_secs: 2,
            catchup_threshold: 250,
            max_batch_lines: BATCH_LINE_LIMIT,
            min_batch_lines: 10,
            max_idle_secs: 60,
            fallback_after_secs: 300,
        }
    }
}

/// Secondary channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecondaryConfig {
    /// Directory fallback files land in: the remote working directory when
    /// `sftp_host` is set, a local directory otherwise.
    pub drop_dir: String,

    /// SFTP server for fallback uploads; unset means local file drop.
    pub sftp_host: Option<String>,

    /// Remote port.
    pub sftp_port: u16,

    /// Remote user.
    pub sftp_user: Option<String>,

    /// Remote password. Never logged.
    #[serde(skip_serializing)]
    pub sftp_password: Option<String>,

    /// Pinned host key fingerprint (MD5 or SHA-256 hex of the key blob).
    pub sftp_fingerprint: Option<String>,

    /// Whole-transfer timeout for one SFTP upload, in seconds.
    pub sftp_timeout_secs: u64,
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            drop_dir: "/var/lib/telemetry-signer/outbox".to_string(),
            sftp_host: None,
            sftp_port: 22,
            sftp_user: None,
            sftp_password: None,
            sftp_fingerprint: None,
            sftp_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines.
    pub json_logs: bool,

    /// Prometheus endpoint bind address; disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_address: None,
        }
    }
}
