//! Configuration loading from disk and environment.
//!
//! Load order: defaults → optional TOML file → environment variables →
//! validation. Empty environment variables count as unset.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::SignerConfig;
use crate::config::validation::{validate_config, ValidationError, ValidationScope};

pub const ENV_NODE_ID: &str = "TELEMETRY_NODE_ID";
pub const ENV_INGRESS_HOST: &str = "TELEMETRY_INGRESS_HOST";
pub const ENV_INGRESS_FINGERPRINT: &str = "TELEMETRY_INGRESS_FINGERPRINT";
pub const ENV_INTERNAL_DIR: &str = "TELEMETRY_INTERNAL_DIR";
pub const ENV_INFLUX_SOCKET: &str = "INFLUX_SOCKET";
pub const ENV_RPC_ENDPOINT: &str = "RPC_ENDPOINT";
pub const ENV_PARITY_WEB_SOCKET: &str = "PARITY_WEB_SOCKET";
pub const ENV_SFTP_HOST: &str = "SFTP_HOST";
pub const ENV_SFTP_PORT: &str = "SFTP_PORT";
pub const ENV_SFTP_USER: &str = "SFTP_USER";
pub const ENV_SFTP_PASS: &str = "SFTP_PASS";
pub const ENV_SFTP_FINGERPRINT: &str = "SFTP_FINGER_PRINT";
pub const ENV_FTP_DIR: &str = "FTP_DIR";
pub const ENV_LOG_LEVEL: &str = "TELEMETRY_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "TELEMETRY_LOG_JSON";
pub const ENV_METRICS_ADDR: &str = "TELEMETRY_METRICS_ADDR";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file plus the process
/// environment, then validate it for `scope`.
pub fn load_config(path: Option<&Path>, scope: ValidationScope) -> Result<SignerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => SignerConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config, scope).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides read through `lookup`.
pub fn apply_env_overrides<F>(config: &mut SignerConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(ENV_NODE_ID) {
        config.node_id = v;
    }
    if let Some(v) = get(ENV_INGRESS_HOST) {
        config.ingress.host = v;
    }
    if let Some(v) = get(ENV_INGRESS_FINGERPRINT) {
        config.ingress.fingerprint = v;
    }
    if let Some(v) = get(ENV_INTERNAL_DIR) {
        config.key_store_dir = v;
    }
    if let Some(v) = get(ENV_INFLUX_SOCKET) {
        config.collector.socket_path = v;
    }
    if let Some(v) = get(ENV_RPC_ENDPOINT) {
        config.node.rpc_url = v;
    }
    if let Some(v) = get(ENV_PARITY_WEB_SOCKET) {
        config.node.websocket_url = v;
    }
    if let Some(v) = get(ENV_SFTP_HOST) {
        config.secondary.sftp_host = Some(v);
    }
    if let Some(v) = get(ENV_SFTP_PORT) {
        config.secondary.sftp_port = v.trim().parse().map_err(|e| ConfigError::Env {
            var: ENV_SFTP_PORT,
            reason: format!("'{}' is not a port: {}", v, e),
        })?;
    }
    if let Some(v) = get(ENV_SFTP_USER) {
        config.secondary.sftp_user = Some(v);
    }
    if let Some(v) = get(ENV_SFTP_PASS) {
        config.secondary.sftp_password = Some(v);
    }
    if let Some(v) = get(ENV_SFTP_FINGERPRINT) {
        config.secondary.sftp_fingerprint = Some(v);
    }
    if let Some(v) = get(ENV_FTP_DIR) {
        config.secondary.drop_dir = v;
    }
    if let Some(v) = get(ENV_LOG_LEVEL) {
        config.observability.log_level = v;
    }
    if let Some(v) = get(ENV_LOG_JSON) {
        config.observability.json_logs = match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => {
                return Err(ConfigError::Env {
                    var: ENV_LOG_JSON,
                    reason: format!("'{}' is not a boolean", v),
                })
            }
        };
    }
    if let Some(v) = get(ENV_METRICS_ADDR) {
        config.observability.metrics_address = Some(v);
    }

    Ok(())
}
