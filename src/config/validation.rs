//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URL schemes, fingerprints and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SignerConfig → Result<(), Vec<ValidationError>>
//! - Key generation only needs the identity and key store, so it validates less

use thiserror::Error;

use crate::config::schema::{SignerConfig, BATCH_LINE_LIMIT};
use crate::ingress::normalize_fingerprint;
use crate::secondary::sftp::is_supported_pin;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// What the configuration is about to be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationScope {
    /// `--genkeys`: identity and key store only.
    KeyGeneration,
    /// Running both pipelines.
    Run,
}

/// Validate `config` for the given scope.
pub fn validate_config(config: &SignerConfig, scope: ValidationScope) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.node_id.trim().is_empty() {
        errors.push(ValidationError::new("node_id", "must not be empty"));
    }
    if config.key_store_dir.trim().is_empty() {
        errors.push(ValidationError::new("key_store_dir", "must not be empty"));
    }

    if scope == ValidationScope::Run {
        validate_ingress(config, &mut errors);
        validate_node(config, &mut errors);
        validate_batch(config, &mut errors);
        validate_secondary(config, &mut errors);

        if config.collector.socket_path.trim().is_empty() {
            errors.push(ValidationError::new("collector.socket_path", "must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str, schemes: &[&str]) {
    if value.trim().is_empty() {
        errors.push(ValidationError::new(field, "must not be empty"));
        return;
    }
    match url::Url::parse(value) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("scheme '{}' not allowed, expected one of {:?}", url.scheme(), schemes),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {}", e))),
    }
}

fn check_fingerprint(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let normalized = normalize_fingerprint(value);
    if normalized.is_empty() {
        errors.push(ValidationError::new(field, "must not be empty"));
    } else if !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
        errors.push(ValidationError::new(field, "must be hex, optionally ':' separated"));
    }
}

fn validate_ingress(config: &SignerConfig, errors: &mut Vec<ValidationError>) {
    check_url(errors, "ingress.host", &config.ingress.host, &["https"]);
    check_fingerprint(errors, "ingress.fingerprint", &config.ingress.fingerprint);

    if config.ingress.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("ingress.connect_timeout_secs", "must be > 0"));
    }
    if config.ingress.request_timeout_secs == 0 {
        errors.push(ValidationError::new("ingress.request_timeout_secs", "must be > 0"));
    }
}

fn validate_node(config: &SignerConfig, errors: &mut Vec<ValidationError>) {
    check_url(errors, "node.rpc_url", &config.node.rpc_url, &["http", "https"]);
    check_url(errors, "node.websocket_url", &config.node.websocket_url, &["ws", "wss"]);

    if config.node.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("node.rpc_timeout_secs", "must be > 0"));
    }
    if config.node.heartbeat_secs == 0 {
        errors.push(ValidationError::new("node.heartbeat_secs", "must be > 0"));
    }
    if config.node.jitter_max_ms == 0 {
        errors.push(ValidationError::new("node.jitter_max_ms", "must be > 0"));
    }
}

fn validate_batch(config: &SignerConfig, errors: &mut Vec<ValidationError>) {
    let batch = &config.batch;
    if batch.period_secs == 0 {
        errors.push(ValidationError::new("batch.period_secs", "must be > 0"));
    }
    if batch.catchup_period_secs == 0 {
        errors.push(ValidationError::new("batch.catchup_period_secs", "must be > 0"));
    }
    if batch.max_batch_lines == 0 {
        errors.push(ValidationError::new("batch.max_batch_lines", "must be > 0"));
    } else if batch.max_batch_lines > BATCH_LINE_LIMIT {
        errors.push(ValidationError::new(
            "batch.max_batch_lines",
            format!("must be at most {}", BATCH_LINE_LIMIT),
        ));
    }
    if batch.min_batch_lines >= batch.max_batch_lines {
        errors.push(ValidationError::new(
            "batch.min_batch_lines",
            "must be smaller than batch.max_batch_lines",
        ));
    }
}

fn validate_secondary(config: &SignerConfig, errors: &mut Vec<ValidationError>) {
    let secondary = &config.secondary;
    if secondary.drop_dir.trim().is_empty() {
        errors.push(ValidationError::new("secondary.drop_dir", "must not be empty"));
    }

    // SFTP settings are all-or-nothing.
    if secondary.sftp_host.is_some() {
        if secondary.sftp_user.as_deref().map_or(true, |u| u.trim().is_empty()) {
            errors.push(ValidationError::new("secondary.sftp_user", "required when sftp_host is set"));
        }
        if secondary.sftp_password.as_deref().map_or(true, |p| p.is_empty()) {
            errors.push(ValidationError::new("secondary.sftp_password", "required when sftp_host is set"));
        }
        match secondary.sftp_fingerprint.as_deref() {
            Some(fp) if !is_supported_pin(&normalize_fingerprint(fp)) => errors.push(ValidationError::new(
                "secondary.sftp_fingerprint",
                "must be an MD5 (32 hex digits) or SHA-256 (64 hex digits) host key fingerprint",
            )),
            Some(_) => {}
            None => errors.push(ValidationError::new(
                "secondary.sftp_fingerprint",
                "required when sftp_host is set",
            )),
        }
        if secondary.sftp_port == 0 {
            errors.push(ValidationError::new("secondary.sftp_port", "must be > 0"));
        }
        if secondary.sftp_timeout_secs == 0 {
            errors.push(ValidationError::new("secondary.sftp_timeout_secs", "must be > 0"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SignerConfig {
        let mut config = SignerConfig::default();
        config.node_id = "validator-1".into();
        config.ingress.host = "https://ingress.example".into();
        config.ingress.fingerprint = "AA:BB:CC".into();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config(), ValidationScope::Run).is_ok());
    }

    #[test]
    fn test_default_config_fails_run() {
        let errors = validate_config(&SignerConfig::default(), ValidationScope::Run).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"node_id"));
        assert!(fields.contains(&"ingress.host"));
        assert!(fields.contains(&"ingress.fingerprint"));
    }

    #[test]
    fn test_keygen_only_needs_identity() {
        let mut config = SignerConfig::default();
        config.node_id = "validator-1".into();
        assert!(validate_config(&config, ValidationScope::KeyGeneration).is_ok());
        assert!(validate_config(&config, ValidationScope::Run).is_err());
    }

    #[test]
    fn test_plain_http_ingress_rejected() {
        let mut config = valid_config();
        config.ingress.host = "http://ingress.example".into();
        let errors = validate_config(&config, ValidationScope::Run).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "ingress.host");
    }

    #[test]
    fn test_non_hex_fingerprint_rejected() {
        let mut config = valid_config();
        config.ingress.fingerprint = "ZZ:TOP".into();
        let errors = validate_config(&config, ValidationScope::Run).unwrap_err();
        assert_eq!(errors[0].field, "ingress.fingerprint");
    }

    #[test]
    fn test_sftp_requires_credentials() {
        let mut config = valid_config();
        config.secondary.sftp_host = Some("sftp.example".into());
        let errors = validate_config(&config, ValidationScope::Run).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_batch_bounds() {
        let mut config = valid_config();
        config.batch.min_batch_lines = 60;
        let errors = validate_config(&config, ValidationScope::Run).unwrap_err();
        assert_eq!(errors[0].field, "batch.min_batch_lines");
    }

    #[test]
    fn test_batch_size_capped_at_limit() {
        let mut config = valid_config();
        config.batch.max_batch_lines = BATCH_LINE_LIMIT;
        assert!(validate_config(&config, ValidationScope::Run).is_ok());

        config.batch.max_batch_lines = 500;
        let errors = validate_config(&config, ValidationScope::Run).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "batch.max_batch_lines");
    }

    #[test]
    fn test_sftp_pin_must_be_md5_or_sha256() {
        let mut config = valid_config();
        config.secondary.sftp_host = Some("sftp.example".into());
        config.secondary.sftp_user = Some("foo".into());
        config.secondary.sftp_password = Some("pass".into());
        config.secondary.sftp_fingerprint = Some("78:72:96:8e:ad:ac:8c:31:57:b4:80:ba:2d:e4:88:9d".into());
        assert!(validate_config(&config, ValidationScope::Run).is_ok());

        config.secondary.sftp_fingerprint = Some("AB:CD".into());
        let errors = validate_config(&config, ValidationScope::Run).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "secondary.sftp_fingerprint");
    }
}
