//! SFTP implementation of the secondary channel.
//!
//! # Responsibilities
//! - Upload each payload into a remote directory over SFTP
//! - Trust the server only if its host key matches the pinned fingerprint
//!
//! # Design Decisions
//! - The pin is an MD5 (32 hex digits) or SHA-256 (64 hex digits) digest of
//!   the host key blob; separators and case are ignored
//! - One SSH session per transfer; the channel is used rarely and a
//!   long-lived session would need its own keepalive
//! - The synchronous [`SecondaryChannel`] call drives the async client on the
//!   current runtime, so it must run on the blocking pool

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use md5::Md5;
use russh::client;
use russh::Disconnect;
use russh_keys::key::PublicKey;
use russh_keys::PublicKeyBase64;
use russh_sftp::client::SftpSession;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use zeroize::Zeroizing;

use crate::config::SecondaryConfig;
use crate::ingress::normalize_fingerprint;
use crate::secondary::SecondaryChannel;

/// Hex length of an MD5 host key pin.
const MD5_PIN_LEN: usize = 32;

/// Hex length of a SHA-256 host key pin.
const SHA256_PIN_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum SftpError {
    #[error("SFTP configuration invalid: {0}")]
    Config(&'static str),

    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    #[error("SFTP error: {0}")]
    Sftp(#[from] russh_sftp::client::error::Error),

    #[error("SFTP I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Host key {0} does not match the pinned fingerprint")]
    HostKeyRejected(String),

    #[error("Password authentication rejected for '{0}'")]
    AuthRejected(String),

    #[error("SFTP transfer timed out after {0}s")]
    Timeout(u64),
}

/// Uppercase hex digest of a host key blob, using the digest the pin implies.
pub fn host_key_fingerprint(key_blob: &[u8], pin_len: usize) -> String {
    if pin_len == MD5_PIN_LEN {
        hex::encode_upper(Md5::digest(key_blob))
    } else {
        hex::encode_upper(Sha256::digest(key_blob))
    }
}

/// Whether a normalized pin has a supported digest length.
pub fn is_supported_pin(normalized: &str) -> bool {
    matches!(normalized.len(), MD5_PIN_LEN | SHA256_PIN_LEN)
        && normalized.chars().all(|c| c.is_ascii_hexdigit())
}

/// SSH client handler that accepts exactly one host key.
struct PinnedHostKey {
    pin: String,
}

#[async_trait]
impl client::Handler for PinnedHostKey {
    type Error = SftpError;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        let presented = host_key_fingerprint(&server_public_key.public_key_bytes(), self.pin.len());
        if presented == self.pin {
            Ok(true)
        } else {
            Err(SftpError::HostKeyRejected(presented))
        }
    }
}

/// Uploads fallback payloads to a host-key pinned SFTP server.
pub struct SftpChannel {
    host: String,
    port: u16,
    user: String,
    password: Zeroizing<String>,
    pin: String,
    remote_dir: String,
    timeout: Duration,
}

impl SftpChannel {
    pub fn new(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        fingerprint: &str,
        remote_dir: &str,
        timeout: Duration,
    ) -> Result<Self, SftpError> {
        if host.trim().is_empty() {
            return Err(SftpError::Config("host is empty"));
        }
        if port == 0 {
            return Err(SftpError::Config("port is invalid"));
        }
        if user.trim().is_empty() {
            return Err(SftpError::Config("user is empty"));
        }
        if password.is_empty() {
            return Err(SftpError::Config("password is empty"));
        }
        if remote_dir.trim().is_empty() {
            return Err(SftpError::Config("remote directory is empty"));
        }
        let pin = normalize_fingerprint(fingerprint);
        if !is_supported_pin(&pin) {
            return Err(SftpError::Config("fingerprint must be an MD5 or SHA-256 hex digest"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            user: user.to_string(),
            password: Zeroizing::new(password.to_string()),
            pin,
            remote_dir: remote_dir.to_string(),
            timeout,
        })
    }

    /// Build the channel from the secondary section, if a remote host is set.
    pub fn from_config(config: &SecondaryConfig) -> Result<Option<Self>, SftpError> {
        let Some(host) = config.sftp_host.as_deref() else {
            return Ok(None);
        };
        Self::new(
            host,
            config.sftp_port,
            config.sftp_user.as_deref().unwrap_or_default(),
            config.sftp_password.as_deref().unwrap_or_default(),
            config.sftp_fingerprint.as_deref().unwrap_or_default(),
            &config.drop_dir,
            Duration::from_secs(config.sftp_timeout_secs),
        )
        .map(Some)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn remote_dir(&self) -> &str {
        &self.remote_dir
    }

    fn remote_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.remote_dir.trim_end_matches('/'), file_name)
    }

    async fn upload(&self, data: &str, file_name: &str) -> Result<(), SftpError> {
        let config = Arc::new(client::Config::default());
        let handler = PinnedHostKey { pin: self.pin.clone() };
        let mut session = client::connect(config, (self.host.as_str(), self.port), handler).await?;

        if !session
            .authenticate_password(self.user.as_str(), self.password.as_str())
            .await?
        {
            return Err(SftpError::AuthRejected(self.user.clone()));
        }

        let channel = session.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;

        let mut file = sftp.create(self.remote_path(file_name)).await?;
        file.write_all(data.as_bytes()).await?;
        file.shutdown().await?;

        session
            .disconnect(Disconnect::ByApplication, "", "English")
            .await?;
        Ok(())
    }

    async fn upload_with_timeout(&self, data: &str, file_name: &str) -> Result<(), SftpError> {
        tokio::time::timeout(self.timeout, self.upload(data, file_name))
            .await
            .map_err(|_| SftpError::Timeout(self.timeout.as_secs()))?
    }
}

impl std::fmt::Debug for SftpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpChannel")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("pin", &self.pin)
            .field("remote_dir", &self.remote_dir)
            .finish()
    }
}

impl SecondaryChannel for SftpChannel {
    fn transfer_data(&self, data: &str, file_name: &str) -> bool {
        if file_name.is_empty() || file_name.contains(['/', '\\']) {
            tracing::error!(file = %file_name, "Invalid SFTP file name");
            return false;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "SFTP transfer needs a tokio runtime");
                return false;
            }
        };

        tracing::info!(host = %self.host, port = self.port, "Connecting to SFTP server");
        match handle.block_on(self.upload_with_timeout(data, file_name)) {
            Ok(()) => {
                tracing::info!(
                    host = %self.host,
                    path = %self.remote_path(file_name),
                    bytes = data.len(),
                    "Payload uploaded on secondary channel"
                );
                true
            }
            Err(e) => {
                tracing::error!(host = %self.host, file = %file_name, error = %e, "SFTP upload failed");
                false
            }
        }
    }
}
