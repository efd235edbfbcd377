//! Line reader over the collector's socket or pipe.
//!
//! # Responsibilities
//! - Open the configured path as a unix stream socket, a FIFO or a file
//! - Push every non-blank line into the [`TelemetryQueue`]
//! - Reopen sockets and FIFOs after EOF or I/O errors with exponential backoff
//! - Read a regular file once; its EOF ends the feed
//!
//! # Design Decisions
//! - The path must exist at construction; a typo fails startup instead of
//!   spinning in the reopen loop
//! - The backoff resets once a session has produced lines

use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::UnixStream;

use crate::batch::TelemetryQueue;
use crate::config::CollectorConfig;
use crate::resilience::calculate_backoff;

/// Errors opening the collector feed.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Collector path '{0}' does not exist")]
    NotFound(PathBuf),

    #[error("Collector I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads the collector feed into the batch queue.
#[derive(Debug, Clone)]
pub struct CollectorFeed {
    path: PathBuf,
    reopen_base_ms: u64,
    reopen_max_ms: u64,
}

impl CollectorFeed {
    pub fn new(config: &CollectorConfig) -> Result<Self, CollectorError> {
        let path = PathBuf::from(&config.socket_path);
        if !path.exists() {
            return Err(CollectorError::NotFound(path));
        }
        Ok(Self {
            path,
            reopen_base_ms: config.reopen_base_ms,
            reopen_max_ms: config.reopen_max_ms,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read until the feed is exhausted. Sockets and FIFOs are reopened
    /// forever; a regular file is read once.
    pub async fn run(self, queue: Arc<TelemetryQueue>) {
        tracing::info!(path = %self.path.display(), "Reading collector feed");
        let mut attempt: u32 = 0;

        loop {
            let result = self.read_once(&queue).await;

            if self.is_regular_file().await {
                match result {
                    Ok(lines) => {
                        tracing::info!(path = %self.path.display(), lines, "Collector file fully read")
                    }
                    Err(e) => {
                        tracing::error!(path = %self.path.display(), error = %e, "Collector file read failed")
                    }
                }
                return;
            }

            match result {
                Ok(0) => {
                    attempt = attempt.saturating_add(1);
                    tracing::debug!(path = %self.path.display(), attempt, "Collector feed ended without data");
                }
                Ok(lines) => {
                    attempt = 1;
                    tracing::info!(path = %self.path.display(), lines, "Collector feed ended, reopening");
                }
                Err(e) => {
                    attempt = attempt.saturating_add(1);
                    tracing::warn!(path = %self.path.display(), error = %e, attempt, "Collector feed error");
                }
            }

            let delay = calculate_backoff(attempt, self.reopen_base_ms, self.reopen_max_ms);
            tokio::time::sleep(delay).await;
        }
    }

    /// Open the feed once and read until EOF. Returns the number of lines queued.
    pub async fn read_once(&self, queue: &TelemetryQueue) -> Result<usize, CollectorError> {
        let reader = self.open().await?;
        let mut lines = BufReader::new(reader).lines();
        let mut count = 0;

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            queue.enqueue(line);
            count += 1;
        }

        Ok(count)
    }

    async fn is_regular_file(&self) -> bool {
        tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.file_type().is_file())
            .unwrap_or(false)
    }

    async fn open(&self) -> Result<Box<dyn AsyncRead + Unpin + Send>, CollectorError> {
        let metadata = tokio::fs::metadata(&self.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CollectorError::NotFound(self.path.clone()),
            _ => CollectorError::Io(e),
        })?;

        if metadata.file_type().is_socket() {
            Ok(Box::new(UnixStream::connect(&self.path).await?))
        } else {
            Ok(Box::new(tokio::fs::File::open(&self.path).await?))
        }
    }
}
