//! Secondary (fallback) delivery channel.
//!
//! # Responsibilities
//! - Accept a payload the ingress would not take and persist it elsewhere
//! - Name fallback files `{nodeId}-{yyyy-MM-dd_HH-mm-ss}.json` (UTC)
//!
//! # Implementations
//! - [`SftpChannel`]: upload to a host-key pinned SFTP server
//! - [`FileDropChannel`]: write into a local directory when no server is set
//!
//! # Design Decisions
//! - The channel interface is synchronous; async callers go through
//!   [`transfer_in_background`] so a slow disk or server never stalls the runtime
//! - A failed transfer is terminal for that payload: logged, never retried

pub mod file_drop;
pub mod sftp;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::observability::metrics;

pub use file_drop::FileDropChannel;
pub use sftp::{SftpChannel, SftpError};

/// A fallback transport taking a payload and the file name to store it under.
pub trait SecondaryChannel: Send + Sync {
    /// Returns false on any failure; never panics or retries.
    fn transfer_data(&self, data: &str, file_name: &str) -> bool;
}

/// File name for a fallback payload produced at `at`.
pub fn fallback_file_name(node_id: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}.json", node_id, at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Run a transfer on the blocking pool and report whether it succeeded.
pub async fn transfer_in_background(
    channel: Arc<dyn SecondaryChannel>,
    data: String,
    file_name: String,
    pipeline: &'static str,
) -> bool {
    let name = file_name.clone();
    let delivered = tokio::task::spawn_blocking(move || channel.transfer_data(&data, &file_name))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(pipeline, error = %e, "Secondary channel task failed");
            false
        });

    if !delivered {
        tracing::error!(pipeline, file = %name, "Unable to send on secondary channel");
    }
    metrics::record_secondary_transfer(pipeline, delivered);
    delivered
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingChannel;
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fallback_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 17, 5, 1).unwrap();
        assert_eq!(fallback_file_name("node-1", at), "node-1-2024-03-09_17-05-01.json");
    }

    #[tokio::test]
    async fn test_transfer_in_background_reports_result() {
        let ok = Arc::new(RecordingChannel::new(true));
        assert!(transfer_in_background(ok.clone(), "{}".into(), "a.json".into(), "batch").await);
        assert_eq!(ok.count(), 1);

        let failing = Arc::new(RecordingChannel::new(false));
        assert!(!transfer_in_background(failing.clone(), "{}".into(), "b.json".into(), "realtime").await);
        assert_eq!(failing.transfers.lock()[0].1, "b.json");
    }
}
