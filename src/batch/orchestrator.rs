//! Adaptive flush loop for collector lines.
//!
//! # Responsibilities
//! - Decide each tick whether a flush is worth a network round trip
//! - Sign and deliver at most `max_batch_lines` lines per tick
//! - Shorten the period while a backlog drains, restore it afterwards
//! - Requeue failed batches and, after sustained failure, hand them to
//!   the secondary channel
//!
//! # Design Decisions
//! - The orchestrator owns its schedule state; nothing is global
//! - `last_flush` only moves on delivery, so the fallback window measures
//!   time since the ingress last accepted anything
//! - Uses `tokio::time::Instant` so tests drive it with a paused clock

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use crate::batch::queue::TelemetryQueue;
use crate::config::{BatchConfig, BATCH_LINE_LIMIT};
use crate::ingress::{IngressClient, TelemetryPacket};
use crate::observability::metrics;
use crate::secondary::{fallback_file_name, transfer_in_background, SecondaryChannel};
use crate::signing::PayloadSigner;

/// What a single flush tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Too little data and the last flush is recent; nothing sent.
    Skipped,
    /// The ingress accepted a batch of `lines` lines.
    Delivered { lines: usize },
    /// The batch was requeued. `fallback` tells whether the secondary
    /// channel was also tried.
    Failed { lines: usize, fallback: bool },
}

/// Owns the queue consumer side, the flush schedule and both channels.
pub struct BatchOrchestrator {
    queue: Arc<TelemetryQueue>,
    signer: Arc<PayloadSigner>,
    ingress: IngressClient,
    secondary: Arc<dyn SecondaryChannel>,
    config: BatchConfig,
    last_flush: Instant,
    period: Duration,
}

impl BatchOrchestrator {
    pub fn new(
        queue: Arc<TelemetryQueue>,
        signer: Arc<PayloadSigner>,
        ingress: IngressClient,
        secondary: Arc<dyn SecondaryChannel>,
        config: BatchConfig,
    ) -> Self {
        let period = Duration::from_secs(config.period_secs);
        Self {
            queue,
            signer,
            ingress,
            secondary,
            config,
            last_flush: Instant::now(),
            period,
        }
    }

    /// Current delay between ticks.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// When the ingress last accepted a batch.
    pub fn last_flush(&self) -> Instant {
        self.last_flush
    }

    /// Run forever: wait the initial delay, then tick and sleep.
    pub async fn run(mut self) {
        tracing::info!(
            endpoint = %self.ingress.endpoint(),
            initial_delay_secs = self.config.initial_delay_secs,
            period_secs = self.config.period_secs,
            "Batch orchestrator starting"
        );
        tokio::time::sleep(Duration::from_secs(self.config.initial_delay_secs)).await;

        loop {
            self.flush_tick().await;
            tokio::time::sleep(self.period).await;
        }
    }

    /// Perform one flush decision and, if due, one delivery attempt.
    pub async fn flush_tick(&mut self) -> FlushOutcome {
        let queued = self.queue.len();
        let since_flush = self.last_flush.elapsed();

        if queued <= self.config.min_batch_lines
            && since_flush <= Duration::from_secs(self.config.max_idle_secs)
        {
            tracing::debug!(queued, since_flush_secs = since_flush.as_secs(), "Skipping flush");
            return FlushOutcome::Skipped;
        }

        let max_lines = self.config.max_batch_lines.min(BATCH_LINE_LIMIT);
        let lines = self.queue.dequeue_batch(max_lines);
        if lines.is_empty() {
            return FlushOutcome::Skipped;
        }
        let count = lines.len();

        let packet = match self.build_packet(lines) {
            Ok(packet) => packet,
            Err(lines) => {
                self.queue.requeue(lines);
                metrics::record_batch(false, count);
                return FlushOutcome::Failed {
                    lines: count,
                    fallback: false,
                };
            }
        };

        let body = match serde_json::to_string(&packet) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "Unable to serialize batch");
                self.queue.requeue(packet.payload);
                metrics::record_batch(false, count);
                return FlushOutcome::Failed {
                    lines: count,
                    fallback: false,
                };
            }
        };

        let delivered = self.ingress.send_request(&body).await.unwrap_or(false);
        metrics::record_batch(delivered, count);

        if delivered {
            self.last_flush = Instant::now();
            let remaining = self.queue.len();
            self.period = if remaining > self.config.catchup_threshold {
                Duration::from_secs(self.config.catchup_period_secs)
            } else {
                Duration::from_secs(self.config.period_secs)
            };
            tracing::info!(lines = count, remaining, period_secs = self.period.as_secs(), "Batch delivered");
            return FlushOutcome::Delivered { lines: count };
        }

        self.queue.requeue(packet.payload);
        let failing_for = self.last_flush.elapsed();
        let fallback = failing_for > Duration::from_secs(self.config.fallback_after_secs);
        tracing::warn!(
            lines = count,
            failing_for_secs = failing_for.as_secs(),
            fallback,
            "Batch delivery failed, lines requeued"
        );

        if fallback {
            let file_name = fallback_file_name(self.signer.node_id(), Utc::now());
            transfer_in_background(self.secondary.clone(), body, file_name, "batch").await;
        }

        FlushOutcome::Failed {
            lines: count,
            fallback,
        }
    }

    /// Sign the concatenated lines; hands the lines back on failure.
    fn build_packet(&self, lines: Vec<String>) -> Result<TelemetryPacket, Vec<String>> {
        match self.signer.sign_payload(&lines.concat()) {
            Ok(signature) => Ok(TelemetryPacket {
                node_id: self.signer.node_id().to_string(),
                payload: lines,
                signature,
            }),
            Err(e) => {
                tracing::error!(error = %e, "Unable to sign batch");
                Err(lines)
            }
        }
    }
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("ingress", &self.ingress)
            .field("queued", &self.queue.len())
            .field("period", &self.period)
            .finish()
    }
}
