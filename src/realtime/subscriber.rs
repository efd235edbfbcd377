//! Websocket block subscriber.
//!
//! # Responsibilities
//! - Keep a block subscription open against the node
//! - Turn each notification into a signed sample and deliver it
//! - Fall back to the secondary channel when delivery fails
//!
//! # Data Flow
//! ```text
//! connect_async(node ws)
//!     ├── sender:   SUBSCRIBE_REQUEST, then idle on heartbeat
//!     └── receiver: message → peer count + client version (RPC)
//!                   → parse → sign → jitter → ingress (realtime)
//!                   → on failure: secondary channel
//! either side ends → cycle ends → reconnect (after reconnect_delay on error)
//! ```
//!
//! # Design Decisions
//! - Sender and receiver are joined with `select!`, so one ending ends both
//! - Per-message failures never end the connection; only stream errors do
//! - The sender never resubscribes; a dead subscription is recovered by
//!   the node closing the socket and the reconnect loop

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::config::NodeConfig;
use crate::ingress::IngressClient;
use crate::observability::metrics;
use crate::realtime::parser::parse_block_notification;
use crate::realtime::rpc::{NodeRpc, SUBSCRIBE_REQUEST};
use crate::realtime::types::{RealTimeTelemetry, RealtimeError};
use crate::resilience::random_jitter;
use crate::secondary::{fallback_file_name, transfer_in_background, SecondaryChannel};
use crate::signing::PayloadSigner;

/// What happened to one received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Not a block notification.
    Ignored,
    /// RPC, parse, sign or serialization failure; nothing sent.
    Dropped,
    /// Ingress accepted the sample for `block`.
    Delivered { block: u64 },
    /// Ingress refused it; `fallback` tells whether the secondary channel took it.
    Failed { block: u64, fallback: bool },
}

/// Long-lived subscriber for the real-time pipeline.
pub struct RealtimeSubscriber {
    websocket_url: String,
    rpc: Arc<dyn NodeRpc>,
    signer: Arc<PayloadSigner>,
    ingress: IngressClient,
    secondary: Arc<dyn SecondaryChannel>,
    reconnect_delay: Duration,
    heartbeat: Duration,
    jitter_max_ms: u64,
}

impl RealtimeSubscriber {
    pub fn new(
        config: &NodeConfig,
        rpc: Arc<dyn NodeRpc>,
        signer: Arc<PayloadSigner>,
        ingress: IngressClient,
        secondary: Arc<dyn SecondaryChannel>,
    ) -> Result<Self, RealtimeError> {
        if config.websocket_url.trim().is_empty() {
            return Err(RealtimeError::Config("websocket URL is empty"));
        }

        Ok(Self {
            websocket_url: config.websocket_url.clone(),
            rpc,
            signer,
            ingress,
            secondary,
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
            heartbeat: Duration::from_secs(config.heartbeat_secs),
            jitter_max_ms: config.jitter_max_ms,
        })
    }

    /// Run connection cycles. Without `auto_reconnect`, exactly one cycle runs.
    /// Failed cycles wait `reconnect_delay` before the next attempt.
    pub async fn subscribe_and_post(&self, auto_reconnect: bool) {
        loop {
            let failed = match self.connect_cycle().await {
                Ok(()) => {
                    tracing::info!(url = %self.websocket_url, "Block subscription closed");
                    false
                }
                Err(e) => {
                    tracing::error!(url = %self.websocket_url, error = %e, "Block subscription failed");
                    true
                }
            };

            if !auto_reconnect {
                return;
            }

            // A clean close reconnects at once; only failures back off.
            if failed {
                tracing::info!(
                    delay_secs = self.reconnect_delay.as_secs(),
                    "Waiting before reconnecting block subscription"
                );
                tokio::time::sleep(self.reconnect_delay).await;
            }
        }
    }

    /// One connect-and-serve cycle.
    async fn connect_cycle(&self) -> Result<(), RealtimeError> {
        tracing::info!(url = %self.websocket_url, "Connecting block subscription");
        let (stream, _) = match connect_async(self.websocket_url.as_str()).await {
            Ok(connected) => {
                metrics::record_subscription_connect(true);
                connected
            }
            Err(e) => {
                metrics::record_subscription_connect(false);
                return Err(e.into());
            }
        };
        tracing::info!(url = %self.websocket_url, "Block subscription connected");

        let (write, read) = stream.split();

        tokio::select! {
            result = send_loop(write, self.heartbeat) => result,
            result = self.receive_loop(read) => result,
        }
    }

    async fn receive_loop<S>(&self, mut read: S) -> Result<(), RealtimeError>
    where
        S: Stream<Item = Result<Message, WsError>> + Unpin,
    {
        let mut buffer = String::new();

        while let Some(message) = read.next().await {
            match message? {
                Message::Text(text) => buffer.push_str(text.as_str()),
                Message::Binary(data) => match std::str::from_utf8(&data) {
                    Ok(text) => buffer.push_str(text),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring non UTF-8 binary message");
                        continue;
                    }
                },
                Message::Close(frame) => {
                    tracing::info!(frame = ?frame, "Node closed block subscription");
                    return Ok(());
                }
                _ => continue,
            }

            self.handle_message(&buffer).await;
            buffer.clear();
        }

        Ok(())
    }

    /// Process one complete message end to end.
    pub async fn handle_message(&self, message: &str) -> SampleOutcome {
        let telemetry = match self.build_telemetry(message).await {
            Ok(Some(telemetry)) => telemetry,
            Ok(None) => {
                tracing::debug!("Message carries no block, ignoring");
                return SampleOutcome::Ignored;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unable to parse or sign real-time data");
                metrics::record_realtime_sample("dropped");
                return SampleOutcome::Dropped;
            }
        };

        let block = telemetry.payload.block_num;
        let body = match serde_json::to_string(&telemetry) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(block, error = %e, "Unable to serialize real-time sample");
                metrics::record_realtime_sample("dropped");
                return SampleOutcome::Dropped;
            }
        };

        tokio::time::sleep(random_jitter(self.jitter_max_ms)).await;

        if self.ingress.send_request(&body).await.unwrap_or(false) {
            tracing::info!(block, "Real-time block sample delivered");
            metrics::record_realtime_sample("delivered");
            return SampleOutcome::Delivered { block };
        }

        metrics::record_realtime_sample("failed");
        tracing::warn!(block, "Real-time delivery failed, using secondary channel");
        let file_name = fallback_file_name(self.signer.node_id(), Utc::now());
        let fallback = transfer_in_background(self.secondary.clone(), body, file_name, "realtime").await;

        SampleOutcome::Failed { block, fallback }
    }

    async fn build_telemetry(&self, message: &str) -> Result<Option<RealTimeTelemetry>, RealtimeError> {
        let num_peers = self.rpc.peer_count().await?;
        let client = self.rpc.client_version().await?;

        let Some(payload) = parse_block_notification(message, &client, num_peers, Utc::now().timestamp())?
        else {
            return Ok(None);
        };

        let canonical = serde_json::to_string(&payload)?;
        let signature = self.signer.sign_payload(&canonical)?;

        tracing::debug!(
            block = payload.block_num,
            hash = %payload.block_hash,
            txs = payload.num_tx_in_block,
            peers = payload.num_peers,
            "New block received"
        );

        Ok(Some(RealTimeTelemetry {
            node_id: self.signer.node_id().to_string(),
            payload,
            signature,
        }))
    }
}

/// Subscribe once, then idle for the rest of the session.
async fn send_loop<S>(mut write: S, heartbeat: Duration) -> Result<(), RealtimeError>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    write.send(Message::Text(SUBSCRIBE_REQUEST.into())).await?;
    tracing::debug!("Block subscription requested");

    loop {
        tokio::time::sleep(heartbeat).await;
        tracing::trace!("Subscription sender heartbeat");
    }
}

impl std::fmt::Debug for RealtimeSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeSubscriber")
            .field("websocket_url", &self.websocket_url)
            .field("ingress", &self.ingress)
            .field("reconnect_delay", &self.reconnect_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingress::client::test_support::{client_with, RecordingTransport};
    use crate::realtime::rpc::test_support::StaticRpc;
    use crate::secondary::test_support::RecordingChannel;
    use crate::signing::signer::test_support::{test_signer, verify};
    use reqwest::StatusCode;
    use std::sync::atomic::Ordering;
    use tokio::net::TcpListener;

    const BLOCK: &str = r#"{"jsonrpc":"2.0","method":"parity_subscription","params":{"subscription":"0x1","result":{"number":"0x10","hash":"0xbeef","timestamp":"0x5f5e1000","gasLimit":"0x7a1200","gasUsed":"0x0","transactions":[]}}}"#;

    struct Harness {
        subscriber: RealtimeSubscriber,
        rpc: Arc<StaticRpc>,
        transport: Arc<RecordingTransport>,
        secondary: Arc<RecordingChannel>,
        signer: Arc<PayloadSigner>,
    }

    fn harness(rpc: StaticRpc, status: Option<StatusCode>, websocket_url: &str) -> Harness {
        let rpc = Arc::new(rpc);
        let transport = RecordingTransport::new(status);
        let secondary = Arc::new(RecordingChannel::new(true));
        let signer = test_signer("node-1");
        let config = NodeConfig {
            websocket_url: websocket_url.to_string(),
            ..NodeConfig::default()
        };
        let subscriber = RealtimeSubscriber::new(
            &config,
            rpc.clone(),
            signer.clone(),
            client_with(transport.clone()),
            secondary.clone(),
        )
        .unwrap();

        Harness {
            subscriber,
            rpc,
            transport,
            secondary,
            signer,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_is_signed_and_delivered() {
        let h = harness(StaticRpc::new(7, "Parity//v2.7.2"), Some(StatusCode::ACCEPTED), "ws://unused");

        assert_eq!(h.subscriber.handle_message(BLOCK).await, SampleOutcome::Delivered { block: 16 });

        let sent: RealTimeTelemetry = serde_json::from_str(&h.transport.bodies.lock()[0]).unwrap();
        assert_eq!(sent.node_id, "node-1");
        assert_eq!(sent.payload.client, "Parity//v2.7.2");
        assert_eq!(sent.payload.num_peers, 7);
        assert_eq!(sent.payload.block_ts, 0x5f5e1000);

        let canonical = serde_json::to_string(&sent.payload).unwrap();
        assert!(verify(&h.signer, &canonical, &sent.signature));
        assert_eq!(h.secondary.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_without_result_is_not_delivered() {
        let h = harness(StaticRpc::new(7, "Parity"), Some(StatusCode::ACCEPTED), "ws://unused");
        let ack = r#"{"jsonrpc":"2.0","result":"0x1","id":1}"#;

        assert_eq!(h.subscriber.handle_message(ack).await, SampleOutcome::Ignored);
        assert_eq!(h.transport.calls(), 0);
        // Node is still queried for every message.
        assert_eq!(h.rpc.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rpc_failure_drops_sample() {
        let h = harness(StaticRpc::failing(), Some(StatusCode::ACCEPTED), "ws://unused");

        assert_eq!(h.subscriber.handle_message(BLOCK).await, SampleOutcome::Dropped);
        assert_eq!(h.transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delivery_goes_to_secondary_channel() {
        let h = harness(StaticRpc::new(1, "Parity"), Some(StatusCode::SERVICE_UNAVAILABLE), "ws://unused");

        assert_eq!(
            h.subscriber.handle_message(BLOCK).await,
            SampleOutcome::Failed { block: 16, fallback: true }
        );

        let transfers = h.secondary.transfers.lock();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].0, h.transport.bodies.lock()[0]);
        assert!(transfers[0].1.starts_with("node-1-"));
    }

    #[test]
    fn test_empty_websocket_url_rejected() {
        let config = NodeConfig {
            websocket_url: String::new(),
            ..NodeConfig::default()
        };
        let result = RealtimeSubscriber::new(
            &config,
            Arc::new(StaticRpc::new(0, "")),
            test_signer("node-1"),
            client_with(RecordingTransport::new(None)),
            Arc::new(RecordingChannel::new(true)),
        );
        assert!(matches!(result, Err(RealtimeError::Config(_))));
    }

    #[tokio::test]
    async fn test_single_cycle_against_mock_node() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let node = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();

            let request = ws.next().await.unwrap().unwrap();
            assert_eq!(request.into_text().unwrap().as_str(), SUBSCRIBE_REQUEST);

            ws.send(Message::Text(r#"{"jsonrpc":"2.0","result":"0x1","id":1}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Text(BLOCK.into())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let mut h = harness(
            StaticRpc::new(3, "Parity"),
            Some(StatusCode::ACCEPTED),
            &format!("ws://{}", addr),
        );
        h.subscriber.jitter_max_ms = 1;

        tokio::time::timeout(Duration::from_secs(10), h.subscriber.subscribe_and_post(false))
            .await
            .unwrap();
        node.await.unwrap();

        assert_eq!(h.transport.calls(), 1);
        assert_eq!(h.rpc.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_connect_failure_ends_single_cycle() {
        let h = harness(StaticRpc::new(0, ""), Some(StatusCode::ACCEPTED), "ws://127.0.0.1:1");
        tokio::time::timeout(Duration::from_secs(10), h.subscriber.subscribe_and_post(false))
            .await
            .unwrap();
        assert_eq!(h.transport.calls(), 0);
    }
}
