//! Real-time block pipeline.
//!
//! # Data Flow
//! ```text
//! node websocket → subscriber.rs (connect / reconnect state machine)
//!     → rpc.rs (peer count, client version)
//!     → parser.rs (notification → RealTimeTelemetryPayload)
//!     → PayloadSigner → IngressClient (realtime endpoint)
//!     → SecondaryChannel on failure
//! ```

pub mod parser;
pub mod rpc;
pub mod subscriber;
pub mod types;

pub use parser::parse_block_notification;
pub use rpc::{JsonRpcClient, NodeRpc, SUBSCRIBE_REQUEST};
pub use subscriber::{RealtimeSubscriber, SampleOutcome};
pub use types::{RealTimeTelemetry, RealTimeTelemetryPayload, RealtimeError};
