//! Batch pipeline: collector lines to signed ingress packets.
//!
//! # Data Flow
//! ```text
//! collector feed → TelemetryQueue (queue.rs)
//!     → BatchOrchestrator tick (orchestrator.rs)
//!         → skip | dequeue ≤ max_batch_lines
//!         → sign(concatenated lines) → IngressClient (batch endpoint)
//!         → 202: record flush, adapt period
//!         → else: requeue, maybe secondary channel
//! ```

pub mod orchestrator;
pub mod queue;

pub use orchestrator::{BatchOrchestrator, FlushOutcome};
pub use queue::TelemetryQueue;
