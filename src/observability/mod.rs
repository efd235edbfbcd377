//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events for every state transition)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (human or JSON lines)
//!     → Prometheus scrape (optional)
//! ```

pub mod logging;
pub mod metrics;
