//! Collector feed subsystem.
//!
//! The metrics collector writes line protocol into a unix socket or named
//! pipe. This subsystem reads it forever and feeds the batch queue.

pub mod feed;

pub use feed::{CollectorError, CollectorFeed};
