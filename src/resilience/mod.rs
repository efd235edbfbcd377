//! Resilience helpers shared by the long-running loops.
//!
//! # Data Flow
//! ```text
//! collector feed EOF / error
//!     → backoff.rs (exponential delay before reopening)
//! real-time delivery
//!     → backoff.rs (random spread so many agents do not post in lockstep)
//! ```
//!
//! # Design Decisions
//! - Loops never give up; they only wait longer
//! - Delays are pure functions of the attempt number so they test without a clock

pub mod backoff;

pub use backoff::{calculate_backoff, random_jitter};
