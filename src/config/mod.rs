//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment variables (loader.rs)
//!     → validation.rs (semantic checks, all errors at once)
//!     → SignerConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BatchConfig, CollectorConfig, IngressConfig, NodeConfig, ObservabilityConfig, SecondaryConfig,
    SignerConfig, BATCH_LINE_LIMIT,
};
pub use validation::{validate_config, ValidationError, ValidationScope};
