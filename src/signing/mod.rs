//! Signing key lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! --genkeys:
//!     generate RSA-4096 → cipher.rs (PBKDF2 + AES-256-CBC) → keystore.rs (signing.salt, signing.key)
//!
//! startup:
//!     keystore.rs → cipher.rs (decrypt) → signer.rs (in-memory key)
//!
//! per batch / per block:
//!     payload string → signer.rs (SHA-256, PKCS#1 v1.5) → base64 signature
//! ```
//!
//! # Security Constraints
//! - The key is encrypted at rest with a password derived from the node ID
//! - A wrong node ID looks exactly like a corrupt key file
//! - No rotation: regenerating overwrites the previous key

pub mod cipher;
pub mod keystore;
pub mod signer;
pub mod types;

pub use keystore::{FileKeyStore, KeyStore};
pub use signer::PayloadSigner;
pub use types::{SigningError, SigningResult};
