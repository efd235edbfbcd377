//! Signing errors and constants.

use thiserror::Error;

/// Required salt length in bytes.
pub const SALT_LEN: usize = 8;

/// PBKDF2 iteration count for the at-rest key.
pub const KDF_ITERATIONS: u32 = 1024;

/// RSA modulus size for generated keys.
pub const KEY_BITS: usize = 4096;

/// Errors that can occur while managing or using the signing key.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Node identity was empty or whitespace.
    #[error("Node ID is empty")]
    EmptyNodeId,

    /// Stored salt has the wrong length.
    #[error("Salt from store is {0} bytes, expected 8")]
    SaltSize(usize),

    /// The persisted keypair could not be loaded.
    #[error("Key files not present or invalid. Generate first using --genkeys: {0}")]
    KeypairLoad(#[source] Box<SigningError>),

    /// Key store read or write failed.
    #[error("Key store error: {0}")]
    Store(#[from] std::io::Error),

    /// AES decryption or padding check failed.
    #[error("Private key decryption failed")]
    Decrypt,

    /// Key bytes could not be encoded or decoded.
    #[error("Key encoding error: {0}")]
    Encoding(String),

    /// Key generation failed.
    #[error("Key generation failed: {0}")]
    Generation(String),

    /// `sign_payload` was called before a successful `init`.
    #[error("Signer not initialized")]
    NotInitialized,

    /// RSA signing failed.
    #[error("Signing failed: {0}")]
    Sign(String),
}

impl SigningError {
    /// True when this error, or the cause it wraps, is a salt size problem.
    pub fn is_salt_size(&self) -> bool {
        match self {
            SigningError::SaltSize(_) => true,
            SigningError::KeypairLoad(inner) => inner.is_salt_size(),
            _ => false,
        }
    }
}

/// Result type for signing operations.
pub type SigningResult<T> = Result<T, SigningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_size_is_detected_through_wrapper() {
        let err = SigningError::KeypairLoad(Box::new(SigningError::SaltSize(5)));
        assert!(err.is_salt_size());
        assert!(err.to_string().contains("--genkeys"));

        let err = SigningError::KeypairLoad(Box::new(SigningError::Decrypt));
        assert!(!err.is_salt_size());
    }

    #[test]
    fn test_error_display() {
        let err = SigningError::SaltSize(16);
        assert_eq!(err.to_string(), "Salt from store is 16 bytes, expected 8");
    }
}
