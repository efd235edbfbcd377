//! Persistence of the encrypted signing key.
//!
//! # Responsibilities
//! - Load and save the salt and encrypted private key as whole byte blobs
//! - Keep the on-disk layout (`signing.salt`, `signing.key`) in one place

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the persisted salt.
pub const SALT_FILE: &str = "signing.salt";

/// File name of the persisted encrypted private key.
pub const KEY_FILE: &str = "signing.key";

/// Storage for the signer's salt and encrypted private key.
pub trait KeyStore: Send + Sync {
    /// Persist the salt, replacing any previous one.
    fn save_salt(&self, salt: &[u8]) -> io::Result<()>;

    /// Load the persisted salt.
    fn load_salt(&self) -> io::Result<Vec<u8>>;

    /// Persist the encrypted private key, replacing any previous one.
    fn save_encrypted_key(&self, key: &[u8]) -> io::Result<()>;

    /// Load the persisted encrypted private key.
    fn load_encrypted_key(&self) -> io::Result<Vec<u8>>;
}

/// Key store backed by two files in a base directory.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    salt_path: PathBuf,
    key_path: PathBuf,
}

impl FileKeyStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        let base_dir = base_dir.as_ref();
        Self {
            salt_path: base_dir.join(SALT_FILE),
            key_path: base_dir.join(KEY_FILE),
        }
    }

    /// Path of the salt file.
    pub fn salt_path(&self) -> &Path {
        &self.salt_path
    }

    /// Path of the encrypted key file.
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }
}

impl KeyStore for FileKeyStore {
    fn save_salt(&self, salt: &[u8]) -> io::Result<()> {
        fs::write(&self.salt_path, salt)
    }

    fn load_salt(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.salt_path)
    }

    fn save_encrypted_key(&self, key: &[u8]) -> io::Result<()> {
        fs::write(&self.key_path, key)
    }

    fn load_encrypted_key(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.key_path)
    }
}
