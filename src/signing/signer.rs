//! Payload signing with the node's RSA key.
//!
//! # Security
//! - The private key only exists decrypted in process memory
//! - Keys are never logged; only the public key is ever printed
//! - Signatures are RSA PKCS#1 v1.5 over SHA-256, base64 encoded

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parking_lot::RwLock;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};

use crate::signing::cipher::{decrypt_private_key, encrypt_private_key, generate_salt};
use crate::signing::keystore::KeyStore;
use crate::signing::types::{SigningError, SigningResult, KEY_BITS, SALT_LEN};

/// Signs outbound telemetry with the node's private key.
///
/// Shared between pipelines behind an `Arc`; signing only takes a read lock.
pub struct PayloadSigner {
    node_id: String,
    keystore: Arc<dyn KeyStore>,
    key: RwLock<Option<RsaPrivateKey>>,
    key_bits: usize,
}

impl PayloadSigner {
    /// Create a signer for `node_id` backed by `keystore`.
    ///
    /// The node ID is also the password protecting the stored key, so it must
    /// not change once keys have been generated.
    pub fn new(node_id: impl Into<String>, keystore: Arc<dyn KeyStore>) -> SigningResult<Self> {
        let node_id = node_id.into();
        if node_id.trim().is_empty() {
            return Err(SigningError::EmptyNodeId);
        }

        Ok(Self {
            node_id,
            keystore,
            key: RwLock::new(None),
            key_bits: KEY_BITS,
        })
    }

    /// The node ID this signer attributes payloads to.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Whether a key has been loaded.
    pub fn is_initialized(&self) -> bool {
        self.key.read().is_some()
    }

    /// Generate a new keypair, persist the encrypted private key, and return
    /// the base64 public key (DER SubjectPublicKeyInfo).
    ///
    /// Overwrites whatever the key store held before. The new key is not
    /// loaded into this signer; call [`init`](Self::init) afterwards.
    pub fn generate_keys(&self) -> SigningResult<String> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, self.key_bits)
            .map_err(|e| SigningError::Generation(e.to_string()))?;

        let public_der = private_key
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| SigningError::Encoding(e.to_string()))?;
        let private_der = private_key
            .to_pkcs8_der()
            .map_err(|e| SigningError::Encoding(e.to_string()))?;

        self.store_key(private_der.as_bytes())?;

        tracing::info!(node_id = %self.node_id, bits = self.key_bits, "Generated new signing keypair");
        Ok(BASE64.encode(public_der.as_bytes()))
    }

    /// Load and decrypt the persisted private key.
    ///
    /// Every failure is reported as [`SigningError::KeypairLoad`] and leaves
    /// the signer without a key.
    pub fn init(&self) -> SigningResult<()> {
        let private_key = self
            .load_key()
            .map_err(|e| SigningError::KeypairLoad(Box::new(e)))?;

        *self.key.write() = Some(private_key);
        tracing::info!(node_id = %self.node_id, "Signing key loaded");
        Ok(())
    }

    /// Sign `payload` and return the base64 signature.
    pub fn sign_payload(&self, payload: &str) -> SigningResult<String> {
        let guard = self.key.read();
        let key = guard.as_ref().ok_or(SigningError::NotInitialized)?;

        let digest = Sha256::digest(payload.as_bytes());
        let signature = key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| SigningError::Sign(e.to_string()))?;

        Ok(BASE64.encode(signature))
    }

    fn store_key(&self, private_der: &[u8]) -> SigningResult<()> {
        let salt = generate_salt();
        self.keystore.save_salt(&salt)?;

        let encrypted = encrypt_private_key(&self.node_id, &salt, private_der)?;
        self.keystore.save_encrypted_key(&encrypted)?;
        Ok(())
    }

    fn load_key(&self) -> SigningResult<RsaPrivateKey> {
        let encrypted = self.keystore.load_encrypted_key()?;
        let salt = self.keystore.load_salt()?;
        if salt.len() != SALT_LEN {
            return Err(SigningError::SaltSize(salt.len()));
        }

        let private_der = decrypt_private_key(&self.node_id, &salt, &encrypted)?;
        RsaPrivateKey::from_pkcs8_der(&private_der).map_err(|e| SigningError::Encoding(e.to_string()))
    }
}

impl std::fmt::Debug for PayloadSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadSigner")
            .field("node_id", &self.node_id)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::signing::keystore::memory::MemoryKeyStore;
    use crate::signing::keystore::FileKeyStore;

    #[test]
    fn test_empty_node_id_rejected() {
        let store = Arc::new(MemoryKeyStore::default());
        assert!(matches!(PayloadSigner::new("  ", store), Err(SigningError::EmptyNodeId)));
    }

    #[test]
    fn test_generate_then_init_and_sign() {
        let store = Arc::new(MemoryKeyStore::default());
        let signer = uninitialized_signer("n1", store.clone());

        let public_key = signer.generate_keys().unwrap();
        assert!(BASE64.decode(&public_key).is_ok());
        assert_eq!(store.salt.lock().as_ref().unwrap().len(), SALT_LEN);
        assert!(!signer.is_initialized());

        signer.init().unwrap();
        let signature = signer.sign_payload("abc").unwrap();
        assert!(verify(&signer, "abc", &signature));
        assert!(!verify(&signer, "abd", &signature));
    }

    #[test]
    fn test_signature_is_deterministic() {
        let signer = test_signer("n1");
        let first = signer.sign_payload("cpu,host=a usage=1").unwrap();
        let second = signer.sign_payload("cpu,host=a usage=1").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sign_before_init_fails() {
        let signer = uninitialized_signer("n1", Arc::new(MemoryKeyStore::default()));
        assert!(matches!(signer.sign_payload("x"), Err(SigningError::NotInitialized)));
    }

    #[test]
    fn test_init_with_other_identity_fails() {
        let store: Arc<MemoryKeyStore> = Arc::new(MemoryKeyStore::default());
        uninitialized_signer("n1", store.clone()).generate_keys().unwrap();

        let other = uninitialized_signer("n2", store);
        let err = other.init().unwrap_err();
        assert!(matches!(err, SigningError::KeypairLoad(_)));
        assert!(!err.is_salt_size());
        assert!(!other.is_initialized());
    }

    #[test]
    fn test_bad_salt_reported_as_salt_size() {
        let store: Arc<MemoryKeyStore> = Arc::new(MemoryKeyStore::default());
        let signer = uninitialized_signer("n1", store.clone());
        signer.generate_keys().unwrap();

        *store.salt.lock() = Some(vec![0u8; 12]);
        let err = signer.init().unwrap_err();
        assert!(err.is_salt_size());
    }

    #[test]
    fn test_missing_record_is_load_error() {
        let signer = uninitialized_signer("n1", Arc::new(MemoryKeyStore::default()));
        let err = signer.init().unwrap_err();
        assert!(matches!(err, SigningError::KeypairLoad(ref inner) if matches!(**inner, SigningError::Store(_))));
    }

    #[test]
    fn test_regenerate_overwrites_previous_key() {
        let store: Arc<MemoryKeyStore> = Arc::new(MemoryKeyStore::default());
        let signer = uninitialized_signer("n1", store.clone());

        let first = signer.generate_keys().unwrap();
        let second = signer.generate_keys().unwrap();
        assert_ne!(first, second);

        signer.init().unwrap();
        let signature = signer.sign_payload("payload").unwrap();
        assert!(verify(&signer, "payload", &signature));
    }

    #[test]
    fn test_file_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let first = uninitialized_signer("validator-7", Arc::new(FileKeyStore::new(dir.path())));
        first.generate_keys().unwrap();
        first.init().unwrap();
        let signature = first.sign_payload("line").unwrap();

        let restarted = uninitialized_signer("validator-7", Arc::new(FileKeyStore::new(dir.path())));
        restarted.init().unwrap();
        assert_eq!(restarted.sign_payload("line").unwrap(), signature);
    }
}
