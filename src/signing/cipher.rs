//! Encryption of the private key at rest.
//!
//! Key and IV come from PBKDF2-HMAC-SHA1 over the node ID and salt: the first
//! 32 derived bytes are the AES-256 key, the next 16 the CBC IV. The plaintext
//! is the base64 text of the private key DER, padded with PKCS#7.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::signing::types::{SigningError, SigningResult, KDF_ITERATIONS, SALT_LEN};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// Generate a fresh random salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive the AES key and IV from the node ID and salt.
fn derive_key_iv(node_id: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN + IV_LEN]> {
    let mut derived = Zeroizing::new([0u8; KEY_LEN + IV_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha1>(node_id.as_bytes(), salt, KDF_ITERATIONS, &mut derived[..]);
    derived
}

/// Encrypt private key bytes for storage.
pub fn encrypt_private_key(node_id: &str, salt: &[u8], private_key: &[u8]) -> SigningResult<Vec<u8>> {
    let derived = derive_key_iv(node_id, salt);
    let (key, iv) = derived.split_at(KEY_LEN);
    let encryptor = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|e| SigningError::Encoding(format!("Invalid cipher parameters: {}", e)))?;

    let plaintext = Zeroizing::new(BASE64.encode(private_key));
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes()))
}

/// Decrypt a stored private key back into its raw bytes.
///
/// A wrong node ID surfaces as [`SigningError::Decrypt`] or
/// [`SigningError::Encoding`]; the two cannot be told apart from a corrupt file.
pub fn decrypt_private_key(node_id: &str, salt: &[u8], ciphertext: &[u8]) -> SigningResult<Zeroizing<Vec<u8>>> {
    if salt.len() != SALT_LEN {
        return Err(SigningError::SaltSize(salt.len()));
    }

    let derived = derive_key_iv(node_id, salt);
    let (key, iv) = derived.split_at(KEY_LEN);
    let decryptor = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|e| SigningError::Encoding(format!("Invalid cipher parameters: {}", e)))?;

    let plaintext = Zeroizing::new(
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| SigningError::Decrypt)?,
    );

    BASE64
        .decode(plaintext.as_slice())
        .map(Zeroizing::new)
        .map_err(|e| SigningError::Encoding(format!("Decrypted key is not base64: {}", e)))
}
