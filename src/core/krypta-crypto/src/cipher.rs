//! The cipher capability and its AES-256-GCM implementation.
//!
//! The key store manager consumes encryption strictly through the
//! [`KeysetCipher`] trait, so alternative AEAD schemes can be substituted
//! without touching the manager.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::keys::SymmetricKey;
use crate::random::generate_nonce;

/// Size of an AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of a GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Symmetric encryption capability for serialized key material.
///
/// Every payload is sealed and opened as one opaque unit; the cipher sees
/// only bytes, never key-object structure. Any error returned here is fatal
/// to the calling store operation.
pub trait KeysetCipher: Send + Sync {
    /// Encrypts a serialized key payload.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypts a previously sealed payload.
    ///
    /// The plaintext is returned wrapped in `Zeroizing` so callers do not
    /// leave decrypted key material lying around in memory.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

/// AES-256-GCM implementation of [`KeysetCipher`].
///
/// Output layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`. A
/// fresh nonce is generated per encryption and carried inside the sealed
/// payload, so the store needs no nonce bookkeeping of its own.
#[derive(Clone)]
pub struct Aes256GcmCipher {
    key: SymmetricKey,
}

impl Aes256GcmCipher {
    /// Creates a cipher from an existing symmetric key.
    pub fn new(key: SymmetricKey) -> Self {
        Self { key }
    }

    /// Creates a cipher with a freshly generated random key.
    pub fn generate() -> Self {
        Self {
            key: SymmetricKey::generate(),
        }
    }

    fn aead(&self) -> Result<Aes256Gcm, CryptoError> {
        Aes256Gcm::new_from_slice(self.key.as_bytes())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }
}

impl KeysetCipher for Aes256GcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let aead = self.aead()?;

        let nonce_bytes = generate_nonce();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = aead
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(sealed)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::InvalidInput(
                "ciphertext too short".to_string(),
            ));
        }

        let aead = self.aead()?;

        let nonce = Nonce::from_slice(&ciphertext[..NONCE_SIZE]);
        let sealed = &ciphertext[NONCE_SIZE..];

        let plaintext = aead
            .decrypt(nonce, sealed)
            .map_err(|_| CryptoError::DecryptionFailed("authentication failed".to_string()))?;

        Ok(Zeroizing::new(plaintext))
    }
}

impl std::fmt::Debug for Aes256GcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes256GcmCipher")
            .field("key", &self.key)
            .finish()
    }
}
