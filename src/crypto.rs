//! # Primitive Cipher
//!
//! Authenticated symmetric encryption of a single byte string under a fresh
//! 256-bit key. This is the inner layer of every leaf envelope.
//!
//! ## Cipher
//!
//! AES-256-GCM with a 32-byte key, a 12-byte nonce drawn from the OS RNG on
//! every call and the standard 16-byte tag.
//!
//! ## Sealed Format
//!
//! ```text
//! [12-byte nonce][variable-length ciphertext + 16-byte GCM tag]
//! ```
//!
//! There is no header: sealed bytes only ever travel inside an age envelope,
//! which already identifies the payload.
//!
//! ## Randomness
//!
//! [`CryptoKey::generate`] panics if the OS random source is unavailable.
//! Falling back to a weaker source is never an option, so entropy failure
//! aborts the process. Nonce generation reports
//! [`KeycloakError::RandomSource`] instead, which callers must not retry
//! with a different source either.

use crate::error::{KeycloakError, Result};
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

/// A one-shot symmetric key. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CryptoKey {
    bytes: [u8; KEY_SIZE],
}

impl CryptoKey {
    /// Draw a fresh key from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Rebuild a key recovered from an envelope bundle.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_SIZE] = raw
            .try_into()
            .map_err(|_| KeycloakError::InvalidKeyFormat)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.bytes))
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext || tag`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|_| KeycloakError::RandomSource)?;

        let sealed = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|err| KeycloakError::Crypto(err.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend(sealed);
        Ok(out)
    }

    /// Authenticate and decrypt the output of [`CryptoKey::seal`].
    ///
    /// Truncated input, a wrong key and a modified ciphertext all produce
    /// the same [`KeycloakError::Authentication`].
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(KeycloakError::Authentication);
        }

        let (nonce, body) = sealed.split_at(NONCE_SIZE);
        self.cipher()
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| KeycloakError::Authentication)
    }
}
