//! Integrity accumulator over plaintext leaves.
//!
//! HMAC-SHA-512/256 keyed with a [`MacLabel`]. Leaves must be fed in the
//! canonical traversal order (sorted object keys, array index order) or two
//! passes over the same tree will not agree.

use crate::error::{KeycloakError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha512_256;

type HmacSha512_256 = Hmac<Sha512_256>;

/// Label every document encrypted without an explicit one is keyed with.
pub const DEFAULT_MAC_LABEL: &str = "1234567890";

pub const DIGEST_SIZE: usize = 32;

/// Key material for the integrity accumulator.
///
/// This is a domain-separation label, not a secret: anyone who knows it and
/// the recipient's public key can produce a MAC that verifies. The digest is
/// stored encrypted, so the label alone reveals nothing about the leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacLabel(String);

impl MacLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Default for MacLabel {
    fn default() -> Self {
        Self::new(DEFAULT_MAC_LABEL)
    }
}

pub struct Accumulator {
    mac: HmacSha512_256,
}

impl Accumulator {
    pub fn new(label: &MacLabel) -> Result<Self> {
        let mac = HmacSha512_256::new_from_slice(label.as_bytes())
            .map_err(|e| KeycloakError::Crypto(e.to_string()))?;
        Ok(Self { mac })
    }

    pub fn update(&mut self, plaintext: &[u8]) {
        self.mac.update(plaintext);
    }

    pub fn finalize(self) -> Vec<u8> {
        self.mac.finalize().into_bytes().to_vec()
    }

    /// Constant-time comparison against a previously finalized digest.
    pub fn verify(self, expected: &[u8]) -> Result<()> {
        self.mac
            .verify_slice(expected)
            .map_err(|_| KeycloakError::IntegrityMismatch)
    }
}
