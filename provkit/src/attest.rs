//! Attestation key material
//!
//! The token accepts an externally supplied P-256 private scalar for its
//! attestation slot. Whatever the source (PEM file, raw bytes), the core
//! only ever sees exactly 32 validated bytes.

use std::fmt;
use std::path::Path;

use p256::pkcs8::DecodePrivateKey;
use p256::SecretKey;

use provkit_core::constants::ATTEST_KEY_LEN;

use crate::error::{Error, Result};

/// Validated 32-byte P-256 private scalar
#[derive(Clone, PartialEq, Eq)]
pub struct AttestationKey {
    bytes: [u8; ATTEST_KEY_LEN],
}

impl AttestationKey {
    /// Accept raw scalar bytes; rejects any length other than 32
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; ATTEST_KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| Error::InvalidKeyLength {
                    actual: bytes.len(),
                })?;
        Ok(Self { bytes })
    }

    /// Decode a PEM-encoded private key (SEC1 or PKCS#8)
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = SecretKey::from_sec1_pem(pem)
            .or_else(|_| SecretKey::from_pkcs8_pem(pem))
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        Self::from_bytes(&key.to_bytes())
    }

    /// Read and decode a PEM key file
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        let pem = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::InvalidKey(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_pem(&pem)
    }

    pub fn as_bytes(&self) -> &[u8; ATTEST_KEY_LEN] {
        &self.bytes
    }
}

// Never print key material
impl fmt::Debug for AttestationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttestationKey([redacted; 32])")
    }
}
