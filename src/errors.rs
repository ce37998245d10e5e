//! Error types for pqseal operations.

use thiserror::Error;

/// Errors raised by key generation, the private key vault, and envelope sealing/opening.
///
/// Every variant is terminal for the operation that produced it. Cryptographic failures
/// mean corrupted input, wrong keys, or tampering, so nothing here is ever retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The primitive provider failed to produce a key pair.
    #[error("key generation failed")]
    KeyGeneration,

    /// Encapsulation against a recipient KEM public key failed (malformed key).
    #[error("kem encapsulation failed")]
    Encapsulation,

    /// Decapsulation failed (malformed KEM ciphertext or private key).
    #[error("kem decapsulation failed")]
    Decapsulation,

    /// Signing failed (malformed signing private key).
    #[error("signing failed")]
    Signing,

    /// The envelope signature did not verify against the sender's public key.
    #[error("signature invalid")]
    BadSignature,

    /// AEAD encryption failed.
    #[error("aead encryption failed")]
    Encryption,

    /// AEAD decryption failed: tag mismatch, wrong key, or wrong nonce.
    #[error("aead decryption failed")]
    Decryption,

    /// Malformed base64, a wrong-length key, or a plaintext that is not valid UTF-8.
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Opaque failure returned at the boundary when an envelope cannot be opened.
///
/// Callers facing untrusted parties should surface this instead of [`CryptoError`]
/// so that the failing step (signature, decapsulation, decryption) is not revealed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("envelope could not be opened")]
pub struct OpenFailed;

impl From<CryptoError> for OpenFailed {
    fn from(_: CryptoError) -> Self {
        OpenFailed
    }
}

/// Errors loading a [`crate::CryptoConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid master key: {0}")]
    InvalidMasterKey(String),

    #[error("unknown cipher {0:?}")]
    UnknownCipher(String),

    #[error("secrets file io: {0}")]
    Io(#[from] std::io::Error),

    #[error("secrets file json: {0}")]
    Json(#[from] serde_json::Error),
}
