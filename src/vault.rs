//! At-rest protection of private keys under the process-wide master key.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::aead::{Cipher, KEY_LEN};
use crate::config::CryptoConfig;
use crate::errors::{ConfigError, CryptoError};
use crate::types::{PrivateKey, SealedPrivateKey};

/// Length in bytes of the master key.
pub const MASTER_KEY_LEN: usize = KEY_LEN;

/// 32-byte symmetric secret that protects stored private keys.
///
/// Loaded once at startup and handed to the vault explicitly. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; MASTER_KEY_LEN]);

impl MasterKey {
    pub fn new(bytes: [u8; MASTER_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; MASTER_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let bytes: [u8; MASTER_KEY_LEN] = bytes.try_into().map_err(|_| {
            ConfigError::InvalidMasterKey(format!(
                "expected {MASTER_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Decode the URL-safe base64 form used in secret stores.
    pub fn from_base64(encoded: &str) -> Result<Self, ConfigError> {
        let decoded = Zeroizing::new(
            URL_SAFE
                .decode(encoded.trim())
                .map_err(|e| ConfigError::InvalidMasterKey(e.to_string()))?,
        );
        Self::from_slice(&decoded)
    }

    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(URL_SAFE.encode(&self.0))
    }

    pub fn as_bytes(&self) -> &[u8; MASTER_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Seals and unseals private keys with an AEAD under the master key.
#[derive(Clone, Debug)]
pub struct PrivateKeyVault {
    master_key: MasterKey,
    cipher: Cipher,
}

impl PrivateKeyVault {
    pub fn new(master_key: MasterKey, cipher: Cipher) -> Self {
        Self { master_key, cipher }
    }

    pub fn from_config(config: &CryptoConfig) -> Self {
        Self::new(config.master_key.clone(), config.cipher)
    }

    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    /// Encrypt `private_key` under a fresh random 12-byte nonce, no associated data.
    pub fn seal(&self, private_key: &[u8]) -> Result<SealedPrivateKey, CryptoError> {
        let (ciphertext, nonce) = self.cipher.encrypt(self.master_key.as_bytes(), private_key)?;
        tracing::debug!(cipher = %self.cipher, len = private_key.len(), "sealed private key");
        Ok(SealedPrivateKey {
            ciphertext,
            nonce: nonce.to_vec(),
        })
    }

    /// Decrypt a sealed key. Fails closed with [`CryptoError::Decryption`] on any
    /// tag mismatch (wrong master key, corrupted ciphertext, wrong nonce).
    pub fn unseal(&self, sealed: &SealedPrivateKey) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let plaintext = self
            .cipher
            .decrypt(self.master_key.as_bytes(), &sealed.nonce, &sealed.ciphertext)
            .map_err(|e| {
                tracing::warn!(cipher = %self.cipher, "private key unseal failed");
                e
            })?;
        tracing::debug!(cipher = %self.cipher, len = plaintext.len(), "unsealed private key");
        Ok(plaintext)
    }

    pub fn seal_key<K>(&self, key: &PrivateKey<K>) -> Result<SealedPrivateKey, CryptoError> {
        self.seal(key.as_bytes())
    }

    /// Unseal straight into a typed key; the caller picks the kind, e.g. `unseal_key::<Kem>`.
    pub fn unseal_key<K>(&self, sealed: &SealedPrivateKey) -> Result<PrivateKey<K>, CryptoError> {
        let mut plaintext = self.unseal(sealed)?;
        Ok(PrivateKey::from_bytes(std::mem::take(&mut *plaintext)))
    }
}

/// Seal a private key under `master_key` with AES-256-GCM.
///
/// Always AES-256-GCM, whatever `PQSEAL_CIPHER` says. Deployments configured for another
/// cipher must go through [`PrivateKeyVault::from_config`].
pub fn seal_private_key(
    master_key: &MasterKey,
    private_key: &[u8],
) -> Result<SealedPrivateKey, CryptoError> {
    PrivateKeyVault::new(master_key.clone(), Cipher::Aes256Gcm).seal(private_key)
}

/// Unseal a private key sealed by [`seal_private_key`].
///
/// Always AES-256-GCM: a key sealed by a vault configured for ChaCha20-Poly1305 fails
/// here with [`CryptoError::Decryption`]. Use [`PrivateKeyVault::from_config`] instead.
pub fn unseal_private_key(
    master_key: &MasterKey,
    sealed: &SealedPrivateKey,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    PrivateKeyVault::new(master_key.clone(), Cipher::Aes256Gcm).unseal(sealed)
}
