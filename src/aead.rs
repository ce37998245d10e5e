//! Symmetric AEAD helpers: 256-bit keys, 96-bit random nonces, no associated data.

use std::fmt;
use std::str::FromStr;

use aes_gcm::Aes256Gcm;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit};
use chacha20poly1305::consts::U12;
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::errors::{ConfigError, CryptoError};

/// AEAD key length in bytes.
pub const KEY_LEN: usize = 32;

/// AEAD nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Which AEAD protects sealed private keys and envelope payloads.
///
/// Not recorded in the envelope: sender and recipient must agree out of band.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cipher {
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl Cipher {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cipher::Aes256Gcm => "aes-256-gcm",
            Cipher::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }

    /// Encrypt under a freshly drawn random nonce. Returns `(ciphertext, nonce)`.
    pub fn encrypt(
        self,
        key: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; NONCE_LEN]), CryptoError> {
        let nonce = random_nonce();
        let ciphertext = match self {
            Cipher::Aes256Gcm => aead_enc::<Aes256Gcm>(key, &nonce, plaintext)?,
            Cipher::ChaCha20Poly1305 => aead_enc::<ChaCha20Poly1305>(key, &nonce, plaintext)?,
        };
        Ok((ciphertext, nonce))
    }

    /// Decrypt and authenticate. Nothing is returned unless the tag verifies.
    pub fn decrypt(
        self,
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::Decryption);
        }
        let plaintext = match self {
            Cipher::Aes256Gcm => aead_dec::<Aes256Gcm>(key, nonce, ciphertext)?,
            Cipher::ChaCha20Poly1305 => aead_dec::<ChaCha20Poly1305>(key, nonce, ciphertext)?,
        };
        Ok(Zeroizing::new(plaintext))
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cipher {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aes-256-gcm" | "aes256gcm" => Ok(Cipher::Aes256Gcm),
            "chacha20-poly1305" | "chacha20poly1305" => Ok(Cipher::ChaCha20Poly1305),
            _ => Err(ConfigError::UnknownCipher(s.to_string())),
        }
    }
}

/// 12 bytes from the OS CSPRNG. Never a counter.
pub fn random_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

fn aead_enc<C>(key: &[u8], nonce: &[u8; NONCE_LEN], pt: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: KeyInit + Aead + AeadCore<NonceSize = U12>,
{
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::Encryption)?;
    cipher
        .encrypt(Nonce::from_slice(nonce), pt)
        .map_err(|_| CryptoError::Encryption)
}

fn aead_dec<C>(key: &[u8], nonce: &[u8], ct: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: KeyInit + Aead + AeadCore<NonceSize = U12>,
{
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::Decryption)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ct)
        .map_err(|_| CryptoError::Decryption)
}
