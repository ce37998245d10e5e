//! # pqseal
//!
//! Post-quantum signed and encrypted message envelopes.
//!
//! ## Algorithm Suite
//!
//! - **Key Encapsulation:** ML-KEM-512 establishes one shared secret per message
//! - **Digital Signatures:** Dilithium2 detached signatures authenticate the sender
//! - **Symmetric Encryption:** AES-256-GCM (default) or ChaCha20-Poly1305, 12-byte random nonces
//! - **Key Storage:** private keys sealed with the same AEAD under a 32-byte master key
//!
//! ## Envelope
//!
//! An [`Envelope`] carries the KEM ciphertext, the AEAD nonce, the AEAD ciphertext and a
//! signature over `base64(kem_ct) | base64(nonce) | base64(ct)`. Opening verifies the
//! signature before anything is decapsulated or decrypted.
//!
//! ## Example
//!
//! ```rust
//! use pqseal::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = KeyPairGenerator::<MlKemDilithium>::default();
//!
//! // Alice receives, Bob sends
//! let alice = Identity::generate(&generator)?;
//! let bob = Identity::generate(&generator)?;
//!
//! let envelope = seal_envelope(&bob.signing.private, &alice.kem.public, "hello")?;
//! let plaintext = open_envelope(&alice.kem.private, &bob.signing.public, &envelope)?;
//! assert_eq!(plaintext, "hello");
//!
//! // Private keys at rest
//! let vault = PrivateKeyVault::from_config(&CryptoConfig::ephemeral());
//! let sealed = alice.seal(&vault)?;
//! let restored = sealed.unseal(&vault)?;
//! assert_eq!(restored.kem.private.as_bytes(), alice.kem.private.as_bytes());
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Considerations
//!
//! - Every message encapsulates against the recipient's long-term KEM key, so there is
//!   no forward secrecy: a leaked KEM private key exposes all past messages to it.
//! - Surface [`OpenFailed`] rather than [`CryptoError`] to untrusted callers.
//! - Private keys, shared secrets and the master key are zeroized on drop.
//!
//! ## License
//!
//! Licensed under the Apache License, Version 2.0.

mod aead;
mod config;
mod envelope;
mod errors;
mod identity;
mod keys;
mod provider;
mod types;
mod vault;

pub use aead::{random_nonce, Cipher, KEY_LEN, NONCE_LEN};
pub use config::{CryptoConfig, CIPHER_ENV, MASTER_KEY_ENV};
pub use envelope::{open_envelope, seal_envelope, EnvelopeOpener, EnvelopeSealer};
pub use errors::{ConfigError, CryptoError, OpenFailed};
pub use identity::{Identity, PublicIdentity, SealedIdentity};
pub use keys::KeyPairGenerator;
pub use provider::{MlKemDilithium, PrimitiveProvider, SUITE_V1};
pub use types::*;
pub use vault::{seal_private_key, unseal_private_key, MasterKey, PrivateKeyVault, MASTER_KEY_LEN};
