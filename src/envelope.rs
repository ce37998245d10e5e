use crate::aead::Cipher;
use crate::config::CryptoConfig;
use crate::errors::{CryptoError, OpenFailed};
use crate::provider::{MlKemDilithium, PrimitiveProvider};
use crate::types::{signing_payload, Envelope, Kem, PrivateKey, PublicKey, Signature};

/* ---------------- Seal ---------------- */

/// Turns plaintext into a signed envelope for one recipient.
///
/// Every call encapsulates a fresh shared secret against the recipient's static KEM
/// key; nothing is carried between calls.
#[derive(Clone, Debug, Default)]
pub struct EnvelopeSealer<P = MlKemDilithium> {
    provider: P,
    cipher: Cipher,
}

impl<P: PrimitiveProvider> EnvelopeSealer<P> {
    pub fn new(provider: P, cipher: Cipher) -> Self {
        Self { provider, cipher }
    }

    pub fn from_config(provider: P, config: &CryptoConfig) -> Self {
        Self::new(provider, config.cipher)
    }

    /// Encapsulate, encrypt, then sign `base64(kem_ct)|base64(nonce)|base64(ct)`.
    pub fn seal(
        &self,
        sender_signing_key: &PrivateKey<Signature>,
        recipient_kem_key: &PublicKey<Kem>,
        plaintext: &str,
    ) -> Result<Envelope, CryptoError> {
        let (kem_ciphertext, shared) = self
            .provider
            .kem_encapsulate(recipient_kem_key.as_bytes())?;

        let (ciphertext, nonce) = self
            .cipher
            .encrypt(shared.as_bytes(), plaintext.as_bytes())?;
        drop(shared);

        let payload = signing_payload(&kem_ciphertext, &nonce, &ciphertext);
        let signature = self.provider.sign(sender_signing_key.as_bytes(), &payload)?;

        tracing::debug!(
            cipher = %self.cipher,
            kem_ct_len = kem_ciphertext.len(),
            ct_len = ciphertext.len(),
            sig_len = signature.len(),
            "sealed envelope"
        );

        Ok(Envelope::from_parts(
            kem_ciphertext,
            nonce.to_vec(),
            ciphertext,
            signature,
        ))
    }
}

/* ---------------- Open ---------------- */

/// Verifies and decrypts envelopes addressed to the holder of a KEM private key.
#[derive(Clone, Debug, Default)]
pub struct EnvelopeOpener<P = MlKemDilithium> {
    provider: P,
    cipher: Cipher,
}

impl<P: PrimitiveProvider> EnvelopeOpener<P> {
    pub fn new(provider: P, cipher: Cipher) -> Self {
        Self { provider, cipher }
    }

    pub fn from_config(provider: P, config: &CryptoConfig) -> Self {
        Self::new(provider, config.cipher)
    }

    /// Verify the sender signature, then decapsulate and decrypt.
    ///
    /// The signature is checked before any decapsulation or decryption; a bad
    /// signature returns [`CryptoError::BadSignature`] without touching the ciphertext.
    pub fn open(
        &self,
        recipient_kem_key: &PrivateKey<Kem>,
        sender_signing_key: &PublicKey<Signature>,
        envelope: &Envelope,
    ) -> Result<String, CryptoError> {
        let payload = envelope.signing_payload();
        if !self
            .provider
            .verify(sender_signing_key.as_bytes(), &payload, envelope.signature())
        {
            tracing::warn!("envelope signature verification failed");
            return Err(CryptoError::BadSignature);
        }

        let shared = self
            .provider
            .kem_decapsulate(recipient_kem_key.as_bytes(), envelope.kem_ciphertext())?;

        let plaintext = self
            .cipher
            .decrypt(shared.as_bytes(), envelope.nonce(), envelope.ciphertext())?;
        drop(shared);

        let text = std::str::from_utf8(&plaintext)
            .map_err(|e| CryptoError::Encoding(e.to_string()))?
            .to_owned();

        tracing::debug!(cipher = %self.cipher, len = text.len(), "opened envelope");
        Ok(text)
    }

    /// Same as [`EnvelopeOpener::open`] but collapses every failure into [`OpenFailed`],
    /// for callers that must not reveal which step rejected the envelope.
    pub fn open_opaque(
        &self,
        recipient_kem_key: &PrivateKey<Kem>,
        sender_signing_key: &PublicKey<Signature>,
        envelope: &Envelope,
    ) -> Result<String, OpenFailed> {
        self.open(recipient_kem_key, sender_signing_key, envelope)
            .map_err(|e| {
                tracing::debug!(error = %e, "open failed");
                OpenFailed
            })
    }
}

/// Seal with [`MlKemDilithium`] and AES-256-GCM.
///
/// The cipher is fixed regardless of `PQSEAL_CIPHER`; configured deployments should use
/// [`EnvelopeSealer::from_config`].
pub fn seal_envelope(
    sender_signing_key: &PrivateKey<Signature>,
    recipient_kem_key: &PublicKey<Kem>,
    plaintext: &str,
) -> Result<Envelope, CryptoError> {
    EnvelopeSealer::new(MlKemDilithium, Cipher::Aes256Gcm).seal(
        sender_signing_key,
        recipient_kem_key,
        plaintext,
    )
}

/// Open with [`MlKemDilithium`] and AES-256-GCM.
///
/// An envelope sealed under ChaCha20-Poly1305 verifies and then fails with
/// [`CryptoError::Decryption`]; use [`EnvelopeOpener::from_config`] for it.
pub fn open_envelope(
    recipient_kem_key: &PrivateKey<Kem>,
    sender_signing_key: &PublicKey<Signature>,
    envelope: &Envelope,
) -> Result<String, CryptoError> {
    EnvelopeOpener::new(MlKemDilithium, Cipher::Aes256Gcm).open(
        recipient_kem_key,
        sender_signing_key,
        envelope,
    )
}
