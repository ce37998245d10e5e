//! Key, sealed-key, and envelope types plus their wire encodings.

use std::fmt;
use std::marker::PhantomData;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::errors::CryptoError;

/// Length in bytes of a KEM shared secret, which doubles as the AEAD key.
pub const SHARED_SECRET_LEN: usize = 32;

/// Field separator of the canonical signing payload. Never produced by base64.
pub const PAYLOAD_DELIMITER: &str = "|";

/* ---------------- Key kinds ---------------- */

/// Marks which primitive a key belongs to so KEM and signature keys cannot be mixed up.
pub trait KeyKind {
    const NAME: &'static str;
}

/// Key encapsulation keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kem {}

/// Signature keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signature {}

impl KeyKind for Kem {
    const NAME: &'static str = "kem";
}

impl KeyKind for Signature {
    const NAME: &'static str = "signature";
}

/* ---------------- Keys ---------------- */

/// Shareable half of a key pair. Serializes as base64 text in JSON.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct PublicKey<K> {
    #[serde(with = "b64")]
    bytes: Vec<u8>,
    #[serde(skip)]
    _kind: PhantomData<K>,
}

impl<K> PublicKey<K> {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            _kind: PhantomData,
        }
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        decode_b64(encoded).map(Self::from_bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

impl<K: KeyKind> fmt::Debug for PublicKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey<{}>({} bytes)", K::NAME, self.bytes.len())
    }
}

/// Secret half of a key pair.
///
/// The bytes are wiped when the key is dropped. There is deliberately no serde
/// support: a private key only leaves memory sealed by a [`crate::PrivateKeyVault`].
#[derive(Clone)]
pub struct PrivateKey<K> {
    bytes: Zeroizing<Vec<u8>>,
    _kind: PhantomData<K>,
}

impl<K> PrivateKey<K> {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
            _kind: PhantomData,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl<K: KeyKind> fmt::Debug for PrivateKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey<{}>([REDACTED])", K::NAME)
    }
}

/// A public/private key pair of one kind.
#[derive(Clone)]
pub struct KeyPair<K> {
    pub public: PublicKey<K>,
    pub private: PrivateKey<K>,
}

impl<K: KeyKind> fmt::Debug for KeyPair<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("private", &self.private)
            .finish()
    }
}

/// Key pair used for encapsulation/decapsulation.
pub type KemKeyPair = KeyPair<Kem>;

/// Key pair used for signing/verification.
pub type SignatureKeyPair = KeyPair<Signature>;

/// Symmetric key produced by one encapsulation. Wiped on drop, never stored.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SHARED_SECRET_LEN]);

impl SharedSecret {
    pub fn new(bytes: [u8; SHARED_SECRET_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; SHARED_SECRET_LEN] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_LEN] {
        &self.0
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

/* ---------------- Sealed private key ---------------- */

/// A private key encrypted under the master key, as persisted by a storage layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SealedPrivateKey {
    /// AEAD ciphertext including the authentication tag.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    /// 12-byte nonce, unique per seal under a given master key.
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,
}

impl SealedPrivateKey {
    /// Rebuild from the two base64 columns a database row carries.
    pub fn from_base64(ciphertext: &str, nonce: &str) -> Result<Self, CryptoError> {
        Ok(Self {
            ciphertext: decode_b64(ciphertext)?,
            nonce: decode_b64(nonce)?,
        })
    }

    pub fn ciphertext_base64(&self) -> String {
        STANDARD.encode(&self.ciphertext)
    }

    pub fn nonce_base64(&self) -> String {
        STANDARD.encode(&self.nonce)
    }
}

/* ---------------- Envelope ---------------- */

/// One signed, encrypted message.
///
/// Fields are read-only once built. The signature covers
/// [`Envelope::signing_payload`] and must be checked before any other field is trusted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    #[serde(with = "b64")]
    kem_ciphertext: Vec<u8>,
    #[serde(with = "b64")]
    nonce: Vec<u8>,
    #[serde(with = "b64")]
    ciphertext: Vec<u8>,
    #[serde(with = "b64")]
    signature: Vec<u8>,
}

impl Envelope {
    pub fn from_parts(
        kem_ciphertext: Vec<u8>,
        nonce: Vec<u8>,
        ciphertext: Vec<u8>,
        signature: Vec<u8>,
    ) -> Self {
        Self {
            kem_ciphertext,
            nonce,
            ciphertext,
            signature,
        }
    }

    /// Rebuild from four base64 text fields (kem ciphertext, nonce, ciphertext, signature).
    pub fn from_base64_fields(
        kem_ciphertext: &str,
        nonce: &str,
        ciphertext: &str,
        signature: &str,
    ) -> Result<Self, CryptoError> {
        Ok(Self {
            kem_ciphertext: decode_b64(kem_ciphertext)?,
            nonce: decode_b64(nonce)?,
            ciphertext: decode_b64(ciphertext)?,
            signature: decode_b64(signature)?,
        })
    }

    /// Returns `(kem_ciphertext, nonce, ciphertext, signature)`.
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>) {
        (self.kem_ciphertext, self.nonce, self.ciphertext, self.signature)
    }

    pub fn kem_ciphertext(&self) -> &[u8] {
        &self.kem_ciphertext
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The exact bytes the sender signed. See [`signing_payload`].
    pub fn signing_payload(&self) -> Vec<u8> {
        signing_payload(&self.kem_ciphertext, &self.nonce, &self.ciphertext)
    }

    pub fn to_json(&self) -> Result<String, CryptoError> {
        serde_json::to_string(self).map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    pub fn from_json(data: &str) -> Result<Self, CryptoError> {
        serde_json::from_str(data).map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, CryptoError> {
        to_cbor_canonical(self)
    }

    pub fn from_cbor(data: &[u8]) -> Result<Self, CryptoError> {
        from_cbor(data)
    }
}

/// Build the canonical signing input:
/// `base64(kem_ciphertext) | base64(nonce) | base64(ciphertext)` as UTF-8 bytes.
///
/// Standard padded base64 never contains `|`, so the join is unambiguous.
pub fn signing_payload(kem_ciphertext: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    [
        STANDARD.encode(kem_ciphertext),
        STANDARD.encode(nonce),
        STANDARD.encode(ciphertext),
    ]
    .join(PAYLOAD_DELIMITER)
    .into_bytes()
}

/* ---------------- Encoding helpers ---------------- */

pub(crate) fn decode_b64(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| CryptoError::Encoding(e.to_string()))
}

/// Serialize a value to CBOR with the self-describe tag.
pub fn to_cbor_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, CryptoError> {
    let mut buf = Vec::new();
    let mut ser = serde_cbor::ser::Serializer::new(&mut buf);
    ser.self_describe()
        .map_err(|e| CryptoError::Encoding(e.to_string()))?;
    v.serialize(&mut ser)
        .map_err(|e| CryptoError::Encoding(e.to_string()))?;
    Ok(buf)
}

/// Deserialize a value from CBOR.
pub fn from_cbor<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T, CryptoError> {
    serde_cbor::from_slice::<T>(data).map_err(|e| CryptoError::Encoding(e.to_string()))
}

/// Binary fields: base64 text for human-readable formats, raw bytes otherwise.
pub(crate) mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        if ser.is_human_readable() {
            ser.serialize_str(&STANDARD.encode(bytes))
        } else {
            serde_bytes::serialize(bytes, ser)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        if de.is_human_readable() {
            let encoded = String::deserialize(de)?;
            STANDARD.decode(encoded).map_err(D::Error::custom)
        } else {
            serde_bytes::deserialize(de)
        }
    }
}
