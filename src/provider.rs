//! Post-quantum primitive capabilities consumed by the envelope protocol.
//!
//! The KEM and signature mathematics are not implemented here. [`PrimitiveProvider`]
//! is the seam to an already-trusted library; [`MlKemDilithium`] is the shipped suite.

use ml_kem::kem::{Decapsulate, Encapsulate};
use ml_kem::{Ciphertext, EncodedSizeUser, KemCore, MlKem512};
use pqcrypto_dilithium::dilithium2 as dilithium;
use pqcrypto_traits::sign::{
    DetachedSignature, PublicKey as SigPublicKey, SecretKey as SigSecretKey,
};
use rand::rngs::OsRng;

use crate::errors::CryptoError;
use crate::types::{KemKeyPair, PrivateKey, PublicKey, SharedSecret, SignatureKeyPair};

/// Algorithm suite identifier of [`MlKemDilithium`].
pub const SUITE_V1: &str = "MLKEM512+Dilithium2";

/// KEM and signature capabilities over opaque byte strings.
///
/// Implementations must be stateless with respect to callers (all randomness drawn
/// fresh per call) so that every operation is safe to run concurrently.
pub trait PrimitiveProvider: Send + Sync {
    fn kem_generate(&self) -> Result<KemKeyPair, CryptoError>;

    /// Returns `(kem_ciphertext, shared_secret)`.
    fn kem_encapsulate(&self, public_key: &[u8]) -> Result<(Vec<u8>, SharedSecret), CryptoError>;

    fn kem_decapsulate(
        &self,
        private_key: &[u8],
        ciphertext: &[u8],
    ) -> Result<SharedSecret, CryptoError>;

    fn sig_generate(&self) -> Result<SignatureKeyPair, CryptoError>;

    /// Detached signature over `message`.
    fn sign(&self, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// `false` for a bad signature as well as for a malformed key or signature.
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;
}

/// ML-KEM-512 (pure Rust) for encapsulation, Dilithium2 for detached signatures.
#[derive(Clone, Copy, Debug, Default)]
pub struct MlKemDilithium;

impl PrimitiveProvider for MlKemDilithium {
    fn kem_generate(&self) -> Result<KemKeyPair, CryptoError> {
        let mut rng = OsRng;
        let (sk, pk) = MlKem512::generate(&mut rng);
        Ok(KemKeyPair {
            public: PublicKey::from_bytes(pk.as_bytes().to_vec()),
            private: PrivateKey::from_bytes(sk.as_bytes().to_vec()),
        })
    }

    fn kem_encapsulate(&self, public_key: &[u8]) -> Result<(Vec<u8>, SharedSecret), CryptoError> {
        let mut rng = OsRng;
        let pk = <MlKem512 as KemCore>::EncapsulationKey::from_bytes(
            &public_key.try_into().map_err(|_| CryptoError::Encapsulation)?,
        );
        let (kem_ct, shared) = pk
            .encapsulate(&mut rng)
            .map_err(|_| CryptoError::Encapsulation)?;
        let secret =
            SharedSecret::from_slice(shared.as_slice()).ok_or(CryptoError::Encapsulation)?;
        Ok((kem_ct.as_slice().to_vec(), secret))
    }

    fn kem_decapsulate(
        &self,
        private_key: &[u8],
        ciphertext: &[u8],
    ) -> Result<SharedSecret, CryptoError> {
        let sk = <MlKem512 as KemCore>::DecapsulationKey::from_bytes(
            &private_key.try_into().map_err(|_| CryptoError::Decapsulation)?,
        );
        let kem_ct: Ciphertext<MlKem512> = ciphertext
            .try_into()
            .map_err(|_| CryptoError::Decapsulation)?;
        let shared = sk
            .decapsulate(&kem_ct)
            .map_err(|_| CryptoError::Decapsulation)?;
        SharedSecret::from_slice(shared.as_slice()).ok_or(CryptoError::Decapsulation)
    }

    fn sig_generate(&self) -> Result<SignatureKeyPair, CryptoError> {
        let (pk, sk) = dilithium::keypair();
        Ok(SignatureKeyPair {
            public: PublicKey::from_bytes(pk.as_bytes().to_vec()),
            private: PrivateKey::from_bytes(sk.as_bytes().to_vec()),
        })
    }

    fn sign(&self, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let sk = dilithium::SecretKey::from_bytes(private_key).map_err(|_| CryptoError::Signing)?;
        let sig = dilithium::detached_sign(message, &sk);
        Ok(sig.as_bytes().to_vec())
    }

    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let Ok(pk) = dilithium::PublicKey::from_bytes(public_key) else {
            return false;
        };
        let Ok(sig) = dilithium::DetachedSignature::from_bytes(signature) else {
            return false;
        };
        dilithium::verify_detached_signature(&sig, message, &pk).is_ok()
    }
}
