use crate::errors::CryptoError;
use crate::provider::{MlKemDilithium, PrimitiveProvider};
use crate::types::{KemKeyPair, SignatureKeyPair};

/// Produces KEM and signature key pairs, once per identity.
///
/// Holds no state besides the provider, so one generator can be shared across threads.
#[derive(Clone, Debug, Default)]
pub struct KeyPairGenerator<P = MlKemDilithium> {
    provider: P,
}

impl<P: PrimitiveProvider> KeyPairGenerator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn generate_kem_keypair(&self) -> Result<KemKeyPair, CryptoError> {
        let pair = self.provider.kem_generate().map_err(|e| {
            tracing::error!(error = %e, "kem key generation failed");
            CryptoError::KeyGeneration
        })?;
        tracing::debug!(public_len = pair.public.as_bytes().len(), "generated kem keypair");
        Ok(pair)
    }

    pub fn generate_signature_keypair(&self) -> Result<SignatureKeyPair, CryptoError> {
        let pair = self.provider.sig_generate().map_err(|e| {
            tracing::error!(error = %e, "signature key generation failed");
            CryptoError::KeyGeneration
        })?;
        tracing::debug!(
            public_len = pair.public.as_bytes().len(),
            "generated signature keypair"
        );
        Ok(pair)
    }
}
