//! Per-user key material: one KEM pair and one signature pair, created at registration.

use serde::{Deserialize, Serialize};

use crate::errors::CryptoError;
use crate::keys::KeyPairGenerator;
use crate::provider::PrimitiveProvider;
use crate::types::{
    Kem, KemKeyPair, KeyPair, PublicKey, SealedPrivateKey, Signature, SignatureKeyPair,
};
use crate::vault::PrivateKeyVault;

/// Shareable directory entry for a user.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicIdentity {
    pub kem_public_key: PublicKey<Kem>,
    pub sign_public_key: PublicKey<Signature>,
}

/// What a storage layer persists: public keys in the clear, private keys sealed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SealedIdentity {
    pub public: PublicIdentity,
    pub kem_private: SealedPrivateKey,
    pub sign_private: SealedPrivateKey,
}

/// Unsealed key pairs, held in memory only while in use.
#[derive(Clone, Debug)]
pub struct Identity {
    pub kem: KemKeyPair,
    pub signing: SignatureKeyPair,
}

impl Identity {
    pub fn generate<P: PrimitiveProvider>(
        generator: &KeyPairGenerator<P>,
    ) -> Result<Self, CryptoError> {
        Ok(Self {
            kem: generator.generate_kem_keypair()?,
            signing: generator.generate_signature_keypair()?,
        })
    }

    pub fn public(&self) -> PublicIdentity {
        PublicIdentity {
            kem_public_key: self.kem.public.clone(),
            sign_public_key: self.signing.public.clone(),
        }
    }

    pub fn seal(&self, vault: &PrivateKeyVault) -> Result<SealedIdentity, CryptoError> {
        Ok(SealedIdentity {
            public: self.public(),
            kem_private: vault.seal_key(&self.kem.private)?,
            sign_private: vault.seal_key(&self.signing.private)?,
        })
    }
}

impl SealedIdentity {
    pub fn unseal(&self, vault: &PrivateKeyVault) -> Result<Identity, CryptoError> {
        Ok(Identity {
            kem: KeyPair {
                public: self.public.kem_public_key.clone(),
                private: vault.unseal_key::<Kem>(&self.kem_private)?,
            },
            signing: KeyPair {
                public: self.public.sign_public_key.clone(),
                private: vault.unseal_key::<Signature>(&self.sign_private)?,
            },
        })
    }
}
