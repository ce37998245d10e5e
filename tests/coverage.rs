use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pqcrypto_dilithium::dilithium2 as dilithium;
use pqseal::*;

fn parties() -> (KemKeyPair, SignatureKeyPair) {
    let generator = KeyPairGenerator::<MlKemDilithium>::default();
    (
        generator.generate_kem_keypair().unwrap(),
        generator.generate_signature_keypair().unwrap(),
    )
}

fn flip_bit(bytes: &mut [u8], index: usize) {
    bytes[index % bytes.len()] ^= 0x01;
}

// ============================================================================
// Key Generation Tests
// ============================================================================

#[test]
fn test_kem_keypair_sizes() {
    let generator = KeyPairGenerator::<MlKemDilithium>::default();
    let pair = generator.generate_kem_keypair().unwrap();

    // ML-KEM-512
    assert_eq!(pair.public.as_bytes().len(), 800);
    assert_eq!(pair.private.as_bytes().len(), 1632);
}

#[test]
fn test_signature_keypair_sizes() {
    let generator = KeyPairGenerator::<MlKemDilithium>::default();
    let pair = generator.generate_signature_keypair().unwrap();

    assert_eq!(pair.public.as_bytes().len(), dilithium::public_key_bytes());
    assert_eq!(pair.private.as_bytes().len(), dilithium::secret_key_bytes());
}

#[test]
fn test_keypairs_unique() {
    let generator = KeyPairGenerator::<MlKemDilithium>::default();
    let k1 = generator.generate_kem_keypair().unwrap();
    let k2 = generator.generate_kem_keypair().unwrap();
    let s1 = generator.generate_signature_keypair().unwrap();
    let s2 = generator.generate_signature_keypair().unwrap();

    assert_ne!(k1.public, k2.public);
    assert_ne!(s1.public, s2.public);
}

#[test]
fn test_kem_encapsulate_decapsulate() {
    let provider = MlKemDilithium;
    let pair = provider.kem_generate().unwrap();

    let (kem_ct, secret) = provider.kem_encapsulate(pair.public.as_bytes()).unwrap();
    assert_eq!(kem_ct.len(), 768);
    let recovered = provider
        .kem_decapsulate(pair.private.as_bytes(), &kem_ct)
        .unwrap();
    assert_eq!(recovered, secret);
}

#[test]
fn test_private_key_debug_is_redacted() {
    let (kem, _) = parties();
    let shown = format!("{:?}", kem);
    assert!(shown.contains("REDACTED"));
    assert!(!shown.contains(&format!("{:?}", &kem.private.as_bytes()[..8])));
    assert_eq!(format!("{:?}", MasterKey::generate()), "MasterKey([REDACTED])");
}

// ============================================================================
// Vault Tests
// ============================================================================

#[test]
fn test_vault_roundtrip() {
    let vault = PrivateKeyVault::new(MasterKey::generate(), Cipher::Aes256Gcm);
    let (kem, _) = parties();

    let sealed = vault.seal_key(&kem.private).unwrap();
    assert_eq!(sealed.nonce.len(), NONCE_LEN);
    assert_ne!(sealed.ciphertext, kem.private.as_bytes());

    let restored = vault.unseal_key::<Kem>(&sealed).unwrap();
    assert_eq!(restored.as_bytes(), kem.private.as_bytes());
}

#[test]
fn test_vault_roundtrip_chacha() {
    let vault = PrivateKeyVault::new(MasterKey::generate(), Cipher::ChaCha20Poly1305);
    let sealed = vault.seal(b"secret key bytes").unwrap();
    assert_eq!(vault.unseal(&sealed).unwrap().as_slice(), b"secret key bytes");
}

#[test]
fn test_vault_wrong_master_key() {
    let key = MasterKey::generate();
    let other = MasterKey::generate();
    let sealed = seal_private_key(&key, b"private").unwrap();

    let err = unseal_private_key(&other, &sealed).unwrap_err();
    assert_eq!(err, CryptoError::Decryption);
}

#[test]
fn test_vault_wrong_cipher() {
    let key = MasterKey::generate();
    let gcm = PrivateKeyVault::new(key.clone(), Cipher::Aes256Gcm);
    let chacha = PrivateKeyVault::new(key, Cipher::ChaCha20Poly1305);

    let sealed = gcm.seal(b"private").unwrap();
    assert_eq!(chacha.unseal(&sealed).unwrap_err(), CryptoError::Decryption);
}

#[test]
fn test_vault_corrupted_ciphertext() {
    let vault = PrivateKeyVault::new(MasterKey::generate(), Cipher::default());
    let mut sealed = vault.seal(b"private").unwrap();
    flip_bit(&mut sealed.ciphertext, 3);

    assert_eq!(vault.unseal(&sealed).unwrap_err(), CryptoError::Decryption);
}

#[test]
fn test_vault_mismatched_nonce() {
    let vault = PrivateKeyVault::new(MasterKey::generate(), Cipher::default());
    let mut sealed = vault.seal(b"private").unwrap();
    let other = vault.seal(b"private").unwrap();
    sealed.nonce = other.nonce;

    assert_eq!(vault.unseal(&sealed).unwrap_err(), CryptoError::Decryption);
}

#[test]
fn test_vault_short_nonce() {
    let vault = PrivateKeyVault::new(MasterKey::generate(), Cipher::default());
    let mut sealed = vault.seal(b"private").unwrap();
    sealed.nonce.truncate(8);

    assert_eq!(vault.unseal(&sealed).unwrap_err(), CryptoError::Decryption);
}

#[test]
fn test_sealed_private_key_base64_columns() {
    let key = MasterKey::generate();
    let sealed = seal_private_key(&key, b"private").unwrap();

    let restored =
        SealedPrivateKey::from_base64(&sealed.ciphertext_base64(), &sealed.nonce_base64())
            .unwrap();
    assert_eq!(restored, sealed);
    assert_eq!(unseal_private_key(&key, &restored).unwrap().as_slice(), b"private");
}

#[test]
fn test_sealed_private_key_bad_base64() {
    let err = SealedPrivateKey::from_base64("not base64!", "AAAA").unwrap_err();
    assert!(matches!(err, CryptoError::Encoding(_)));
}

#[test]
fn test_master_key_base64() {
    let key = MasterKey::generate();
    let restored = MasterKey::from_base64(&key.to_base64()).unwrap();
    assert_eq!(restored.as_bytes(), key.as_bytes());

    assert!(matches!(
        MasterKey::from_slice(&[0u8; 16]),
        Err(ConfigError::InvalidMasterKey(_))
    ));
    assert!(matches!(
        MasterKey::from_base64("%%%"),
        Err(ConfigError::InvalidMasterKey(_))
    ));
}

// ============================================================================
// AEAD Tests
// ============================================================================

#[test]
fn test_nonce_freshness_same_key() {
    let key = [7u8; KEY_LEN];
    let mut seen = HashSet::new();
    for _ in 0..10_000 {
        let (_, nonce) = Cipher::default().encrypt(&key, b"x").unwrap();
        assert!(seen.insert(nonce), "nonce reused");
    }
}

#[test]
fn test_cipher_wrong_key_length() {
    let err = Cipher::ChaCha20Poly1305.encrypt(&[0u8; 16], b"x").unwrap_err();
    assert_eq!(err, CryptoError::Encryption);
}

#[test]
fn test_cipher_parse() {
    assert_eq!("aes-256-gcm".parse::<Cipher>().unwrap(), Cipher::Aes256Gcm);
    assert_eq!(
        "ChaCha20-Poly1305".parse::<Cipher>().unwrap(),
        Cipher::ChaCha20Poly1305
    );
    assert!(matches!(
        "rot13".parse::<Cipher>(),
        Err(ConfigError::UnknownCipher(_))
    ));
}

// ============================================================================
// Envelope Tests
// ============================================================================

#[test]
fn test_envelope_field_shapes() {
    let (kem, sig) = parties();
    let envelope = seal_envelope(&sig.private, &kem.public, "hello").unwrap();

    assert_eq!(envelope.kem_ciphertext().len(), 768);
    assert_eq!(envelope.nonce().len(), NONCE_LEN);
    // AEAD tag is 16 bytes
    assert_eq!(envelope.ciphertext().len(), "hello".len() + 16);
    assert_eq!(envelope.signature().len(), dilithium::signature_bytes());
}

#[test]
fn test_signing_payload_is_canonical() {
    let envelope = Envelope::from_parts(vec![1, 2, 3], vec![4, 5], vec![6], vec![9; 4]);
    assert_eq!(envelope.signing_payload(), b"AQID|BAU=|Bg==".to_vec());
    assert_eq!(
        signing_payload(&[1, 2, 3], &[4, 5], &[6]),
        envelope.signing_payload()
    );
}

#[test]
fn test_envelope_empty_message() {
    let (kem, sig) = parties();
    let envelope = seal_envelope(&sig.private, &kem.public, "").unwrap();
    assert_eq!(open_envelope(&kem.private, &sig.public, &envelope).unwrap(), "");
}

#[test]
fn test_envelope_unicode_message() {
    let (kem, sig) = parties();
    let msg = "Привет, мир! 你好世界 🔐";
    let envelope = seal_envelope(&sig.private, &kem.public, msg).unwrap();
    assert_eq!(open_envelope(&kem.private, &sig.public, &envelope).unwrap(), msg);
}

#[test]
fn test_envelope_chacha_suite() {
    let (kem, sig) = parties();
    let sealer = EnvelopeSealer::new(MlKemDilithium, Cipher::ChaCha20Poly1305);
    let opener = EnvelopeOpener::new(MlKemDilithium, Cipher::ChaCha20Poly1305);

    let envelope = sealer.seal(&sig.private, &kem.public, "chacha").unwrap();
    assert_eq!(opener.open(&kem.private, &sig.public, &envelope).unwrap(), "chacha");

    // Mismatched cipher configuration fails after verification
    let gcm = EnvelopeOpener::new(MlKemDilithium, Cipher::Aes256Gcm);
    assert_eq!(
        gcm.open(&kem.private, &sig.public, &envelope).unwrap_err(),
        CryptoError::Decryption
    );
}

#[test]
fn test_envelope_fresh_per_call() {
    let (kem, sig) = parties();
    let e1 = seal_envelope(&sig.private, &kem.public, "same").unwrap();
    let e2 = seal_envelope(&sig.private, &kem.public, "same").unwrap();

    assert_ne!(e1.kem_ciphertext(), e2.kem_ciphertext());
    assert_ne!(e1.nonce(), e2.nonce());
    assert_ne!(e1.ciphertext(), e2.ciphertext());
}

#[test]
fn test_tamper_each_field_fails_signature() {
    let (kem, sig) = parties();
    let envelope = seal_envelope(&sig.private, &kem.public, "tamper me").unwrap();

    for field in 0..3 {
        let (mut kem_ct, mut nonce, mut ct, signature) = envelope.clone().into_parts();
        match field {
            0 => flip_bit(&mut kem_ct, 17),
            1 => flip_bit(&mut nonce, 5),
            _ => flip_bit(&mut ct, 2),
        }
        let tampered = Envelope::from_parts(kem_ct, nonce, ct, signature);
        let err = open_envelope(&kem.private, &sig.public, &tampered).unwrap_err();
        assert_eq!(err, CryptoError::BadSignature, "field {field}");
    }
}

#[test]
fn test_corrupted_signature() {
    let (kem, sig) = parties();
    let (kem_ct, nonce, ct, mut signature) = seal_envelope(&sig.private, &kem.public, "x")
        .unwrap()
        .into_parts();
    flip_bit(&mut signature, 100);

    let tampered = Envelope::from_parts(kem_ct, nonce, ct, signature);
    let err = open_envelope(&kem.private, &sig.public, &tampered).unwrap_err();
    assert_eq!(err, CryptoError::BadSignature);
}

#[test]
fn test_truncated_signature() {
    let (kem, sig) = parties();
    let (kem_ct, nonce, ct, _) = seal_envelope(&sig.private, &kem.public, "x")
        .unwrap()
        .into_parts();

    let tampered = Envelope::from_parts(kem_ct, nonce, ct, vec![0u8; 10]);
    let err = open_envelope(&kem.private, &sig.public, &tampered).unwrap_err();
    assert_eq!(err, CryptoError::BadSignature);
}

#[test]
fn test_wrong_recipient_key() {
    let (kem, sig) = parties();
    let (other_kem, _) = parties();
    let envelope = seal_envelope(&sig.private, &kem.public, "for kem only").unwrap();

    // ML-KEM decapsulation with the wrong key yields an unrelated secret (implicit rejection)
    let err = open_envelope(&other_kem.private, &sig.public, &envelope).unwrap_err();
    assert_eq!(err, CryptoError::Decryption);
}

#[test]
fn test_malformed_recipient_public_key() {
    let (_, sig) = parties();
    let bad = PublicKey::<Kem>::from_bytes(vec![0u8; 10]);
    let err = seal_envelope(&sig.private, &bad, "x").unwrap_err();
    assert_eq!(err, CryptoError::Encapsulation);
}

#[test]
fn test_malformed_signing_private_key() {
    let (kem, _) = parties();
    let bad = PrivateKey::<Signature>::from_bytes(vec![1u8; 5]);
    let err = seal_envelope(&bad, &kem.public, "x").unwrap_err();
    assert_eq!(err, CryptoError::Signing);
}

#[test]
fn test_malformed_recipient_private_key() {
    let (kem, sig) = parties();
    let envelope = seal_envelope(&sig.private, &kem.public, "x").unwrap();
    let bad = PrivateKey::<Kem>::from_bytes(vec![0u8; 12]);

    let err = open_envelope(&bad, &sig.public, &envelope).unwrap_err();
    assert_eq!(err, CryptoError::Decapsulation);
}

#[test]
fn test_validly_signed_malformed_kem_ciphertext() {
    // A sender that signs garbage passes verification but fails decapsulation
    let (kem, sig) = parties();
    let provider = MlKemDilithium;
    let (kem_ct, nonce, ct) = (vec![0u8; 5], vec![0u8; NONCE_LEN], vec![0u8; 32]);
    let signature = provider
        .sign(sig.private.as_bytes(), &signing_payload(&kem_ct, &nonce, &ct))
        .unwrap();

    let envelope = Envelope::from_parts(kem_ct, nonce, ct, signature);
    let err = open_envelope(&kem.private, &sig.public, &envelope).unwrap_err();
    assert_eq!(err, CryptoError::Decapsulation);
}

#[test]
fn test_validly_signed_non_utf8_plaintext() {
    let (kem, sig) = parties();
    let provider = MlKemDilithium;
    let (kem_ct, secret) = provider.kem_encapsulate(kem.public.as_bytes()).unwrap();
    let (ct, nonce) = Cipher::default()
        .encrypt(secret.as_bytes(), &[0xff, 0xfe, 0xfd])
        .unwrap();
    let signature = provider
        .sign(sig.private.as_bytes(), &signing_payload(&kem_ct, &nonce, &ct))
        .unwrap();

    let envelope = Envelope::from_parts(kem_ct, nonce.to_vec(), ct, signature);
    let err = open_envelope(&kem.private, &sig.public, &envelope).unwrap_err();
    assert!(matches!(err, CryptoError::Encoding(_)));
}

#[test]
fn test_open_opaque_hides_failure_kind() {
    let (kem, sig) = parties();
    let (_, other_sig) = parties();
    let opener = EnvelopeOpener::<MlKemDilithium>::default();
    let envelope = seal_envelope(&sig.private, &kem.public, "x").unwrap();

    assert_eq!(opener.open_opaque(&kem.private, &sig.public, &envelope).unwrap(), "x");
    assert_eq!(
        opener.open_opaque(&kem.private, &other_sig.public, &envelope),
        Err(OpenFailed)
    );
    let bad = PrivateKey::<Kem>::from_bytes(vec![0u8; 12]);
    assert_eq!(
        opener.open_opaque(&bad, &sig.public, &envelope),
        Err(OpenFailed)
    );
}

// ============================================================================
// Verify-before-decrypt ordering
// ============================================================================

#[derive(Clone, Default)]
struct CountingProvider {
    inner: MlKemDilithium,
    decapsulations: Arc<AtomicUsize>,
}

impl PrimitiveProvider for CountingProvider {
    fn kem_generate(&self) -> Result<KemKeyPair, CryptoError> {
        self.inner.kem_generate()
    }

    fn kem_encapsulate(&self, public_key: &[u8]) -> Result<(Vec<u8>, SharedSecret), CryptoError> {
        self.inner.kem_encapsulate(public_key)
    }

    fn kem_decapsulate(
        &self,
        private_key: &[u8],
        ciphertext: &[u8],
    ) -> Result<SharedSecret, CryptoError> {
        self.decapsulations.fetch_add(1, Ordering::SeqCst);
        self.inner.kem_decapsulate(private_key, ciphertext)
    }

    fn sig_generate(&self) -> Result<SignatureKeyPair, CryptoError> {
        self.inner.sig_generate()
    }

    fn sign(&self, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.inner.sign(private_key, message)
    }

    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        self.inner.verify(public_key, message, signature)
    }
}

#[test]
fn test_bad_signature_never_reaches_decapsulation() {
    let provider = CountingProvider::default();
    let generator = KeyPairGenerator::new(provider.clone());
    let kem = generator.generate_kem_keypair().unwrap();
    let sig = generator.generate_signature_keypair().unwrap();
    let other_sig = generator.generate_signature_keypair().unwrap();

    let sealer = EnvelopeSealer::new(provider.clone(), Cipher::default());
    let opener = EnvelopeOpener::new(provider.clone(), Cipher::default());
    let envelope = sealer.seal(&sig.private, &kem.public, "ordered").unwrap();

    let err = opener.open(&kem.private, &other_sig.public, &envelope).unwrap_err();
    assert_eq!(err, CryptoError::BadSignature);
    assert_eq!(provider.decapsulations.load(Ordering::SeqCst), 0);

    assert_eq!(opener.open(&kem.private, &sig.public, &envelope).unwrap(), "ordered");
    assert_eq!(provider.decapsulations.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Serialization Tests
// ============================================================================

#[test]
fn test_envelope_json_uses_base64_fields() {
    let (kem, sig) = parties();
    let envelope = seal_envelope(&sig.private, &kem.public, "json").unwrap();

    let json = envelope.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["kem_ciphertext"].is_string());
    assert!(value["nonce"].is_string());
    assert!(value["ciphertext"].is_string());
    assert!(value["signature"].is_string());

    let restored = Envelope::from_json(&json).unwrap();
    assert_eq!(restored, envelope);
    assert_eq!(open_envelope(&kem.private, &sig.public, &restored).unwrap(), "json");
}

#[test]
fn test_envelope_from_base64_fields() {
    let (kem, sig) = parties();
    let envelope = seal_envelope(&sig.private, &kem.public, "columns").unwrap();
    let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

    let restored = Envelope::from_base64_fields(
        value["kem_ciphertext"].as_str().unwrap(),
        value["nonce"].as_str().unwrap(),
        value["ciphertext"].as_str().unwrap(),
        value["signature"].as_str().unwrap(),
    )
    .unwrap();
    assert_eq!(restored, envelope);
}

#[test]
fn test_envelope_from_base64_fields_invalid() {
    let err = Envelope::from_base64_fields("AAAA", "not|base64", "AAAA", "AAAA").unwrap_err();
    assert!(matches!(err, CryptoError::Encoding(_)));
}

#[test]
fn test_envelope_cbor() {
    let (kem, sig) = parties();
    let envelope = seal_envelope(&sig.private, &kem.public, "cbor").unwrap();

    let wire = envelope.to_cbor().unwrap();
    let restored = Envelope::from_cbor(&wire).unwrap();
    assert_eq!(open_envelope(&kem.private, &sig.public, &restored).unwrap(), "cbor");
}

#[test]
fn test_envelope_cbor_invalid() {
    let err = Envelope::from_cbor(&[0xff, 0x00, 0x13]).unwrap_err();
    assert!(matches!(err, CryptoError::Encoding(_)));
}

#[test]
fn test_sealed_identity_json() {
    let generator = KeyPairGenerator::<MlKemDilithium>::default();
    let vault = PrivateKeyVault::from_config(&CryptoConfig::ephemeral());
    let sealed = Identity::generate(&generator).unwrap().seal(&vault).unwrap();

    let json = serde_json::to_string(&sealed).unwrap();
    let restored: SealedIdentity = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, sealed);

    let identity = restored.unseal(&vault).unwrap();
    assert_eq!(identity.public(), sealed.public);
}

#[test]
fn test_sealed_identity_other_vault() {
    let generator = KeyPairGenerator::<MlKemDilithium>::default();
    let vault = PrivateKeyVault::from_config(&CryptoConfig::ephemeral());
    let other = PrivateKeyVault::from_config(&CryptoConfig::ephemeral());
    let sealed = Identity::generate(&generator).unwrap().seal(&vault).unwrap();

    assert_eq!(sealed.unseal(&other).unwrap_err(), CryptoError::Decryption);
}

#[test]
fn test_public_key_base64() {
    let (kem, _) = parties();
    let restored = PublicKey::<Kem>::from_base64(&kem.public.to_base64()).unwrap();
    assert_eq!(restored, kem.public);
}

// ============================================================================
// Free functions are fixed to AES-256-GCM
// ============================================================================

#[test]
fn test_free_functions_ignore_configured_cipher() {
    let (kem, sig) = parties();
    let config = CryptoConfig::new(MasterKey::generate(), Cipher::ChaCha20Poly1305);

    let sealer = EnvelopeSealer::from_config(MlKemDilithium, &config);
    let opener = EnvelopeOpener::from_config(MlKemDilithium, &config);
    let envelope = sealer.seal(&sig.private, &kem.public, "configured").unwrap();

    assert_eq!(
        open_envelope(&kem.private, &sig.public, &envelope).unwrap_err(),
        CryptoError::Decryption
    );
    assert_eq!(opener.open(&kem.private, &sig.public, &envelope).unwrap(), "configured");

    let vault = PrivateKeyVault::from_config(&config);
    let sealed = vault.seal(b"private").unwrap();
    assert_eq!(
        unseal_private_key(&config.master_key, &sealed).unwrap_err(),
        CryptoError::Decryption
    );
    assert_eq!(vault.unseal(&sealed).unwrap().as_slice(), b"private");

    // And the other way round: free-function output opens under an AES-GCM config
    let sealed = seal_private_key(&config.master_key, b"private").unwrap();
    let gcm = PrivateKeyVault::new(config.master_key.clone(), Cipher::Aes256Gcm);
    assert_eq!(gcm.unseal(&sealed).unwrap().as_slice(), b"private");
}
