//! pqseal demo
//!
//! Registers two identities, seals a message from alice to bob, opens it as bob,
//! then shows that a tampered envelope is rejected.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use pqseal::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Message alice sends to bob
    #[arg(short, long, default_value = "Hello from the post-quantum side!")]
    message: String,

    /// JSON secrets file holding the master key (created if missing).
    /// Without it an ephemeral master key is used.
    #[arg(short, long)]
    secrets: Option<PathBuf>,

    /// AEAD cipher (aes-256-gcm, chacha20-poly1305); overrides the secrets file
    #[arg(long)]
    cipher: Option<Cipher>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::builder()
        .with_default_directive(args.log_level.into())
        .from_env_lossy();
    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);
    tracing_subscriber::registry().with(stderr_layer).init();

    let mut config = match &args.secrets {
        Some(path) => CryptoConfig::load_or_create(path)?,
        None => CryptoConfig::ephemeral(),
    };
    if let Some(cipher) = args.cipher {
        config.cipher = cipher;
    }
    tracing::info!(suite = SUITE_V1, cipher = %config.cipher, "starting demo");

    let generator = KeyPairGenerator::new(MlKemDilithium);
    let vault = PrivateKeyVault::from_config(&config);
    let sealer = EnvelopeSealer::from_config(MlKemDilithium, &config);
    let opener = EnvelopeOpener::from_config(MlKemDilithium, &config);

    // --- Register: generate keys, keep only the sealed form ---
    let alice = Identity::generate(&generator)?.seal(&vault)?;
    let bob = Identity::generate(&generator)?.seal(&vault)?;
    println!("alice: {}", serde_json::to_string(&alice.public)?);
    println!("bob:   {}", serde_json::to_string(&bob.public)?);

    // --- Alice sends ---
    let alice_keys = alice.unseal(&vault)?;
    let envelope = sealer.seal(
        &alice_keys.signing.private,
        &bob.public.kem_public_key,
        &args.message,
    )?;
    drop(alice_keys);
    println!("\nenvelope: {}", envelope.to_json()?);

    // --- Bob opens ---
    let bob_keys = bob.unseal(&vault)?;
    let plaintext = opener.open_opaque(
        &bob_keys.kem.private,
        &alice.public.sign_public_key,
        &envelope,
    )?;
    println!("\nbob decrypted: {plaintext}");

    // --- Tampered ciphertext is rejected ---
    let (kem_ct, nonce, mut ct, sig) = envelope.into_parts();
    if let Some(byte) = ct.first_mut() {
        *byte ^= 0x01;
    }
    let tampered = Envelope::from_parts(kem_ct, nonce, ct, sig);
    match opener.open_opaque(&bob_keys.kem.private, &alice.public.sign_public_key, &tampered) {
        Ok(_) => anyhow::bail!("tampered envelope was accepted"),
        Err(e) => println!("tampered envelope rejected: {e}"),
    }

    Ok(())
}
