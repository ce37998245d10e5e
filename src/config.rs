//! Process-wide crypto configuration: the master key and the AEAD choice.
//!
//! Built once at startup and passed explicitly into the vault, sealer, and opener.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::aead::Cipher;
use crate::errors::ConfigError;
use crate::vault::MasterKey;

/// Environment variable holding the URL-safe base64 master key.
pub const MASTER_KEY_ENV: &str = "PQSEAL_MASTER_KEY";

/// Environment variable selecting the AEAD (`aes-256-gcm` or `chacha20-poly1305`).
pub const CIPHER_ENV: &str = "PQSEAL_CIPHER";

const MASTER_KEY_FIELD: &str = "crypto_master_key";
const CIPHER_FIELD: &str = "cipher";

#[derive(Clone, Debug)]
pub struct CryptoConfig {
    pub master_key: MasterKey,
    pub cipher: Cipher,
}

impl CryptoConfig {
    pub fn new(master_key: MasterKey, cipher: Cipher) -> Self {
        Self { master_key, cipher }
    }

    /// Random master key, default cipher. Keys sealed under it die with the process.
    pub fn ephemeral() -> Self {
        Self::new(MasterKey::generate(), Cipher::default())
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let encoded =
            std::env::var(MASTER_KEY_ENV).map_err(|_| ConfigError::MissingVar(MASTER_KEY_ENV))?;
        let master_key = MasterKey::from_base64(&encoded)?;
        let cipher = match std::env::var(CIPHER_ENV) {
            Ok(name) => name.parse::<Cipher>()?,
            Err(_) => Cipher::default(),
        };
        Ok(Self::new(master_key, cipher))
    }

    /// Read a JSON secrets file, generating and persisting a master key if the file
    /// or the `crypto_master_key` entry is missing. Other entries are left as found.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut secrets: Map<String, Value> = if path.exists() {
            serde_json::from_str(&fs::read_to_string(path)?)?
        } else {
            Map::new()
        };

        let mut changed = false;
        let master_key = match secrets.get(MASTER_KEY_FIELD) {
            Some(Value::String(encoded)) => MasterKey::from_base64(encoded)?,
            Some(_) => {
                return Err(ConfigError::InvalidMasterKey(format!(
                    "{MASTER_KEY_FIELD} must be a string"
                )))
            }
            None => {
                let key = MasterKey::generate();
                secrets.insert(
                    MASTER_KEY_FIELD.to_string(),
                    Value::String(key.to_base64().as_str().to_owned()),
                );
                changed = true;
                key
            }
        };

        let cipher = match secrets.get(CIPHER_FIELD) {
            Some(Value::String(name)) => name.parse::<Cipher>()?,
            Some(other) => return Err(ConfigError::UnknownCipher(other.to_string())),
            None => Cipher::default(),
        };

        if changed {
            write_secrets(path, &secrets)?;
            tracing::info!(path = %path.display(), "generated new master key");
        }

        Ok(Self::new(master_key, cipher))
    }
}

fn write_secrets(path: &Path, secrets: &Map<String, Value>) -> Result<(), ConfigError> {
    let contents = serde_json::to_vec_pretty(secrets)?;
    persist_atomically(path, |file| file.write_all(&contents))?;
    Ok(())
}

/// Write through a temporary file in the target directory, then rename it over `path`.
///
/// The temporary file is created 0600 on Unix, so the key is never readable by other
/// users, and the previous file stays intact until the rename succeeds.
fn persist_atomically<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
