//! Encrypted file storage for API keys
//!
//! Keys are sealed with AES-256-GCM. The cipher key is derived with Argon2id
//! from a random master key kept next to the store, so the store file alone
//! does not reveal anything.

use crate::security::{Credential, CredentialStore, CredentialStoreError, SecureString};
use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use argon2::{Algorithm, Argon2, Params, Version, password_hash::SaltString};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Environment variable overriding the store directory
pub const STORE_DIR_ENV: &str = "MULTIHOL_CREDENTIAL_STORE_DIR";

const STORE_FILE: &str = "keys.enc";
const MASTER_KEY_FILE: &str = ".key";
const FORMAT_VERSION: u32 = 1;

/// API keys in an encrypted local file
pub struct EncryptedFileStore {
    file_path: PathBuf,
    master_key: SecureString,
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    salt: String,
    /// service -> account -> sealed key
    entries: BTreeMap<String, BTreeMap<String, SealedEntry>>,
}

#[derive(Serialize, Deserialize)]
struct SealedEntry {
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
    stored_at: DateTime<Utc>,
}

impl EncryptedFileStore {
    /// Open the store in `$MULTIHOL_CREDENTIAL_STORE_DIR`, or in the user's
    /// configuration directory
    pub async fn new() -> Result<Self, CredentialStoreError> {
        let store_dir = match std::env::var(STORE_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or_else(|| {
                    CredentialStoreError::PlatformError(
                        "Could not determine config directory".to_string(),
                    )
                })?
                .join("multihol")
                .join("credentials"),
        };

        Self::open(&store_dir).await
    }

    /// Open the store in `store_dir`, creating the directory and master key
    pub async fn open(store_dir: &Path) -> Result<Self, CredentialStoreError> {
        fs::create_dir_all(store_dir).await?;
        let master_key = Self::get_or_create_master_key(store_dir).await?;

        debug!("Credential store at {}", store_dir.display());

        Ok(Self {
            file_path: store_dir.join(STORE_FILE),
            master_key,
        })
    }

    async fn get_or_create_master_key(
        store_dir: &Path,
    ) -> Result<SecureString, CredentialStoreError> {
        let key_file = store_dir.join(MASTER_KEY_FILE);

        if fs::try_exists(&key_file).await? {
            let key_data = fs::read(&key_file).await?;
            return Ok(SecureString::from_bytes(key_data));
        }

        let key = Aes256Gcm::generate_key(&mut OsRng);
        let key_vec = key.to_vec();

        let mut file = private_file(&key_file).await?;
        file.write_all(&key_vec).await?;
        file.sync_all().await?;

        Ok(SecureString::from_bytes(key_vec))
    }

    fn derive_key(&self, salt: &SaltString) -> Result<Key<Aes256Gcm>, CredentialStoreError> {
        let params = Params::new(19_456, 2, 1, Some(32))
            .map_err(|e| CredentialStoreError::CryptoError(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key_bytes = [0u8; 32];
        argon2
            .hash_password_into(
                self.master_key.as_bytes(),
                salt.as_str().as_bytes(),
                &mut key_bytes,
            )
            .map_err(|e| CredentialStoreError::CryptoError(e.to_string()))?;

        Ok(*Key::<Aes256Gcm>::from_slice(&key_bytes))
    }

    async fn load(&self) -> Result<StoreFile, CredentialStoreError> {
        if !fs::try_exists(&self.file_path).await? {
            return Ok(StoreFile {
                version: FORMAT_VERSION,
                salt: SaltString::generate(&mut OsRng).to_string(),
                entries: BTreeMap::new(),
            });
        }

        let data = fs::read(&self.file_path).await?;
        let store: StoreFile = serde_json::from_slice(&data)
            .map_err(|e| CredentialStoreError::CorruptedData(e.to_string()))?;

        if store.version != FORMAT_VERSION {
            return Err(CredentialStoreError::CorruptedData(format!(
                "unsupported store version {}",
                store.version
            )));
        }
        Ok(store)
    }

    /// Write through a temporary file and rename it into place
    async fn save(&self, store: &StoreFile) -> Result<(), CredentialStoreError> {
        let data = serde_json::to_vec_pretty(store)
            .map_err(|e| CredentialStoreError::SerializationError(e.to_string()))?;

        let temp_path = self.file_path.with_extension("tmp");
        let mut file = private_file(&temp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.file_path).await?;
        Ok(())
    }

    fn salt(store: &StoreFile) -> Result<SaltString, CredentialStoreError> {
        SaltString::from_b64(&store.salt)
            .map_err(|e| CredentialStoreError::CorruptedData(format!("invalid salt: {e}")))
    }

    fn seal(
        &self,
        secret: &SecureString,
        salt: &SaltString,
    ) -> Result<SealedEntry, CredentialStoreError> {
        let cipher = Aes256Gcm::new(&self.derive_key(salt)?);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, secret.as_bytes())
            .map_err(|e| CredentialStoreError::CryptoError(e.to_string()))?;

        Ok(SealedEntry {
            nonce: nonce.to_vec(),
            ciphertext,
            stored_at: Utc::now(),
        })
    }

    fn open_entry(
        &self,
        entry: &SealedEntry,
        salt: &SaltString,
    ) -> Result<SecureString, CredentialStoreError> {
        if entry.nonce.len() != 12 {
            return Err(CredentialStoreError::CorruptedData(
                "nonce has the wrong length".to_string(),
            ));
        }

        let cipher = Aes256Gcm::new(&self.derive_key(salt)?);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&entry.nonce), entry.ciphertext.as_ref())
            .map_err(|e| CredentialStoreError::CryptoError(format!("Decryption failed: {e}")))?;

        Ok(SecureString::from_bytes(plaintext))
    }
}

/// Create or truncate a file readable only by the owner
async fn private_file(path: &Path) -> Result<fs::File, CredentialStoreError> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    Ok(options.open(path).await?)
}

#[async_trait]
impl CredentialStore for EncryptedFileStore {
    async fn store(&self, credential: &Credential) -> Result<(), CredentialStoreError> {
        let mut store = self.load().await?;
        let salt = Self::salt(&store)?;
        let sealed = self.seal(&credential.secret, &salt)?;

        store
            .entries
            .entry(credential.service.clone())
            .or_default()
            .insert(credential.account.clone(), sealed);

        self.save(&store).await
    }

    async fn retrieve(
        &self,
        service: &str,
        account: &str,
    ) -> Result<Credential, CredentialStoreError> {
        let store = self.load().await?;
        let salt = Self::salt(&store)?;

        let entry = store
            .entries
            .get(service)
            .and_then(|accounts| accounts.get(account))
            .ok_or_else(|| CredentialStoreError::NotFound(format!("{service}/{account}")))?;

        Ok(Credential {
            service: service.to_string(),
            account: account.to_string(),
            secret: self.open_entry(entry, &salt)?,
            stored_at: Some(entry.stored_at),
        })
    }

    async fn delete(&self, service: &str, account: &str) -> Result<(), CredentialStoreError> {
        let mut store = self.load().await?;

        let accounts = store
            .entries
            .get_mut(service)
            .ok_or_else(|| CredentialStoreError::NotFound(format!("{service}/{account}")))?;
        if accounts.remove(account).is_none() {
            return Err(CredentialStoreError::NotFound(format!(
                "{service}/{account}"
            )));
        }
        if accounts.is_empty() {
            store.entries.remove(service);
        }

        self.save(&store).await
    }

    async fn list_accounts(&self, service: &str) -> Result<Vec<String>, CredentialStoreError> {
        let store = self.load().await?;

        Ok(store
            .entries
            .get(service)
            .map(|accounts| accounts.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "Encrypted File Store"
    }
}
