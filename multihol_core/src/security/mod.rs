//! API key storage
//!
//! Keys live in an encrypted file store. An environment variable can supply
//! the key directly, which is how CI and one-off runs avoid the store.

pub mod credential_store;
pub mod fallback;
pub mod secure_string;

pub use credential_store::{Credential, CredentialStore, CredentialStoreError};
pub use secure_string::SecureString;

pub type DefaultCredentialStore = fallback::EncryptedFileStore;

/// Service name API keys are filed under
pub const SERVICE: &str = "alma-api";

/// Account used when none is configured
pub const DEFAULT_ACCOUNT: &str = "bib-sandbox";

/// Environment variable that overrides the stored key
pub const API_KEY_ENV: &str = "MULTIHOL_API_KEY";

/// Open the credential store for this platform
pub async fn create_credential_store() -> Result<Box<dyn CredentialStore>, CredentialStoreError> {
    fallback::EncryptedFileStore::new()
        .await
        .map(|store| Box::new(store) as Box<dyn CredentialStore>)
}

/// Resolve the API key for `account`.
///
/// A non-blank `MULTIHOL_API_KEY` wins over the store. The key is trimmed
/// either way; a blank stored key counts as missing.
pub async fn resolve_api_key(
    store: &dyn CredentialStore,
    account: &str,
) -> Result<SecureString, CredentialStoreError> {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        let key = SecureString::new(key);
        if !key.is_empty() {
            log::debug!("Using API key from {API_KEY_ENV}");
            return Ok(key.trimmed());
        }
    }

    let credential = store.retrieve(SERVICE, account).await?;
    if credential.secret.is_empty() {
        return Err(CredentialStoreError::NotFound(format!("{SERVICE}/{account}")));
    }
    Ok(credential.secret.trimmed())
}
