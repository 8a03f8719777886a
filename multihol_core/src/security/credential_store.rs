//! Secret storage trait and common types

use crate::security::SecureString;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Errors raised by a credential store
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("No API key stored for {0}")]
    NotFound(String),

    #[error("Stored API key data is corrupted: {0}")]
    CorruptedData(String),

    #[error("Credential store unavailable: {0}")]
    PlatformError(String),

    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// An API key filed under a service name and an account
#[derive(Clone)]
pub struct Credential {
    /// Service name, e.g. "alma-api"
    pub service: String,
    /// Account the key belongs to, e.g. "bib-sandbox"
    pub account: String,
    pub secret: SecureString,
    /// When the key was stored; unset until the store writes it
    pub stored_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(
        service: impl Into<String>,
        account: impl Into<String>,
        secret: impl Into<SecureString>,
    ) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
            secret: secret.into(),
            stored_at: None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("service", &self.service)
            .field("account", &self.account)
            .field("secret", &"***")
            .field("stored_at", &self.stored_at)
            .finish()
    }
}

/// Persistent storage for API keys
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Store a key, replacing any key filed under the same service and account
    async fn store(&self, credential: &Credential) -> Result<(), CredentialStoreError>;

    async fn retrieve(
        &self,
        service: &str,
        account: &str,
    ) -> Result<Credential, CredentialStoreError>;

    async fn delete(&self, service: &str, account: &str) -> Result<(), CredentialStoreError>;

    async fn list_accounts(&self, service: &str) -> Result<Vec<String>, CredentialStoreError>;

    async fn exists(&self, service: &str, account: &str) -> Result<bool, CredentialStoreError> {
        match self.retrieve(service, account).await {
            Ok(_) => Ok(true),
            Err(CredentialStoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Human readable name of the backend
    fn name(&self) -> &str;
}
