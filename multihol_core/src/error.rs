//! Error types for the multihol core library
//!
//! Errors are grouped by how the batch reacts to them:
//! - Descriptor errors: the target holding cannot be described, the run aborts
//! - Fetch errors: the candidate set cannot be determined, the run aborts
//! - Backup errors: the candidate list could not be persisted, the run aborts
//! - Catalog errors: raw remote failures, classified per item by the mover
//! - Validation errors: bad identifiers or configuration values

use std::path::PathBuf;
use thiserror::Error;

pub mod validation;

pub use self::validation::ValidationError;
pub use crate::catalog::error::{ApiFailureKind, CatalogError};
pub use crate::descriptor::DescriptorError;
pub use crate::security::CredentialStoreError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the multihol core library
#[derive(Error, Debug)]
pub enum Error {
    /// Target holding record could not be turned into a descriptor
    #[error("Cannot describe target holding {holding_id}: {source}")]
    Descriptor {
        holding_id: String,
        #[source]
        source: DescriptorError,
    },

    /// Paginated item fetch failed
    #[error("Failed to fetch items of {bib_id} at offset {offset}: {source}")]
    Fetch {
        bib_id: String,
        offset: usize,
        #[source]
        source: CatalogError,
    },

    /// Candidate backup could not be written
    #[error("Failed to write backup {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Remote catalog failure outside of an item move
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Input validation failure
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Secret store failure
    #[error(transparent)]
    Credential(#[from] CredentialStoreError),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a descriptor error for the given holding
    pub fn descriptor(holding_id: impl Into<String>, source: DescriptorError) -> Self {
        Self::Descriptor {
            holding_id: holding_id.into(),
            source,
        }
    }

    /// Create a fetch error for a page of the given bib record
    pub fn fetch(bib_id: impl Into<String>, offset: usize, source: CatalogError) -> Self {
        Self::Fetch {
            bib_id: bib_id.into(),
            offset,
            source,
        }
    }

    /// Create a backup error for the given path
    pub fn backup(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Backup {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Descriptor { .. } | Self::Fetch { .. } | Self::Backup { .. }
        )
    }
}
