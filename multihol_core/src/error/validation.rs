//! Validation related error types

use thiserror::Error;

/// Validation and configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Identifier does not follow the catalog's numbering rules
    #[error("Invalid {kind} '{id}': {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        id: String,
        reason: String,
    },
}

impl ValidationError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(message: &str) -> Self {
        Self::InvalidConfiguration {
            message: message.to_string(),
        }
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(kind: &'static str, id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            kind,
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
