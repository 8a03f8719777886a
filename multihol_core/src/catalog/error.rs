//! Catalog service error types
//!
//! Remote failures are decoded once, at the HTTP boundary, into
//! [`CatalogError`]. The move orchestrator then asks an [`ErrorCodeMap`]
//! which of the known failure kinds an error code stands for.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest slice of an undecodable error body kept in the message
const MAX_RAW_BODY: usize = 200;

/// Errors returned by a catalog service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The service answered with an error status
    #[error("Catalog API error {status}: {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// No usable HTTP exchange took place
    #[error("Catalog transport error: {message}")]
    Transport { message: String },

    /// A success response carried a body that could not be decoded
    #[error("Failed to decode {what}: {message}")]
    Decode { what: String, message: String },
}

impl CatalogError {
    /// Create an API error
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Decode an error response body.
    ///
    /// The service reports errors as
    /// `{"errorList": {"error": [{"errorCode": .., "errorMessage": ..}]}}`;
    /// only the first entry is used. Bodies of any other shape keep the
    /// status and a prefix of the raw text.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => match parsed.error_list.error.into_iter().next() {
                Some(entry) => Self::api(status, entry.error_code, entry.error_message),
                None => Self::api(status, "", "error list is empty"),
            },
            Err(_) => Self::api(status, "", truncate(body.trim(), MAX_RAW_BODY)),
        }
    }

    /// Remote error code, if the service sent one
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } if !code.is_empty() => Some(code),
            _ => None,
        }
    }

    /// HTTP status, if a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::decode("response body", err.to_string())
        } else {
            Self::transport(err.to_string())
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "errorList")]
    error_list: ErrorList,
}

#[derive(Deserialize)]
struct ErrorList {
    #[serde(default)]
    error: Vec<ErrorEntry>,
}

#[derive(Deserialize)]
struct ErrorEntry {
    #[serde(rename = "errorCode", default)]
    error_code: String,
    #[serde(rename = "errorMessage", default)]
    error_message: String,
}

fn truncate(raw: &str, max_chars: usize) -> String {
    match raw.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &raw[..end]),
        None => raw.to_string(),
    }
}

/// Failure kinds the move protocol reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiFailureKind {
    /// Delete refused because of an active policy or order line block
    PolicyBlocked,
    /// Create refused because the barcode index still knows the deleted item
    BarcodeConflict,
    /// Order line referenced by the item does not exist
    OrderLineInvalid,
    /// Anything else
    Other,
}

/// Remote error codes behind each failure kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCodeMap {
    pub policy_blocked: Vec<String>,
    pub barcode_conflict: Vec<String>,
    pub order_line_invalid: Vec<String>,
}

impl Default for ErrorCodeMap {
    fn default() -> Self {
        Self {
            policy_blocked: vec!["401877".to_string()],
            barcode_conflict: vec!["401873".to_string()],
            order_line_invalid: vec!["401871".to_string()],
        }
    }
}

impl ErrorCodeMap {
    /// Classify an error; transport and decode errors are always `Other`
    pub fn classify(&self, error: &CatalogError) -> ApiFailureKind {
        let Some(code) = error.error_code() else {
            return ApiFailureKind::Other;
        };

        let listed = |codes: &[String]| codes.iter().any(|known| known == code);

        if listed(&self.policy_blocked) {
            ApiFailureKind::PolicyBlocked
        } else if listed(&self.barcode_conflict) {
            ApiFailureKind::BarcodeConflict
        } else if listed(&self.order_line_invalid) {
            ApiFailureKind::OrderLineInvalid
        } else {
            ApiFailureKind::Other
        }
    }
}
