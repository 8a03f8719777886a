//! Identifier checks for bib records and holdings
//!
//! Catalog ids are long digit strings with an institution specific shape:
//! bib (MMS) ids start with `99` and end with the institution code, holding
//! ids start with `22`. Checking the shape up front keeps typos from turning
//! into confusing remote errors.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Shape rules for catalog identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdRules {
    pub bib_prefix: String,
    /// Institution code every bib id ends with
    pub institution_suffix: String,
    pub holding_prefix: String,
}

impl Default for IdRules {
    fn default() -> Self {
        Self {
            bib_prefix: "99".to_string(),
            institution_suffix: "3339".to_string(),
            holding_prefix: "22".to_string(),
        }
    }
}

/// Check a bib (MMS) id
pub fn validate_bib_id(id: &str, rules: &IdRules) -> Result<(), ValidationError> {
    const KIND: &str = "bib id";

    check_digits(KIND, id)?;
    if !id.starts_with(&rules.bib_prefix) {
        return Err(ValidationError::invalid_identifier(
            KIND,
            id,
            format!("must start with '{}'", rules.bib_prefix),
        ));
    }
    if !id.ends_with(&rules.institution_suffix) {
        return Err(ValidationError::invalid_identifier(
            KIND,
            id,
            format!("must end with '{}'", rules.institution_suffix),
        ));
    }
    Ok(())
}

/// Check a holding id
pub fn validate_holding_id(id: &str, rules: &IdRules) -> Result<(), ValidationError> {
    const KIND: &str = "holding id";

    check_digits(KIND, id)?;
    if !id.starts_with(&rules.holding_prefix) {
        return Err(ValidationError::invalid_identifier(
            KIND,
            id,
            format!("must start with '{}'", rules.holding_prefix),
        ));
    }
    Ok(())
}

fn check_digits(kind: &'static str, id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::invalid_identifier(kind, id, "must not be empty"));
    }
    if !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::invalid_identifier(
            kind,
            id,
            "must contain digits only",
        ));
    }
    Ok(())
}
