//! Target holding descriptor
//!
//! A holding record carries its shelving location in MARC field 852:
//! `$b` library, `$c` location and `$h` call number. The descriptor built
//! from these three subfields is what candidate items are matched against.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// MARC tag of the location field
pub const LOCATION_TAG: &str = "852";

static DATAFIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<(?:marc:)?datafield\b(?P<attrs>[^>]*?)(?:/>|>(?P<body>.*?)</(?:marc:)?datafield>)"#,
    )
    .expect("datafield pattern is valid")
});

static TAG_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\btag\s*=\s*["'](?P<tag>[^"']*)["']"#).expect("tag pattern is valid"));

/// A subfield is either `<subfield ...>value</subfield>` or self-closing
static SUBFIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<(?:marc:)?subfield\b(?P<attrs>[^>]*?)(?:/>|>(?P<value>.*?)</(?:marc:)?subfield>)"#,
    )
    .expect("subfield pattern is valid")
});

static CODE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bcode\s*=\s*["'](?P<code>[^"']*)["']"#).expect("code pattern is valid")
});

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:#(?P<dec>[0-9]+)|#[xX](?P<hex>[0-9A-Fa-f]+)|(?P<name>lt|gt|quot|apos|amp));")
        .expect("entity pattern is valid")
});

/// Errors raised while reading the 852 field of a holding record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// The record has no 852 field
    #[error("holding record has no 852 field")]
    MissingLocationField,

    /// The 852 field lacks a required subfield
    #[error("852 field has no ${0} subfield")]
    MissingField(char),
}

/// Library, location and call number prefix of the target holding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HoldingDescriptor {
    pub library: String,
    pub location: String,
    pub call_number_prefix: String,
}

impl HoldingDescriptor {
    pub fn new(
        library: impl Into<String>,
        location: impl Into<String>,
        call_number_prefix: impl Into<String>,
    ) -> Self {
        Self {
            library: library.into(),
            location: location.into(),
            call_number_prefix: call_number_prefix.into(),
        }
    }

    /// Build the descriptor from a MARCXML holding record.
    ///
    /// The first 852 field wins. Subfield values are entity-decoded and
    /// trimmed; an empty `$b`, `$c` or `$h` counts as missing.
    pub fn from_marcxml(xml: &str) -> Result<Self, DescriptorError> {
        let body = DATAFIELD
            .captures_iter(xml)
            .find(|caps| {
                TAG_ATTR
                    .captures(&caps["attrs"])
                    .is_some_and(|tag| &tag["tag"] == LOCATION_TAG)
            })
            .map(|caps| caps.name("body").map_or("", |m| m.as_str()).to_string())
            .ok_or(DescriptorError::MissingLocationField)?;

        let subfield = |code: char| -> Result<String, DescriptorError> {
            SUBFIELD
                .captures_iter(&body)
                .find(|caps| {
                    CODE_ATTR
                        .captures(&caps["attrs"])
                        .is_some_and(|attr| attr["code"].chars().eq(std::iter::once(code)))
                })
                .map(|caps| decode_entities(caps.name("value").map_or("", |m| m.as_str())))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(DescriptorError::MissingField(code))
        };

        Ok(Self {
            library: subfield('b')?,
            location: subfield('c')?,
            call_number_prefix: subfield('h')?,
        })
    }
}

impl std::fmt::Display for HoldingDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {} / {}",
            self.library, self.location, self.call_number_prefix
        )
    }
}

/// Decode the five predefined entities and numeric character references.
///
/// A reference to an invalid code point is kept verbatim.
fn decode_entities(raw: &str) -> String {
    ENTITY
        .replace_all(raw, |caps: &regex::Captures| {
            let code_point = if let Some(dec) = caps.name("dec") {
                dec.as_str().parse::<u32>().ok()
            } else if let Some(hex) = caps.name("hex") {
                u32::from_str_radix(hex.as_str(), 16).ok()
            } else {
                let named = match &caps["name"] {
                    "lt" => '<',
                    "gt" => '>',
                    "quot" => '"',
                    "apos" => '\'',
                    _ => '&',
                };
                Some(named as u32)
            };

            code_point
                .and_then(char::from_u32)
                .map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
