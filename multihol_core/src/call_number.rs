//! Call number normalization
//!
//! Shelf marks of serial volumes are written inconsistently: the same
//! volume appears as `II 140137, 219` and as `II 140137/219`. The
//! normalizer rewrites the first form into the second for the narrow
//! roman-volume grammar and leaves every other string untouched.

use once_cell::sync::Lazy;
use regex::Regex;

/// Separator between entries of a compound alternative call number
pub const HISTORY_SEPARATOR: &str = " ; ";

/// `ROMAN SP+ DIGITS "," SP* DIGITS`, anchored at the start
static VOLUME_SEQUENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<base>[IVXLCDM]+\s+\d+),\s*(?P<issue>\d+)")
        .expect("volume sequence pattern is valid")
});

/// `ROMAN SP+ DIGITS ","` with nothing after the comma
static OPEN_VOLUME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<base>[IVXLCDM]+\s+\d+),$").expect("open volume pattern is valid")
});

/// Rewrite `II 140137, 219` as `II 140137/219`.
///
/// Only the comma directly following the base number is touched; anything
/// after the issue number is kept as is. Idempotent.
pub fn normalize(raw: &str) -> String {
    VOLUME_SEQUENCE
        .replace(raw, "${base}/${issue}")
        .into_owned()
}

/// Trim and collapse whitespace runs to a single space
pub fn compact_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Form used for all call number comparisons
pub fn comparable(raw: &str) -> String {
    compact_whitespace(&normalize(&compact_whitespace(raw)))
}

/// Last entry of a compound alternative call number
pub fn history_tail(alternative: &str) -> &str {
    alternative
        .rsplit(HISTORY_SEPARATOR)
        .next()
        .unwrap_or(alternative)
}

/// Whether `candidate` is shelved under `prefix`.
///
/// Both sides are compared in [`comparable`] form. A prefix ending in an
/// alphanumeric character must be followed by a non-alphanumeric one (or the
/// end of the candidate), so `II 14` is not a prefix of `II 140137`. A
/// prefix ending in the volume comma (`II 140137,`) also matches the
/// slash form its issues are normalized to.
pub fn has_prefix(candidate: &str, prefix: &str) -> bool {
    let candidate = comparable(candidate);
    let prefix = comparable(prefix);

    if prefix.is_empty() {
        return true;
    }

    let open_volume = OPEN_VOLUME.replace(&prefix, "${base}/");
    let Some(rest) = candidate
        .strip_prefix(prefix.as_str())
        .or_else(|| candidate.strip_prefix(&*open_volume))
    else {
        return false;
    };

    let prefix_ends_in_token = prefix.chars().last().is_some_and(char::is_alphanumeric);
    if !prefix_ends_in_token {
        return true;
    }

    rest.chars().next().is_none_or(|c| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_rewrites_volume_comma() {
        assert_eq!(normalize("II 140137, 219"), "II 140137/219");
        assert_eq!(normalize("II 140137,219"), "II 140137/219");
        assert_eq!(
            normalize("II 140137, 219,Ind. 1879"),
            "II 140137/219,Ind. 1879"
        );
    }

    #[test]
    fn test_normalize_passes_through_other_shapes() {
        for raw in [
            "HB20-918",
            "I 380584/1971,2",
            "I 380010/48",
            "140137, 219",
            "II, 219",
            "ii 140137, 219",
            " II 140137, 219",
            "",
        ] {
            assert_eq!(normalize(raw), raw, "{raw:?} must pass through");
        }
    }

    #[test]
    fn test_compact_whitespace() {
        assert_eq!(compact_whitespace("  II   140137 \t219 "), "II 140137 219");
        assert_eq!(compact_whitespace(""), "");
    }

    #[test]
    fn test_history_tail() {
        assert_eq!(history_tail("HB20-918 ; I 380584/1971,2"), "I 380584/1971,2");
        assert_eq!(history_tail("A ; B ; C"), "C");
        assert_eq!(history_tail("HB20-918"), "HB20-918");
        assert_eq!(history_tail(""), "");
    }

    #[test]
    fn test_has_prefix_after_normalization() {
        assert!(has_prefix("II 140137, 219,Ind. 1879", "II 140137"));
        assert!(has_prefix("II 140137, 219,Ind. 1879", "II 140137, 219"));
        assert!(has_prefix("II 140137/219", "II  140137,219"));
    }

    #[test]
    fn test_has_prefix_respects_token_boundary() {
        assert!(!has_prefix("II 140137", "II 14"));
        assert!(!has_prefix("II 140137/2190", "II 140137, 219"));
        assert!(!has_prefix("HB20-9180", "HB20-918"));
        assert!(has_prefix("HB20-918", "HB20-"));
        assert!(has_prefix("HB20-918", "HB20-918"));
    }

    #[test]
    fn test_has_prefix_with_trailing_volume_comma() {
        assert!(has_prefix("II 140137, 219", "II 140137,"));
        assert!(has_prefix("II 140137, 219,Ind. 1879", "II 140137, "));
        assert!(has_prefix("II 140137,", "II 140137,"));
        assert!(!has_prefix("II 1401370, 219", "II 140137,"));
        assert!(!has_prefix("III 140137, 219", "II 140137,"));
    }

    #[test]
    fn test_has_prefix_empty_prefix_matches_everything() {
        assert!(has_prefix("anything", ""));
        assert!(has_prefix("", "  "));
        assert!(!has_prefix("", "II"));
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(raw in ".*") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_normalize_is_idempotent_on_volume_shapes(
            roman in "[IVXLCDM]{1,4}",
            base in "[0-9]{1,7}",
            issue in "[0-9]{1,4}",
            spaces in " {0,2}",
            tail in "[,. A-Za-z0-9]{0,12}",
        ) {
            let raw = format!("{roman} {base},{spaces}{issue}{tail}");
            let once = normalize(&raw);
            prop_assert_eq!(&once, &format!("{roman} {base}/{issue}{tail}"));
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_call_number_has_itself_as_prefix(raw in "[A-Z0-9 ,/.-]{0,24}") {
            prop_assert!(has_prefix(&raw, &raw));
        }
    }
}
