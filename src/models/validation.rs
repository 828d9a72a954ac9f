//! Field-level validation shared by every input type.
//!
//! Length limits count characters, not bytes.

use once_cell::sync::Lazy;
use regex::Regex;

static SLUG_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").ok());

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type FieldResult = Result<(), FieldError>;

/// Reject an empty (or whitespace-only) required value.
pub fn required(field: &'static str, value: &str) -> FieldResult {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, "This field is required"));
    }
    Ok(())
}

pub fn max_len(field: &'static str, value: &str, max: usize) -> FieldResult {
    let len = value.chars().count();
    if len > max {
        return Err(FieldError::new(
            field,
            format!("Ensure this value has at most {} characters (it has {})", max, len),
        ));
    }
    Ok(())
}

pub fn max_len_opt(field: &'static str, value: Option<&str>, max: usize) -> FieldResult {
    match value {
        Some(v) => max_len(field, v, max),
        None => Ok(()),
    }
}

/// Accept absolute http(s) URLs of at most 200 characters.
pub fn url(field: &'static str, value: &str) -> FieldResult {
    max_len(field, value, 200)?;
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {
            Ok(())
        }
        _ => Err(FieldError::new(field, "Enter a valid URL")),
    }
}

pub fn url_opt(field: &'static str, value: Option<&str>) -> FieldResult {
    match value {
        Some(v) => url(field, v),
        None => Ok(()),
    }
}

/// Letters, digits, hyphens and underscores only.
pub fn slug(field: &'static str, value: &str) -> FieldResult {
    max_len(field, value, 255)?;
    let valid = SLUG_RE.as_ref().is_some_and(|re| re.is_match(value));
    if !valid {
        return Err(FieldError::new(
            field,
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens",
        ));
    }
    Ok(())
}

/// Collapse a blank optional string to `None`.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_required() {
        assert!(required("name", "India").is_ok());
        assert!(required("name", "").is_err());
        assert!(required("name", "   ").is_err());
    }

    #[test]
    fn test_max_len_counts_characters() {
        assert!(max_len("short_name", "IND", 5).is_ok());
        assert!(max_len("short_name", "ABCDE", 5).is_ok());
        assert!(max_len("short_name", "ABCDEF", 5).is_err());
        // multi-byte characters count once
        assert!(max_len("short_name", "ÄÖÜßé", 5).is_ok());
    }

    #[test]
    fn test_max_len_error_names_field() {
        let err = max_len("timezone", &"x".repeat(101), 100).unwrap_err();
        assert_eq!(err.field, "timezone");
        assert!(err.to_string().starts_with("timezone: "));
    }

    #[test]
    fn test_url() {
        assert!(url("url", "http://bainslabs.in").is_ok());
        assert!(url("url", "https://example.com/path?q=1").is_ok());
        assert!(url("url", "ftp://example.com").is_err());
        assert!(url("url", "not a url").is_err());
        assert!(url("url", "").is_err());
        let long = format!("https://example.com/{}", "a".repeat(200));
        assert!(url("url", &long).is_err());
    }

    #[test]
    fn test_slug() {
        assert!(slug("slug", "first-drive_2024").is_ok());
        assert!(slug("slug", "has space").is_err());
        assert!(slug("slug", "").is_err());
        assert!(slug("slug", "ünicode").is_err());
    }

    #[test]
    fn test_blank_to_none() {
        assert_eq!(blank_to_none(None), None);
        assert_eq!(blank_to_none(Some("".into())), None);
        assert_eq!(blank_to_none(Some("  ".into())), None);
        assert_eq!(blank_to_none(Some("x".into())), Some("x".into()));
    }

    proptest! {
        #[test]
        fn slug_pattern_accepts_allowed_alphabet(s in "[-a-zA-Z0-9_]{1,255}") {
            prop_assert!(slug("slug", &s).is_ok());
        }

        #[test]
        fn slug_pattern_rejects_other_characters(
            prefix in "[a-z]{0,10}",
            bad in "[ ./:#?!]",
            suffix in "[a-z]{0,10}",
        ) {
            let s = format!("{}{}{}", prefix, bad, suffix);
            prop_assert!(slug("slug", &s).is_err());
        }

        #[test]
        fn max_len_matches_char_count(s in "\\PC{0,40}", max in 0usize..40) {
            let ok = max_len("f", &s, max).is_ok();
            prop_assert_eq!(ok, s.chars().count() <= max);
        }
    }
}
