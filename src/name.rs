//! Extracts a person's name from a search-result profile title and cleans
//! name parts for email generation.

use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder last name used when a title carries a single name token.
pub(crate) const UNKNOWN_LAST_NAME: &str = "Unknown";

static PRONOUN_PARENTHETICAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\s*\w+\s*/\s*\w+\s*\)").expect("pronoun regex is valid")
});

static VALID_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z\s'.\-]+$").expect("name regex is valid"));

static INVALID_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z\s'.\-]").expect("name cleanup regex is valid"));

/// First and last name recovered from a profile title.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct ParsedName {
    pub first_name: String,
    pub last_name: String,
}

impl ParsedName {
    /// True when the title yielded no name tokens at all.
    pub(crate) fn is_empty(&self) -> bool {
        self.first_name.is_empty() && self.last_name.is_empty()
    }

    /// Converts the empty result into the unparseable-name error.
    pub(crate) fn require(self, title: &str) -> Result<Self> {
        if self.is_empty() {
            tracing::warn!("Could not parse a name from title '{}'", title);
            return Err(AppError::UnparseableName(title.to_string()));
        }
        Ok(self)
    }
}

/// Cuts `text` at the first occurrence of `separator`.
fn cut_at<'a>(text: &'a str, separator: &str) -> &'a str {
    text.split_once(separator).map_or(text, |(head, _)| head)
}

/// Parses a title such as `"Sarah Johnson - Technical Recruiter at Google"`.
///
/// The role suffix (after `" - "`, `"|"` or `","`) and pronoun annotations
/// like `(She/Her)` are removed. The first remaining token is the first name
/// and the *second* token is the last name, so middle names and trailing
/// credentials never end up as the surname. A single token yields
/// [`UNKNOWN_LAST_NAME`]; no tokens yield an empty [`ParsedName`].
pub(crate) fn parse_profile_title(title: &str) -> ParsedName {
    let head = cut_at(title, " - ");
    let head = cut_at(head, "|");
    let head = cut_at(head, ",");
    let head = PRONOUN_PARENTHETICAL.replace_all(head, " ");

    let tokens: Vec<&str> = head.split_whitespace().collect();
    let parsed = match tokens.as_slice() {
        [] => ParsedName::default(),
        [only] => ParsedName {
            first_name: only.to_string(),
            last_name: UNKNOWN_LAST_NAME.to_string(),
        },
        [first, second, ..] => ParsedName {
            first_name: first.to_string(),
            last_name: second.to_string(),
        },
    };

    tracing::debug!(
        "Parsed title '{}' as first='{}', last='{}'",
        title,
        parsed.first_name,
        parsed.last_name
    );
    parsed
}

/// Keeps letters, whitespace, apostrophes, periods and hyphens, then
/// collapses runs of whitespace.
pub(crate) fn clean_name(name: &str) -> String {
    let cleaned = INVALID_NAME_CHARS.replace_all(name.trim(), "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Accepts names like `Mary-Jane`, `O'Connor` or `Jade P.`.
pub(crate) fn is_valid_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && VALID_NAME.is_match(trimmed)
}

/// Strips everything but alphabetic characters.
pub(crate) fn letters_only(name: &str) -> String {
    name.chars().filter(|c| c.is_alphabetic()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(first: &str, last: &str) -> ParsedName {
        ParsedName {
            first_name: first.to_string(),
            last_name: last.to_string(),
        }
    }

    #[test]
    fn test_parse_title_separators() {
        assert_eq!(parse_profile_title("Ada Lovelace - Recruiter"), name("Ada", "Lovelace"));
        assert_eq!(parse_profile_title("Ada Lovelace | LinkedIn"), name("Ada", "Lovelace"));
        assert_eq!(parse_profile_title("Ada Lovelace, Talent Partner"), name("Ada", "Lovelace"));
        assert_eq!(
            parse_profile_title("Sarah Johnson - Technical Recruiter at Google"),
            name("Sarah", "Johnson")
        );
    }

    #[test]
    fn test_parse_title_uses_second_token_not_last() {
        assert_eq!(
            parse_profile_title("Mary Anne Smith - Recruiter"),
            name("Mary", "Anne")
        );
    }

    #[test]
    fn test_parse_title_pronouns() {
        assert_eq!(
            parse_profile_title("Priya (She/Her) - Talent Acquisition"),
            name("Priya", UNKNOWN_LAST_NAME)
        );
        assert_eq!(
            parse_profile_title("Priya Rao (she/her) | Recruiter"),
            name("Priya", "Rao")
        );
    }

    #[test]
    fn test_parse_title_hyphenated_name_survives() {
        assert_eq!(
            parse_profile_title("Mary-Jane Watson - HR"),
            name("Mary-Jane", "Watson")
        );
    }

    #[test]
    fn test_parse_title_empty() {
        let parsed = parse_profile_title("");
        assert!(parsed.is_empty());
        assert!(matches!(
            parsed.require(""),
            Err(AppError::UnparseableName(_))
        ));
        assert!(parse_profile_title(" - Recruiter at Acme").is_empty());
    }

    #[test]
    fn test_clean_and_validate_names() {
        assert_eq!(clean_name("  O'Connor  Jr. "), "O'Connor Jr.");
        assert_eq!(clean_name("Ana🙂 María"), "Ana Mara");
        assert!(is_valid_name("Mary-Jane"));
        assert!(is_valid_name("Jade P."));
        assert!(!is_valid_name("R2D2"));
        assert!(!is_valid_name("   "));
        assert_eq!(letters_only("O'Connor-Smith"), "OConnorSmith");
    }
}
