//! Generates candidate email addresses from a name and a domain.

use crate::name::letters_only;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

pub(crate) static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("Failed to compile email regex pattern. This should not happen.")
});

/// Generates the common corporate email conventions for a person.
///
/// Names are reduced to lowercase letters before use. The order is stable,
/// most popular convention first, and duplicates (e.g. when the two names
/// share an initial pattern) are dropped.
///
/// # Returns
/// * `Vec<String>` of addresses, empty if either name has no letters or the
///   domain has no dot.
pub(crate) fn generate_email_patterns(
    first_name: &str,
    last_name: &str,
    domain: &str,
) -> Vec<String> {
    let first = letters_only(first_name).to_lowercase();
    let last = letters_only(last_name).to_lowercase();
    let domain = domain.trim().to_lowercase();

    if first.is_empty() || last.is_empty() || !domain.contains('.') {
        tracing::warn!(
            "Cannot generate patterns for '{} {} @ {}'",
            first_name,
            last_name,
            domain
        );
        return Vec::new();
    }

    let first_initial: String = first.chars().take(1).collect();
    let last_initial: String = last.chars().take(1).collect();

    let local_parts = [
        format!("{}.{}", first, last),
        format!("{}{}", first, last),
        format!("{}{}", first_initial, last),
        format!("{}_{}", first, last),
        format!("{}-{}", first, last),
        first.clone(),
        format!("{}.{}", last, first),
        format!("{}{}", last, first),
        format!("{}.{}", first_initial, last),
        format!("{}{}", first_initial, last_initial),
        format!("{}{}", first, last_initial),
    ];

    let mut seen = HashSet::new();
    let patterns: Vec<String> = local_parts
        .iter()
        .map(|local| format!("{}@{}", local, domain))
        .filter(|email| EMAIL_REGEX.is_match(email))
        .filter(|email| seen.insert(email.clone()))
        .collect();

    tracing::info!(
        "Generated {} email patterns for {} {}",
        patterns.len(),
        first_name,
        last_name
    );
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_patterns_basic() {
        let patterns = generate_email_patterns("John", "Doe", "example.com");
        assert_eq!(patterns.len(), 11);
        assert_eq!(patterns[0], "john.doe@example.com");
        assert!(patterns.contains(&"jdoe@example.com".to_string()));
        assert!(patterns.contains(&"john@example.com".to_string()));
        assert!(patterns.contains(&"doe.john@example.com".to_string()));
        assert!(patterns.contains(&"johnd@example.com".to_string()));
        assert!(patterns.contains(&"jd@example.com".to_string()));
        assert!(patterns.contains(&"john_doe@example.com".to_string()));
    }

    #[test]
    fn test_generate_patterns_strips_non_letters() {
        let patterns = generate_email_patterns("Mary-Jane", "O'Connor", "Test.co.uk");
        assert_eq!(patterns[0], "maryjane.oconnor@test.co.uk");
        assert!(patterns.contains(&"moconnor@test.co.uk".to_string()));
    }

    #[test]
    fn test_generate_patterns_empty_input() {
        assert!(generate_email_patterns("", "Doe", "example.com").is_empty());
        assert!(generate_email_patterns("John", "", "example.com").is_empty());
        assert!(generate_email_patterns("John", "Doe", "").is_empty());
        assert!(generate_email_patterns("John", "Doe", "nodot").is_empty());
        assert!(generate_email_patterns("42", "Doe", "example.com").is_empty());
    }

    #[test]
    fn test_generate_patterns_duplicates() {
        let patterns = generate_email_patterns("Test", "Test", "test.com");
        let unique: HashSet<_> = patterns.iter().collect();
        assert_eq!(unique.len(), patterns.len(), "Duplicate patterns should be removed");
        assert_eq!(
            patterns.iter().filter(|p| *p == "test.test@test.com").count(),
            1
        );
    }
}
