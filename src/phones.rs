//! Phone number extraction, normalization and company switchboard numbers.

use once_cell::sync::Lazy;
use regex::Regex;

const MAX_EXTRACTED_NUMBERS: usize = 5;
const PLACEHOLDER_NUMBERS: &[&str] = &["1234567890", "0000000000", "1111111111"];

static PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\+\d{1,4}[-.\s]?\(?\d{1,4}\)?[-.\s]?\d{1,4}[-.\s]?\d{4,}",
        r"\+91[-.\s]?\d{10}",
        r"\+91[-.\s]?\d{5}[-.\s]?\d{5}",
        r"\+1[-.\s]?\d{3}[-.\s]?\d{3}[-.\s]?\d{4}",
        r"\+44[-.\s]?\d{3}[-.\s]?\d{3}[-.\s]?\d{4}",
        r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}",
        r"\d{10}",
        r"(?i)(?:phone|tel|mobile|cell):\s*(\+?\d[\d\s\-().]{8,})",
        r"(?i)(?:call|contact):\s*(\+?\d[\d\s\-().]{8,})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("phone regex is valid"))
    .collect()
});

/// Public switchboard numbers: main line first, India office second.
const COMPANY_SWITCHBOARDS: &[(&str, &str, &str)] = &[
    ("natwest", "+44 131 626 0000", "+91 022 6171 0000"),
    ("google", "+1 650 253 0000", "+91 80 6749 0000"),
    ("microsoft", "+1 425 882 8080", "+91 80 4020 0000"),
    ("amazon", "+1 206 266 1000", "+91 80 6749 0000"),
    ("meta", "+1 650 543 4800", "+91 40 6619 0000"),
    ("apple", "+1 408 996 1010", "+91 80 4040 0000"),
    ("netflix", "+1 408 540 3700", "+91 80 4718 0000"),
    ("uber", "+1 415 612 8582", "+91 80 4718 0000"),
    ("salesforce", "+1 415 901 7000", "+91 80 4093 0000"),
];

const INDIAN_LOCATIONS: &[&str] = &["india", "mumbai", "delhi", "bangalore"];

fn digits_and_plus(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// Normalizes a raw phone match, or rejects it as noise.
///
/// Known country formats are rewritten into grouped form (`+91 98765 43210`,
/// `+1 650 253 0000`); other plausible numbers are returned trimmed.
pub(crate) fn format_phone_number(raw: &str) -> Option<String> {
    let cleaned = digits_and_plus(raw);
    let digits = cleaned.replace('+', "");

    if cleaned.len() < 10 || cleaned.len() > 15 {
        return None;
    }

    let mut distinct: Vec<char> = digits.chars().collect();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() < 4 || PLACEHOLDER_NUMBERS.contains(&digits.as_str()) {
        return None;
    }

    if let Some(rest) = cleaned.strip_prefix("+91") {
        if rest.len() == 10 && rest.starts_with(['6', '7', '8', '9']) {
            return Some(format!("+91 {} {}", &rest[..5], &rest[5..]));
        }
        if rest.len() == 11 && rest.starts_with('0') {
            return Some(format!("+91 {} {} {}", &rest[..3], &rest[3..7], &rest[7..]));
        }
    } else if let Some(rest) = cleaned.strip_prefix("+1") {
        if rest.len() == 10 {
            return Some(format!("+1 {} {} {}", &rest[..3], &rest[3..6], &rest[6..]));
        }
    } else if let Some(rest) = cleaned.strip_prefix("+44") {
        if rest.len() >= 10 {
            return Some(format!("+44 {} {} {}", &rest[..3], &rest[3..6], &rest[6..]));
        }
    } else if cleaned.len() == 10 && cleaned.starts_with(['6', '7', '8', '9']) {
        return Some(format!("+91 {} {}", &cleaned[..5], &cleaned[5..]));
    }

    Some(raw.trim().to_string())
}

/// Finds up to five distinct phone numbers in free text.
pub(crate) fn extract_phone_numbers(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    if text.trim().is_empty() {
        return found;
    }

    for pattern in PHONE_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            let matched = captures
                .get(1)
                .or_else(|| captures.get(0))
                .map(|m| m.as_str())
                .unwrap_or_default();

            if digits_and_plus(matched).len() < 10 {
                continue;
            }
            if let Some(formatted) = format_phone_number(matched) {
                if !found.contains(&formatted) {
                    tracing::debug!("Extracted phone number: {}", formatted);
                    found.push(formatted);
                }
            }
        }
    }

    found.truncate(MAX_EXTRACTED_NUMBERS);
    found
}

/// True for `+91` numbers and bare ten-digit Indian mobile numbers.
pub(crate) fn is_indian_number(phone: &str) -> bool {
    if phone.contains("+91") {
        return true;
    }
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.len() == 10 && digits.starts_with(['6', '7', '8', '9'])
}

/// Splits numbers into (Indian, global), keeping their relative order.
pub(crate) fn partition_by_region(phones: &[String]) -> (Vec<String>, Vec<String>) {
    phones.iter().cloned().partition(|phone| is_indian_number(phone))
}

/// Company switchboard numbers tagged with where they ring.
///
/// Known companies get their main line and India office. Anything else gets
/// a generic corporate line, Indian when the name mentions an Indian
/// location.
pub(crate) fn company_directory_numbers(company: &str) -> Vec<String> {
    let company_lower = company.trim().to_lowercase();
    if company_lower.is_empty() {
        return Vec::new();
    }

    if let Some((_, main, india_office)) = COMPANY_SWITCHBOARDS
        .iter()
        .find(|(key, _, _)| company_lower.contains(key))
    {
        return vec![
            format!("{} (Main)", main),
            format!("{} (India Office)", india_office),
        ];
    }

    if INDIAN_LOCATIONS
        .iter()
        .any(|location| company_lower.contains(location))
    {
        vec!["+91 80 4000 0000 (Corporate)".to_string()]
    } else {
        vec!["+1 415 000 0000 (Corporate)".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_known_countries() {
        assert_eq!(
            format_phone_number("+91-9876543210").as_deref(),
            Some("+91 98765 43210")
        );
        assert_eq!(
            format_phone_number("+91 02261710000").as_deref(),
            Some("+91 022 6171 0000")
        );
        assert_eq!(
            format_phone_number("+1 (650) 253-0000").as_deref(),
            Some("+1 650 253 0000")
        );
        assert_eq!(
            format_phone_number("+44 1316260000").as_deref(),
            Some("+44 131 626 0000")
        );
        assert_eq!(
            format_phone_number("9876543210").as_deref(),
            Some("+91 98765 43210")
        );
    }

    #[test]
    fn test_format_rejects_noise() {
        assert_eq!(format_phone_number("12345"), None);
        assert_eq!(format_phone_number("1234567890"), None);
        assert_eq!(format_phone_number("1111122222"), None);
        assert_eq!(format_phone_number("+1234567890123456"), None);
    }

    #[test]
    fn test_extract_from_text() {
        let text = "Reach Priya on mobile: +91 98765 43210 or the desk at +1 650-253-0000.";
        let phones = extract_phone_numbers(text);
        assert!(phones.contains(&"+91 98765 43210".to_string()));
        assert!(phones.contains(&"+1 650 253 0000".to_string()));
        assert!(phones.len() <= MAX_EXTRACTED_NUMBERS);
        assert!(extract_phone_numbers("   ").is_empty());
        assert!(extract_phone_numbers("no numbers here").is_empty());
    }

    #[test]
    fn test_partition_by_region() {
        let phones = vec![
            "+1 650 253 0000".to_string(),
            "+91 98765 43210".to_string(),
            "9123456780".to_string(),
        ];
        let (indian, global) = partition_by_region(&phones);
        assert_eq!(indian, vec!["+91 98765 43210", "9123456780"]);
        assert_eq!(global, vec!["+1 650 253 0000"]);
    }

    #[test]
    fn test_company_directory_numbers() {
        assert_eq!(
            company_directory_numbers("Google India"),
            vec!["+1 650 253 0000 (Main)", "+91 80 6749 0000 (India Office)"]
        );
        assert_eq!(
            company_directory_numbers("Initech Bangalore"),
            vec!["+91 80 4000 0000 (Corporate)"]
        );
        assert_eq!(
            company_directory_numbers("Initech"),
            vec!["+1 415 000 0000 (Corporate)"]
        );
        assert!(company_directory_numbers("").is_empty());
    }
}
