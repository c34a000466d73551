//! Heuristic confidence scores for guessed contact details.
//!
//! Scores are display hints, not probabilities. Phone numbers get a rule
//! based base value with a little jitter; emails the service confirmed get a
//! flat random score in `80..=99`.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

const MIN_PHONE_CONFIDENCE: i16 = 60;
const MAX_PHONE_CONFIDENCE: i16 = 90;
const PHONE_JITTER: i16 = 3;

static INDIAN_MOBILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[6-9]\d{4} \d{5}").expect("mobile regex is valid"));

/// Classification assigned to a phone number by [`score_phone`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PhoneKind {
    #[serde(rename = "Mobile (India)")]
    IndianMobile,
    #[serde(rename = "Office Line")]
    OfficeLine,
    #[serde(rename = "Landline (India)")]
    IndianLandline,
    #[serde(rename = "Corporate (US)")]
    UsCorporate,
    #[serde(rename = "Business (US)")]
    UsBusiness,
    #[serde(rename = "Corporate (UK)")]
    UkCorporate,
    #[serde(rename = "Local Number")]
    Local,
}

impl PhoneKind {
    pub(crate) fn label(self) -> &'static str {
        match self {
            PhoneKind::IndianMobile => "Mobile (India)",
            PhoneKind::OfficeLine => "Office Line",
            PhoneKind::IndianLandline => "Landline (India)",
            PhoneKind::UsCorporate => "Corporate (US)",
            PhoneKind::UsBusiness => "Business (US)",
            PhoneKind::UkCorporate => "Corporate (UK)",
            PhoneKind::Local => "Local Number",
        }
    }

    fn base_confidence(self) -> i16 {
        match self {
            PhoneKind::IndianMobile => 75,
            PhoneKind::OfficeLine => 85,
            PhoneKind::IndianLandline => 70,
            PhoneKind::UsCorporate => 80,
            PhoneKind::UsBusiness => 80,
            PhoneKind::UkCorporate => 85,
            PhoneKind::Local => 65,
        }
    }
}

impl fmt::Display for PhoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind and confidence for one phone number.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PhoneScore {
    pub kind: PhoneKind,
    pub confidence: u8,
}

fn has_any(phone: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| phone.contains(marker))
}

/// Classifies a raw phone string. The first matching rule wins.
pub(crate) fn classify_phone(phone: &str) -> PhoneKind {
    if phone.contains("+91") {
        if INDIAN_MOBILE.is_match(phone) {
            PhoneKind::IndianMobile
        } else if has_any(phone, &["(Office)", "(Main)", "(Corporate)"]) {
            PhoneKind::OfficeLine
        } else {
            PhoneKind::IndianLandline
        }
    } else if phone.contains("+1") {
        if has_any(phone, &["(Main)", "(Corporate)"]) {
            PhoneKind::UsCorporate
        } else {
            PhoneKind::UsBusiness
        }
    } else if phone.contains("+44") {
        PhoneKind::UkCorporate
    } else {
        PhoneKind::Local
    }
}

/// Scores a phone number: the kind's base value, jittered by up to three
/// points either way, clamped to `60..=90`.
pub(crate) fn score_phone<R: Rng + ?Sized>(phone: &str, rng: &mut R) -> PhoneScore {
    let kind = classify_phone(phone);
    let jitter = rng.gen_range(-PHONE_JITTER..=PHONE_JITTER);
    let confidence =
        (kind.base_confidence() + jitter).clamp(MIN_PHONE_CONFIDENCE, MAX_PHONE_CONFIDENCE) as u8;

    tracing::debug!(
        "Scored phone '{}' as {} ({}%)",
        phone,
        kind,
        confidence
    );
    PhoneScore { kind, confidence }
}

/// Confidence for an email the contact service reported as valid.
pub(crate) fn email_confidence<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(80..=99)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_classify_rules_in_order() {
        assert_eq!(classify_phone("+91 98765 43210"), PhoneKind::IndianMobile);
        assert_eq!(
            classify_phone("+91 98765 43210 (Office)"),
            PhoneKind::IndianMobile
        );
        assert_eq!(
            classify_phone("+91 80 4000 0000 (Corporate)"),
            PhoneKind::OfficeLine
        );
        assert_eq!(classify_phone("+91 022 6171 0000"), PhoneKind::IndianLandline);
        assert_eq!(
            classify_phone("+1 650 253 0000 (Main)"),
            PhoneKind::UsCorporate
        );
        assert_eq!(classify_phone("+1 206 266 1000"), PhoneKind::UsBusiness);
        assert_eq!(classify_phone("+44 131 626 0000"), PhoneKind::UkCorporate);
        assert_eq!(classify_phone("020 7946 0958"), PhoneKind::Local);
    }

    #[test]
    fn test_indian_mobile_confidence_range() {
        for seed in 0..500 {
            let mut rng = StdRng::seed_from_u64(seed);
            let score = score_phone("+91 98765 43210", &mut rng);
            assert_eq!(score.kind, PhoneKind::IndianMobile);
            assert!((72..=78).contains(&score.confidence), "got {}", score.confidence);
        }
    }

    #[test]
    fn test_phone_confidence_is_clamped() {
        for seed in 0..500 {
            let mut rng = StdRng::seed_from_u64(seed);
            for phone in ["+44 20 7946 0958", "+91 80 4000 0000 (Corporate)", "12345"] {
                let score = score_phone(phone, &mut rng);
                assert!((60..=90).contains(&score.confidence));
            }
        }
    }

    #[test]
    fn test_email_confidence_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert!((80..=99).contains(&email_confidence(&mut rng)));
        }
    }

    #[test]
    fn test_kind_serializes_as_label() {
        let json = serde_json::to_string(&PhoneKind::UkCorporate).unwrap();
        assert_eq!(json, "\"Corporate (UK)\"");
        assert_eq!(PhoneKind::IndianLandline.to_string(), "Landline (India)");
    }
}
