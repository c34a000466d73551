//! Defines the core data structures used in the recruiter-sleuth application.

use crate::name::ParsedName;
use crate::scoring::{PhoneKind, PhoneScore};
use serde::{Deserialize, Serialize};

/// Body of `POST /contact-lookup`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContactLookupRequest {
    pub first_name: String,
    pub last_name: String,
    pub domain: String,
    #[serde(default)]
    pub company: String,
}

/// Reply of `POST /contact-lookup`.
///
/// Only `valid_emails`, `phone_numbers`, `total_patterns_tested` and
/// `message` are interpreted by the client; the rest is informational.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub(crate) struct ContactLookupResponse {
    pub valid_emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_patterns_tested: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub original_first_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub original_last_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mx_hosts_found: Option<usize>,
}

/// Body of `POST /phone-lookup`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct PhoneLookupRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company: String,
}

/// Reply of `POST /phone-lookup`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub(crate) struct PhoneLookupResponse {
    pub phone_numbers: Vec<String>,
    pub indian_phone_numbers: Vec<String>,
    pub global_phone_numbers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub company: String,
    pub search_queries_used: usize,
}

/// Error body returned by the service with any non-2xx status.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub(crate) struct ServiceErrorBody {
    pub error: String,
    pub message: Option<String>,
}

/// Outcome of a successful (2xx) service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LookupOutcome<T> {
    /// The service returned at least one match.
    Found(T),
    /// The call worked but nothing matched.
    NoResults { patterns_tested: u32 },
}

/// What a [`ContactRecord`] holds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type", content = "label")]
pub(crate) enum ContactKind {
    Email,
    Phone(PhoneKind),
}

/// One guessed contact detail with its heuristic confidence.
///
/// Built per lookup and never stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContactRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub phones: Vec<String>,
    pub kind: ContactKind,
    /// 0-100
    pub confidence: u8,
}

impl ContactRecord {
    pub(crate) fn email(address: String, confidence: u8) -> Self {
        Self {
            email: Some(address),
            phones: Vec::new(),
            kind: ContactKind::Email,
            confidence,
        }
    }

    pub(crate) fn phone(number: String, score: PhoneScore) -> Self {
        Self {
            email: None,
            phones: vec![number],
            kind: ContactKind::Phone(score.kind),
            confidence: score.confidence,
        }
    }
}

/// Result of one lookup action for one profile.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContactReport {
    pub title: String,
    pub name: ParsedName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub contacts: Vec<ContactRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns_tested: Option<u32>,
    /// Informational note, e.g. when nothing was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A recruiter profile found through web search.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecruiterProfile {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_searched: Option<String>,
}

/// A job posting found on a job board or company career page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct JobPosting {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Hiring company as named by the posting.
    pub company: String,
    pub location: String,
    /// Job board or "Company Career Page".
    pub source: String,
    pub posted_date: String,
    pub job_type: String,
    pub salary: String,
    /// 0-100, higher is a better match for the searched company.
    pub relevance_score: u8,
}

/// One raw item of a web search response.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub(crate) struct SearchItem {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// Internal representation of SMTP verification outcome
#[derive(Debug, Clone)]
pub(crate) struct SmtpVerificationResult {
    /// True = Exists, False = Does Not Exist, None = Inconclusive/Error
    pub exists: Option<bool>,
    /// Detailed message about the outcome.
    pub message: String,
    /// Suggests if retrying might yield a different result (e.g., for temporary errors).
    pub should_retry: bool,
}

impl SmtpVerificationResult {
    /// Creates a conclusive result (email definitely exists or not).
    pub(crate) fn conclusive(exists: bool, message: String) -> Self {
        Self {
            exists: Some(exists),
            message,
            should_retry: false,
        }
    }

    /// Creates an inconclusive result where retrying might help.
    pub(crate) fn inconclusive_retry(message: String) -> Self {
        Self {
            exists: None,
            message,
            should_retry: true,
        }
    }

    /// Creates an inconclusive result where retrying is unlikely to help.
    pub(crate) fn inconclusive_no_retry(message: String) -> Self {
        Self {
            exists: None,
            message,
            should_retry: false,
        }
    }
}
