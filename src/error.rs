//! Defines the custom error types for the recruiter-sleuth application.

use std::io;
use thiserror::Error;
use url::ParseError as UrlParseError;

/// Fallback message when the contact service fails without explaining why.
pub(crate) const CONTACT_LOOKUP_FALLBACK: &str = "Contact lookup failed. Please try again later.";

/// Fallback message when the phone service fails without explaining why.
pub(crate) const PHONE_LOOKUP_FALLBACK: &str = "Phone lookup failed. Please try again later.";

/// The primary error type for recruiter lookups and the contact service.
#[derive(Error, Debug)]
pub(crate) enum AppError {
    /// Error occurring during configuration loading or validation.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error related to file input/output operations.
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    /// Error parsing a URL.
    #[error("URL Parsing Error: {0}")]
    UrlParse(#[from] UrlParseError),

    /// Transport failure talking to an HTTP service.
    #[error("HTTP Request Error: {0}")]
    Request(#[from] reqwest::Error),

    /// The profile title left no usable name tokens.
    #[error("Cannot parse name from \"{0}\"")]
    UnparseableName(String),

    /// No company context to derive an email domain from.
    #[error("Cannot determine company domain")]
    UnresolvableDomain,

    /// The contact service answered with a non-2xx status.
    #[error("{message}")]
    Service {
        /// HTTP status code returned by the service.
        status: u16,
        /// Service-provided message, or a generic fallback.
        message: String,
    },

    /// The contact service could not be reached or sent an unreadable reply.
    #[error("{message}")]
    Transport {
        /// Generic message shown in place of the transport error.
        message: String,
        #[source]
        source: reqwest::Error,
    },

    /// The same lookup action is already running for this profile.
    #[error("A {0} lookup is already in progress")]
    LookupInProgress(&'static str),

    /// Recruiter search is unavailable or returned an unusable response.
    #[error("Search Error: {0}")]
    Search(String),

    /// Error during DNS resolution.
    #[error("DNS Resolution Error: {0}")]
    Dns(#[from] trust_dns_resolver::error::ResolveError),

    /// Specific DNS error indicating the domain does not exist.
    #[error("Domain Not Found (NXDOMAIN): {0}")]
    NxDomain(String),

    /// Specific DNS error indicating no relevant records were found.
    #[error("No DNS Records Found (MX/A): {0}")]
    NoDnsRecords(String),

    /// DNS operation timed out.
    #[error("DNS Timeout for domain: {0}")]
    DnsTimeout(String),

    /// Error related to concurrency or task execution.
    #[error("Task Execution Error: {0}")]
    Task(String),

    /// An underlying error that doesn't fit other categories, using anyhow.
    #[error("Generic Error: {0}")]
    Generic(#[from] anyhow::Error),

    /// Failed to extract a domain from the provided URL.
    #[error("Failed to extract domain from URL: {0}")]
    DomainExtraction(String),
}

pub(crate) type Result<T> = std::result::Result<T, AppError>;
