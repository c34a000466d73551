//! Maps company names and URLs to email domains.

use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Known company aliases, checked in this order.
///
/// Exact matches win outright. Otherwise the first alias contained in the
/// normalized company name is used, so more specific aliases must come
/// before shorter ones they contain (`facebook` before `meta`).
pub(crate) const COMPANY_ALIASES: &[(&str, &str)] = &[
    ("facebook", "meta.com"),
    ("meta", "meta.com"),
    ("alphabet", "google.com"),
    ("google", "google.com"),
    ("microsoft", "microsoft.com"),
    ("amazon", "amazon.com"),
    ("apple", "apple.com"),
    ("netflix", "netflix.com"),
    ("natwest", "natwest.com"),
    ("royal bank of scotland", "natwest.com"),
    ("jpmorgan", "jpmorganchase.com"),
    ("jp morgan", "jpmorganchase.com"),
    ("goldman sachs", "gs.com"),
    ("morgan stanley", "morganstanley.com"),
    ("bank of america", "bankofamerica.com"),
    ("wells fargo", "wellsfargo.com"),
    ("deutsche bank", "db.com"),
    ("credit suisse", "credit-suisse.com"),
    ("salesforce", "salesforce.com"),
    ("oracle", "oracle.com"),
    ("nvidia", "nvidia.com"),
    ("tesla", "tesla.com"),
    ("uber", "uber.com"),
    ("ibm", "ibm.com"),
];

/// Companies that operate several mail domains.
const MULTI_DOMAIN_COMPANIES: &[(&str, &[&str])] = &[
    ("natwest", &["natwest.com", "natwestgroup.com", "rbs.com"]),
    ("rbs", &["rbs.com", "natwest.com", "natwestgroup.com"]),
    ("google", &["google.com", "alphabet.com"]),
    ("amazon", &["amazon.com", "aboutamazon.com"]),
    ("meta", &["meta.com", "facebook.com"]),
    ("facebook", &["meta.com", "facebook.com"]),
    ("jpmorgan", &["jpmorganchase.com", "jpmorgan.com"]),
    ("jpmorganchase", &["jpmorganchase.com", "jpmorgan.com"]),
    ("goldmansachs", &["gs.com", "goldmansachs.com"]),
    ("gs", &["gs.com", "goldmansachs.com"]),
    ("citi", &["citi.com", "citigroup.com"]),
    ("bankofamerica", &["bankofamerica.com", "bofa.com"]),
    ("hsbc", &["hsbc.com", "hsbc.co.uk"]),
    ("barclays", &["barclays.com", "barclays.co.uk"]),
    ("lloyds", &["lloydsbank.com", "lloydsbankinggroup.com"]),
    ("santander", &["santander.com", "santander.co.uk"]),
    ("deutsche", &["db.com", "deutsche-bank.com"]),
    ("db", &["db.com", "deutsche-bank.com"]),
];

const MAX_ALTERNATIVE_DOMAINS: usize = 5;

static CORPORATE_SUFFIXES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(inc|ltd|llc|corp|corporation|company|co|group|india|limited)\b")
        .expect("suffix regex is valid")
});

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]").expect("alphanumeric regex is valid"));

/// Resolves a company name to the email domain its staff most likely use.
///
/// Deterministic: the same name always yields the same domain.
///
/// # Returns
/// * `Ok(String)` with a lowercase domain such as `"meta.com"`.
/// * `Err(AppError::UnresolvableDomain)` for empty input, or when nothing is
///   left after removing corporate suffixes.
pub(crate) fn resolve_company_domain(company: &str) -> Result<String> {
    let normalized = company.trim().to_lowercase();
    if normalized.is_empty() {
        tracing::warn!("Received empty company name for domain resolution.");
        return Err(AppError::UnresolvableDomain);
    }

    if let Some((_, domain)) = COMPANY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
    {
        tracing::debug!("Exact alias match for '{}': {}", company, domain);
        return Ok(domain.to_string());
    }

    if let Some((alias, domain)) = COMPANY_ALIASES
        .iter()
        .find(|(alias, _)| normalized.contains(alias))
    {
        tracing::debug!(
            "Alias '{}' found inside '{}', using {}",
            alias,
            company,
            domain
        );
        return Ok(domain.to_string());
    }

    let without_suffixes = CORPORATE_SUFFIXES.replace_all(&normalized, "");
    let base = NON_ALPHANUMERIC.replace_all(&without_suffixes, "");
    if base.is_empty() {
        tracing::warn!(
            "Company name '{}' has nothing left after normalization.",
            company
        );
        return Err(AppError::UnresolvableDomain);
    }

    let domain = format!("{}.com", base);
    tracing::debug!("Synthesized domain '{}' from '{}'", domain, company);
    Ok(domain)
}

/// Extracts the base domain name (e.g., "example.com") from a given URL string.
/// Handles missing schemes, "www." prefixes, and ports.
///
/// # Returns
/// * `Ok(String)` containing the lowercase domain name if successful.
/// * `Err(AppError::DomainExtraction)` if the URL is empty or has no host.
pub(crate) fn get_domain_from_url(website_url_str: &str) -> Result<String> {
    let trimmed = website_url_str.trim();
    if trimmed.is_empty() {
        tracing::warn!("Received empty website URL for domain extraction.");
        return Err(AppError::DomainExtraction(
            "Input URL string is empty".to_string(),
        ));
    }

    let url_str_with_scheme = if !trimmed.starts_with("http://") && !trimmed.starts_with("https://")
    {
        format!("https://{}", trimmed)
    } else {
        trimmed.to_string()
    };

    let url = Url::parse(&url_str_with_scheme)?;
    let host = url.host_str().ok_or_else(|| {
        AppError::DomainExtraction(format!(
            "Could not extract host from parsed URL: {}",
            url_str_with_scheme
        ))
    })?;

    let domain = host.strip_prefix("www.").unwrap_or(host).to_lowercase();
    tracing::debug!("Extracted domain '{}' from '{}'", domain, website_url_str);
    Ok(domain)
}

/// Suggests other domains to try when `original_domain` has no mail server.
///
/// Known multi-domain companies get their real alternatives; anything else
/// gets the usual corporate variations of the base name. The original domain
/// is never included and at most five suggestions are returned.
pub(crate) fn alternative_domains(original_domain: &str) -> Vec<String> {
    let lowered = original_domain.to_lowercase();
    let base_name = lowered.strip_suffix(".com").unwrap_or(&lowered);

    let candidates: Vec<String> = match MULTI_DOMAIN_COMPANIES
        .iter()
        .find(|(name, _)| *name == base_name)
    {
        Some((_, domains)) => domains.iter().map(|d| d.to_string()).collect(),
        None => vec![
            format!("{}.com", base_name),
            format!("{}group.com", base_name),
            format!("{}corp.com", base_name),
            format!("{}inc.com", base_name),
            format!("the{}.com", base_name),
        ],
    };

    candidates
        .into_iter()
        .filter(|candidate| *candidate != lowered)
        .take(MAX_ALTERNATIVE_DOMAINS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_exact_alias() {
        assert_eq!(resolve_company_domain("Facebook").unwrap(), "meta.com");
        assert_eq!(resolve_company_domain("  google ").unwrap(), "google.com");
    }

    #[test]
    fn test_resolve_substring_alias() {
        assert_eq!(resolve_company_domain("NatWest India").unwrap(), "natwest.com");
        assert_eq!(
            resolve_company_domain("Facebook Reality Labs").unwrap(),
            "meta.com"
        );
        assert_eq!(
            resolve_company_domain("Goldman Sachs India").unwrap(),
            "gs.com"
        );
    }

    #[test]
    fn test_resolve_synthesized_domain() {
        assert_eq!(resolve_company_domain("Acme Corp").unwrap(), "acme.com");
        assert_eq!(
            resolve_company_domain("Tata Consultancy Services Limited").unwrap(),
            "tataconsultancyservices.com"
        );
        assert_eq!(resolve_company_domain("Coca-Cola Co.").unwrap(), "cocacola.com");
        assert_eq!(resolve_company_domain("Zoho India").unwrap(), "zoho.com");
        assert_eq!(
            resolve_company_domain("J.P. Morgan Chase & Co").unwrap(),
            "jpmorganchase.com"
        );
    }

    #[test]
    fn test_resolve_unresolvable() {
        assert!(matches!(
            resolve_company_domain(""),
            Err(AppError::UnresolvableDomain)
        ));
        assert!(matches!(
            resolve_company_domain("   "),
            Err(AppError::UnresolvableDomain)
        ));
        assert!(matches!(
            resolve_company_domain("Group Inc"),
            Err(AppError::UnresolvableDomain)
        ));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        for company in ["Facebook", "NatWest India", "Acme Corp", "Initech LLC"] {
            assert_eq!(
                resolve_company_domain(company).unwrap(),
                resolve_company_domain(company).unwrap()
            );
        }
    }

    #[test]
    fn test_get_domain_from_url() {
        assert_eq!(
            get_domain_from_url("https://www.example.com").unwrap(),
            "example.com"
        );
        assert_eq!(get_domain_from_url("Example.com").unwrap(), "example.com");
        assert_eq!(
            get_domain_from_url("http://example.com:8080/careers").unwrap(),
            "example.com"
        );
        assert!(get_domain_from_url("").is_err());
        assert!(get_domain_from_url("http://").is_err());
    }

    #[test]
    fn test_alternative_domains() {
        assert_eq!(
            alternative_domains("natwest.com"),
            vec!["natwestgroup.com".to_string(), "rbs.com".to_string()]
        );
        let generic = alternative_domains("initech.com");
        assert_eq!(generic.len(), 4);
        assert!(!generic.contains(&"initech.com".to_string()));
        assert!(generic.contains(&"theinitech.com".to_string()));
    }
}
