//! Recruiter profile search and public phone number discovery through the
//! Google Custom Search JSON API.

use crate::config::Config;
use crate::domain::resolve_company_domain;
use crate::error::{AppError, Result};
use crate::models::{RecruiterProfile, SearchItem};
use crate::phones::{extract_phone_numbers, is_indian_number};
use crate::scraper::fetch_page_text;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
/// The API returns at most ten items per request.
const MAX_RESULTS_PER_REQUEST: usize = 10;
const MAX_SNIPPET_CHARS: usize = 200;
const MAX_DISCOVERED_PHONES: usize = 3;

static LOCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(india|usa|uk|canada|australia|germany|france|singapore|japan|china|brazil|mexico)\b",
        r"(?i)\b(bangalore|mumbai|delhi|hyderabad|chennai|pune|london|new york|san francisco|seattle|toronto|sydney|berlin|paris|tokyo|beijing|shanghai|sao paulo)\b",
        r"(?i)\b(asia pacific|emea|north america|latin america|middle east|europe)\b",
        r"(?i)\b(silicon valley|bay area|wall street)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("location regex is valid"))
    .collect()
});

const COUNTRY_CODES: &[(&str, &str)] = &[
    ("india", "IN"),
    ("usa", "US"),
    ("uk", "GB"),
    ("canada", "CA"),
    ("australia", "AU"),
    ("germany", "DE"),
    ("france", "FR"),
    ("singapore", "SG"),
    ("japan", "JP"),
    ("china", "CN"),
    ("brazil", "BR"),
    ("mexico", "MX"),
];

const HIGH_VALUE_SOURCES: &[&str] = &["linkedin.com", "crunchbase.com", "about.me", "xing.com"];
const CONTACT_TITLE_WORDS: &[&str] = &["contact", "phone", "mobile", "profile"];
const RECRUITING_TITLE_WORDS: &[&str] = &["recruiter", "hiring", "talent", "hr"];

/// Splits free text such as "Google India" into the company and the first
/// recognised country, city, region or office location.
pub(crate) fn split_company_and_location(input: &str) -> (String, Option<String>) {
    let trimmed = input.trim();

    for pattern in LOCATION_PATTERNS.iter() {
        if let Some(found) = pattern.find(trimmed) {
            let location = found.as_str().to_lowercase();
            let company = pattern
                .replace_all(trimmed, " ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            return (company, Some(location));
        }
    }

    (trimmed.to_string(), None)
}

/// Search queries to try, most specific first.
pub(crate) fn search_strategies(company: &str, location: Option<&str>) -> Vec<String> {
    match location {
        Some(location) => vec![
            format!("{company} recruiter {location}"),
            format!("{company} hiring {location}"),
            format!("{company} talent {location}"),
            format!("{company} {location} recruiter"),
            format!("{company} {location} hiring manager"),
            format!("recruiter {company} {location}"),
            format!("hiring manager {company} {location}"),
            format!("{company} recruiter"),
            format!("{company} hiring manager"),
            format!("{company} talent acquisition"),
        ],
        None => vec![
            format!("{company} recruiter"),
            format!("{company} hiring manager"),
            format!("{company} talent acquisition"),
            format!("{company} hr manager"),
            format!("{company} people partner"),
            format!("recruiter {company}"),
            format!("hiring manager {company}"),
            format!("talent acquisition {company}"),
        ],
    }
}

/// Looser queries used when the regular strategies find nothing.
fn broad_strategies(company: &str, location: Option<&str>) -> Vec<String> {
    let mut strategies = vec![
        format!("{company} linkedin recruiter"),
        format!("{company} linkedin hiring"),
        format!("{company} linkedin talent"),
        format!("linkedin.com {company} recruiter"),
        format!("site:linkedin.com {company} talent acquisition"),
        format!("site:linkedin.com {company} hiring manager"),
    ];
    if let Some(location) = location {
        strategies.push(format!("{company} {location} linkedin recruiter"));
        strategies.push(format!("linkedin.com {company} {location}"));
        strategies.push(format!("site:linkedin.com {company} {location} recruiter"));
    }
    strategies
}

/// Queries for discovering a person's public phone numbers.
pub(crate) fn phone_discovery_queries(first: &str, last: &str, company: &str) -> Vec<String> {
    let name = format!("{first} {last}");
    let mut queries = vec![
        format!(r#"site:linkedin.com "{name}" "{company}" contact"#),
        format!(r#"site:linkedin.com "{name}" "{company}" phone"#),
        format!(r#"site:linkedin.com "{name}" mobile email contact"#),
    ];
    if let Ok(domain) = resolve_company_domain(company) {
        queries.push(format!(r#"site:{domain} "{name}" contact"#));
        queries.push(format!(r#"site:{domain} "{name}" phone"#));
    }
    queries.extend([
        format!(r#""{company}" directory "{name}" contact information"#),
        format!(r#"site:xing.com "{name}" "{company}" contact"#),
        format!(r#"site:about.me "{name}" "{company}" phone"#),
        format!(r#"site:crunchbase.com "{name}" "{company}" contact"#),
        format!(r#""{name}" "{company}" business card contact"#),
        format!(r#""{name}" "{company}" vcard contact information"#),
        format!(r#""{name}" "{company}" "contact me" phone"#),
        format!(r#""{name}" "{company}" speaker contact"#),
        format!(r#""{name}" "{company}" conference bio contact"#),
        format!(r#""{name}" "{company}" india contact phone"#),
        format!(r#""{name}" "{company}" mumbai bangalore contact"#),
        format!(r#""{name}" "{company}" uk london contact phone"#),
        format!(r#""{name}" "{company}" usa contact information"#),
    ]);
    queries
}

fn country_code(location: &str) -> Option<&'static str> {
    COUNTRY_CODES
        .iter()
        .find(|(name, _)| *name == location)
        .map(|(_, code)| *code)
}

fn location_terms(location: &str) -> Vec<&str> {
    let mut terms = vec![location];
    match location {
        "india" => terms.extend([
            "mumbai", "bangalore", "delhi", "hyderabad", "chennai", "pune", "indian",
        ]),
        "usa" => terms.extend([
            "american",
            "united states",
            "california",
            "new york",
            "seattle",
        ]),
        "uk" => terms.extend(["london", "british", "united kingdom", "england"]),
        _ => {}
    }
    terms
}

fn truncate_at_word(text: &str, max_chars: usize) -> String {
    let cut: String = text.chars().take(max_chars).collect();
    let kept = match cut.rsplit_once(' ') {
        Some((head, _)) => head,
        None => cut.as_str(),
    };
    format!("{}...", kept)
}

/// Shortens a result snippet to about 200 characters, keeping a sentence
/// that mentions the searched location when there is one.
pub(crate) fn shorten_snippet(snippet: &str, location: Option<&str>) -> String {
    if snippet.chars().count() <= MAX_SNIPPET_CHARS {
        return snippet.to_string();
    }

    if let Some(location) = location {
        let terms = location_terms(location);
        let mentions_location =
            |text: &str| terms.iter().any(|term| text.to_lowercase().contains(term));

        if let Some(sentence) = snippet
            .split(". ")
            .filter(|sentence| mentions_location(sentence))
            .find(|sentence| sentence.chars().count() <= MAX_SNIPPET_CHARS)
        {
            return format!("{}...", sentence);
        }
    }

    truncate_at_word(snippet, MAX_SNIPPET_CHARS)
}

fn is_linkedin(url: &str) -> bool {
    url.contains("linkedin.com")
}

#[derive(Deserialize, Debug, Default)]
struct GoogleSearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// Client for the Google Custom Search JSON API.
#[derive(Debug, Clone)]
pub(crate) struct SearchClient {
    http_client: Arc<Client>,
    api_key: String,
    engine_id: String,
    endpoint: String,
}

impl SearchClient {
    /// Creates a search client from the configured Google credentials.
    ///
    /// # Returns
    /// * `Err(AppError::Search)` when the API key or engine id is missing.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let (api_key, engine_id) = config.search_credentials().ok_or_else(|| {
            AppError::Search("Google Custom Search API key and engine id are required".to_string())
        })?;

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                AppError::Generic(anyhow::anyhow!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client: Arc::new(http_client),
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
            endpoint: GOOGLE_SEARCH_URL.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    async fn query(
        &self,
        query: &str,
        max_results: usize,
        country: Option<&str>,
    ) -> Result<Vec<SearchItem>> {
        let num = max_results.clamp(1, MAX_RESULTS_PER_REQUEST).to_string();
        let mut params = vec![
            ("key", self.api_key.as_str()),
            ("cx", self.engine_id.as_str()),
            ("q", query),
            ("num", num.as_str()),
            ("safe", "off"),
        ];
        let restriction = country.map(|code| format!("country{}", code));
        if let Some(cr) = restriction.as_deref() {
            params.push(("cr", cr));
        }

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Search(format!(
                "API error {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let data: GoogleSearchResponse = response.json().await?;
        tracing::debug!(target: "search_task", "'{}' returned {} items", query, data.items.len());
        Ok(data.items)
    }

    /// Runs one query and keeps LinkedIn results only.
    ///
    /// The query is tried restricted to `linkedin.com/in/` first and then as
    /// given; the first attempt that yields profiles wins. Failed attempts
    /// are logged and skipped.
    pub(crate) async fn perform_search(
        &self,
        query: &str,
        max_results: usize,
        location: Option<&str>,
    ) -> Vec<RecruiterProfile> {
        let country = location.and_then(country_code);
        let attempts = [format!("site:linkedin.com/in/ {}", query), query.to_string()];

        for (attempt, q) in attempts.iter().enumerate() {
            let items = match self.query(q, max_results, country).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(target: "search_task", "Search attempt {} failed: {}", attempt + 1, e);
                    continue;
                }
            };

            let profiles: Vec<RecruiterProfile> = items
                .into_iter()
                .filter(|item| is_linkedin(&item.link))
                .map(|item| RecruiterProfile {
                    snippet: shorten_snippet(&item.snippet, location),
                    title: item.title,
                    url: item.link,
                    location_searched: location.map(str::to_string),
                })
                .collect();

            if !profiles.is_empty() {
                return profiles;
            }
        }

        Vec::new()
    }

    /// Finds up to `max_results` unique LinkedIn profiles of recruiters at
    /// the company named in `company_input` (which may carry a location).
    pub(crate) async fn search_recruiters(
        &self,
        company_input: &str,
        max_results: usize,
    ) -> Vec<RecruiterProfile> {
        let (company, location) = split_company_and_location(company_input);
        let location = location.as_deref();
        tracing::info!(target: "search_task",
            "Searching for recruiters at: {}{}",
            company,
            location.map(|l| format!(" in {}", l)).unwrap_or_default()
        );

        let mut results: Vec<RecruiterProfile> = Vec::new();
        for (i, strategy) in search_strategies(&company, location).iter().enumerate() {
            tracing::debug!(target: "search_task", "Trying search strategy {}: {}", i + 1, strategy);
            for profile in self.perform_search(strategy, max_results, location).await {
                if !results.iter().any(|r| r.url == profile.url) {
                    results.push(profile);
                }
            }
            if results.len() >= max_results {
                break;
            }
        }

        if results.is_empty() {
            results = self.broad_search(&company, location, max_results).await;
        }

        results.truncate(max_results);
        tracing::info!(target: "search_task", "Found {} unique LinkedIn profiles", results.len());
        results
    }

    async fn broad_search(
        &self,
        company: &str,
        location: Option<&str>,
        max_results: usize,
    ) -> Vec<RecruiterProfile> {
        tracing::info!(target: "search_task", "No results from main search, trying broader strategies");

        for strategy in broad_strategies(company, location) {
            let items = match self.query(&strategy, max_results, None).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(target: "search_task", "Broad search strategy failed: {} - {}", strategy, e);
                    continue;
                }
            };

            let profiles: Vec<RecruiterProfile> = items
                .into_iter()
                .filter(|item| {
                    let title = item.title.to_lowercase();
                    is_linkedin(&item.link)
                        && RECRUITING_TITLE_WORDS.iter().any(|w| title.contains(w))
                })
                .take(max_results)
                .map(|item| RecruiterProfile {
                    snippet: shorten_snippet(&item.snippet, None),
                    title: item.title,
                    url: item.link,
                    location_searched: location.map(str::to_string),
                })
                .collect();

            if !profiles.is_empty() {
                tracing::info!(target: "search_task",
                    "Broad search found {} results with strategy: {}", profiles.len(), strategy
                );
                return profiles;
            }
        }

        Vec::new()
    }

    /// All items for a query, LinkedIn or not.
    pub(crate) async fn raw_search(&self, query: &str, max_results: usize) -> Result<Vec<SearchItem>> {
        self.query(query, max_results, None).await
    }

    /// Looks for a person's phone numbers in search results and the pages
    /// they link to.
    ///
    /// Stops once two Indian and one other number are known. Returns at most
    /// three numbers, Indian first, along with the number of queries run.
    pub(crate) async fn discover_phone_numbers(
        &self,
        first: &str,
        last: &str,
        company: &str,
    ) -> (Vec<String>, usize) {
        let queries = phone_discovery_queries(first, last, company);
        let mut found = RegionalNumbers::default();
        let mut queries_used = 0;

        for (i, query) in queries.iter().enumerate() {
            queries_used += 1;
            tracing::debug!(target: "search_task", "Phone search ({}/{}): {}", i + 1, queries.len(), query);

            let items = match self.raw_search(query, MAX_RESULTS_PER_REQUEST).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(target: "search_task", "Search failed for query '{}': {}", query, e);
                    continue;
                }
            };

            for item in &items {
                found.extend(extract_phone_numbers(&format!("{} {}", item.title, item.snippet)));

                let title = item.title.to_lowercase();
                let worth_fetching = HIGH_VALUE_SOURCES.iter().any(|s| item.link.contains(s))
                    || CONTACT_TITLE_WORDS.iter().any(|w| title.contains(w));
                if !worth_fetching {
                    continue;
                }
                match fetch_page_text(&self.http_client, &item.link).await {
                    Ok(Some(text)) => found.extend(extract_phone_numbers(&text)),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!(target: "search_task", "Could not fetch {}: {}", item.link, e)
                    }
                }
            }

            if found.is_sufficient() {
                tracing::info!(target: "search_task", "Found sufficient numbers, stopping search early");
                break;
            }
            if found.len() >= 5 && i >= 10 {
                break;
            }
        }

        tracing::info!(target: "search_task",
            "Phone search for {} {} found {} Indian and {} other numbers",
            first, last, found.indian.len(), found.global.len()
        );
        (found.into_top(MAX_DISCOVERED_PHONES), queries_used)
    }
}

/// Phone numbers collected during discovery, split by region.
#[derive(Debug, Default)]
struct RegionalNumbers {
    indian: Vec<String>,
    global: Vec<String>,
}

impl RegionalNumbers {
    fn extend(&mut self, numbers: Vec<String>) {
        for number in numbers {
            let bucket = if is_indian_number(&number) {
                &mut self.indian
            } else {
                &mut self.global
            };
            if !bucket.contains(&number) {
                tracing::debug!(target: "search_task", "Found phone number: {}", number);
                bucket.push(number);
            }
        }
    }

    fn len(&self) -> usize {
        self.indian.len() + self.global.len()
    }

    fn is_sufficient(&self) -> bool {
        self.indian.len() >= 2 && !self.global.is_empty()
    }

    fn into_top(self, limit: usize) -> Vec<String> {
        self.indian.into_iter().chain(self.global).take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use warp::Filter;

    #[test]
    fn test_split_company_and_location() {
        assert_eq!(
            split_company_and_location("Google India"),
            ("Google".to_string(), Some("india".to_string()))
        );
        assert_eq!(
            split_company_and_location("Microsoft New York office"),
            ("Microsoft office".to_string(), Some("new york".to_string()))
        );
        assert_eq!(
            split_company_and_location("  Stripe  "),
            ("Stripe".to_string(), None)
        );
        // Countries are checked before cities.
        assert_eq!(
            split_company_and_location("Amazon Bangalore India").1.as_deref(),
            Some("india")
        );
    }

    #[test]
    fn test_search_strategies() {
        let located = search_strategies("Google", Some("india"));
        assert_eq!(located.len(), 10);
        assert_eq!(located[0], "Google recruiter india");
        assert_eq!(located[9], "Google talent acquisition");

        let plain = search_strategies("Google", None);
        assert_eq!(plain.len(), 8);
        assert_eq!(plain[0], "Google recruiter");
        assert!(broad_strategies("Google", Some("uk")).len() > broad_strategies("Google", None).len());
    }

    #[test]
    fn test_phone_discovery_queries_use_company_domain() {
        let queries = phone_discovery_queries("Priya", "Rao", "Google");
        assert_eq!(queries.len(), 18);
        assert!(queries.contains(&r#"site:google.com "Priya Rao" contact"#.to_string()));

        let no_company = phone_discovery_queries("Priya", "Rao", "");
        assert_eq!(no_company.len(), 16);
    }

    #[test]
    fn test_shorten_snippet() {
        assert_eq!(shorten_snippet("short", Some("india")), "short");

        let long = format!("{}. Recruiting in Bangalore for cloud teams. {}", "x ".repeat(120), "y ".repeat(50));
        assert_eq!(
            shorten_snippet(&long, Some("india")),
            "Recruiting in Bangalore for cloud teams..."
        );

        let plain = shorten_snippet(&"word ".repeat(60), None);
        assert!(plain.ends_with("..."));
        assert!(plain.chars().count() <= MAX_SNIPPET_CHARS + 3);
        assert!(!plain.trim_end_matches("...").ends_with(' '));
    }

    #[test]
    fn test_regional_numbers_ordering() {
        let mut found = RegionalNumbers::default();
        found.extend(vec!["+1 650 253 0000".to_string(), "+91 98765 43210".to_string()]);
        assert!(!found.is_sufficient());
        found.extend(vec!["+91 98765 43210".to_string(), "9123456780".to_string()]);
        assert!(found.is_sufficient());
        assert_eq!(found.len(), 3);
        assert_eq!(
            found.into_top(3),
            vec!["+91 98765 43210", "9123456780", "+1 650 253 0000"]
        );
    }

    #[test]
    fn test_new_requires_credentials() {
        assert!(matches!(
            SearchClient::new(&Config::default()),
            Err(AppError::Search(_))
        ));
    }

    async fn mock_google() -> SearchClient {
        let routes = warp::get()
            .and(warp::query::<HashMap<String, String>>())
            .map(|params: HashMap<String, String>| {
                let q = params.get("q").cloned().unwrap_or_default();
                let items = if q.starts_with("site:linkedin.com/in/") {
                    serde_json::json!([
                        {
                            "title": "Sarah Johnson - Technical Recruiter - Google | LinkedIn",
                            "link": "https://www.linkedin.com/in/sarah-johnson",
                            "snippet": format!("Recruiting for {}", params.get("cr").cloned().unwrap_or_default())
                        },
                        { "title": "Google Careers", "link": "https://careers.google.com", "snippet": "" }
                    ])
                } else {
                    serde_json::json!([
                        { "title": "Contact Priya", "link": "https://example.org/priya", "snippet": "Mobile: +91 98765 43210" }
                    ])
                };
                warp::reply::json(&serde_json::json!({ "items": items }))
            });
        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let config = Config {
            google_api_key: Some("key".to_string()),
            google_search_engine_id: Some("cx".to_string()),
            ..Config::default()
        };
        SearchClient::new(&config)
            .unwrap()
            .with_endpoint(format!("http://{}/customsearch/v1", addr))
    }

    #[tokio::test]
    async fn test_search_recruiters_keeps_unique_linkedin_profiles() {
        let client = mock_google().await;
        let profiles = client.search_recruiters("Google India", 5).await;

        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].url, "https://www.linkedin.com/in/sarah-johnson");
        assert_eq!(profiles[0].snippet, "Recruiting for countryIN");
        assert_eq!(profiles[0].location_searched.as_deref(), Some("india"));
    }

    #[tokio::test]
    async fn test_raw_search_returns_all_items() {
        let client = mock_google().await;
        let items = client.raw_search("Priya Rao contact", 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.org/priya");
    }
}
