//! HTTP contact-discovery service: guesses and verifies recruiter emails,
//! collects public phone numbers and searches recruiters and job postings.

use crate::config::Config;
use crate::dns::{create_resolver, resolve_mail_route};
use crate::error::Result;
use crate::jobs::{DEFAULT_MAX_JOBS, search_jobs, title_case};
use crate::models::{
    ContactLookupResponse, JobPosting, PhoneLookupResponse, RecruiterProfile, ServiceErrorBody,
};
use crate::name::{clean_name, is_valid_name, letters_only};
use crate::patterns::generate_email_patterns;
use crate::phones::{company_directory_numbers, partition_by_region};
use crate::search::{SearchClient, split_company_and_location};
use crate::smtp::{SmtpSettings, mailbox_exists};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::Semaphore;
use trust_dns_resolver::TokioAsyncResolver;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

/// Mailbox probes run at once for one lookup.
const CONCURRENT_PROBES: usize = 3;

#[derive(Serialize, Deserialize)]
struct HealthResponse {
    success: bool,
    message: String,
}

/// Body of `POST /contact-lookup` before validation.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct ContactLookupBody {
    first_name: Option<String>,
    last_name: Option<String>,
    domain: Option<String>,
    company: Option<String>,
}

/// Body of `POST /phone-lookup` before validation.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct PhoneLookupBody {
    first_name: Option<String>,
    last_name: Option<String>,
    company: Option<String>,
}

/// Query string of `GET /search`.
#[derive(Deserialize, Debug, Default)]
struct RecruiterSearchQuery {
    company: Option<String>,
}

/// Query string of the job search routes.
#[derive(Deserialize, Debug, Default)]
struct JobSearchQuery {
    company: Option<String>,
    location: Option<String>,
    max_results: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug)]
struct RecruiterSearchResponse {
    company: String,
    profiles: Vec<RecruiterProfile>,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_searched: Option<String>,
    message: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct JobResults {
    total_found: usize,
    jobs: Vec<JobPosting>,
}

#[derive(Serialize, Deserialize, Debug)]
struct JobSearchResponse {
    success: bool,
    company: String,
    location: Option<String>,
    max_results: usize,
    results: JobResults,
}

/// A request the service refuses, rendered as `{error, message}`.
#[derive(Debug, PartialEq, Eq)]
struct ApiFailure {
    status: StatusCode,
    error: &'static str,
    message: String,
}

impl ApiFailure {
    fn bad_request(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
            message: message.into(),
        }
    }

    fn internal(error: &'static str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error,
            message: "An error occurred while finding contact information. Please try again later."
                .to_string(),
        }
    }

    fn search_unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            error: "Search not configured",
            message: "Google Custom Search credentials are not configured".to_string(),
        }
    }

    fn into_reply(self) -> WithStatus<Json> {
        let body = ServiceErrorBody {
            error: self.error.to_string(),
            message: Some(self.message),
        };
        warp::reply::with_status(warp::reply::json(&body), self.status)
    }
}

type ApiResult<T> = std::result::Result<T, ApiFailure>;

/// Names as received and reduced to letters.
#[derive(Debug, PartialEq, Eq)]
struct ValidatedNames {
    first: String,
    last: String,
    original_first: String,
    original_last: String,
}

fn require_field(value: Option<&str>, field: &str) -> ApiResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.trim().to_string()),
        _ => Err(ApiFailure::bad_request(
            "Missing required field",
            format!("Field '{}' is required", field),
        )),
    }
}

/// Company names for search must have at least two characters.
fn require_company(value: Option<&str>) -> ApiResult<String> {
    let company = value.map(str::trim).unwrap_or_default();
    if company.is_empty() {
        return Err(ApiFailure::bad_request(
            "Company parameter is required",
            "Please provide a company name using ?company=CompanyName",
        ));
    }
    if company.chars().count() < 2 {
        return Err(ApiFailure::bad_request(
            "Invalid company name",
            "Company name must be at least 2 characters long",
        ));
    }
    Ok(company.to_string())
}

fn recruiter_search_message(company: &str, found: usize, location: Option<&str>) -> String {
    if found == 0 {
        return match split_company_and_location(company) {
            (name, Some(location)) => format!(
                "No LinkedIn recruiter profiles found for {} in {}. Try the company name without a location.",
                name,
                title_case(&location)
            ),
            (name, None) => format!(
                "No LinkedIn recruiter profiles found for {}. Try adding a location like \"{} India\".",
                name, name
            ),
        };
    }

    let plural = if found == 1 { "" } else { "s" };
    let context = location
        .map(|l| format!(" in {}", title_case(l)))
        .unwrap_or_default();
    format!("Found {} LinkedIn recruiter profile{}{}", found, plural, context)
}

fn validate_names(first: String, last: String) -> ApiResult<ValidatedNames> {
    if first.is_empty() || last.is_empty() {
        return Err(ApiFailure::bad_request(
            "Invalid input",
            "First name and last name cannot be empty",
        ));
    }

    if !is_valid_name(&first) || !is_valid_name(&last) {
        return Err(ApiFailure::bad_request(
            "Invalid name format",
            format!(
                "Names contain invalid characters. Received: '{}' '{}'. Names can contain letters, spaces, apostrophes, periods, and hyphens.",
                first, last
            ),
        ));
    }

    let clean_first = letters_only(&first);
    let clean_last = letters_only(&last);
    if clean_first.is_empty() || clean_last.is_empty() {
        return Err(ApiFailure::bad_request(
            "Invalid name format",
            format!("Could not extract valid letters from names: '{}' '{}'", first, last),
        ));
    }

    Ok(ValidatedNames {
        first: clean_first,
        last: clean_last,
        original_first: clean_name(&first),
        original_last: clean_name(&last),
    })
}

/// Everything the service needs to answer lookups.
pub(crate) struct ContactService {
    resolver: TokioAsyncResolver,
    smtp: SmtpSettings,
    search: Option<SearchClient>,
    max_search_results: usize,
}

impl ContactService {
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let search = match SearchClient::new(config) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(target: "api_task", "Phone discovery disabled: {}", e);
                None
            }
        };

        Ok(Self {
            resolver: create_resolver(config)?,
            smtp: SmtpSettings::from(config),
            search,
            max_search_results: config.max_search_results,
        })
    }

    async fn search_recruiters(
        &self,
        query: RecruiterSearchQuery,
    ) -> ApiResult<RecruiterSearchResponse> {
        let company = require_company(query.company.as_deref())?;
        let search = self.search.as_ref().ok_or_else(ApiFailure::search_unavailable)?;

        tracing::info!(target: "api_task", "Searching for recruiters at: {}", company);
        let profiles = search
            .search_recruiters(&company, self.max_search_results)
            .await;
        let location_searched = profiles.first().and_then(|p| p.location_searched.clone());

        Ok(RecruiterSearchResponse {
            message: recruiter_search_message(&company, profiles.len(), location_searched.as_deref()),
            count: profiles.len(),
            company,
            profiles,
            location_searched,
        })
    }

    async fn find_jobs(
        &self,
        company: Option<&str>,
        query: JobSearchQuery,
    ) -> ApiResult<JobSearchResponse> {
        let company = require_company(company)?;
        let search = self.search.as_ref().ok_or_else(ApiFailure::search_unavailable)?;
        let location = query
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        let max_results = query.max_results.unwrap_or(DEFAULT_MAX_JOBS).max(1);

        let search_term = match &location {
            Some(location) => format!("{} {}", company, location),
            None => company.clone(),
        };
        tracing::info!(target: "api_task", "Searching for jobs at: {}", search_term);

        let jobs = search_jobs(search, &search_term, max_results).await;
        Ok(JobSearchResponse {
            success: true,
            company,
            location,
            max_results,
            results: JobResults {
                total_found: jobs.len(),
                jobs,
            },
        })
    }

    async fn lookup_contacts(&self, body: ContactLookupBody) -> ApiResult<ContactLookupResponse> {
        let first = require_field(body.first_name.as_deref(), "first_name")?;
        let last = require_field(body.last_name.as_deref(), "last_name")?;
        let requested_domain = require_field(body.domain.as_deref(), "domain")?.to_lowercase();
        let company = body.company.unwrap_or_default().trim().to_string();

        if requested_domain.is_empty() {
            return Err(ApiFailure::bad_request(
                "Invalid input",
                "First name, last name, and domain cannot be empty",
            ));
        }
        let names = validate_names(first, last)?;

        tracing::info!(target: "api_task",
            "Guessing emails for {} {} @ {}", names.first, names.last, requested_domain
        );

        let Some(route) = resolve_mail_route(&self.resolver, &requested_domain).await else {
            return Err(ApiFailure::bad_request(
                "Domain validation failed",
                format!(
                    "Could not find MX records for {} or alternative domains",
                    requested_domain
                ),
            ));
        };

        let patterns = generate_email_patterns(&names.first, &names.last, &route.domain);
        tracing::info!(target: "api_task",
            "Testing {} patterns against {} mail hosts for {}",
            patterns.len(), route.hosts.len(), route.domain
        );

        let (smtp, probe_route) = (&self.smtp, &route);
        let checks: Vec<(String, bool)> = stream::iter(patterns.iter().cloned())
            .map(|email| async move {
                let exists =
                    mailbox_exists(smtp, &email, &probe_route.domain, &probe_route.hosts).await;
                (email, exists)
            })
            .buffered(CONCURRENT_PROBES)
            .collect()
            .await;
        let valid_emails: Vec<String> = checks
            .into_iter()
            .filter_map(|(email, exists)| exists.then_some(email))
            .collect();

        let directory_source = if company.is_empty() {
            route.domain.split('.').next().unwrap_or_default().to_string()
        } else {
            company.clone()
        };

        tracing::info!(target: "api_task", "Found {} valid emails", valid_emails.len());
        Ok(ContactLookupResponse {
            valid_emails,
            phone_numbers: company_directory_numbers(&directory_source),
            total_patterns_tested: Some(patterns.len() as u32),
            message: None,
            first_name: names.first,
            last_name: names.last,
            original_first_name: names.original_first,
            original_last_name: names.original_last,
            domain: route.domain,
            company,
            mx_hosts_found: Some(route.hosts.len()),
        })
    }

    async fn lookup_phones(&self, body: PhoneLookupBody) -> ApiResult<PhoneLookupResponse> {
        let first = require_field(body.first_name.as_deref(), "first_name")?;
        let last = require_field(body.last_name.as_deref(), "last_name")?;
        let company = body.company.unwrap_or_default().trim().to_string();
        let names = validate_names(first, last)?;

        tracing::info!(target: "api_task",
            "Finding phone numbers for {} {} @ {}", names.first, names.last, company
        );

        let (mut phone_numbers, search_queries_used) = match &self.search {
            Some(search) => {
                search
                    .discover_phone_numbers(&names.first, &names.last, &company)
                    .await
            }
            None => (Vec::new(), 0),
        };

        if phone_numbers.is_empty() {
            tracing::info!(target: "api_task", "No public numbers found, using company directory");
            phone_numbers = company_directory_numbers(&company);
        }

        let (indian, global) = partition_by_region(&phone_numbers);
        let message = phone_numbers
            .is_empty()
            .then(|| "No phone numbers found".to_string());

        Ok(PhoneLookupResponse {
            phone_numbers: indian.iter().chain(global.iter()).cloned().collect(),
            indian_phone_numbers: indian,
            global_phone_numbers: global,
            message,
            first_name: names.first,
            last_name: names.last,
            company,
            search_queries_used,
        })
    }
}

fn render<T: Serialize>(result: ApiResult<T>) -> WithStatus<Json> {
    match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), StatusCode::OK),
        Err(failure) => {
            tracing::warn!(target: "api_task", "{} ({}): {}", failure.error, failure.status, failure.message);
            failure.into_reply()
        }
    }
}

async fn handle_contact_lookup(
    body: ContactLookupBody,
    service: Arc<ContactService>,
    semaphore: Arc<Semaphore>,
) -> std::result::Result<impl Reply, Rejection> {
    let Ok(_permit) = semaphore.acquire().await else {
        return Ok(ApiFailure::internal("Contact finding failed").into_reply());
    };
    Ok(render(service.lookup_contacts(body).await))
}

async fn handle_phone_lookup(
    body: PhoneLookupBody,
    service: Arc<ContactService>,
    semaphore: Arc<Semaphore>,
) -> std::result::Result<impl Reply, Rejection> {
    let Ok(_permit) = semaphore.acquire().await else {
        return Ok(ApiFailure::internal("Phone finding failed").into_reply());
    };
    Ok(render(service.lookup_phones(body).await))
}

async fn handle_recruiter_search(
    query: RecruiterSearchQuery,
    service: Arc<ContactService>,
) -> std::result::Result<impl Reply, Rejection> {
    Ok(render(service.search_recruiters(query).await))
}

async fn handle_job_search(
    query: JobSearchQuery,
    service: Arc<ContactService>,
) -> std::result::Result<impl Reply, Rejection> {
    let company = query.company.clone();
    Ok(render(service.find_jobs(company.as_deref(), query).await))
}

async fn handle_company_jobs(
    raw_company: String,
    query: JobSearchQuery,
    service: Arc<ContactService>,
) -> std::result::Result<impl Reply, Rejection> {
    let company = decode_path_segment(&raw_company);
    Ok(render(service.find_jobs(Some(&company), query).await))
}

/// Percent-decodes a path segment such as `Google%20India`.
fn decode_path_segment(segment: &str) -> String {
    url::form_urlencoded::parse(segment.as_bytes())
        .map(|(key, _)| key.into_owned())
        .next()
        .unwrap_or_default()
}

/// All service routes, with rejections turned into JSON errors.
pub(crate) fn routes(
    service: Arc<ContactService>,
    max_concurrent: usize,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let service_filter = warp::any().map(move || service.clone());
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let semaphore_filter = warp::any().map(move || semaphore.clone());

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            warp::reply::json(&HealthResponse {
                success: true,
                message: "Contact service is running".to_string(),
            })
        });

    let contact_lookup = warp::path(crate::client::CONTACT_LOOKUP_PATH)
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(service_filter.clone())
        .and(semaphore_filter.clone())
        .and_then(handle_contact_lookup);

    let phone_lookup = warp::path(crate::client::PHONE_LOOKUP_PATH)
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(service_filter.clone())
        .and(semaphore_filter)
        .and_then(handle_phone_lookup);

    let recruiter_search = warp::path("search")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<RecruiterSearchQuery>())
        .and(service_filter.clone())
        .and_then(handle_recruiter_search);

    let job_search = warp::path("search-jobs")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<JobSearchQuery>())
        .and(service_filter.clone())
        .and_then(handle_job_search);

    let company_jobs = warp::path!("jobs-by-company" / String)
        .and(warp::get())
        .and(warp::query::<JobSearchQuery>())
        .and(service_filter)
        .and_then(handle_company_jobs);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"])
        .allow_header("content-type");

    health
        .or(contact_lookup)
        .or(phone_lookup)
        .or(recruiter_search)
        .or(job_search)
        .or(company_jobs)
        .with(cors)
        .recover(handle_rejection)
}

/// Runs the service until the process is stopped.
pub(crate) async fn start_api_server(config: &Config, port: u16) -> Result<()> {
    let service = Arc::new(ContactService::new(config)?);
    let routes = routes(service, config.max_concurrent_requests);

    tracing::info!(target: "api_task", "Starting contact service on port {}", port);
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
    Ok(())
}

async fn handle_rejection(err: Rejection) -> std::result::Result<WithStatus<Json>, Infallible> {
    let failure = if err.is_not_found() {
        ApiFailure {
            status: StatusCode::NOT_FOUND,
            error: "Not Found",
            message: "Not Found".to_string(),
        }
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        ApiFailure::bad_request("Invalid parameter", "Please check your request parameters")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiFailure {
            status: StatusCode::METHOD_NOT_ALLOWED,
            error: "Method not allowed",
            message: "Method not allowed".to_string(),
        }
    } else {
        ApiFailure::bad_request("Invalid request format", "Request must be JSON")
    };
    Ok(failure.into_reply())
}
