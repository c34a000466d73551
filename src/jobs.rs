//! Job posting search over job boards and company career pages.

use crate::domain::resolve_company_domain;
use crate::models::{JobPosting, SearchItem};
use crate::search::{SearchClient, split_company_and_location};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

pub(crate) const DEFAULT_MAX_JOBS: usize = 15;
const MAX_JOB_STRATEGIES: usize = 8;
const BASE_RELEVANCE: u32 = 50;
/// Word overlap above which two titles from the same company are one job.
const DUPLICATE_TITLE_SIMILARITY: f64 = 0.8;

const JOB_KEYWORDS: &[&str] = &[
    "job", "jobs", "career", "careers", "hiring", "opening", "openings", "position",
    "positions", "vacancy", "vacancies", "recruitment", "apply", "application", "candidate",
    "employment", "work at",
];

const JOB_SITES: &[&str] = &[
    "linkedin.com/jobs",
    "indeed.com",
    "glassdoor.com",
    "naukri.com",
    "monster.com",
    "ziprecruiter.com",
    "simplyhired.com",
    "dice.com",
    "careers",
    "jobs",
];

const EXCLUDED_KEYWORDS: &[&str] = &[
    "news",
    "article",
    "blog",
    "wikipedia",
    "about us",
    "company profile",
    "stock",
    "financial",
    "investor",
    "press release",
];

const TITLE_SUFFIXES: &[&str] = &[
    "- Indeed.com",
    "- LinkedIn",
    "- Glassdoor",
    "- Naukri.com",
    "- Monster.com",
    "| Indeed.com",
    "| LinkedIn",
    "| Glassdoor",
];

/// Separators after which a posting title names the hiring company.
const COMPANY_SEPARATORS: &[&str] = &[" at ", " with ", " - ", " | ", " for ", " by "];

const JOB_LOCATIONS: &[&str] = &[
    "remote",
    "hybrid",
    "onsite",
    "bangalore",
    "mumbai",
    "delhi",
    "hyderabad",
    "pune",
    "chennai",
    "gurgaon",
    "noida",
    "london",
    "new york",
    "san francisco",
    "seattle",
    "chicago",
    "toronto",
    "sydney",
    "berlin",
    "paris",
    "tokyo",
];

const JOB_SOURCES: &[(&str, &str)] = &[
    ("linkedin.com", "LinkedIn"),
    ("indeed.com", "Indeed"),
    ("glassdoor.com", "Glassdoor"),
    ("naukri.com", "Naukri"),
    ("monster.com", "Monster"),
    ("ziprecruiter.com", "ZipRecruiter"),
    ("simplyhired.com", "SimplyHired"),
    ("dice.com", "Dice"),
];

const CAREER_PAGE: &str = "Company Career Page";

const SOURCE_SCORES: &[(&str, u32)] = &[
    ("LinkedIn", 25),
    ("Indeed", 20),
    ("Glassdoor", 20),
    (CAREER_PAGE, 30),
    ("Naukri", 18),
    ("Monster", 15),
];

static POSTED_DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\d{1,2}\s+(?:days?|hours?|weeks?)\s+ago",
        r"\d{1,2}d\s+ago",
        r"\d{1,2}h\s+ago",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("posted date regex is valid"))
    .collect()
});

static JOB_TYPES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bfull[- ]time\b", "Full-time"),
        (r"\bpart[- ]time\b", "Part-time"),
        (r"\bcontract\b", "Contract"),
        (r"\bfreelance\b", "Freelance"),
        (r"\bintern(?:ship)?\b", "Internship"),
        (r"\btemporary\b", "Temporary"),
        (r"\bpermanent\b", "Permanent"),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).expect("job type regex is valid"), label))
    .collect()
});

static SALARY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"[$₹£€]\s*\d{1,3}(?:,\d{3})*(?:\.\d{2})?(?:\s*-\s*[$₹£€]?\s*\d{1,3}(?:,\d{3})*(?:\.\d{2})?)?",
        r"\d{1,3}(?:,\d{3})*\s*(?:lpa|per year|per month|/year|/month)",
        r"\d+k\s*-\s*\d+k",
        r"\d+\s*lakh",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("salary regex is valid"))
    .collect()
});

static POSTED_AGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})\s*(h|hours?|d|days?|w|weeks?)\b").expect("posted age regex is valid")
});

/// Capitalises the first letter of every word.
pub(crate) fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Queries to run for a company's openings, most targeted first.
pub(crate) fn job_search_strategies(company: &str, location: Option<&str>) -> Vec<String> {
    let suffix = location.map(|l| format!(" {l}")).unwrap_or_default();

    let mut strategies = vec![
        format!("site:linkedin.com/jobs {company}{suffix} jobs"),
        format!("site:indeed.com {company}{suffix} jobs"),
        format!("site:glassdoor.com {company}{suffix} jobs"),
    ];
    if location.is_some_and(|l| l.to_lowercase().contains("india")) {
        strategies.push(format!("site:naukri.com {company}{suffix} jobs"));
    }
    strategies.push(format!("site:monster.com {company}{suffix} jobs"));

    if let Ok(domain) = resolve_company_domain(company) {
        strategies.push(format!("site:{domain} careers{suffix}"));
        strategies.push(format!("site:{domain} jobs{suffix}"));
    }
    strategies.extend([
        format!("{company} careers{suffix} hiring"),
        format!("{company} job openings{suffix}"),
        format!(r#""{company}" hiring{suffix} openings"#),
        format!("{company} recruitment{suffix} positions"),
    ]);

    strategies.truncate(MAX_JOB_STRATEGIES);
    strategies
}

/// Whether a search result looks like a job posting rather than news or
/// company background.
pub(crate) fn is_job_posting(item: &SearchItem) -> bool {
    let title = item.title.to_lowercase();
    let snippet = item.snippet.to_lowercase();
    let url = item.link.to_lowercase();
    let mentions = |word: &&str| title.contains(*word) || snippet.contains(*word);

    let looks_like_job =
        JOB_KEYWORDS.iter().any(mentions) || JOB_SITES.iter().any(|site| url.contains(site));
    looks_like_job && !EXCLUDED_KEYWORDS.iter().any(mentions)
}

fn clean_job_title(title: &str) -> String {
    TITLE_SUFFIXES
        .iter()
        .fold(title.to_string(), |acc, suffix| acc.replace(suffix, ""))
        .trim()
        .to_string()
}

fn hiring_company(title: &str, snippet: &str) -> String {
    let lowered = title.to_ascii_lowercase();
    for separator in COMPANY_SEPARATORS {
        let Some(at) = lowered.rfind(separator) else {
            continue;
        };
        let rest = &title[at + separator.len()..];
        let company = rest.split('(').next().unwrap_or_default();
        let company = company.split('-').next().unwrap_or_default().trim();
        if !company.is_empty() {
            return company.to_string();
        }
    }

    let words: Vec<&str> = snippet.split_whitespace().collect();
    words
        .windows(2)
        .find(|pair| matches!(pair[0].to_lowercase().as_str(), "at" | "with"))
        .map(|pair| pair[1].trim_matches(|c: char| c == '.' || c == ','))
        .filter(|company| !company.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "Company Not Specified".to_string())
}

fn job_location(title: &str, snippet: &str, searched: Option<&str>) -> String {
    let text = format!("{} {}", title, snippet).to_lowercase();
    JOB_LOCATIONS
        .iter()
        .find(|keyword| text.contains(*keyword))
        .map(|keyword| title_case(keyword))
        .or_else(|| searched.map(title_case))
        .unwrap_or_else(|| "Location Not Specified".to_string())
}

fn job_source(url: &str) -> String {
    let Some(host) = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
    else {
        return "Other".to_string();
    };

    if let Some((_, name)) = JOB_SOURCES.iter().find(|(domain, _)| host.contains(domain)) {
        return name.to_string();
    }
    if host.contains("careers") || host.contains("jobs") {
        return CAREER_PAGE.to_string();
    }
    "Other".to_string()
}

fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|pattern| pattern.find(text))
        .map(|found| found.as_str().to_string())
}

fn posted_date(snippet: &str) -> String {
    first_match(&POSTED_DATE_PATTERNS, &snippet.to_lowercase())
        .unwrap_or_else(|| "Date Not Specified".to_string())
}

fn job_type(title: &str, snippet: &str) -> String {
    let text = format!("{} {}", title, snippet).to_lowercase();
    JOB_TYPES
        .iter()
        .find(|(pattern, _)| pattern.is_match(&text))
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| "Not Specified".to_string())
}

fn salary(snippet: &str) -> String {
    first_match(&SALARY_PATTERNS, &snippet.to_lowercase())
        .unwrap_or_else(|| "Salary Not Specified".to_string())
}

impl JobPosting {
    /// Builds a posting from a search result, before ranking.
    pub(crate) fn from_item(item: &SearchItem, searched_location: Option<&str>) -> Self {
        Self {
            title: clean_job_title(&item.title),
            url: item.link.clone(),
            snippet: item.snippet.clone(),
            company: hiring_company(&item.title, &item.snippet),
            location: job_location(&item.title, &item.snippet, searched_location),
            source: job_source(&item.link),
            posted_date: posted_date(&item.snippet),
            job_type: job_type(&item.title, &item.snippet),
            salary: salary(&item.snippet),
            relevance_score: 0,
        }
    }
}

/// Jaccard similarity of the word sets of two texts.
fn word_similarity(a: &str, b: &str) -> f64 {
    let a: HashSet<&str> = a.split_whitespace().collect();
    let b: HashSet<&str> = b.split_whitespace().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / a.union(&b).count() as f64
}

/// Same URL, or a near-identical title at the same company.
pub(crate) fn is_duplicate_job(job: &JobPosting, existing: &[JobPosting]) -> bool {
    let title = job.title.to_lowercase();
    existing.iter().any(|other| {
        other.url == job.url
            || (word_similarity(&title, &other.title.to_lowercase()) > DUPLICATE_TITLE_SIMILARITY
                && other.company.eq_ignore_ascii_case(&job.company))
    })
}

fn recency_bonus(posted_date: &str) -> u32 {
    let Some(caps) = POSTED_AGE.captures(posted_date) else {
        return 0;
    };
    let amount: u32 = caps[1].parse().unwrap_or(u32::MAX);
    match caps[2].chars().next() {
        Some('h') => 15,
        Some('d') if amount <= 1 => 10,
        Some('w') if amount <= 1 => 5,
        _ => 0,
    }
}

/// Scores how well a posting matches the searched company and location.
pub(crate) fn job_relevance(job: &JobPosting, company: &str, location: Option<&str>) -> u8 {
    let target = company.to_lowercase();
    let mut score = BASE_RELEVANCE;

    if !target.is_empty()
        && (job.company.to_lowercase().contains(&target)
            || job.title.to_lowercase().contains(&target))
    {
        score += 30;
    }
    if location.is_some_and(|l| job.location.to_lowercase().contains(&l.to_lowercase())) {
        score += 20;
    }
    score += SOURCE_SCORES
        .iter()
        .find(|(source, _)| *source == job.source)
        .map_or(10, |(_, bonus)| *bonus);
    score += recency_bonus(&job.posted_date);

    score.min(100) as u8
}

/// Scores every posting and sorts the best matches first.
pub(crate) fn rank_jobs(jobs: &mut [JobPosting], company: &str, location: Option<&str>) {
    for job in jobs.iter_mut() {
        job.relevance_score = job_relevance(job, company, location);
    }
    jobs.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
}

/// Searches job boards and career pages for openings at the company named in
/// `company_input`, which may carry a location ("Google India").
pub(crate) async fn search_jobs(
    search: &SearchClient,
    company_input: &str,
    max_results: usize,
) -> Vec<JobPosting> {
    let (company, location) = split_company_and_location(company_input);
    let location = location.as_deref();
    tracing::info!(target: "search_task",
        "Searching for jobs at: {}{}",
        company,
        location.map(|l| format!(" in {}", l)).unwrap_or_default()
    );

    let mut jobs: Vec<JobPosting> = Vec::new();
    for (i, strategy) in job_search_strategies(&company, location).iter().enumerate() {
        tracing::debug!(target: "search_task", "Trying job search strategy {}: {}", i + 1, strategy);
        let items = match search.raw_search(strategy, max_results).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(target: "search_task", "Job search strategy {} failed: {}", i + 1, e);
                continue;
            }
        };

        for item in items.iter().filter(|item| is_job_posting(item)) {
            let job = JobPosting::from_item(item, location);
            if !is_duplicate_job(&job, &jobs) {
                jobs.push(job);
            }
        }
        if jobs.len() >= max_results {
            break;
        }
    }

    jobs.truncate(max_results);
    rank_jobs(&mut jobs, &company, location);
    tracing::info!(target: "search_task", "Found {} unique job postings", jobs.len());
    jobs
}
