use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod client;
mod config;
mod dns;
mod domain;
mod error;
mod jobs;
mod lookup;
mod models;
mod name;
mod patterns;
mod phones;
mod scoring;
mod scraper;
mod search;
mod smtp;

use crate::client::ContactClient;
use crate::config::{ConfigArgs, build_config};
use crate::lookup::{ContactLookup, ProfileSession};
use crate::models::{ContactReport, RecruiterProfile};
use crate::name::{ParsedName, parse_profile_title};
use crate::search::SearchClient;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search LinkedIn for recruiters at a company (e.g. "Google India")
    Search {
        #[arg(short, long)]
        company: String,

        /// Maximum number of profiles (defaults to the configured limit)
        #[arg(short, long)]
        max: Option<usize>,
    },
    /// Guess and verify email addresses for a profile title
    Lookup {
        /// Profile title, e.g. "Sarah Johnson - Technical Recruiter at Google"
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        company: String,

        /// Company domain or website, skipping name-based resolution
        #[arg(short, long)]
        domain: Option<String>,
    },
    /// Find and score phone numbers for a profile title
    Phone {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        company: String,
    },
    /// Search recruiters, then look up emails and phones for each of them
    Batch {
        #[arg(short, long)]
        company: String,

        #[arg(short, long)]
        max: Option<usize>,

        /// Number of profiles processed at once
        #[arg(short, long, default_value_t = 3)]
        workers: usize,
    },
    /// Search job boards and career pages for openings at a company
    Jobs {
        #[arg(short, long)]
        company: String,

        /// Restrict postings to a location, e.g. "Bangalore"
        #[arg(short, long)]
        location: Option<String>,

        #[arg(short, long, default_value_t = jobs::DEFAULT_MAX_JOBS)]
        max: usize,
    },
    /// Start the contact-discovery service
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 5000)]
        port: u16,
    },
}

/// A search hit together with the name parsed from its title.
#[derive(Serialize)]
struct ProfileSummary {
    #[serde(flatten)]
    profile: RecruiterProfile,
    name: ParsedName,
}

#[derive(Serialize)]
struct BatchEntry {
    profile: RecruiterProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    emails: Option<ContactReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phones: Option<ContactReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

impl BatchEntry {
    fn new(profile: RecruiterProfile) -> Self {
        Self {
            profile,
            emails: None,
            phones: None,
            errors: Vec::new(),
        }
    }

    fn record(
        &mut self,
        action: &str,
        outcome: error::Result<Option<ContactReport>>,
    ) -> Option<ContactReport> {
        match outcome {
            Ok(Some(report)) => Some(report),
            Ok(None) => {
                self.errors.push(format!("{} lookup interrupted", action));
                None
            }
            Err(e) => {
                self.errors.push(format!("{} lookup failed: {}", action, e));
                None
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli.config).context("Failed to load configuration")?;

    match cli.command {
        Commands::Search { company, max } => {
            let search = SearchClient::new(&config)?;
            let profiles = search
                .search_recruiters(&company, max.unwrap_or(config.max_search_results))
                .await;
            let summaries: Vec<ProfileSummary> = profiles
                .into_iter()
                .map(|profile| ProfileSummary {
                    name: parse_profile_title(&profile.title),
                    profile,
                })
                .collect();
            print_json(&summaries)?;
        }
        Commands::Lookup {
            title,
            company,
            domain,
        } => {
            let client = ContactClient::new(&config)?;
            info!("Using contact service at {}", client.base_url());
            let report = ContactLookup::new(client)
                .find_emails(&title, &company, domain.as_deref())
                .await?;
            print_json(&report)?;
        }
        Commands::Phone { title, company } => {
            let lookup = ContactLookup::new(ContactClient::new(&config)?);
            let report = lookup.find_phones(&title, &company).await?;
            print_json(&report)?;
        }
        Commands::Batch {
            company,
            max,
            workers,
        } => {
            let entries =
                run_batch(&config, &company, max.unwrap_or(config.max_search_results), workers)
                    .await?;
            print_json(&entries)?;
        }
        Commands::Jobs {
            company,
            location,
            max,
        } => {
            let search = SearchClient::new(&config)?;
            let search_term = match location {
                Some(location) => format!("{} {}", company, location),
                None => company,
            };
            let postings = jobs::search_jobs(&search, &search_term, max.max(1)).await;
            print_json(&postings)?;
        }
        Commands::Serve { port } => {
            info!("Starting contact service on port {}", port);
            api::start_api_server(&config, port).await?;
        }
    }

    Ok(())
}

async fn run_batch(
    config: &config::Config,
    company: &str,
    max_results: usize,
    workers: usize,
) -> Result<Vec<BatchEntry>> {
    let search = SearchClient::new(config)?;
    let lookup = ContactLookup::new(ContactClient::new(config)?);

    let profiles = search.search_recruiters(company, max_results).await;
    info!("Looking up contacts for {} profiles", profiles.len());

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let sessions: Vec<Arc<ProfileSession>> = profiles
        .iter()
        .map(|profile| Arc::new(ProfileSession::new(profile.title.clone(), company)))
        .collect();

    let progress_bar = indicatif::ProgressBar::new(profiles.len() as u64);
    progress_bar.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    // Ctrl-C stops new lookups and discards replies still in flight.
    let interrupt_watcher = {
        let sessions = sessions.clone();
        let semaphore = semaphore.clone();
        let progress_bar = progress_bar.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                semaphore.close();
                sessions.iter().for_each(|session| session.supersede_all());
                progress_bar.set_message("interrupted");
            }
        })
    };

    let tasks = profiles.into_iter().zip(sessions).map(|(profile, session)| {
        let lookup = lookup.clone();
        let semaphore = semaphore.clone();
        let progress_bar = progress_bar.clone();

        tokio::spawn(async move {
            process_profile(profile, &session, &lookup, &semaphore, &progress_bar).await
        })
    });

    let mut entries = Vec::new();
    for joined in join_all(tasks).await {
        entries.push(joined.context("Lookup task panicked")?);
    }

    interrupt_watcher.abort();
    progress_bar.finish_with_message("Processing complete");
    Ok(entries)
}

/// Runs both lookups for one profile once a worker slot is free. Every
/// profile advances the progress bar, including ones skipped after an
/// interrupt.
async fn process_profile(
    profile: RecruiterProfile,
    session: &ProfileSession,
    lookup: &ContactLookup,
    semaphore: &Semaphore,
    progress_bar: &indicatif::ProgressBar,
) -> BatchEntry {
    let mut entry = BatchEntry::new(profile);
    let Ok(_permit) = semaphore.acquire().await else {
        entry.errors.push("batch interrupted".to_string());
        progress_bar.inc(1);
        return entry;
    };

    let (emails, phones) = tokio::join!(
        session.lookup_emails(lookup, None),
        session.lookup_phones(lookup)
    );
    entry.emails = entry.record("email", emails);
    entry.phones = entry.record("phone", phones);
    progress_bar.inc(1);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{client_for, spawn_mock_service};
    use warp::http::StatusCode;

    fn profile(title: &str) -> RecruiterProfile {
        RecruiterProfile {
            title: title.to_string(),
            url: "https://www.linkedin.com/in/someone".to_string(),
            snippet: String::new(),
            location_searched: None,
        }
    }

    #[tokio::test]
    async fn test_interrupted_profiles_still_advance_progress() {
        let lookup = ContactLookup::new(ContactClient::new(&config::Config::default()).unwrap());
        let semaphore = Semaphore::new(1);
        semaphore.close();
        let progress_bar = indicatif::ProgressBar::hidden();
        progress_bar.set_length(2);

        for title in ["Sarah Johnson - Recruiter", "Priya Rao - Talent Partner"] {
            let session = ProfileSession::new(title, "Google");
            let entry =
                process_profile(profile(title), &session, &lookup, &semaphore, &progress_bar).await;
            assert_eq!(entry.errors, vec!["batch interrupted".to_string()]);
            assert!(entry.emails.is_none() && entry.phones.is_none());
        }
        assert_eq!(progress_bar.position(), 2);
    }

    #[tokio::test]
    async fn test_process_profile_records_both_lookups() {
        let addr = spawn_mock_service(
            StatusCode::OK,
            serde_json::json!({
                "valid_emails": ["sarah.johnson@google.com"],
                "phone_numbers": ["+1 650 253 0000 (Main)"]
            }),
        )
        .await;
        let lookup = ContactLookup::new(client_for(addr));
        let semaphore = Semaphore::new(1);
        let progress_bar = indicatif::ProgressBar::hidden();
        let title = "Sarah Johnson - Technical Recruiter at Google";
        let session = ProfileSession::new(title, "Google");

        let entry =
            process_profile(profile(title), &session, &lookup, &semaphore, &progress_bar).await;

        assert!(entry.errors.is_empty());
        assert_eq!(entry.emails.unwrap().contacts.len(), 1);
        assert_eq!(entry.phones.unwrap().contacts.len(), 1);
        assert_eq!(progress_bar.position(), 1);
    }
}
