//! Defines the configuration settings for the recruiter-sleuth application.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! command line arguments and environment variables. The result is a plain
//! [`Config`] value handed to each component at startup.

use crate::error::AppError;
use anyhow::Context;
use clap::{Args, ValueEnum};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Service base URL used when running against a local backend.
pub(crate) const DEVELOPMENT_API_URL: &str = "http://localhost:5000";

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["./recruiter-sleuth.toml", "./config.toml"];

/// Deployment environment the client talks to.
#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Environment {
    #[default]
    Development,
    Production,
}

/// Settings shared by every subcommand.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct ConfigArgs {
    /// Path to configuration file (TOML format)
    #[arg(long, global = true, env = "RECRUITER_SLEUTH_CONFIG")]
    pub config_file: Option<String>,

    /// Environment used to pick the contact service URL
    #[arg(long, global = true, value_enum, env = "RECRUITER_SLEUTH_ENV")]
    pub environment: Option<Environment>,

    /// Explicit contact service base URL (overrides the environment)
    #[arg(long, global = true, env = "RECRUITER_SLEUTH_API_URL")]
    pub api_url: Option<String>,

    /// Contact service base URL used in production
    #[arg(long, global = true, env = "RECRUITER_SLEUTH_PRODUCTION_API_URL")]
    pub production_api_url: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, env = "RECRUITER_SLEUTH_REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,

    /// User agent string for HTTP requests
    #[arg(long, global = true, env = "RECRUITER_SLEUTH_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Google Custom Search API key
    #[arg(long, global = true, env = "GOOGLE_CUSTOM_SEARCH_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    /// Google Custom Search engine id
    #[arg(long, global = true, env = "GOOGLE_CUSTOM_SEARCH_ENGINE_ID")]
    pub google_search_engine_id: Option<String>,

    /// Comma-separated list of DNS servers
    #[arg(long, global = true, env = "RECRUITER_SLEUTH_DNS_SERVERS")]
    pub dns_servers: Option<String>,

    /// DNS resolution timeout in seconds
    #[arg(long, global = true, env = "RECRUITER_SLEUTH_DNS_TIMEOUT")]
    pub dns_timeout: Option<u64>,

    /// SMTP connection timeout in seconds
    #[arg(long, global = true, env = "RECRUITER_SLEUTH_SMTP_TIMEOUT")]
    pub smtp_timeout: Option<u64>,

    /// Sender email address for SMTP verification
    #[arg(long, global = true, env = "RECRUITER_SLEUTH_SMTP_SENDER")]
    pub smtp_sender: Option<String>,

    /// Maximum number of SMTP verification attempts
    #[arg(long, global = true, env = "RECRUITER_SLEUTH_MAX_VERIFICATION_ATTEMPTS")]
    pub max_verification_attempts: Option<u32>,
}

/// TOML Configuration file structure
#[derive(Deserialize, Debug, Default)]
struct ConfigFile {
    service: Option<ServiceConfig>,
    search: Option<SearchConfig>,
    network: Option<NetworkConfig>,
    dns: Option<DnsConfig>,
    smtp: Option<SmtpConfig>,
}

#[derive(Deserialize, Debug, Default)]
struct ServiceConfig {
    environment: Option<Environment>,
    api_url: Option<String>,
    production_api_url: Option<String>,
    max_concurrent_requests: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
struct SearchConfig {
    api_key: Option<String>,
    search_engine_id: Option<String>,
    max_results: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
struct NetworkConfig {
    request_timeout: Option<u64>,
    min_sleep: Option<f32>,
    max_sleep: Option<f32>,
    user_agent: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct DnsConfig {
    dns_timeout: Option<u64>,
    dns_servers: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
struct SmtpConfig {
    smtp_timeout: Option<u64>,
    smtp_sender_email: Option<String>,
    max_verification_attempts: Option<u32>,
}

/// Application configuration settings.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    /// Environment used for service URL resolution.
    pub environment: Environment,
    /// Explicit service URL, taking precedence over the environment.
    pub api_url_override: Option<String>,
    /// Service URL used when the environment is production.
    pub production_api_url: Option<String>,
    /// Maximum number of lookups the service handles at once.
    pub max_concurrent_requests: usize,
    /// Google Custom Search API key.
    pub google_api_key: Option<String>,
    /// Google Custom Search engine id.
    pub google_search_engine_id: Option<String>,
    /// Maximum number of recruiter profiles returned by a search.
    pub max_search_results: usize,
    /// Timeout for individual HTTP requests.
    pub request_timeout: Duration,
    /// Minimum and maximum sleep duration between outbound probes (seconds).
    pub sleep_between_requests: (f32, f32),
    /// User agent string to use for HTTP requests.
    pub user_agent: String,
    /// DNS servers to use for resolution.
    pub dns_servers: Vec<String>,
    /// Timeout for DNS resolution queries.
    pub dns_timeout: Duration,
    /// Timeout for establishing SMTP connections and individual commands.
    pub smtp_timeout: Duration,
    /// Sender email address to use in the SMTP MAIL FROM command.
    pub smtp_sender_email: String,
    /// Maximum number of SMTP verification attempts for an inconclusive email.
    pub max_verification_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            environment: Environment::Development,
            api_url_override: None,
            production_api_url: None,
            max_concurrent_requests: 10,
            google_api_key: None,
            google_search_engine_id: None,
            max_search_results: 10,
            request_timeout: Duration::from_secs(30),
            sleep_between_requests: (0.1, 0.5),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36".to_string(),
            dns_servers: vec![
                "8.8.8.8".to_string(),
                "8.8.4.4".to_string(),
                "1.1.1.1".to_string(),
                "1.0.0.1".to_string(),
            ],
            dns_timeout: Duration::from_secs(5),
            smtp_timeout: Duration::from_secs(10),
            smtp_sender_email: "no-reply@recruiter-sleuth.example".to_string(),
            max_verification_attempts: 2,
        }
    }
}

impl Config {
    /// Base URL of the contact service for this configuration.
    pub(crate) fn api_base_url(&self) -> crate::error::Result<String> {
        resolve_api_base_url(
            self.api_url_override.as_deref(),
            self.environment,
            self.production_api_url.as_deref(),
        )
    }

    /// Google Custom Search credentials, when both halves are present.
    pub(crate) fn search_credentials(&self) -> Option<(&str, &str)> {
        match (&self.google_api_key, &self.google_search_engine_id) {
            (Some(key), Some(cx)) if !key.is_empty() && !cx.is_empty() => {
                Some((key.as_str(), cx.as_str()))
            }
            _ => None,
        }
    }
}

/// Picks the contact service base URL.
///
/// An explicit URL always wins. Otherwise production requires a configured
/// production URL and development uses [`DEVELOPMENT_API_URL`]. Trailing
/// slashes are removed so paths can be appended directly.
pub(crate) fn resolve_api_base_url(
    explicit: Option<&str>,
    environment: Environment,
    production_url: Option<&str>,
) -> crate::error::Result<String> {
    fn non_empty(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    let url = match (non_empty(explicit), environment) {
        (Some(url), _) => url,
        (None, Environment::Production) => non_empty(production_url).ok_or_else(|| {
            AppError::Config("production environment requires a production API URL".to_string())
        })?,
        (None, Environment::Development) => DEVELOPMENT_API_URL,
    };

    Ok(url.trim_end_matches('/').to_string())
}

/// Load configuration from a TOML file
fn load_config_file(file_path: &str) -> anyhow::Result<ConfigFile> {
    let path = Path::new(file_path);
    if !path.exists() {
        tracing::warn!("Configuration file {} not found, using defaults", file_path);
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", file_path))?;

    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML configuration from {}", file_path))?;

    tracing::info!("Loaded configuration from {}", file_path);
    Ok(config)
}

fn apply_file_config(config: &mut Config, file_config: &ConfigFile) {
    if let Some(service) = &file_config.service {
        if let Some(environment) = service.environment {
            config.environment = environment;
        }
        if let Some(url) = &service.api_url {
            config.api_url_override = Some(url.clone());
        }
        if let Some(url) = &service.production_api_url {
            config.production_api_url = Some(url.clone());
        }
        if let Some(max) = service.max_concurrent_requests {
            config.max_concurrent_requests = max;
        }
    }

    if let Some(search) = &file_config.search {
        if let Some(key) = &search.api_key {
            config.google_api_key = Some(key.clone());
        }
        if let Some(cx) = &search.search_engine_id {
            config.google_search_engine_id = Some(cx.clone());
        }
        if let Some(max) = search.max_results {
            config.max_search_results = max;
        }
    }

    if let Some(network) = &file_config.network {
        if let Some(timeout) = network.request_timeout {
            config.request_timeout = Duration::from_secs(timeout);
        }
        if let Some(min_sleep) = network.min_sleep {
            config.sleep_between_requests.0 = min_sleep;
        }
        if let Some(max_sleep) = network.max_sleep {
            config.sleep_between_requests.1 = max_sleep;
        }
        if let Some(user_agent) = &network.user_agent {
            config.user_agent = user_agent.clone();
        }
    }

    if let Some(dns) = &file_config.dns {
        if let Some(timeout) = dns.dns_timeout {
            config.dns_timeout = Duration::from_secs(timeout);
        }
        if let Some(servers) = &dns.dns_servers {
            config.dns_servers = servers.clone();
        }
    }

    if let Some(smtp) = &file_config.smtp {
        if let Some(timeout) = smtp.smtp_timeout {
            config.smtp_timeout = Duration::from_secs(timeout);
        }
        if let Some(sender) = &smtp.smtp_sender_email {
            config.smtp_sender_email = sender.clone();
        }
        if let Some(attempts) = smtp.max_verification_attempts {
            config.max_verification_attempts = attempts;
        }
    }
}

/// Apply command line arguments to the Config instance
fn apply_cli_args(config: &mut Config, args: &ConfigArgs) {
    if let Some(environment) = args.environment {
        config.environment = environment;
    }
    if let Some(ref url) = args.api_url {
        config.api_url_override = Some(url.clone());
    }
    if let Some(ref url) = args.production_api_url {
        config.production_api_url = Some(url.clone());
    }
    if let Some(timeout) = args.request_timeout {
        config.request_timeout = Duration::from_secs(timeout);
    }
    if let Some(ref agent) = args.user_agent {
        config.user_agent = agent.clone();
    }
    if let Some(ref key) = args.google_api_key {
        config.google_api_key = Some(key.clone());
    }
    if let Some(ref cx) = args.google_search_engine_id {
        config.google_search_engine_id = Some(cx.clone());
    }
    if let Some(ref servers) = args.dns_servers {
        config.dns_servers = servers
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(timeout) = args.dns_timeout {
        config.dns_timeout = Duration::from_secs(timeout);
    }
    if let Some(timeout) = args.smtp_timeout {
        config.smtp_timeout = Duration::from_secs(timeout);
    }
    if let Some(ref sender) = args.smtp_sender {
        config.smtp_sender_email = sender.clone();
    }
    if let Some(attempts) = args.max_verification_attempts {
        config.max_verification_attempts = attempts;
    }
}

fn validate_config(config: &mut Config) {
    if config.sleep_between_requests.0 > config.sleep_between_requests.1 {
        config.sleep_between_requests.1 = config.sleep_between_requests.0;
        tracing::warn!(
            "Min sleep was greater than max sleep. Setting both to {}",
            config.sleep_between_requests.0
        );
    }

    if config.dns_servers.is_empty() {
        config.dns_servers = vec!["8.8.8.8".to_string(), "1.1.1.1".to_string()];
        tracing::warn!("DNS servers list was empty. Setting to default public DNS servers.");
    }

    if config.max_verification_attempts == 0 {
        config.max_verification_attempts = 1;
        tracing::warn!("Verification attempts was set to 0. Setting to 1.");
    }

    if config.max_concurrent_requests == 0 {
        config.max_concurrent_requests = 1;
        tracing::warn!("Concurrency was set to 0. Setting to 1.");
    }

    if config.max_search_results == 0 {
        config.max_search_results = 10;
        tracing::warn!("Max search results was set to 0. Setting to 10.");
    }
}

/// Builds the configuration from defaults, a TOML file and `args`.
pub(crate) fn build_config(args: &ConfigArgs) -> anyhow::Result<Config> {
    let mut config = Config::default();

    if let Some(ref file_path) = args.config_file {
        let file_config = load_config_file(file_path)?;
        apply_file_config(&mut config, &file_config);
    } else if let Some(path) = DEFAULT_CONFIG_PATHS
        .iter()
        .find(|path| Path::new(path).exists())
    {
        match load_config_file(path) {
            Ok(file_config) => apply_file_config(&mut config, &file_config),
            Err(e) => tracing::warn!("Failed to load configuration from {}: {}", path, e),
        }
    }

    apply_cli_args(&mut config, args);
    validate_config(&mut config);

    tracing::debug!(
        "Final configuration: environment={:?}, search_configured={}, dns_servers={:?}",
        config.environment,
        config.search_credentials().is_some(),
        config.dns_servers
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_api_base_url() {
        assert_eq!(
            resolve_api_base_url(None, Environment::Development, None).unwrap(),
            DEVELOPMENT_API_URL
        );
        assert_eq!(
            resolve_api_base_url(
                None,
                Environment::Production,
                Some("https://api.example.com/")
            )
            .unwrap(),
            "https://api.example.com"
        );
        assert_eq!(
            resolve_api_base_url(
                Some("http://127.0.0.1:9000"),
                Environment::Production,
                Some("https://api.example.com")
            )
            .unwrap(),
            "http://127.0.0.1:9000"
        );
        assert!(matches!(
            resolve_api_base_url(Some("  "), Environment::Production, None),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_resolve_api_base_url_trims_padded_values() {
        assert_eq!(
            resolve_api_base_url(
                Some("  http://localhost:8080/  "),
                Environment::Development,
                None
            )
            .unwrap(),
            "http://localhost:8080"
        );
        assert_eq!(
            resolve_api_base_url(None, Environment::Production, Some(" https://api.example.com "))
                .unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn test_file_then_cli_precedence() {
        let file_config: ConfigFile = toml::from_str(
            r#"
            [service]
            environment = "production"
            production_api_url = "https://api.example.com"

            [search]
            api_key = "file-key"
            search_engine_id = "file-cx"
            max_results = 4

            [network]
            request_timeout = 12
            min_sleep = 2.0
            max_sleep = 1.0
            "#,
        )
        .unwrap();

        let mut config = Config::default();
        apply_file_config(&mut config, &file_config);
        let args = ConfigArgs {
            google_api_key: Some("cli-key".to_string()),
            dns_servers: Some(" 9.9.9.9, ,1.1.1.1".to_string()),
            ..ConfigArgs::default()
        };
        apply_cli_args(&mut config, &args);
        validate_config(&mut config);

        assert_eq!(config.api_base_url().unwrap(), "https://api.example.com");
        assert_eq!(config.search_credentials(), Some(("cli-key", "file-cx")));
        assert_eq!(config.max_search_results, 4);
        assert_eq!(config.request_timeout, Duration::from_secs(12));
        assert_eq!(config.sleep_between_requests, (2.0, 2.0));
        assert_eq!(config.dns_servers, vec!["9.9.9.9", "1.1.1.1"]);
    }

    #[test]
    fn test_validate_fixes_degenerate_values() {
        let mut config = Config {
            dns_servers: vec![],
            max_verification_attempts: 0,
            max_concurrent_requests: 0,
            ..Config::default()
        };
        validate_config(&mut config);
        assert!(!config.dns_servers.is_empty());
        assert_eq!(config.max_verification_attempts, 1);
        assert_eq!(config.max_concurrent_requests, 1);
    }
}
