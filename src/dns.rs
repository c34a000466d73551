//! Mail server discovery (MX records, A record fallback) for the contact
//! service.

use crate::config::Config;
use crate::domain::alternative_domains;
use crate::error::{AppError, Result};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::config::{
    LookupIpStrategy, NameServerConfig, Protocol, ResolverConfig, ResolverOpts,
};
use trust_dns_resolver::error::ResolveError;

/// A mail exchanger for a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MailServer {
    /// Hostname or IP address of the mail server.
    pub exchange: String,
    /// MX preference (lower is preferred). `u16::MAX` when taken from an A record.
    pub preference: u16,
}

/// Mail servers found for the domain that ended up being used.
#[derive(Debug, Clone)]
pub(crate) struct MailRoute {
    pub domain: String,
    pub hosts: Vec<MailServer>,
}

/// What went wrong with a lookup, independent of the resolver's error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupFailure {
    NoRecords,
    NxDomain,
    Timeout,
    Other,
}

fn classify_failure(description: &str) -> LookupFailure {
    if description.contains("NXDomain") || description.contains("Name does not exist") {
        LookupFailure::NxDomain
    } else if description.contains("NoRecordsFound") {
        LookupFailure::NoRecords
    } else if description.contains("Timeout") {
        LookupFailure::Timeout
    } else {
        LookupFailure::Other
    }
}

/// Name server list for `servers`, each reachable over UDP with TCP fallback.
fn build_resolver_config(servers: &[String]) -> Result<ResolverConfig> {
    let mut resolver_config = ResolverConfig::new();

    for server_str in servers {
        let ip_addr = IpAddr::from_str(server_str).map_err(|e| {
            tracing::error!("Invalid DNS server IP address in config: '{}' - {}", server_str, e);
            AppError::Config(format!("Invalid DNS server IP address: {}", server_str))
        })?;
        let socket_addr = SocketAddr::new(ip_addr, 53);
        for protocol in [Protocol::Udp, Protocol::Tcp] {
            resolver_config.add_name_server(NameServerConfig {
                socket_addr,
                protocol,
                tls_dns_name: None,
                trust_negative_responses: true,
                bind_addr: None,
            });
        }
    }

    Ok(resolver_config)
}

/// Creates a resolver using the configured name servers and timeout.
pub(crate) fn create_resolver(config: &Config) -> Result<TokioAsyncResolver> {
    let resolver_config = build_resolver_config(&config.dns_servers)?;

    let mut resolver_opts = ResolverOpts::default();
    resolver_opts.timeout = config.dns_timeout;
    resolver_opts.attempts = 2;
    resolver_opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;

    tracing::debug!("DNS resolver configured with {} servers", config.dns_servers.len());
    Ok(TokioAsyncResolver::tokio(resolver_config, resolver_opts))
}

/// Resolves every mail server of `domain`, most preferred first.
///
/// MX records are used when present; otherwise the domain's first A/AAAA
/// address stands in as the mail server.
///
/// # Returns
/// * `Err(AppError::NxDomain)`, `Err(AppError::NoDnsRecords)` or
///   `Err(AppError::DnsTimeout)` for the corresponding resolver outcomes.
pub(crate) async fn resolve_mail_servers(
    resolver: &TokioAsyncResolver,
    domain: &str,
) -> Result<Vec<MailServer>> {
    tracing::debug!("Performing DNS MX lookup for {}", domain);

    let mx_response = match resolver.mx_lookup(domain).await {
        Ok(response) => response,
        Err(e) => {
            return match classify_failure(&format!("{:?}", e.kind())) {
                LookupFailure::NoRecords => {
                    tracing::warn!("No MX records for {}. Trying A record fallback...", domain);
                    resolve_a_record_fallback(resolver, domain).await
                }
                failure => Err(lookup_error(failure, domain, e)),
            };
        }
    };

    let mut hosts: Vec<MailServer> = mx_response
        .iter()
        .map(|mx| MailServer {
            exchange: mx.exchange().to_utf8().trim_end_matches('.').to_string(),
            preference: mx.preference(),
        })
        .filter(|server| !server.exchange.is_empty())
        .collect();

    if hosts.is_empty() {
        tracing::warn!("MX lookup for {} yielded no usable records", domain);
        return resolve_a_record_fallback(resolver, domain).await;
    }

    hosts.sort_by_key(|server| server.preference);
    tracing::info!(
        "Found {} MX hosts for {} (best: {}, pref {})",
        hosts.len(),
        domain,
        hosts[0].exchange,
        hosts[0].preference
    );
    Ok(hosts)
}

async fn resolve_a_record_fallback(
    resolver: &TokioAsyncResolver,
    domain: &str,
) -> Result<Vec<MailServer>> {
    tracing::debug!("Attempting A record fallback for {}", domain);
    match resolver.lookup_ip(domain).await {
        Ok(response) => match response.iter().next() {
            Some(ip_addr) => {
                tracing::info!("Using A record for {} as mail server: {}", domain, ip_addr);
                Ok(vec![MailServer {
                    exchange: ip_addr.to_string(),
                    preference: u16::MAX,
                }])
            }
            None => {
                tracing::error!("No MX or A records found for {}", domain);
                Err(AppError::NoDnsRecords(domain.to_string()))
            }
        },
        Err(e) => Err(lookup_error(
            classify_failure(&format!("{:?}", e.kind())),
            domain,
            e,
        )),
    }
}

fn lookup_error(failure: LookupFailure, domain: &str, error: ResolveError) -> AppError {
    match failure {
        LookupFailure::NoRecords => AppError::NoDnsRecords(domain.to_string()),
        LookupFailure::NxDomain => {
            tracing::error!("Domain {} does not exist (NXDOMAIN)", domain);
            AppError::NxDomain(domain.to_string())
        }
        LookupFailure::Timeout => {
            tracing::error!("DNS resolution timeout for {}", domain);
            AppError::DnsTimeout(domain.to_string())
        }
        LookupFailure::Other => {
            tracing::error!("Unexpected DNS resolution error for {}: {}", domain, error);
            AppError::Dns(error)
        }
    }
}

/// Finds mail servers for `domain`, trying its alternative spellings when
/// the domain itself has none.
///
/// Returns `None` when neither the domain nor any alternative resolves.
pub(crate) async fn resolve_mail_route(
    resolver: &TokioAsyncResolver,
    domain: &str,
) -> Option<MailRoute> {
    let candidates = std::iter::once(domain.to_string()).chain(alternative_domains(domain));

    for candidate in candidates {
        match resolve_mail_servers(resolver, &candidate).await {
            Ok(hosts) => {
                if candidate != domain {
                    tracing::info!("Using alternative domain {} for {}", candidate, domain);
                }
                return Some(MailRoute {
                    domain: candidate,
                    hosts,
                });
            }
            Err(e) => tracing::debug!("No mail route via {}: {}", candidate, e),
        }
    }

    tracing::warn!("Could not find mail servers for {} or alternatives", domain);
    None
}
