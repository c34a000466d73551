//! Mailbox verification over SMTP (EHLO, MAIL FROM, RCPT TO) without
//! sending any message.

use crate::config::Config;
use crate::dns::MailServer;
use crate::error::{AppError, Result};
use crate::models::SmtpVerificationResult;
use lettre::Address;
use lettre::transport::smtp::client::SmtpConnection;
use lettre::transport::smtp::commands::{Ehlo, Mail, Rcpt};
use lettre::transport::smtp::extension::ClientId;
use lettre::transport::smtp::response::{Code, Severity};
use rand::Rng;
use std::net::ToSocketAddrs;
use std::str::FromStr;
use std::time::Duration;

const REJECTION_PHRASES: &[&str] = &[
    "unknown",
    "no such",
    "unavailable",
    "rejected",
    "doesn't exist",
    "disabled",
    "invalid address",
    "recipient not found",
    "user unknown",
    "mailbox unavailable",
];

const NONEXISTENT_PHRASES: &[&str] = &[
    "does not exist",
    "no such user",
    "user unknown",
    "recipient not found",
    "NoSuchUser",
];

/// SMTP settings copied out of [`Config`] so probes can run on a blocking
/// thread.
#[derive(Debug, Clone)]
pub(crate) struct SmtpSettings {
    pub sender_email: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub sleep_between_attempts: (f32, f32),
}

impl From<&Config> for SmtpSettings {
    fn from(config: &Config) -> Self {
        Self {
            sender_email: config.smtp_sender_email.clone(),
            timeout: config.smtp_timeout,
            max_attempts: config.max_verification_attempts.max(1),
            sleep_between_attempts: config.sleep_between_requests,
        }
    }
}

impl SmtpSettings {
    fn retry_pause(&self) -> Duration {
        let (min, max) = self.sleep_between_attempts;
        if min >= max {
            return Duration::from_secs_f32(min.max(0.0));
        }
        Duration::from_secs_f32(rand::thread_rng().gen_range(min..max))
    }
}

/// One RCPT TO probe against one mail server. Blocking.
fn probe_mailbox(
    settings: &SmtpSettings,
    email: &str,
    domain: &str,
    mail_server: &str,
) -> Result<SmtpVerificationResult> {
    tracing::debug!(target: "smtp_task",
        "Starting SMTP check for {} via {} (Domain: {})", email, mail_server, domain
    );

    let recipient_address = match Address::from_str(email) {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(target: "smtp_task", "Invalid recipient email format '{}': {}", email, e);
            return Ok(SmtpVerificationResult::conclusive(
                false,
                format!("Invalid email format: {}", e),
            ));
        }
    };

    let sender_address = Address::from_str(&settings.sender_email)
        .map_err(|e| AppError::Config(format!("Invalid sender email in config: {}", e)))?;

    let Some(socket_addr) = (mail_server, 25_u16).to_socket_addrs()?.next() else {
        tracing::error!(target: "smtp_task", "Could not resolve mail server address: {}", mail_server);
        return Ok(SmtpVerificationResult::inconclusive_no_retry(format!(
            "Could not resolve mail server address: {}",
            mail_server
        )));
    };

    let helo_name = ClientId::Domain("localhost".to_string());

    let mut smtp_conn =
        match SmtpConnection::connect(socket_addr, Some(settings.timeout), &helo_name, None, None)
        {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(target: "smtp_task", "SMTP connection failed for {}: {}", mail_server, e);
                return Ok(classify_smtp_error(&e.to_string(), mail_server));
            }
        };

    if let Err(e) = smtp_conn.command(Ehlo::new(helo_name.clone())) {
        tracing::warn!(target: "smtp_task", "Initial EHLO failed: {}", e);
        return Ok(classify_smtp_error(&e.to_string(), mail_server));
    }

    match smtp_conn.command(Mail::new(Some(sender_address), vec![])) {
        Ok(response) if response.is_positive() => {
            tracing::debug!(target: "smtp_task", "MAIL FROM accepted by {}", mail_server);
        }
        Ok(response) => {
            tracing::error!(target: "smtp_task",
                "SMTP sender '{}' rejected by {}: {:?}", settings.sender_email, mail_server, response
            );
            smtp_conn.quit().ok();
            return Ok(SmtpVerificationResult::inconclusive_no_retry(format!(
                "MAIL FROM rejected: {} {}",
                response.code(),
                response.message().collect::<Vec<&str>>().join(" ")
            )));
        }
        Err(e) => {
            tracing::error!(target: "smtp_task", "Error during MAIL FROM on {}: {}", mail_server, e);
            smtp_conn.quit().ok();
            return Ok(classify_smtp_error(&e.to_string(), mail_server));
        }
    }

    let (target_code, target_message) =
        match smtp_conn.command(Rcpt::new(recipient_address, vec![])) {
            Ok(response) => (
                response.code(),
                response.message().collect::<Vec<&str>>().join(" "),
            ),
            Err(e) => {
                tracing::debug!(target: "smtp_task",
                    "RCPT TO for {} on {} failed: {}", email, mail_server, e
                );
                smtp_conn.quit().ok();
                return Ok(classify_smtp_error(&e.to_string(), mail_server));
            }
        };

    tracing::info!(target: "smtp_task",
        "RCPT TO:<{}> result: Code={}, Msg='{}'", email, target_code, target_message
    );

    let mut is_catch_all = false;
    if target_code.severity == Severity::PositiveCompletion {
        let random_user = format!(
            "no-reply-does-not-exist-{}@{}",
            rand::thread_rng().gen_range(100000..999999),
            domain
        );
        if let Ok(random_address) = Address::from_str(&random_user) {
            match smtp_conn.command(Rcpt::new(random_address, vec![])) {
                Ok(response) if response.code().severity == Severity::PositiveCompletion => {
                    is_catch_all = true;
                    tracing::warn!(target: "smtp_task",
                        "Domain {} appears to be a catch-all (accepted {})", domain, random_user
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(target: "smtp_task", "Catch-all probe failed (ignoring): {}", e);
                }
            }
        }
    }

    smtp_conn.quit().ok();
    Ok(interpret_rcpt(target_code, &target_message, is_catch_all))
}

/// Maps an RCPT TO reply to a verification result.
fn interpret_rcpt(code: Code, message: &str, is_catch_all: bool) -> SmtpVerificationResult {
    match code.severity {
        Severity::PositiveCompletion if is_catch_all => SmtpVerificationResult::inconclusive_retry(
            format!("SMTP accepted (Possible Catch-All): {} {}", code, message),
        ),
        Severity::PositiveCompletion => SmtpVerificationResult::conclusive(
            true,
            format!("SMTP Verification OK: {} {}", code, message),
        ),
        Severity::PositiveIntermediate => SmtpVerificationResult::inconclusive_retry(format!(
            "SMTP Unexpected Intermediate Code: {} {}",
            code, message
        )),
        Severity::TransientNegativeCompletion => SmtpVerificationResult::inconclusive_retry(
            format!("SMTP Temp Failure/Greylisted? (4xx): {} {}", code, message),
        ),
        Severity::PermanentNegativeCompletion => {
            let message_lower = message.to_lowercase();
            let user_unknown = [550, 551, 553].contains(&u16::from(code))
                || REJECTION_PHRASES.iter().any(|p| message_lower.contains(p));
            let reason = if user_unknown {
                "User Likely Unknown"
            } else {
                "Policy/Other 5xx"
            };
            SmtpVerificationResult::conclusive(
                false,
                format!("SMTP Rejected ({}): {} {}", reason, code, message),
            )
        }
    }
}

/// Interprets a transport or protocol error from `lettre`.
fn classify_smtp_error(err_string: &str, server: &str) -> SmtpVerificationResult {
    if err_string.contains("550") && NONEXISTENT_PHRASES.iter().any(|p| err_string.contains(p)) {
        return SmtpVerificationResult::conclusive(
            false,
            format!("SMTP Rejected (User Does Not Exist): {}", err_string),
        );
    }

    let lower = err_string.to_lowercase();
    if lower.contains("temporary") || lower.contains("transient") {
        return SmtpVerificationResult::inconclusive_retry(format!(
            "SMTP Transient Error: {}",
            err_string
        ));
    }
    if lower.contains("permanent") {
        return SmtpVerificationResult::inconclusive_no_retry(format!(
            "SMTP Permanent Error: {}",
            err_string
        ));
    }
    if lower.contains("connection refused") {
        return SmtpVerificationResult::inconclusive_no_retry(format!(
            "Connection refused by {}",
            server
        ));
    }
    if lower.contains("connection reset") {
        return SmtpVerificationResult::inconclusive_retry(format!(
            "Connection reset by {}",
            server
        ));
    }
    if lower.contains("timed out") {
        return SmtpVerificationResult::inconclusive_no_retry(
            "SMTP connection timed out (port 25 may be blocked)".to_string(),
        );
    }
    if lower.contains("tls") {
        return SmtpVerificationResult::inconclusive_retry(format!("SMTP TLS Error: {}", err_string));
    }

    tracing::error!(target: "smtp_task", "Unhandled SMTP Error ({}) : {}", server, err_string);
    SmtpVerificationResult::inconclusive_retry(format!("Unhandled SMTP Error: {}", err_string))
}

/// Verifies one address against one mail server, retrying inconclusive
/// results up to the configured number of attempts.
async fn verify_with_retries(
    settings: &SmtpSettings,
    email: &str,
    domain: &str,
    mail_server: &str,
) -> SmtpVerificationResult {
    let mut last = SmtpVerificationResult::inconclusive_no_retry(
        "SMTP check did not run or complete".to_string(),
    );

    for attempt in 1..=settings.max_attempts {
        tracing::debug!(target: "smtp_task",
            "Attempt {}/{} SMTP check for {} via {}", attempt, settings.max_attempts, email, mail_server
        );

        let probe_settings = settings.clone();
        let (probe_email, probe_domain, probe_server) =
            (email.to_string(), domain.to_string(), mail_server.to_string());
        let outcome = tokio::task::spawn_blocking(move || {
            probe_mailbox(&probe_settings, &probe_email, &probe_domain, &probe_server)
        })
        .await
        .map_err(|e| AppError::Task(e.to_string()))
        .and_then(|result| result);

        match outcome {
            Ok(result) => {
                let stop = result.exists.is_some() || !result.should_retry;
                last = result;
                if stop {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(target: "smtp_task", "SMTP verification attempt {} failed: {}", attempt, e);
                last = SmtpVerificationResult::inconclusive_no_retry(format!(
                    "Internal error during SMTP check: {}",
                    e
                ));
                break;
            }
        }

        if attempt < settings.max_attempts {
            tokio::time::sleep(settings.retry_pause()).await;
        }
    }

    last
}

/// True when any of `hosts` confirms the mailbox exists.
///
/// Hosts are tried in order; the first conclusive answer wins.
pub(crate) async fn mailbox_exists(
    settings: &SmtpSettings,
    email: &str,
    domain: &str,
    hosts: &[MailServer],
) -> bool {
    for host in hosts {
        let result = verify_with_retries(settings, email, domain, &host.exchange).await;
        tracing::debug!(target: "smtp_task", "{} via {}: {}", email, host.exchange, result.message);
        if let Some(exists) = result.exists {
            if exists {
                tracing::info!(target: "smtp_task", "Valid email found: {}", email);
            }
            return exists;
        }
    }
    false
}
