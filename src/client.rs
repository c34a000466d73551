//! Client for the contact-discovery service.
//!
//! The service owns pattern generation and verification; this side only
//! shapes requests and interprets replies.

use crate::config::Config;
use crate::error::{AppError, CONTACT_LOOKUP_FALLBACK, PHONE_LOOKUP_FALLBACK, Result};
use crate::models::{
    ContactLookupRequest, ContactLookupResponse, LookupOutcome, PhoneLookupRequest,
    PhoneLookupResponse, ServiceErrorBody,
};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub(crate) const CONTACT_LOOKUP_PATH: &str = "contact-lookup";
pub(crate) const PHONE_LOOKUP_PATH: &str = "phone-lookup";

#[derive(Debug, Clone)]
pub(crate) struct ContactClient {
    http_client: Arc<Client>,
    base_url: String,
}

impl ContactClient {
    /// Creates a client for the service URL resolved from `config`.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let base_url = config.api_base_url()?;
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                AppError::Generic(anyhow::anyhow!("Failed to build HTTP client: {}", e))
            })?;

        tracing::debug!(target: "client_task", "Contact service at {}", base_url);
        Ok(Self {
            http_client: Arc::new(http_client),
            base_url,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Asks the service to find and verify email addresses for a person.
    ///
    /// # Returns
    /// * `Found` when at least one valid email came back.
    /// * `NoResults` with the number of patterns the service tried.
    /// * `Err(AppError::Service)` for non-2xx replies, `Err(AppError::Transport)`
    ///   when the service could not be reached.
    pub(crate) async fn lookup_contacts(
        &self,
        request: &ContactLookupRequest,
    ) -> Result<LookupOutcome<ContactLookupResponse>> {
        tracing::info!(target: "client_task",
            "Contact lookup for {} {} @ {}",
            request.first_name, request.last_name, request.domain
        );

        let response: ContactLookupResponse = self
            .post_json(CONTACT_LOOKUP_PATH, request, CONTACT_LOOKUP_FALLBACK)
            .await?;

        if response.valid_emails.is_empty() {
            let patterns_tested = response.total_patterns_tested.unwrap_or(0);
            tracing::info!(target: "client_task",
                "No valid emails after {} patterns for {} {}",
                patterns_tested, request.first_name, request.last_name
            );
            return Ok(LookupOutcome::NoResults { patterns_tested });
        }

        tracing::info!(target: "client_task",
            "Service returned {} valid emails", response.valid_emails.len()
        );
        Ok(LookupOutcome::Found(response))
    }

    /// Asks the service for phone numbers of a person.
    pub(crate) async fn lookup_phones(
        &self,
        request: &PhoneLookupRequest,
    ) -> Result<LookupOutcome<PhoneLookupResponse>> {
        tracing::info!(target: "client_task",
            "Phone lookup for {} {} at {}",
            request.first_name, request.last_name, request.company
        );

        let response: PhoneLookupResponse = self
            .post_json(PHONE_LOOKUP_PATH, request, PHONE_LOOKUP_FALLBACK)
            .await?;

        if response.phone_numbers.is_empty() {
            return Ok(LookupOutcome::NoResults { patterns_tested: 0 });
        }
        Ok(LookupOutcome::Found(response))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, fallback: &str) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, fallback))?;

        let status = response.status();
        tracing::debug!(target: "client_task", "POST {} status: {}", url, status);

        if !status.is_success() {
            return Err(service_error(response, fallback).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| transport_error(e, fallback))
    }
}

/// Hides a transport failure behind the action's generic message.
fn transport_error(source: reqwest::Error, fallback: &str) -> AppError {
    tracing::warn!(target: "client_task", "Contact service request failed: {}", source);
    AppError::Transport {
        message: fallback.to_string(),
        source,
    }
}

/// Turns a non-2xx reply into `AppError::Service`, preferring the message
/// the service sent.
async fn service_error(response: Response, fallback: &str) -> AppError {
    let status = response.status().as_u16();
    let message = match response.json::<ServiceErrorBody>().await {
        Ok(body) => body
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string()),
        Err(e) => {
            tracing::debug!(target: "client_task", "Unreadable error body (status {}): {}", status, e);
            fallback.to_string()
        }
    };

    tracing::warn!(target: "client_task", "Service returned {}: {}", status, message);
    AppError::Service { status, message }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::net::SocketAddr;
    use warp::Filter;
    use warp::http::StatusCode;

    /// Serves `reply` with `status` on both lookup routes of a local server.
    pub(crate) async fn spawn_mock_service(
        status: StatusCode,
        reply: serde_json::Value,
    ) -> SocketAddr {
        let routes = warp::post()
            .and(warp::path(CONTACT_LOOKUP_PATH).or(warp::path(PHONE_LOOKUP_PATH)))
            .map(move |_| warp::reply::with_status(warp::reply::json(&reply), status));

        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        addr
    }

    pub(crate) fn client_for(addr: SocketAddr) -> ContactClient {
        let config = Config {
            api_url_override: Some(format!("http://{}/", addr)),
            ..Config::default()
        };
        ContactClient::new(&config).unwrap()
    }

    fn request() -> ContactLookupRequest {
        ContactLookupRequest {
            first_name: "Sarah".to_string(),
            last_name: "Johnson".to_string(),
            domain: "google.com".to_string(),
            company: "Google".to_string(),
        }
    }

    #[tokio::test]
    async fn test_lookup_contacts_found() {
        let addr = spawn_mock_service(
            StatusCode::OK,
            serde_json::json!({
                "valid_emails": ["sarah.johnson@google.com"],
                "phone_numbers": [],
                "total_patterns_tested": 11
            }),
        )
        .await;
        let client = client_for(addr);
        assert_eq!(client.base_url(), format!("http://{}", addr));

        match client.lookup_contacts(&request()).await.unwrap() {
            LookupOutcome::Found(response) => {
                assert_eq!(response.valid_emails, vec!["sarah.johnson@google.com"]);
                assert_eq!(response.total_patterns_tested, Some(11));
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_contacts_empty_is_no_results() {
        let addr = spawn_mock_service(
            StatusCode::OK,
            serde_json::json!({ "valid_emails": [], "total_patterns_tested": 11 }),
        )
        .await;

        let outcome = client_for(addr).lookup_contacts(&request()).await.unwrap();
        assert_eq!(outcome, LookupOutcome::NoResults { patterns_tested: 11 });
    }

    #[tokio::test]
    async fn test_lookup_contacts_service_message() {
        let addr = spawn_mock_service(
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": "Domain validation failed",
                "message": "Could not find MX records for acme.com or alternative domains"
            }),
        )
        .await;

        match client_for(addr).lookup_contacts(&request()).await {
            Err(AppError::Service { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(
                    message,
                    "Could not find MX records for acme.com or alternative domains"
                );
            }
            other => panic!("expected service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_phones_fallback_message() {
        let addr = spawn_mock_service(
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "error": "boom" }),
        )
        .await;

        let request = PhoneLookupRequest {
            first_name: "Sarah".to_string(),
            last_name: "Johnson".to_string(),
            company: "Google".to_string(),
        };
        match client_for(addr).lookup_phones(&request).await {
            Err(AppError::Service { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, PHONE_LOOKUP_FALLBACK);
            }
            other => panic!("expected service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_reports_fallback_message() {
        let config = Config {
            api_url_override: Some("http://127.0.0.1:9".to_string()),
            ..Config::default()
        };
        let client = ContactClient::new(&config).unwrap();

        let err = client.lookup_contacts(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::Transport { .. }));
        assert_eq!(err.to_string(), CONTACT_LOOKUP_FALLBACK);

        let err = client
            .lookup_phones(&PhoneLookupRequest {
                first_name: "Sarah".to_string(),
                last_name: "Johnson".to_string(),
                company: "Google".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), PHONE_LOOKUP_FALLBACK);
    }
}
