//! Runs one contact lookup for one recruiter profile: parse the name,
//! resolve the domain, call the service and score what comes back.

use crate::client::ContactClient;
use crate::domain::{get_domain_from_url, resolve_company_domain};
use crate::error::{AppError, Result};
use crate::models::{
    ContactLookupRequest, ContactRecord, ContactReport, LookupOutcome, PhoneLookupRequest,
};
use crate::name::parse_profile_title;
use crate::scoring::{email_confidence, score_phone};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Orchestrates email and phone lookups against the contact service.
#[derive(Debug, Clone)]
pub(crate) struct ContactLookup {
    client: ContactClient,
}

impl ContactLookup {
    pub(crate) fn new(client: ContactClient) -> Self {
        Self { client }
    }

    /// Finds email addresses for the person behind a profile title.
    ///
    /// `domain_override` (a bare domain or a URL) skips company-name
    /// resolution.
    ///
    /// # Returns
    /// * A report with one record per valid email, or an empty report with
    ///   an informational message when the service found nothing.
    /// * `Err(AppError::UnparseableName)`, `Err(AppError::UnresolvableDomain)`
    ///   or a service/transport error.
    pub(crate) async fn find_emails(
        &self,
        title: &str,
        company: &str,
        domain_override: Option<&str>,
    ) -> Result<ContactReport> {
        let name = parse_profile_title(title).require(title)?;

        let domain = match domain_override.map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => get_domain_from_url(raw)?,
            None => resolve_company_domain(company)?,
        };

        tracing::info!(target: "lookup_task",
            "Email lookup for '{}' -> {} {} @ {}",
            title, name.first_name, name.last_name, domain
        );

        let request = ContactLookupRequest {
            first_name: name.first_name.clone(),
            last_name: name.last_name.clone(),
            domain: domain.clone(),
            company: company.trim().to_string(),
        };

        let mut report = ContactReport {
            title: title.to_string(),
            name,
            domain: Some(domain),
            contacts: Vec::new(),
            patterns_tested: None,
            message: None,
        };

        match self.client.lookup_contacts(&request).await? {
            LookupOutcome::Found(response) => {
                let mut rng = rand::thread_rng();
                report.contacts = response
                    .valid_emails
                    .into_iter()
                    .map(|email| ContactRecord::email(email, email_confidence(&mut rng)))
                    .collect();
                report.patterns_tested = response.total_patterns_tested;
            }
            LookupOutcome::NoResults { patterns_tested } => {
                report.patterns_tested = Some(patterns_tested);
                report.message = Some(format!(
                    "No valid emails found after testing {} patterns",
                    patterns_tested
                ));
            }
        }

        Ok(report)
    }

    /// Finds phone numbers for the person behind a profile title and scores
    /// each one.
    pub(crate) async fn find_phones(&self, title: &str, company: &str) -> Result<ContactReport> {
        let name = parse_profile_title(title).require(title)?;

        tracing::info!(target: "lookup_task",
            "Phone lookup for '{}' -> {} {} at '{}'",
            title, name.first_name, name.last_name, company
        );

        let request = PhoneLookupRequest {
            first_name: name.first_name.clone(),
            last_name: name.last_name.clone(),
            company: company.trim().to_string(),
        };

        let mut report = ContactReport {
            title: title.to_string(),
            name,
            domain: None,
            contacts: Vec::new(),
            patterns_tested: None,
            message: None,
        };

        match self.client.lookup_phones(&request).await? {
            LookupOutcome::Found(response) => {
                let mut rng = rand::thread_rng();
                report.contacts = response
                    .phone_numbers
                    .into_iter()
                    .map(|number| {
                        let score = score_phone(&number, &mut rng);
                        ContactRecord::phone(number, score)
                    })
                    .collect();
            }
            LookupOutcome::NoResults { .. } => {
                report.message = Some("No phone numbers found".to_string());
            }
        }

        Ok(report)
    }
}

/// Busy flag and request generation for one lookup action of one profile.
///
/// A second `begin` while a ticket is alive is rejected. `supersede` makes
/// every outstanding ticket stale, so a late reply can be dropped instead of
/// overwriting newer state.
#[derive(Debug)]
pub(crate) struct ActionSlot {
    action: &'static str,
    busy: AtomicBool,
    generation: AtomicU64,
}

/// Proof that a slot's action is running. Releases the busy flag on drop.
#[derive(Debug)]
pub(crate) struct ActionTicket<'a> {
    slot: &'a ActionSlot,
    generation: u64,
}

impl ActionSlot {
    pub(crate) fn new(action: &'static str) -> Self {
        Self {
            action,
            busy: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Marks the action as running.
    pub(crate) fn begin(&self) -> Result<ActionTicket<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(target: "lookup_task", "Rejected duplicate {} lookup", self.action);
            return Err(AppError::LookupInProgress(self.action));
        }

        let generation = self.generation.load(Ordering::Acquire);
        Ok(ActionTicket {
            slot: self,
            generation,
        })
    }

    /// Invalidates every ticket issued so far.
    pub(crate) fn supersede(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns `value` only if `ticket` is still the current request.
    pub(crate) fn accept<T>(&self, ticket: ActionTicket<'_>, value: T) -> Option<T> {
        if ticket.generation == self.generation.load(Ordering::Acquire) {
            Some(value)
        } else {
            tracing::debug!(target: "lookup_task", "Dropping superseded {} result", self.action);
            None
        }
    }
}

impl Drop for ActionTicket<'_> {
    fn drop(&mut self) {
        self.slot.busy.store(false, Ordering::Release);
    }
}

/// Lookup state for one recruiter profile. The email and phone actions are
/// independent and may run at the same time.
#[derive(Debug)]
pub(crate) struct ProfileSession {
    pub title: String,
    pub company: String,
    pub email: ActionSlot,
    pub phone: ActionSlot,
}

impl ProfileSession {
    pub(crate) fn new(title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            email: ActionSlot::new("email"),
            phone: ActionSlot::new("phone"),
        }
    }

    /// Runs the email lookup unless one is already in flight. `Ok(None)`
    /// means the result arrived after the slot was superseded.
    pub(crate) async fn lookup_emails(
        &self,
        lookup: &ContactLookup,
        domain_override: Option<&str>,
    ) -> Result<Option<ContactReport>> {
        let ticket = self.email.begin()?;
        let report = lookup
            .find_emails(&self.title, &self.company, domain_override)
            .await?;
        Ok(self.email.accept(ticket, report))
    }

    /// Makes every in-flight email and phone request stale.
    pub(crate) fn supersede_all(&self) {
        self.email.supersede();
        self.phone.supersede();
    }

    /// Runs the phone lookup unless one is already in flight.
    pub(crate) async fn lookup_phones(&self, lookup: &ContactLookup) -> Result<Option<ContactReport>> {
        let ticket = self.phone.begin()?;
        let report = lookup.find_phones(&self.title, &self.company).await?;
        Ok(self.phone.accept(ticket, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{client_for, spawn_mock_service};
    use crate::models::ContactKind;
    use crate::scoring::PhoneKind;
    use warp::http::StatusCode;

    async fn lookup_with(status: StatusCode, reply: serde_json::Value) -> ContactLookup {
        let addr = spawn_mock_service(status, reply).await;
        ContactLookup::new(client_for(addr))
    }

    #[tokio::test]
    async fn test_end_to_end_recruiter_email() {
        let lookup = lookup_with(
            StatusCode::OK,
            serde_json::json!({ "valid_emails": ["sarah.johnson@google.com"] }),
        )
        .await;

        let report = lookup
            .find_emails("Sarah Johnson - Technical Recruiter at Google", "Google", None)
            .await
            .unwrap();

        assert_eq!(report.name.first_name, "Sarah");
        assert_eq!(report.name.last_name, "Johnson");
        assert_eq!(report.domain.as_deref(), Some("google.com"));
        assert_eq!(report.contacts.len(), 1);
        let contact = &report.contacts[0];
        assert_eq!(contact.email.as_deref(), Some("sarah.johnson@google.com"));
        assert_eq!(contact.kind, ContactKind::Email);
        assert!((80..=99).contains(&contact.confidence));
        assert!(report.message.is_none());
    }

    #[tokio::test]
    async fn test_no_results_is_informational() {
        let lookup = lookup_with(
            StatusCode::OK,
            serde_json::json!({ "valid_emails": [], "total_patterns_tested": 11 }),
        )
        .await;

        let report = lookup
            .find_emails("Ada Lovelace | LinkedIn", "Acme Corp", None)
            .await
            .unwrap();
        assert_eq!(report.domain.as_deref(), Some("acme.com"));
        assert!(report.contacts.is_empty());
        assert_eq!(report.patterns_tested, Some(11));
        assert_eq!(
            report.message.as_deref(),
            Some("No valid emails found after testing 11 patterns")
        );
    }

    #[tokio::test]
    async fn test_domain_override_takes_precedence() {
        let lookup = lookup_with(
            StatusCode::OK,
            serde_json::json!({ "valid_emails": ["ada@initech.io"] }),
        )
        .await;

        let report = lookup
            .find_emails("Ada Lovelace - HR", "Initech", Some("https://www.initech.io/jobs"))
            .await
            .unwrap();
        assert_eq!(report.domain.as_deref(), Some("initech.io"));
    }

    #[tokio::test]
    async fn test_local_failures_before_any_request() {
        let lookup = lookup_with(StatusCode::OK, serde_json::json!({})).await;

        assert!(matches!(
            lookup.find_emails("", "Google", None).await,
            Err(AppError::UnparseableName(_))
        ));
        assert!(matches!(
            lookup.find_emails("Ada Lovelace - HR", "", None).await,
            Err(AppError::UnresolvableDomain)
        ));
    }

    #[tokio::test]
    async fn test_phone_lookup_scores_numbers() {
        let lookup = lookup_with(
            StatusCode::OK,
            serde_json::json!({
                "phone_numbers": ["+91 98765 43210", "+44 131 626 0000"]
            }),
        )
        .await;

        let report = lookup
            .find_phones("Priya Rao - Recruiter", "NatWest India")
            .await
            .unwrap();
        assert_eq!(report.contacts.len(), 2);
        assert_eq!(
            report.contacts[0].kind,
            ContactKind::Phone(PhoneKind::IndianMobile)
        );
        assert!((72..=78).contains(&report.contacts[0].confidence));
        assert_eq!(report.contacts[0].phones, vec!["+91 98765 43210"]);
        assert_eq!(
            report.contacts[1].kind,
            ContactKind::Phone(PhoneKind::UkCorporate)
        );
    }

    #[test]
    fn test_action_slot_rejects_duplicates_until_released() {
        let slot = ActionSlot::new("email");
        let ticket = slot.begin().unwrap();
        assert!(slot.is_busy());
        assert!(matches!(
            slot.begin(),
            Err(AppError::LookupInProgress("email"))
        ));
        assert_eq!(slot.accept(ticket, 1), Some(1));
        assert!(!slot.is_busy());
        assert!(slot.begin().is_ok());
    }

    #[test]
    fn test_action_slot_drops_superseded_results() {
        let slot = ActionSlot::new("phone");
        let ticket = slot.begin().unwrap();
        slot.supersede();
        assert_eq!(slot.accept(ticket, "stale"), None);
        assert!(!slot.is_busy());

        let fresh = slot.begin().unwrap();
        assert_eq!(slot.accept(fresh, "fresh"), Some("fresh"));
    }

    #[test]
    fn test_profile_slots_are_independent() {
        let session = ProfileSession::new("Ada Lovelace - HR", "Acme");
        let _email = session.email.begin().unwrap();
        assert!(session.phone.begin().is_ok());
    }

    #[tokio::test]
    async fn test_superseded_session_discards_late_reply() {
        let lookup = lookup_with(
            StatusCode::OK,
            serde_json::json!({ "phone_numbers": ["+44 131 626 0000"] }),
        )
        .await;
        let session = ProfileSession::new("Priya Rao - Recruiter", "NatWest");

        // The lookup takes its ticket on first poll, before the supersede runs.
        let (late, ()) = futures::future::join(session.lookup_phones(&lookup), async {
            session.supersede_all();
        })
        .await;
        assert_eq!(late.unwrap(), None);
        assert!(session.lookup_phones(&lookup).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_lookup_releases_slot() {
        let lookup = lookup_with(StatusCode::OK, serde_json::json!({})).await;
        let session = ProfileSession::new("", "Google");

        assert!(session.lookup_emails(&lookup, None).await.is_err());
        assert!(!session.email.is_busy());
    }
}
