use reqwest::multipart::Form;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{ReservationConfig, StudefiConfig};
use crate::models::{ListingItem, WaitingRequest};
use crate::reservation::profile::{identity_document, ApplicantProfile};
use crate::reservation::tokens::{extract_step_form, StepForm};
use crate::utils::error::Result;

/// Anchor markers identifying the online-reservation entry point on a
/// residence detail page.
const RESERVE_ANCHOR_SELECTOR: &str = "a.button.mini-button";
const RESERVE_ANCHOR_TEXT: &str = "Réserver en ligne";
const RESERVE_HREF_MARKER: &str = "srv=Reservation";

/// Literal markers that only appear once the flow has reached the final
/// confirmation page. A brittle point-in-time contract with the remote
/// system; when the site changes its page text, this predicate is the one
/// place to update.
const CONFIRMATION_MARKERS: [&str; 3] = ["Confirmation", "etape 3", "etape3"];

pub fn is_confirmation_page(body: &str) -> bool {
    let lowered = body.to_lowercase();
    CONFIRMATION_MARKERS
        .iter()
        .any(|marker| lowered.contains(&marker.to_lowercase()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Success,
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The detail page has no reserve anchor; the listing is not actually
    /// reservable despite appearing available. Expected, not exceptional.
    NoReservationLink,
    /// The reservation entry page did not contain the step form.
    EntryFormMissing,
    /// The step-1 response did not advance to the second form.
    StepFormMissing,
    /// Both submissions went through but the final page shows no
    /// confirmation marker.
    Rejected,
    /// Transport failure in any state; the session is abandoned.
    Transport(String),
}

/// One end-to-end attempt to claim a specific listing for a specific
/// waiting request.
///
/// `DISCOVER → STEP1_SUBMITTED → STEP2_SUBMITTED → {SUCCESS, FAILED}`, no
/// retries within a session. The cookie-bearing client lives exactly as
/// long as the session value, so every abort path releases it.
pub struct ReservationSession {
    client: Client,
    base_url: Url,
    /// Submission target when a form declares no action of its own.
    default_endpoint: Url,
    profile: ApplicantProfile,
}

impl ReservationSession {
    pub fn begin(
        reservation: &ReservationConfig,
        studefi: &StudefiConfig,
        request: &WaitingRequest,
    ) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(reservation.request_timeout_secs))
            .build()?;

        let base_url = Url::parse(&studefi.base_url)?;
        let default_endpoint = base_url.join(&studefi.listing_path)?;

        Ok(ReservationSession {
            client,
            base_url,
            default_endpoint,
            profile: ApplicantProfile::placeholder(
                &request.contact_email,
                reservation.include_co_tenant,
            ),
        })
    }

    /// Run the session to completion. Transport errors in any state abort
    /// as FAILED; nothing here touches the queue or the notifier.
    pub async fn run(self, item: &ListingItem) -> SessionOutcome {
        match self.drive(item).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(listing = %item.key, error = %e, "reservation session aborted");
                SessionOutcome::Failed(FailureReason::Transport(e.to_string()))
            }
        }
    }

    async fn drive(&self, item: &ListingItem) -> Result<SessionOutcome> {
        // DISCOVER
        let Some(detail_link) = item.detail_link.as_deref() else {
            return Ok(SessionOutcome::Failed(FailureReason::NoReservationLink));
        };
        let detail_url = self.resolve(detail_link)?;
        let detail_page = self.get_text(detail_url).await?;

        let Some(reserve_link) = find_reserve_link(&detail_page) else {
            debug!(listing = %item.key, "no reservation anchor on detail page");
            return Ok(SessionOutcome::Failed(FailureReason::NoReservationLink));
        };

        // STEP1_SUBMITTED
        let entry_url = self.resolve(&reserve_link)?;
        info!(listing = %item.key, url = %entry_url, "starting reservation");
        let entry_page = self.get_text(entry_url).await?;

        let Some(entry_form) = extract_step_form(&entry_page) else {
            return Ok(SessionOutcome::Failed(FailureReason::EntryFormMissing));
        };
        let step1_response = self
            .submit_step(
                &entry_form,
                self.profile.step1_fields(&entry_form.tokens),
                "pieceIdentite",
                "piece.pdf",
            )
            .await?;

        // STEP2_SUBMITTED
        let Some(step2_form) = extract_step_form(&step1_response) else {
            return Ok(SessionOutcome::Failed(FailureReason::StepFormMissing));
        };
        let step2_response = self
            .submit_step(
                &step2_form,
                self.profile.step2_fields(&step2_form.tokens),
                "pieceIdentiteGarant",
                "pieceGarant.pdf",
            )
            .await?;

        // SUCCESS / FAILED
        if is_confirmation_page(&step2_response) {
            info!(listing = %item.key, "reservation reached confirmation page");
            Ok(SessionOutcome::Success)
        } else {
            debug!(listing = %item.key, "no confirmation marker in final response");
            Ok(SessionOutcome::Failed(FailureReason::Rejected))
        }
    }

    async fn submit_step(
        &self,
        form: &StepForm,
        fields: Vec<(String, String)>,
        attachment_field: &'static str,
        attachment_name: &'static str,
    ) -> Result<String> {
        let action = match form.action.as_deref() {
            Some(action) => self.resolve(action)?,
            None => self.default_endpoint.clone(),
        };

        let mut multipart = Form::new();
        for (name, value) in fields {
            multipart = multipart.text(name, value);
        }
        multipart = multipart.part(attachment_field, identity_document(attachment_name)?);

        let body = self
            .client
            .post(action)
            .multipart(multipart)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    /// Absolute links pass through; relative ones resolve against the
    /// site's base URL.
    fn resolve(&self, raw: &str) -> Result<Url> {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Ok(Url::parse(raw)?)
        } else {
            Ok(self.base_url.join(raw.trim_start_matches('/'))?)
        }
    }
}

/// Scan the detail page for the reserve-online anchor. Synchronous so the
/// non-Send document never crosses an await.
pub fn find_reserve_link(body: &str) -> Option<String> {
    let anchor_selector = Selector::parse(RESERVE_ANCHOR_SELECTOR).ok()?;
    let document = Html::parse_document(body);

    for anchor in document.select(&anchor_selector) {
        let text = anchor.text().collect::<String>();
        let href = anchor.value().attr("href").unwrap_or_default();
        if text.contains(RESERVE_ANCHOR_TEXT) || href.contains(RESERVE_HREF_MARKER) {
            if !href.is_empty() {
                return Some(href.to_string());
            }
        }
    }
    None
}
