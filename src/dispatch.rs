use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{ReservationConfig, StudefiConfig};
use crate::matcher::select_request;
use crate::models::{ListingItem, WaitingRequest};
use crate::notify::{Audience, NotificationContent, Notifier};
use crate::reservation::{FailureReason, ReservationSession, SessionOutcome};
use crate::storage::Store;
use crate::utils::error::Result;

/// Downstream processing for freshly detected items: match against the
/// waiting queue, drive reservation sessions, and fan out notifications.
///
/// Errors inside one item's handling are contained here; they never reach
/// the pollers or other in-flight sessions.
pub struct Dispatcher {
    store: Store,
    notifier: Arc<dyn Notifier>,
    reservation: ReservationConfig,
    studefi: StudefiConfig,
    /// Requesters with a session currently in flight. A request stays
    /// queued until its session succeeds, so a second match against the
    /// same requester is possible and must be skipped, not raced.
    in_flight: Mutex<HashSet<i64>>,
}

impl Dispatcher {
    pub fn new(
        store: Store,
        notifier: Arc<dyn Notifier>,
        reservation: ReservationConfig,
        studefi: StudefiConfig,
    ) -> Self {
        Dispatcher {
            store,
            notifier,
            reservation,
            studefi,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Whether polling is worth the remote-API quota right now: a
    /// configured destination with at least one subscriber behind it.
    pub async fn has_audience(&self) -> bool {
        if !self.notifier.is_active() {
            return false;
        }
        match self.store.subscriber_count().await {
            Ok(count) => count > 0,
            Err(e) => {
                warn!(error = %e, "failed to count subscribers, assuming audience");
                true
            }
        }
    }

    pub async fn handle_new_items(&self, items: Vec<ListingItem>) {
        for item in items {
            if let Err(e) = self.handle_item(&item).await {
                warn!(listing = %item.key, error = %e, "failed to process new item");
            }
        }
    }

    async fn handle_item(&self, item: &ListingItem) -> Result<()> {
        if self.reservation.enabled && item.is_reservable() {
            let queue = self.store.list_ordered().await?;
            if let Some(request) = select_request(item, &queue).cloned() {
                return self.attempt_reservation(item, request).await;
            }
        }

        self.notifier
            .notify(
                Audience::AllSubscribers,
                NotificationContent::NewListing(item.clone()),
            )
            .await
    }

    async fn attempt_reservation(&self, item: &ListingItem, request: WaitingRequest) -> Result<()> {
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(request.requester_id) {
                debug!(
                    requester = request.requester_id,
                    listing = %item.key,
                    "session already in flight for requester, skipping"
                );
                return Ok(());
            }
        }

        let outcome = match ReservationSession::begin(&self.reservation, &self.studefi, &request) {
            Ok(session) => session.run(item).await,
            Err(e) => SessionOutcome::Failed(FailureReason::Transport(e.to_string())),
        };

        // Clear the marker regardless of outcome before anything can fail.
        self.in_flight.lock().await.remove(&request.requester_id);

        match outcome {
            SessionOutcome::Success => {
                // Queue removal must precede the externally visible
                // success notification.
                self.store.remove(request.requester_id).await?;
                info!(
                    requester = request.requester_id,
                    listing = %item.key,
                    "reservation claimed, requester dequeued"
                );
                self.notifier
                    .notify(
                        Audience::Requester(request.requester_id),
                        NotificationContent::ReservationSuccess {
                            listing_label: item.label.clone(),
                            contact_email: request.contact_email.clone(),
                        },
                    )
                    .await
            }
            SessionOutcome::Failed(reason) => {
                // Silent on failure: the request stays queued for the next
                // matching attempt and nobody is notified.
                debug!(
                    requester = request.requester_id,
                    listing = %item.key,
                    ?reason,
                    "reservation attempt failed"
                );
                Ok(())
            }
        }
    }
}
