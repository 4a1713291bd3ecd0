pub mod webhook;

use async_trait::async_trait;

use crate::models::ListingItem;
use crate::utils::error::Result;

pub use webhook::WebhookNotifier;

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Requester(i64),
    AllSubscribers,
}

/// What gets delivered. Rendering for a concrete transport lives in the
/// notifier implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationContent {
    Text(String),
    NewListing(ListingItem),
    ReservationSuccess {
        listing_label: String,
        contact_email: String,
    },
}

/// Delivery seam for human-visible alerts. The watcher core builds
/// payloads and never touches the transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Whether any destination is currently configured. Pollers skip their
    /// tick entirely when this is false, so remote quota is not burned with
    /// nobody to notify.
    fn is_active(&self) -> bool;

    async fn notify(&self, audience: Audience, content: NotificationContent) -> Result<()>;
}
