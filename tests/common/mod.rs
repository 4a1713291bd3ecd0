#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use lodgewatch::config::{ReservationConfig, StudefiConfig};
use lodgewatch::models::{ListingItem, ListingKey, SourceKind};
use lodgewatch::notify::{Audience, NotificationContent, Notifier};
use lodgewatch::utils::error::Result;

/// Notifier double that records every delivery instead of sending it.
pub struct RecordingNotifier {
    pub active: bool,
    pub events: Mutex<Vec<(Audience, NotificationContent)>>,
}

impl RecordingNotifier {
    pub fn active() -> Arc<Self> {
        Arc::new(RecordingNotifier {
            active: true,
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn inactive() -> Arc<Self> {
        Arc::new(RecordingNotifier {
            active: false,
            events: Mutex::new(Vec::new()),
        })
    }

    pub async fn recorded(&self) -> Vec<(Audience, NotificationContent)> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn is_active(&self) -> bool {
        self.active
    }

    async fn notify(&self, audience: Audience, content: NotificationContent) -> Result<()> {
        self.events.lock().await.push((audience, content));
        Ok(())
    }
}

pub fn studefi_config(base_url: &str) -> StudefiConfig {
    StudefiConfig {
        base_url: base_url.to_string(),
        listing_path: "main.php".to_string(),
    }
}

pub fn reservation_config(enabled: bool) -> ReservationConfig {
    ReservationConfig {
        enabled,
        request_timeout_secs: 5,
        include_co_tenant: false,
    }
}

pub fn studefi_item(name: &str, link: &str) -> ListingItem {
    ListingItem {
        key: ListingKey::composite(name, link),
        source: SourceKind::Studefi,
        label: name.to_string(),
        address: None,
        rent: None,
        area: None,
        room_count: None,
        bedroom_count: None,
        available: true,
        equipments: vec![],
        reference: None,
        detail_link: Some(link.to_string()),
    }
}

/// Residence detail page with the reserve-online anchor.
pub fn detail_page_with_anchor() -> String {
    r#"<html><body>
        <h1>Résidence Les Lilas</h1>
        <a class="button mini-button" href="main.php?srv=Reservation&op=nouvelle&id=12">Réserver en ligne</a>
    </body></html>"#
        .to_string()
}

pub fn detail_page_without_anchor() -> String {
    r#"<html><body>
        <h1>Résidence Les Lilas</h1>
        <a class="button mini-button" href="main.php?srv=Contact">Nous contacter</a>
    </body></html>"#
        .to_string()
}

/// A step page carrying the reservation form with its hidden token bag.
pub fn step_form_page(step: u8) -> String {
    let previous_step = if step > 1 {
        r#"<input type="hidden" name="etapePrecedente" value="1" />"#
    } else {
        ""
    };
    format!(
        r#"<html><body>
        <form id="form1" method="post" action="main.php" enctype="multipart/form-data">
            <input type="hidden" name="tokenCSRF" value="csrf-{step}" />
            <input type="hidden" name="srv" value="Reservation" />
            <input type="hidden" name="cdTemporaire" value="TMP-{step}" />
            <input type="hidden" name="cdEsi" value="ESI-{step}" />
            <input type="hidden" name="idDemandeLogement" value="555" />
            <input type="hidden" name="idLogement" value="777" />
            {previous_step}
        </form>
    </body></html>"#
    )
}

pub fn confirmation_page() -> String {
    "<html><body><h1>Confirmation</h1><p>Votre demande a bien été enregistrée.</p></body></html>"
        .to_string()
}

pub fn rejection_page() -> String {
    "<html><body><p>Une erreur est survenue lors de la validation.</p></body></html>".to_string()
}
