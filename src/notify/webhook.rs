use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::config::WebhookConfig;
use crate::models::ListingItem;
use crate::notify::{Audience, NotificationContent, Notifier};
use crate::utils::error::{AppError, Result};

const NEW_LISTING_COLOR: u32 = 0x00ff00;
const SUCCESS_COLOR: u32 = 0x00ff00;
const TEXT_COLOR: u32 = 0x0099ff;

/// Webhook-backed notifier posting Discord-style embeds.
///
/// Addressing is flattened to the one configured webhook channel: requester
/// mentions go into the message content rather than a direct channel.
pub struct WebhookNotifier {
    client: Client,
    config: WebhookConfig,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Self {
        WebhookNotifier {
            client: Client::new(),
            config,
        }
    }

    fn listing_embed(item: &ListingItem) -> serde_json::Value {
        let mut fields = Vec::new();

        if let Some(address) = &item.address {
            fields.push(json!({ "name": "Location", "value": address, "inline": false }));
        }

        let mut room_info = Vec::new();
        if let Some(rooms) = item.room_count {
            room_info.push(format!("Rooms: {}", rooms));
        }
        if let Some(bedrooms) = item.bedroom_count {
            room_info.push(format!("Bedrooms: {}", bedrooms));
        }
        if let Some(area) = &item.area {
            room_info.push(format!("Area: {}", area));
        }
        if !room_info.is_empty() {
            fields.push(json!({ "name": "Room Info", "value": room_info.join("\n"), "inline": true }));
        }

        if let Some(rent) = &item.rent {
            fields.push(json!({ "name": "Rent", "value": rent.to_string(), "inline": true }));
        }

        fields.push(json!({
            "name": "Status",
            "value": if item.available { "Available" } else { "Not available" },
            "inline": true
        }));

        if !item.equipments.is_empty() {
            let listed: Vec<&str> = item.equipments.iter().map(String::as_str).take(5).collect();
            fields.push(json!({ "name": "Equipment", "value": listed.join(", "), "inline": false }));
        }

        let mut reference = item.reference.clone().unwrap_or_default();
        if let Some(link) = &item.detail_link {
            if !reference.is_empty() {
                reference.push('\n');
            }
            reference.push_str(&format!("[View on website]({})", link));
        }
        if !reference.is_empty() {
            fields.push(json!({ "name": "Reference", "value": reference, "inline": false }));
        }

        json!({
            "title": format!("🏠 {}", item.label),
            "color": NEW_LISTING_COLOR,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "fields": fields
        })
    }

    fn build_payload(&self, audience: Audience, content: &NotificationContent) -> serde_json::Value {
        let embed = match content {
            NotificationContent::Text(text) => json!({
                "description": text,
                "color": TEXT_COLOR,
            }),
            NotificationContent::NewListing(item) => Self::listing_embed(item),
            NotificationContent::ReservationSuccess {
                listing_label,
                contact_email,
            } => json!({
                "title": "🎉 Reservation Successful!",
                "description": format!(
                    "Automated reservation on **{}** has been submitted.",
                    listing_label
                ),
                "color": SUCCESS_COLOR,
                "fields": [{
                    "name": "Next Steps",
                    "value": format!("Check {} for the confirmation link.", contact_email),
                    "inline": false
                }]
            }),
        };

        let mut payload = json!({
            "username": self.config.username,
            "embeds": [embed]
        });

        if let Audience::Requester(user_id) = audience {
            payload["content"] = json!(format!("<@{}>", user_id));
        }

        payload
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn is_active(&self) -> bool {
        self.config.url.is_some()
    }

    async fn notify(&self, audience: Audience, content: NotificationContent) -> Result<()> {
        let Some(url) = self.config.url.as_deref() else {
            return Err(AppError::Notify("no webhook destination configured".into()));
        };

        let payload = self.build_payload(audience, &content);
        self.client
            .post(url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AreaRange, ListingKey, RentRange, SourceKind};

    fn notifier(url: Option<&str>) -> WebhookNotifier {
        WebhookNotifier::new(WebhookConfig {
            url: url.map(str::to_string),
            username: "Lodgewatch".to_string(),
        })
    }

    fn item() -> ListingItem {
        ListingItem {
            key: ListingKey::Numeric(101),
            source: SourceKind::Crous,
            label: "Studio 18m²".to_string(),
            address: Some("1 rue Haute, Paris".to_string()),
            rent: Some(RentRange::from_minor_units(40_000, 40_000)),
            area: Some(AreaRange { min: 18, max: 18 }),
            room_count: Some(1),
            bedroom_count: Some(1),
            available: true,
            equipments: vec!["Kitchenette".to_string()],
            reference: Some("REF-101".to_string()),
            detail_link: Some("https://housing.example.com/tools/41/accommodations/101".to_string()),
        }
    }

    #[test]
    fn test_active_only_with_destination() {
        assert!(notifier(Some("https://discord.com/api/webhooks/1/t")).is_active());
        assert!(!notifier(None).is_active());
    }

    #[test]
    fn test_listing_embed_fields() {
        let embed = WebhookNotifier::listing_embed(&item());
        assert_eq!(embed["title"], "🏠 Studio 18m²");

        let rendered = embed.to_string();
        assert!(rendered.contains("1 rue Haute, Paris"));
        assert!(rendered.contains("400.00€"));
        assert!(rendered.contains("18m²"));
        assert!(rendered.contains("Kitchenette"));
        assert!(rendered.contains("REF-101"));
    }

    #[test]
    fn test_requester_audience_adds_mention() {
        let n = notifier(Some("https://discord.com/api/webhooks/1/t"));
        let payload = n.build_payload(
            Audience::Requester(42),
            &NotificationContent::Text("hello".into()),
        );
        assert_eq!(payload["content"], "<@42>");

        let broadcast = n.build_payload(
            Audience::AllSubscribers,
            &NotificationContent::Text("hello".into()),
        );
        assert!(broadcast.get("content").is_none());
    }

    #[test]
    fn test_success_payload_carries_contact() {
        let n = notifier(Some("https://discord.com/api/webhooks/1/t"));
        let payload = n.build_payload(
            Audience::Requester(42),
            &NotificationContent::ReservationSuccess {
                listing_label: "Résidence Les Lilas".to_string(),
                contact_email: "alice@example.com".to_string(),
            },
        );
        let rendered = payload.to_string();
        assert!(rendered.contains("Résidence Les Lilas"));
        assert!(rendered.contains("alice@example.com"));
    }
}
