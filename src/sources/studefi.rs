use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::StudefiConfig;
use crate::models::{ListingItem, ListingKey, SourceKind};
use crate::sources::ListingSource;
use crate::utils::error::{AppError, Result};

/// Marker substring in the availability image source that flags a residence
/// as fully booked. Elements carrying it are excluded from the snapshot
/// entirely, not reported as unavailable items.
const UNAVAILABLE_MARKER: &str = "non_disponibles";

const LISTING_ELEMENT_SELECTOR: &str = "div.col-sm-6.list-res-elem";
const AVAILABILITY_IMG_SELECTOR: &str = "img.dispoRes";
const NAME_LINK_SELECTOR: &str = "div.list-res-link a";

/// Scraped listing-page source. The page exposes no stable numeric id, so
/// the identity key is the name/link composite.
pub struct StudefiSource {
    client: Client,
    config: StudefiConfig,
}

impl StudefiSource {
    pub fn new(config: StudefiConfig, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client, config })
    }

    fn listing_url(&self) -> Result<Url> {
        let base = Url::parse(&self.config.base_url)?;
        Ok(base.join(&self.config.listing_path)?)
    }
}

#[async_trait]
impl ListingSource for StudefiSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Studefi
    }

    async fn fetch(&self) -> Result<Vec<ListingItem>> {
        let url = self.listing_url()?;
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let items = parse_listing_page(&body)?;
        debug!(count = items.len(), "parsed available residences");
        Ok(items)
    }
}

/// Extract the currently available residences from the listing page HTML.
///
/// Kept synchronous and separate from the fetch so the non-Send parsed
/// document never lives across an await point.
pub fn parse_listing_page(body: &str) -> Result<Vec<ListingItem>> {
    let elem_selector = selector(LISTING_ELEMENT_SELECTOR)?;
    let img_selector = selector(AVAILABILITY_IMG_SELECTOR)?;
    let link_selector = selector(NAME_LINK_SELECTOR)?;

    let document = Html::parse_document(body);
    let mut items = Vec::new();

    for element in document.select(&elem_selector) {
        let Some(img) = element.select(&img_selector).next() else {
            continue;
        };
        let src = img.value().attr("src").unwrap_or_default();
        if src.contains(UNAVAILABLE_MARKER) {
            continue;
        }

        let Some(anchor) = element.select(&link_selector).next() else {
            continue;
        };
        let name = anchor.text().collect::<String>().trim().to_string();
        let link = anchor.value().attr("href").unwrap_or_default().to_string();
        if name.is_empty() || link.is_empty() {
            continue;
        }

        items.push(ListingItem {
            key: ListingKey::composite(&name, &link),
            source: SourceKind::Studefi,
            label: name,
            address: None,
            rent: None,
            area: None,
            room_count: None,
            bedroom_count: None,
            available: true,
            equipments: vec![],
            reference: None,
            detail_link: Some(link),
        });
    }

    Ok(items)
}

fn selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| AppError::parse(format!("selector '{}': {:?}", raw, e)))
}
