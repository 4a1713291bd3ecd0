use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::CrousConfig;
use crate::models::{AreaRange, ListingItem, ListingKey, RentRange, SourceKind};
use crate::sources::ListingSource;
use crate::utils::error::{AppError, Result};

/// Structured search-API source. Items carry a stable numeric id, which is
/// the identity key.
pub struct CrousSource {
    client: Client,
    config: CrousConfig,
}

impl CrousSource {
    pub fn new(config: CrousConfig, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client, config })
    }

    /// The fixed search payload: bounding box, pagination, wide-open price
    /// and area filters.
    fn payload(&self) -> serde_json::Value {
        let b = &self.config.bounds;
        json!({
            "idTool": self.tool_id(),
            "need_aggregation": true,
            "page": 1,
            "pageSize": self.config.page_size,
            "sector": null,
            "occupationModes": [],
            "location": [
                { "lon": b.lon1, "lat": b.lat1 },
                { "lon": b.lon2, "lat": b.lat2 }
            ],
            "residence": null,
            "precision": 4,
            "equipment": [],
            "price": { "max": self.config.max_price_minor },
            "area": { "min": 0 },
            "toolMechanism": "residual"
        })
    }

    /// The tool id is the last path segment of the search endpoint.
    fn tool_id(&self) -> u32 {
        Url::parse(&self.config.api_url)
            .ok()
            .and_then(|url| {
                url.path_segments()
                    .and_then(|segments| segments.last().map(|s| s.to_string()))
            })
            .and_then(|segment| segment.parse().ok())
            .unwrap_or(41)
    }

    /// Public accommodation page for one item, on the same host as the API.
    fn detail_link(&self, id: i64) -> Option<String> {
        let url = Url::parse(&self.config.api_url).ok()?;
        Some(format!(
            "{}://{}/tools/{}/accommodations/{}",
            url.scheme(),
            url.host_str()?,
            self.tool_id(),
            id
        ))
    }

    fn convert(&self, item: ApiItem) -> ListingItem {
        let rent = item
            .occupation_modes
            .first()
            .and_then(|mode| mode.rent.as_ref())
            .map(|rent| RentRange::from_minor_units(rent.min.unwrap_or(0), rent.max.unwrap_or(0)));

        let area = item.area.as_ref().map(|range| {
            let min = range.min.unwrap_or(0.0).round() as u32;
            AreaRange {
                min,
                max: range.max.map(|m| m.round() as u32).unwrap_or(min),
            }
        });

        let residence = item.residence.unwrap_or_default();
        let detail_link = self.detail_link(item.id);

        ListingItem {
            key: ListingKey::Numeric(item.id),
            source: SourceKind::Crous,
            label: item.label.unwrap_or_else(|| format!("Accommodation {}", item.id)),
            address: residence.address,
            rent,
            area,
            room_count: item.room_count,
            bedroom_count: item.bedroom_count,
            available: item.available,
            equipments: item
                .equipments
                .into_iter()
                .filter_map(|eq| eq.label)
                .collect(),
            reference: item.reference.or(item.code),
            detail_link,
        }
    }
}

#[async_trait]
impl ListingSource for CrousSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Crous
    }

    async fn fetch(&self) -> Result<Vec<ListingItem>> {
        let response = self
            .client
            .post(&self.config.api_url)
            .json(&self.payload())
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::parse(format!("search response: {}", e)))?;

        let items: Vec<ListingItem> = parsed
            .results
            .items
            .into_iter()
            .map(|item| self.convert(item))
            .collect();

        debug!(count = items.len(), "fetched search API items");
        Ok(items)
    }
}

// --- wire format ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    items: Vec<ApiItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiItem {
    id: i64,
    label: Option<String>,
    #[serde(default)]
    residence: Option<ApiResidence>,
    room_count: Option<u32>,
    bedroom_count: Option<u32>,
    #[serde(default)]
    area: Option<ApiRange>,
    #[serde(default)]
    occupation_modes: Vec<ApiOccupationMode>,
    #[serde(default)]
    available: bool,
    #[serde(default)]
    equipments: Vec<ApiEquipment>,
    code: Option<String>,
    reference: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiResidence {
    #[allow(dead_code)]
    label: Option<String>,
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRange {
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiOccupationMode {
    rent: Option<ApiRent>,
}

#[derive(Debug, Deserialize)]
struct ApiRent {
    min: Option<i64>,
    max: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiEquipment {
    label: Option<String>,
}
