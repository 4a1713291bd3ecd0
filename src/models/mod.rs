use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Which listing source an item came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    /// Structured JSON search API.
    Crous,
    /// Scraped residence listing page.
    Studefi,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Crous => write!(f, "crous"),
            SourceKind::Studefi => write!(f, "studefi"),
        }
    }
}

/// Identity of one listing across polls. This is the only field used for
/// equality and dedup; everything else on [`ListingItem`] is display payload.
///
/// The API source exposes a stable numeric id. The scraped source does not,
/// so its key is the `name:link` composite of the listing element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ListingKey {
    Numeric(i64),
    Composite(String),
}

impl ListingKey {
    pub fn composite(name: &str, link: &str) -> Self {
        ListingKey::Composite(format!("{}:{}", name, link))
    }
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingKey::Numeric(id) => write!(f, "{}", id),
            ListingKey::Composite(s) => write!(f, "{}", s),
        }
    }
}

/// Rent range in major currency units (the API reports centimes).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RentRange {
    pub min: f64,
    pub max: f64,
}

impl RentRange {
    /// Convert a min/max pair of minor units into a displayable range.
    pub fn from_minor_units(min: i64, max: i64) -> Self {
        RentRange {
            min: min as f64 / 100.0,
            max: max as f64 / 100.0,
        }
    }
}

impl fmt::Display for RentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (self.min - self.max).abs() < f64::EPSILON {
            write!(f, "{:.2}€", self.min)
        } else {
            write!(f, "{:.2}€ - {:.2}€", self.min, self.max)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AreaRange {
    pub min: u32,
    pub max: u32,
}

impl fmt::Display for AreaRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}m²", self.min)
        } else {
            write!(f, "{}-{}m²", self.min, self.max)
        }
    }
}

/// One unit as seen in a source snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingItem {
    pub key: ListingKey,
    pub source: SourceKind,
    pub label: String,
    pub address: Option<String>,
    pub rent: Option<RentRange>,
    pub area: Option<AreaRange>,
    pub room_count: Option<u32>,
    pub bedroom_count: Option<u32>,
    pub available: bool,
    pub equipments: Vec<String>,
    pub reference: Option<String>,
    /// Detail-page link, when the source exposes one. Reservation sessions
    /// start from this page; items without it can only be broadcast.
    pub detail_link: Option<String>,
}

impl ListingItem {
    pub fn is_reservable(&self) -> bool {
        self.source == SourceKind::Studefi && self.detail_link.is_some()
    }
}

/// A user's standing instruction to auto-claim a matching listing.
///
/// Created by the enrollment flow, read-only here except for the single
/// terminal removal once a reservation session reaches SUCCESS.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct WaitingRequest {
    pub requester_id: i64,
    pub residence_filter: String,
    pub contact_email: String,
    pub enqueued_at: DateTime<Utc>,
    pub priority: i64,
}

impl WaitingRequest {
    /// The wildcard filter that matches any listing.
    pub const FIRST_AVAILABLE: &'static str = "first available";

    pub fn is_wildcard(&self) -> bool {
        self.residence_filter
            .eq_ignore_ascii_case(Self::FIRST_AVAILABLE)
    }
}
