use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub poller: PollerConfig,
    pub database: DatabaseConfig,
    pub crous: CrousConfig,
    pub studefi: StudefiConfig,
    pub reservation: ReservationConfig,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Fixed polling period per source, in seconds.
    pub interval_secs: u64,
    /// Request timeout applied to every source fetch.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Geographic bounding box submitted to the search API, as two corner points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lon1: f64,
    pub lat1: f64,
    pub lon2: f64,
    pub lat2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrousConfig {
    pub api_url: String,
    pub bounds: BoundingBox,
    pub page_size: u32,
    /// Upper rent filter in minor currency units, as the API expects.
    pub max_price_minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudefiConfig {
    pub base_url: String,
    /// Listing page path relative to `base_url`.
    pub listing_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationConfig {
    pub enabled: bool,
    /// Per-step HTTP timeout so a hung remote call cannot stall a session.
    pub request_timeout_secs: u64,
    /// Submit the co-tenant field block alongside the applicant fields.
    pub include_co_tenant: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub username: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_dir("config")
    }

    pub fn from_dir(dir: &str) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name(&format!("{}/default", dir)))
            // Add environment-specific config
            .add_source(File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name(&format!("{}/local", dir)).required(false))
            // Add environment variables with prefix "LODGE_"
            .add_source(Environment::with_prefix("LODGE").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Startup validation. A failure here is the only fatal error in the
    /// process; everything later is contained per poll tick or session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poller.interval_secs == 0 {
            return Err(ConfigError::Message(
                "Poller interval_secs must be greater than 0".into(),
            ));
        }

        if self.poller.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Poller request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "Database max_connections must be greater than 0".into(),
            ));
        }

        if Url::parse(&self.crous.api_url).is_err() {
            return Err(ConfigError::Message("Invalid crous.api_url format".into()));
        }

        if Url::parse(&self.studefi.base_url).is_err() {
            return Err(ConfigError::Message(
                "Invalid studefi.base_url format".into(),
            ));
        }

        let b = &self.crous.bounds;
        for (name, lat) in [("lat1", b.lat1), ("lat2", b.lat2)] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ConfigError::Message(format!(
                    "crous.bounds.{} must be within -90..90",
                    name
                )));
            }
        }
        for (name, lon) in [("lon1", b.lon1), ("lon2", b.lon2)] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(ConfigError::Message(format!(
                    "crous.bounds.{} must be within -180..180",
                    name
                )));
            }
        }

        if self.crous.page_size == 0 {
            return Err(ConfigError::Message(
                "crous.page_size must be greater than 0".into(),
            ));
        }

        if self.reservation.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Reservation request_timeout_secs must be greater than 0".into(),
            ));
        }

        if let Some(webhook_url) = &self.notifications.webhook.url {
            if Url::parse(webhook_url).is_err() {
                return Err(ConfigError::Message(
                    "Invalid notifications.webhook.url format".into(),
                ));
            }
        }

        Ok(())
    }
}
