use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Parsing error: {message}")]
    Parse { message: String },

    #[error("Notification error: {0}")]
    Notify(String),
}

impl AppError {
    pub fn parse(message: impl Into<String>) -> Self {
        AppError::Parse {
            message: message.into(),
        }
    }

    /// Whether this error is expected to clear on its own by the next
    /// scheduled poll tick (network trouble rather than a broken contract).
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Fetch(_))
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
