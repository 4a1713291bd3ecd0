pub mod config;
pub mod dispatch;
pub mod matcher;
pub mod models;
pub mod notify;
pub mod poller;
pub mod reservation;
pub mod snapshot;
pub mod sources;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
