pub mod crous;
pub mod studefi;

use async_trait::async_trait;

use crate::models::{ListingItem, SourceKind};
use crate::utils::error::Result;

/// One external housing-listing source.
///
/// `fetch` returns the full collection of currently listed items, never a
/// delta; diffing against the previous snapshot happens at the poller.
#[async_trait]
pub trait ListingSource: Send + Sync {
    fn kind(&self) -> SourceKind;
    async fn fetch(&self) -> Result<Vec<ListingItem>>;
}

pub use crous::CrousSource;
pub use studefi::StudefiSource;
