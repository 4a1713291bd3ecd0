use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::models::ListingKey;
use crate::snapshot::SnapshotDiffer;
use crate::sources::ListingSource;
use crate::storage::Store;
use crate::utils::error::Result;

/// Polling loop for one listing source.
///
/// Each source gets its own poller and its own differ; ticks of different
/// sources may overlap but a tick never overlaps its own predecessor
/// (skip-if-busy, bounding concurrent load on the remote site).
pub struct SourcePoller<S: ListingSource> {
    source: S,
    differ: SnapshotDiffer,
    store: Store,
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
}

impl<S: ListingSource> SourcePoller<S> {
    /// Build a poller with its differ seeded from the persisted seen-set,
    /// so a restart does not re-alert on everything currently listed.
    pub async fn init(
        source: S,
        store: Store,
        dispatcher: Arc<Dispatcher>,
        interval: Duration,
    ) -> Result<Self> {
        let seed = store.load_seen(source.kind()).await?;
        if !seed.is_empty() {
            info!(source = %source.kind(), seeded = seed.len(), "restored seen-set");
        }

        Ok(SourcePoller {
            differ: SnapshotDiffer::with_seed(seed),
            source,
            store,
            dispatcher,
            interval,
        })
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            source = %self.source.kind(),
            interval_secs = self.interval.as_secs(),
            "poller started"
        );

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One poll tick. A failed fetch leaves the remembered set untouched
    /// and is logged, never conflated with "zero new items".
    pub async fn tick(&mut self) {
        if !self.dispatcher.has_audience().await {
            debug!(source = %self.source.kind(), "no notification audience, skipping poll");
            return;
        }

        let items = match self.source.fetch().await {
            Ok(items) => items,
            Err(e) => {
                warn!(source = %self.source.kind(), error = %e, "poll tick failed, will retry next tick");
                return;
            }
        };

        let current: HashSet<ListingKey> = items.iter().map(|item| item.key.clone()).collect();
        let new_keys: HashSet<ListingKey> = self.differ.diff_and_commit(current).into_iter().collect();

        // Best effort: losing the persisted copy only risks duplicate
        // alerts after a restart, never missed ones.
        if let Err(e) = self
            .store
            .replace_seen(self.source.kind(), self.differ.snapshot())
            .await
        {
            warn!(source = %self.source.kind(), error = %e, "failed to persist seen-set");
        }

        debug!(
            source = %self.source.kind(),
            total = items.len(),
            new = new_keys.len(),
            "poll tick completed"
        );

        if !new_keys.is_empty() {
            let new_items: Vec<_> = items
                .into_iter()
                .filter(|item| new_keys.contains(&item.key))
                .collect();
            info!(source = %self.source.kind(), count = new_items.len(), "new listings detected");
            self.dispatcher.handle_new_items(new_items).await;
        }
    }
}
