use std::collections::HashSet;

use crate::models::ListingKey;

/// Remembered set of listing identities "seen as of the last successful
/// poll" for one source.
///
/// Each source owns exactly one differ instance and is the only mutator of
/// it. `diff` must be called with the full current collection, never a
/// delta; the remembered set is replaced wholesale by `commit` and only
/// after a successful fetch, so a failed fetch leaves it untouched.
#[derive(Debug, Default)]
pub struct SnapshotDiffer {
    seen: HashSet<ListingKey>,
}

impl SnapshotDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the remembered set from persisted state so a process restart
    /// does not re-report every currently listed item as new. Without a
    /// seed, the first diff intentionally reports everything.
    pub fn with_seed(seed: HashSet<ListingKey>) -> Self {
        SnapshotDiffer { seen: seed }
    }

    pub fn tracked_count(&self) -> usize {
        self.seen.len()
    }

    /// Keys present in `current` but not in the remembered set.
    pub fn diff(&self, current: &HashSet<ListingKey>) -> Vec<ListingKey> {
        current.difference(&self.seen).cloned().collect()
    }

    /// Replace the remembered set with the full current collection. Keys
    /// that vanished from the source are dropped from tracking; only
    /// current membership matters.
    pub fn commit(&mut self, current: HashSet<ListingKey>) {
        self.seen = current;
    }

    /// Diff and commit as one unit, the way a successful poll tick uses it.
    pub fn diff_and_commit(&mut self, current: HashSet<ListingKey>) -> Vec<ListingKey> {
        let new_keys = self.diff(&current);
        self.commit(current);
        new_keys
    }

    pub fn snapshot(&self) -> &HashSet<ListingKey> {
        &self.seen
    }
}
