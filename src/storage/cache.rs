use crate::model::Snapshot;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

struct Published {
    snapshot: Arc<Snapshot>,
    fetch_started: Instant,
}

/// Holds the one current snapshot.
///
/// The lock only guards a pointer swap, so readers never wait on an update
/// run, and they always get a whole snapshot.
pub struct CacheStore {
    current: RwLock<Option<Published>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// The current snapshot, or `None` if nothing has been published yet.
    pub fn read(&self) -> Option<Arc<Snapshot>> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(|p| p.snapshot.clone())
    }

    /// Replaces the current snapshot. Its age counts from `fetch_started`,
    /// the moment the fetch that produced it began.
    pub fn publish(&self, snapshot: Snapshot, fetch_started: Instant) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let published = Published {
            snapshot: snapshot.clone(),
            fetch_started,
        };
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(published);
        snapshot
    }

    /// Time since the fetch behind the current snapshot began.
    pub fn age(&self) -> Option<Duration> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(|p| p.fetch_started.elapsed())
    }

    /// The current snapshot if its fetch began less than `threshold` ago.
    pub fn fresh(&self, threshold: Duration) -> Option<Arc<Snapshot>> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|p| p.fetch_started.elapsed() < threshold)
            .map(|p| p.snapshot.clone())
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}
