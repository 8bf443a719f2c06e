use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::info;

use crate::source::ExternalTitleRecord;

type Slot = Arc<OnceCell<Option<ExternalTitleRecord>>>;

/// Memoizes one title lookup per distinct query string for the lifetime of a run
///
/// Negative results are cached too. Concurrent callers asking for the same
/// query share a single in-flight fetch.
#[derive(Debug, Default)]
pub struct LookupCache {
    slots: Mutex<HashMap<String, Slot>>,
    fetches: AtomicUsize,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, query: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(query.to_string()).or_default().clone()
    }

    /// Return the cached result for `query`, calling `fetch` only if no caller has yet
    pub async fn get_or_fetch<F, Fut>(&self, query: &str, fetch: F) -> Option<ExternalTitleRecord>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<ExternalTitleRecord>>,
    {
        let slot = self.slot(query);

        if let Some(cached) = slot.get() {
            info!("Cache hit: '{}'", query);
            return cached.clone();
        }

        let fetches = &self.fetches;
        slot.get_or_init(|| async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            fetch().await
        })
        .await
        .clone()
    }

    /// Cached value for `query`: `None` if never looked up, `Some(None)` for a cached miss
    pub fn cached(&self, query: &str) -> Option<Option<ExternalTitleRecord>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(query).and_then(|slot| slot.get().cloned())
    }

    /// Number of fetches actually issued
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of distinct queries with a settled result
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
