//! Application state.

use crate::RouteCache;
use crate::handlers::records::RecordStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    cache: RouteCache,
    records: RecordStore,
}

impl AppState {
    /// Creates a new AppState with an empty record table.
    pub fn new(cache: RouteCache) -> Self {
        Self {
            cache,
            records: RecordStore::new(),
        }
    }

    /// Creates an AppState over an existing record table.
    pub fn with_records(cache: RouteCache, records: RecordStore) -> Self {
        Self { cache, records }
    }

    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }
}
