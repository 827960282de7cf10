//! Application state.

use std::sync::Arc;

use tienda_store::Store;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend. Trait object so the binary runs on `PgStore`
    /// while integration tests run on `MemoryStore`.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        Self { store, config }
    }
}
