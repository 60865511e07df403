//! Application context shared across route handlers via Axum state.

use std::sync::Arc;

use vs_core::config::Config;
use vs_storage::VideoStore;

/// Immutable configuration plus the asset store, cheap to clone per request.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<VideoStore>,
}

impl AppContext {
    /// Build a context, opening the store at `config.storage.root`.
    pub fn new(config: Config) -> vs_core::Result<Self> {
        let store = VideoStore::from_config(&config.storage)?;
        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
        })
    }
}
