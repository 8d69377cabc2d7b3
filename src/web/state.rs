//! Application state shared across handlers

use crate::cache::CacheMaintenance;
use crate::config::Settings;
use crate::search::Search;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Global settings
    pub settings: Arc<Settings>,
    /// Search orchestrator
    pub search: Arc<Search>,
    /// Background cache sweeps
    pub maintenance: Arc<CacheMaintenance>,
}

impl AppState {
    /// Wire the orchestrator and its maintenance timers from settings
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let search = Search::from_settings(&settings)?;
        Ok(Self::from_parts(settings, search))
    }

    pub fn from_parts(settings: Settings, search: Search) -> Self {
        let maintenance = CacheMaintenance::new(search.cache().clone());
        Self {
            settings: Arc::new(settings),
            search: Arc::new(search),
            maintenance: Arc::new(maintenance),
        }
    }

    /// Whether the /api/cache routes are mounted
    pub fn admin_routes(&self) -> bool {
        self.settings.server.admin_routes
    }
}
