//! Application state.
//!
//! Built once at startup and cloned into whatever needs shared resources.

use std::sync::Arc;

use crate::cache::CacheManager;
use crate::config::settings::Settings;
use crate::error::AppResult;
use crate::services::{CatalogService, CatalogSource};

/// Application state containing all shared services and resources.
///
/// Cloning is cheap since the settings and the cache manager are shared.
#[derive(Clone)]
pub struct AppState {
    /// Loaded and validated settings
    pub settings: Arc<Settings>,
    /// The process-wide cache, injected into services
    pub cache: CacheManager,
}

impl AppState {
    /// Creates the state, connecting the configured cache backend.
    ///
    /// # Example
    /// ```ignore
    /// let settings = ConfigLoader::new()?.load()?;
    /// let state = AppState::new(settings).await?;
    /// let catalog = state.catalog(Arc::new(PgCatalog::new(pool)));
    /// ```
    pub async fn new(settings: Settings) -> AppResult<Self> {
        let cache = CacheManager::new(settings.cache.clone(), &settings.application.name).await?;
        Ok(Self {
            settings: Arc::new(settings),
            cache,
        })
    }

    /// Catalog service reading through this state's cache.
    pub fn catalog(&self, source: Arc<dyn CatalogSource>) -> CatalogService {
        CatalogService::new(self.cache.clone(), source)
    }

    /// Stop background cache maintenance.
    pub fn shutdown(&self) {
        self.cache.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheBackend;

    #[tokio::test]
    async fn test_state_uses_configured_backend() {
        let mut settings = Settings::default();
        settings.cache.backend = CacheBackend::Memory;

        let state = AppState::new(settings).await.unwrap();
        assert_eq!(state.cache.backend().kind(), "memory");

        let clone = state.clone();
        clone.cache.set("k", &1u32, None).await.unwrap();
        assert_eq!(state.cache.get::<u32>("k").await, Some(1));
        state.shutdown();
    }

    #[tokio::test]
    async fn test_state_disabled_cache() {
        let mut settings = Settings::default();
        settings.cache.enabled = false;

        let state = AppState::new(settings).await.unwrap();
        assert_eq!(state.cache.backend().kind(), "noop");
    }
}
