//! Application state for the RSS manager service.

use std::sync::Arc;

use common::config::AppConfig;
use common::errors::AppResult;

use crate::config::RssConfig;
use crate::datasource::InMemoryCatalog;
use crate::manager::ResourceManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub manager: Arc<ResourceManager>,
}

impl AppState {
    pub fn new(config: AppConfig, manager: ResourceManager) -> Self {
        Self {
            config,
            manager: Arc::new(manager),
        }
    }

    /// Builds the manager from the environment configuration file.
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let rss = RssConfig::load(&config.rss_config_path)?;
        let registry = rss.build_registry(&config).await?;
        let manager = ResourceManager::new(
            rss.provider.clone(),
            Arc::new(registry),
            rss.gate(),
            Arc::new(InMemoryCatalog::new()),
        );
        Ok(Self::new(config, manager))
    }
}
