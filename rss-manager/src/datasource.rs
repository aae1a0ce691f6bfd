//! Publication of derived connection handles to an external catalog.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::errors::{AppError, AppResult};
use common::models::{DatasourceDescriptor, UserDatabaseEntry};

use crate::adaptor::BackendContext;
use crate::environment::EnvironmentRegistry;
use crate::keyed_lock::KeyedLocks;

/// External datasource catalog.
#[async_trait]
pub trait DatasourceCatalog: Send + Sync {
    async fn list_all(&self) -> AppResult<Vec<DatasourceDescriptor>>;
    async fn add(&self, descriptor: DatasourceDescriptor) -> AppResult<()>;
    /// Returns whether a datasource was removed.
    async fn remove(&self, name: &str) -> AppResult<bool>;
}

/// Catalog kept in process memory.
#[derive(Default)]
pub struct InMemoryCatalog {
    entries: RwLock<BTreeMap<String, DatasourceDescriptor>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatasourceCatalog for InMemoryCatalog {
    async fn list_all(&self) -> AppResult<Vec<DatasourceDescriptor>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn add(&self, descriptor: DatasourceDescriptor) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&descriptor.name) {
            return Err(AppError::duplicate("datasource", &descriptor.name));
        }
        entries.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    async fn remove(&self, name: &str) -> AppResult<bool> {
        Ok(self.entries.write().await.remove(name).is_some())
    }
}

/// Registers and removes datasources derived from a database and a user.
pub struct DatasourceRegistrar {
    registry: Arc<EnvironmentRegistry>,
    catalog: Arc<dyn DatasourceCatalog>,
    locks: KeyedLocks,
}

impl DatasourceRegistrar {
    pub fn new(registry: Arc<EnvironmentRegistry>, catalog: Arc<dyn DatasourceCatalog>) -> Self {
        Self {
            registry,
            catalog,
            locks: KeyedLocks::new(),
        }
    }

    pub fn catalog(&self) -> Arc<dyn DatasourceCatalog> {
        self.catalog.clone()
    }

    /// Publishes a datasource for the database and user named by `entry`.
    pub async fn register_datasource(
        &self,
        environment: &str,
        name: &str,
        entry: &UserDatabaseEntry,
    ) -> AppResult<DatasourceDescriptor> {
        let env = self.registry.resolve(environment)?;
        let adaptor = env.adaptor();

        let database = adaptor
            .get_database(&entry.rss_instance_name, &entry.database_name, entry.engine)
            .await
            .backend_context("reading database", &entry.database_name)?;
        let user = adaptor
            .get_user(&entry.rss_instance_name, &entry.username, entry.engine)
            .await
            .backend_context("reading database user", &entry.username)?;

        let fallback_url = env
            .handle(&entry.rss_instance_name)
            .ok_or_else(|| AppError::not_found("RSS instance", &entry.rss_instance_name))?
            .database_url(&entry.database_name);
        let descriptor = DatasourceDescriptor::derive(name, &database, &user, fallback_url);

        let _guard = self.locks.lock(name).await;
        let existing = self.catalog.list_all().await?;
        if existing.iter().any(|d| d.name == name) {
            return Err(AppError::duplicate("datasource", name));
        }
        self.catalog.add(descriptor.clone()).await?;

        info!(environment, datasource = name, url = %descriptor.url, "Datasource registered");
        Ok(descriptor)
    }

    /// Removes a datasource. Unknown names are a successful no-op.
    pub async fn remove_datasource(&self, name: &str) -> AppResult<()> {
        let _guard = self.locks.lock(name).await;
        if self.catalog.remove(name).await? {
            info!(datasource = name, "Datasource removed");
        } else {
            debug!(datasource = name, "Datasource not registered, nothing to remove");
        }
        Ok(())
    }
}
