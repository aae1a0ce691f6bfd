//! In-process backend.
//!
//! Keeps instances, databases, users, grants and templates in memory. Used
//! for environments configured with the `memory` adaptor and by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use common::models::{
    Database, DatabaseUser, EngineType, PrivilegeSet, PrivilegeTemplate, PrivilegeTemplateEntry,
    RssInstance, Snapshot, UserDatabaseEntry,
};
use common::utils::IdGenerator;

use super::{AdaptorError, AdaptorResult, RssAdaptor};

type EntityKey = (String, String, EngineType);
type GrantKey = (String, String, String, EngineType);

#[derive(Default)]
struct Backend {
    instances: HashMap<String, RssInstance>,
    databases: HashMap<EntityKey, Database>,
    users: HashMap<EntityKey, DatabaseUser>,
    /// (instance, database, username, engine) -> granted privileges.
    grants: HashMap<GrantKey, PrivilegeSet>,
    templates: HashMap<String, PrivilegeTemplate>,
}

impl Backend {
    fn instance(&self, name: &str) -> AdaptorResult<&RssInstance> {
        self.instances
            .get(name)
            .ok_or_else(|| AdaptorError::not_found("RSS instance", name))
    }

    fn ensure_user(&self, instance: &str, username: &str, engine: EngineType) -> AdaptorResult<()> {
        if self.users.contains_key(&key(instance, username, engine)) {
            Ok(())
        } else {
            Err(AdaptorError::not_found("database user", username))
        }
    }

    fn ensure_database(&self, instance: &str, name: &str, engine: EngineType) -> AdaptorResult<()> {
        if self.databases.contains_key(&key(instance, name, engine)) {
            Ok(())
        } else {
            Err(AdaptorError::not_found("database", name))
        }
    }

    fn attached(&self, instance: &str, database: &str, engine: EngineType) -> Vec<DatabaseUser> {
        self.grants
            .keys()
            .filter(|(i, d, _, e)| i == instance && d == database && *e == engine)
            .filter_map(|(i, _, u, e)| self.users.get(&key(i, u, *e)).cloned())
            .collect()
    }
}

fn key(instance: &str, name: &str, engine: EngineType) -> EntityKey {
    (instance.to_string(), name.to_string(), engine)
}

/// Backend simulation holding all state in memory.
#[derive(Default)]
pub struct InMemoryAdaptor {
    backend: RwLock<Backend>,
}

impl InMemoryAdaptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that already knows `instances`.
    pub fn with_instances(instances: impl IntoIterator<Item = RssInstance>) -> Self {
        let backend = Backend {
            instances: instances
                .into_iter()
                .map(|i| (i.name.clone(), i))
                .collect(),
            ..Default::default()
        };
        Self {
            backend: RwLock::new(backend),
        }
    }
}

#[async_trait]
impl RssAdaptor for InMemoryAdaptor {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn add_instance(&self, instance: &RssInstance) -> AdaptorResult<RssInstance> {
        let mut backend = self.backend.write().await;
        if backend.instances.contains_key(&instance.name) {
            return Err(AdaptorError::duplicate("RSS instance", &instance.name));
        }
        backend.instances.insert(instance.name.clone(), instance.clone());
        Ok(instance.clone())
    }

    async fn remove_instance(&self, _environment: &str, name: &str) -> AdaptorResult<()> {
        let mut backend = self.backend.write().await;
        backend
            .instances
            .remove(name)
            .ok_or_else(|| AdaptorError::not_found("RSS instance", name))?;
        backend.databases.retain(|(i, _, _), _| i != name);
        backend.users.retain(|(i, _, _), _| i != name);
        backend.grants.retain(|(i, _, _, _), _| i != name);
        Ok(())
    }

    async fn update_instance(&self, instance: &RssInstance) -> AdaptorResult<RssInstance> {
        let mut backend = self.backend.write().await;
        let current = backend
            .instances
            .get_mut(&instance.name)
            .ok_or_else(|| AdaptorError::not_found("RSS instance", &instance.name))?;
        *current = instance.clone();
        Ok(instance.clone())
    }

    async fn add_database(&self, database: &Database) -> AdaptorResult<Database> {
        let mut backend = self.backend.write().await;
        let url = backend
            .instance(&database.rss_instance_name)?
            .database_url(&database.name);
        let k = key(&database.rss_instance_name, &database.name, database.engine);
        if backend.databases.contains_key(&k) {
            return Err(AdaptorError::duplicate("database", &database.name));
        }
        let created = Database {
            id: Some(IdGenerator::database_id()),
            url: Some(url),
            ..database.clone()
        };
        backend.databases.insert(k, created.clone());
        Ok(created)
    }

    async fn remove_database(&self, instance: &str, name: &str, engine: EngineType) -> AdaptorResult<()> {
        let mut backend = self.backend.write().await;
        backend
            .databases
            .remove(&key(instance, name, engine))
            .ok_or_else(|| AdaptorError::not_found("database", name))?;
        backend
            .grants
            .retain(|(i, d, _, e), _| !(i == instance && d == name && *e == engine));
        Ok(())
    }

    async fn get_database(&self, instance: &str, name: &str, engine: EngineType) -> AdaptorResult<Database> {
        self.backend
            .read()
            .await
            .databases
            .get(&key(instance, name, engine))
            .cloned()
            .ok_or_else(|| AdaptorError::not_found("database", name))
    }

    async fn get_databases(&self) -> AdaptorResult<Vec<Database>> {
        Ok(self.backend.read().await.databases.values().cloned().collect())
    }

    async fn database_exists(&self, instance: &str, name: &str, engine: EngineType) -> AdaptorResult<bool> {
        Ok(self
            .backend
            .read()
            .await
            .databases
            .contains_key(&key(instance, name, engine)))
    }

    async fn user_exists(&self, instance: &str, username: &str, engine: EngineType) -> AdaptorResult<bool> {
        Ok(self
            .backend
            .read()
            .await
            .users
            .contains_key(&key(instance, username, engine)))
    }

    async fn add_user(&self, user: &DatabaseUser) -> AdaptorResult<DatabaseUser> {
        let mut backend = self.backend.write().await;
        backend.instance(&user.rss_instance_name)?;
        let k = key(&user.rss_instance_name, &user.username, user.engine);
        if backend.users.contains_key(&k) {
            return Err(AdaptorError::duplicate("database user", &user.username));
        }
        let created = DatabaseUser {
            id: Some(IdGenerator::user_id()),
            ..user.clone()
        };
        backend.users.insert(k, created.clone());
        Ok(created)
    }

    async fn remove_user(&self, instance: &str, username: &str, engine: EngineType) -> AdaptorResult<()> {
        let mut backend = self.backend.write().await;
        backend
            .users
            .remove(&key(instance, username, engine))
            .ok_or_else(|| AdaptorError::not_found("database user", username))?;
        backend
            .grants
            .retain(|(i, _, u, e), _| !(i == instance && u == username && *e == engine));
        Ok(())
    }

    async fn edit_user(&self, user: &DatabaseUser) -> AdaptorResult<DatabaseUser> {
        let mut backend = self.backend.write().await;
        let current = backend
            .users
            .get_mut(&key(&user.rss_instance_name, &user.username, user.engine))
            .ok_or_else(|| AdaptorError::not_found("database user", &user.username))?;
        if user.password.is_some() {
            current.password = user.password.clone();
        }
        Ok(current.clone())
    }

    async fn get_user(&self, instance: &str, username: &str, engine: EngineType) -> AdaptorResult<DatabaseUser> {
        self.backend
            .read()
            .await
            .users
            .get(&key(instance, username, engine))
            .cloned()
            .ok_or_else(|| AdaptorError::not_found("database user", username))
    }

    async fn get_users(&self) -> AdaptorResult<Vec<DatabaseUser>> {
        Ok(self.backend.read().await.users.values().cloned().collect())
    }

    async fn update_privileges(
        &self,
        privileges: &PrivilegeSet,
        user: &DatabaseUser,
        database: &str,
    ) -> AdaptorResult<()> {
        let mut backend = self.backend.write().await;
        let (instance, engine) = (user.rss_instance_name.as_str(), user.engine);
        backend.ensure_database(instance, database, engine)?;
        backend.ensure_user(instance, &user.username, engine)?;
        backend.grants.insert(
            (instance.to_string(), database.to_string(), user.username.clone(), engine),
            privileges.clone(),
        );
        Ok(())
    }

    async fn get_privileges(
        &self,
        instance: &str,
        database: &str,
        username: &str,
        engine: EngineType,
    ) -> AdaptorResult<PrivilegeSet> {
        let grant = (instance.to_string(), database.to_string(), username.to_string(), engine);
        self.backend
            .read()
            .await
            .grants
            .get(&grant)
            .cloned()
            .ok_or_else(|| AdaptorError::not_found("user privileges", format!("{}@{}", username, database)))
    }

    async fn get_attached_users(
        &self,
        instance: &str,
        database: &str,
        engine: EngineType,
    ) -> AdaptorResult<Vec<DatabaseUser>> {
        Ok(self.backend.read().await.attached(instance, database, engine))
    }

    async fn get_available_users(
        &self,
        instance: &str,
        database: &str,
        engine: EngineType,
    ) -> AdaptorResult<Vec<DatabaseUser>> {
        let backend = self.backend.read().await;
        let attached = backend.attached(instance, database, engine);
        Ok(backend
            .users
            .values()
            .filter(|u| u.rss_instance_name == instance && u.engine == engine)
            .filter(|u| !attached.contains(u))
            .cloned()
            .collect())
    }

    async fn apply_attachment(
        &self,
        entry: &UserDatabaseEntry,
        template: &PrivilegeTemplateEntry,
    ) -> AdaptorResult<()> {
        let mut backend = self.backend.write().await;
        let (instance, engine) = (entry.rss_instance_name.as_str(), entry.engine);
        backend.ensure_database(instance, &entry.database_name, engine)?;
        backend.ensure_user(instance, &entry.username, engine)?;
        backend.grants.insert(
            (
                instance.to_string(),
                entry.database_name.clone(),
                entry.username.clone(),
                engine,
            ),
            template.privileges.clone(),
        );
        Ok(())
    }

    async fn remove_attachment(&self, entry: &UserDatabaseEntry) -> AdaptorResult<()> {
        self.backend.write().await.grants.remove(&(
            entry.rss_instance_name.clone(),
            entry.database_name.clone(),
            entry.username.clone(),
            entry.engine,
        ));
        Ok(())
    }

    async fn create_snapshot(&self, database: &str, engine: EngineType) -> AdaptorResult<Snapshot> {
        let backend = self.backend.read().await;
        let exists = backend
            .databases
            .keys()
            .any(|(_, name, e)| name == database && *e == engine);
        if !exists {
            return Err(AdaptorError::not_found("database", database));
        }
        Ok(Snapshot {
            id: IdGenerator::snapshot_id(),
            database_name: database.to_string(),
            engine,
            location: None,
            created_at: Utc::now(),
        })
    }

    async fn add_template(&self, template: &PrivilegeTemplate) -> AdaptorResult<()> {
        let mut backend = self.backend.write().await;
        if backend.templates.contains_key(&template.name) {
            return Err(AdaptorError::duplicate("privilege template", &template.name));
        }
        backend.templates.insert(template.name.clone(), template.clone());
        Ok(())
    }

    async fn remove_template(&self, name: &str) -> AdaptorResult<()> {
        self.backend
            .write()
            .await
            .templates
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AdaptorError::not_found("privilege template", name))
    }

    async fn edit_template(&self, template: &PrivilegeTemplate) -> AdaptorResult<()> {
        let mut backend = self.backend.write().await;
        let current = backend
            .templates
            .get_mut(&template.name)
            .ok_or_else(|| AdaptorError::not_found("privilege template", &template.name))?;
        *current = template.clone();
        Ok(())
    }

    async fn get_template(&self, name: &str) -> AdaptorResult<Option<PrivilegeTemplate>> {
        Ok(self.backend.read().await.templates.get(name).cloned())
    }

    async fn get_templates(&self) -> AdaptorResult<Vec<PrivilegeTemplate>> {
        let mut templates: Vec<_> = self.backend.read().await.templates.values().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }
}
