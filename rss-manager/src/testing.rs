//! Test fixtures: a call-recording adaptor and seeded registries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use common::models::{
    Database, DatabaseUser, EngineType, PrivilegeSet, PrivilegeTemplate, PrivilegeTemplateEntry,
    RssInstance, Snapshot, UserDatabaseEntry,
};

use crate::adaptor::{AdaptorError, AdaptorResult, InMemoryAdaptor, RssAdaptor};
use crate::environment::{Environment, EnvironmentRegistry};

/// Wraps an `InMemoryAdaptor` and records every call by name.
pub struct RecordingAdaptor {
    inner: InMemoryAdaptor,
    calls: Mutex<Vec<&'static str>>,
    unreachable: AtomicBool,
    instance_latency: Mutex<Option<Duration>>,
    canonical_name: Mutex<Option<String>>,
}

impl RecordingAdaptor {
    pub fn new(inner: InMemoryAdaptor) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            unreachable: AtomicBool::new(false),
            instance_latency: Mutex::new(None),
            canonical_name: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn calls_named(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| **c == name).count()
    }

    pub fn was_called(&self, name: &str) -> bool {
        self.calls_named(name) > 0
    }

    /// Makes every following call fail with a connection error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Delays `add_instance` so that concurrent callers overlap.
    pub fn set_instance_latency(&self, latency: Duration) {
        *self.instance_latency.lock().unwrap_or_else(PoisonError::into_inner) = Some(latency);
    }

    /// Makes `update_instance` answer with a record carrying `name`.
    pub fn set_canonical_name(&self, name: &str) {
        *self.canonical_name.lock().unwrap_or_else(PoisonError::into_inner) = Some(name.to_string());
    }

    pub async fn attached_usernames(&self, instance: &str, database: &str) -> Vec<String> {
        let mut names: Vec<_> = self
            .inner
            .get_attached_users(instance, database, EngineType::MySql)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|u| u.username)
            .collect();
        names.sort();
        names
    }

    fn record(&self, call: &'static str) -> AdaptorResult<()> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AdaptorError::Connection("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RssAdaptor for RecordingAdaptor {
    fn kind(&self) -> &'static str {
        "recording"
    }

    async fn add_instance(&self, instance: &RssInstance) -> AdaptorResult<RssInstance> {
        self.record("add_instance")?;
        let latency = *self.instance_latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.inner.add_instance(instance).await
    }

    async fn remove_instance(&self, environment: &str, name: &str) -> AdaptorResult<()> {
        self.record("remove_instance")?;
        self.inner.remove_instance(environment, name).await
    }

    async fn update_instance(&self, instance: &RssInstance) -> AdaptorResult<RssInstance> {
        self.record("update_instance")?;
        let mut canonical = self.inner.update_instance(instance).await?;
        if let Some(name) = self.canonical_name.lock().unwrap_or_else(PoisonError::into_inner).clone() {
            canonical.name = name;
        }
        Ok(canonical)
    }

    async fn add_database(&self, database: &Database) -> AdaptorResult<Database> {
        self.record("add_database")?;
        self.inner.add_database(database).await
    }

    async fn remove_database(&self, instance: &str, name: &str, engine: EngineType) -> AdaptorResult<()> {
        self.record("remove_database")?;
        self.inner.remove_database(instance, name, engine).await
    }

    async fn get_database(&self, instance: &str, name: &str, engine: EngineType) -> AdaptorResult<Database> {
        self.record("get_database")?;
        self.inner.get_database(instance, name, engine).await
    }

    async fn get_databases(&self) -> AdaptorResult<Vec<Database>> {
        self.record("get_databases")?;
        self.inner.get_databases().await
    }

    async fn database_exists(&self, instance: &str, name: &str, engine: EngineType) -> AdaptorResult<bool> {
        self.record("database_exists")?;
        self.inner.database_exists(instance, name, engine).await
    }

    async fn user_exists(&self, instance: &str, username: &str, engine: EngineType) -> AdaptorResult<bool> {
        self.record("user_exists")?;
        self.inner.user_exists(instance, username, engine).await
    }

    async fn add_user(&self, user: &DatabaseUser) -> AdaptorResult<DatabaseUser> {
        self.record("add_user")?;
        self.inner.add_user(user).await
    }

    async fn remove_user(&self, instance: &str, username: &str, engine: EngineType) -> AdaptorResult<()> {
        self.record("remove_user")?;
        self.inner.remove_user(instance, username, engine).await
    }

    async fn edit_user(&self, user: &DatabaseUser) -> AdaptorResult<DatabaseUser> {
        self.record("edit_user")?;
        self.inner.edit_user(user).await
    }

    async fn get_user(&self, instance: &str, username: &str, engine: EngineType) -> AdaptorResult<DatabaseUser> {
        self.record("get_user")?;
        self.inner.get_user(instance, username, engine).await
    }

    async fn get_users(&self) -> AdaptorResult<Vec<DatabaseUser>> {
        self.record("get_users")?;
        self.inner.get_users().await
    }

    async fn update_privileges(
        &self,
        privileges: &PrivilegeSet,
        user: &DatabaseUser,
        database: &str,
    ) -> AdaptorResult<()> {
        self.record("update_privileges")?;
        self.inner.update_privileges(privileges, user, database).await
    }

    async fn get_privileges(
        &self,
        instance: &str,
        database: &str,
        username: &str,
        engine: EngineType,
    ) -> AdaptorResult<PrivilegeSet> {
        self.record("get_privileges")?;
        self.inner.get_privileges(instance, database, username, engine).await
    }

    async fn get_attached_users(
        &self,
        instance: &str,
        database: &str,
        engine: EngineType,
    ) -> AdaptorResult<Vec<DatabaseUser>> {
        self.record("get_attached_users")?;
        self.inner.get_attached_users(instance, database, engine).await
    }

    async fn get_available_users(
        &self,
        instance: &str,
        database: &str,
        engine: EngineType,
    ) -> AdaptorResult<Vec<DatabaseUser>> {
        self.record("get_available_users")?;
        self.inner.get_available_users(instance, database, engine).await
    }

    async fn apply_attachment(
        &self,
        entry: &UserDatabaseEntry,
        template: &PrivilegeTemplateEntry,
    ) -> AdaptorResult<()> {
        self.record("apply_attachment")?;
        self.inner.apply_attachment(entry, template).await
    }

    async fn remove_attachment(&self, entry: &UserDatabaseEntry) -> AdaptorResult<()> {
        self.record("remove_attachment")?;
        self.inner.remove_attachment(entry).await
    }

    async fn create_snapshot(&self, database: &str, engine: EngineType) -> AdaptorResult<Snapshot> {
        self.record("create_snapshot")?;
        self.inner.create_snapshot(database, engine).await
    }

    async fn add_template(&self, template: &PrivilegeTemplate) -> AdaptorResult<()> {
        self.record("add_template")?;
        self.inner.add_template(template).await
    }

    async fn remove_template(&self, name: &str) -> AdaptorResult<()> {
        self.record("remove_template")?;
        self.inner.remove_template(name).await
    }

    async fn edit_template(&self, template: &PrivilegeTemplate) -> AdaptorResult<()> {
        self.record("edit_template")?;
        self.inner.edit_template(template).await
    }

    async fn get_template(&self, name: &str) -> AdaptorResult<Option<PrivilegeTemplate>> {
        self.record("get_template")?;
        self.inner.get_template(name).await
    }

    async fn get_templates(&self) -> AdaptorResult<Vec<PrivilegeTemplate>> {
        self.record("get_templates")?;
        self.inner.get_templates().await
    }
}

pub fn instance(environment: &str, name: &str) -> RssInstance {
    RssInstance {
        name: name.into(),
        environment_name: environment.into(),
        engine: EngineType::MySql,
        host: "localhost".into(),
        port: 3306,
        admin_username: "root".into(),
        admin_password: String::new(),
        config_defined: false,
    }
}

/// Backend knowing `inst1` with database `orders`, users `alice` and `bob`,
/// and templates `readwrite` and `select-only`. Seeding is not recorded.
pub async fn seeded_adaptor(environment: &str) -> Arc<RecordingAdaptor> {
    let inner = InMemoryAdaptor::with_instances([instance(environment, "inst1")]);
    let seed = async {
        inner
            .add_database(&Database::new("inst1", "orders", EngineType::MySql))
            .await?;
        for username in ["alice", "bob"] {
            inner
                .add_user(&DatabaseUser::new("inst1", username, EngineType::MySql).with_password("pw"))
                .await?;
        }
        inner
            .add_template(&PrivilegeTemplate::new(environment, "readwrite", PrivilegeSet::all()))
            .await?;
        inner
            .add_template(&PrivilegeTemplate::new(environment, "select-only", PrivilegeSet::read_only()))
            .await
    };
    seed.await.expect("seeding in-memory backend");
    Arc::new(RecordingAdaptor::new(inner))
}

/// One environment whose static instance `inst1` is backed by a seeded adaptor.
pub async fn seeded_registry(environment: &str) -> (Arc<EnvironmentRegistry>, Arc<RecordingAdaptor>) {
    let adaptor = seeded_adaptor(environment).await;
    let env = Environment::new(
        environment,
        adaptor.clone(),
        vec![instance(environment, "inst1")],
    )
    .expect("environment");
    let registry = EnvironmentRegistry::new(vec![env]).expect("registry");
    (Arc::new(registry), adaptor)
}

/// `dev`, `stage` and `prod`; `prod` carries the static instance `core-db`.
pub async fn multi_registry() -> (Arc<EnvironmentRegistry>, Vec<(String, Arc<RecordingAdaptor>)>) {
    let mut environments = Vec::new();
    let mut adaptors = Vec::new();
    for name in ["dev", "stage", "prod"] {
        let adaptor = seeded_adaptor(name).await;
        let mut statics = vec![instance(name, "inst1")];
        if name == "prod" {
            statics.push(instance(name, "core-db"));
        }
        environments.push(Environment::new(name, adaptor.clone(), statics).expect("environment"));
        adaptors.push((name.to_string(), adaptor));
    }
    let registry = EnvironmentRegistry::new(environments).expect("registry");
    (Arc::new(registry), adaptors)
}
