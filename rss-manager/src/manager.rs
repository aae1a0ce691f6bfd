//! Resource manager facade.
//!
//! Every public operation follows the same shape: authorize, resolve the
//! environment and its adaptor, delegate, then update the environment's
//! instance set when the operation changes it. Reads are not authorized.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use common::errors::{AppError, AppResult};
use common::models::{
    Database, DatabaseUser, DatasourceDescriptor, EngineType, PrivilegeSet, PrivilegeTemplate,
    RssInstance, Snapshot, UserDatabaseEntry,
};

use crate::adaptor::{BackendContext, RssAdaptor};
use crate::attachment::AttachmentManager;
use crate::authorization::{Action, AuthorizationGate, ResourceKind};
use crate::datasource::{DatasourceCatalog, DatasourceRegistrar};
use crate::environment::{Environment, EnvironmentRegistry};

pub struct ResourceManager {
    provider: String,
    registry: Arc<EnvironmentRegistry>,
    gate: AuthorizationGate,
    attachments: AttachmentManager,
    datasources: DatasourceRegistrar,
}

impl ResourceManager {
    pub fn new(
        provider: impl Into<String>,
        registry: Arc<EnvironmentRegistry>,
        gate: AuthorizationGate,
        catalog: Arc<dyn DatasourceCatalog>,
    ) -> Self {
        Self {
            provider: provider.into(),
            attachments: AttachmentManager::new(registry.clone(), gate.clone()),
            datasources: DatasourceRegistrar::new(registry.clone(), catalog),
            registry,
            gate,
        }
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> Arc<dyn DatasourceCatalog> {
        self.datasources.catalog()
    }

    // ---------------------------------------------------------------------
    // Environments and RSS instances
    // ---------------------------------------------------------------------

    /// Name of the RSS provider serving this process.
    pub fn get_rss_provider(&self) -> &str {
        &self.provider
    }

    pub fn get_environments(&self) -> BTreeSet<String> {
        self.registry.names()
    }

    /// Creates an instance on the backend and registers it in `environment`.
    pub async fn add_rss_instance(&self, environment: &str, mut instance: RssInstance) -> AppResult<RssInstance> {
        self.gate
            .authorize(environment, instance.engine, ResourceKind::RssInstance, Action::Add)?;
        let env = self.registry.resolve(environment)?;
        instance.environment_name = env.name().to_string();
        instance.config_defined = false;

        let reservation = env.reserve_new(&instance.name)?;
        let created = env
            .adaptor()
            .add_instance(&instance)
            .await
            .backend_context("adding RSS instance", &instance.name)?;
        reservation.commit_insert(created.clone());

        info!(
            environment,
            instance = %created.name,
            engine = %created.engine,
            "RSS instance added"
        );
        Ok(created)
    }

    /// Drops a runtime-defined instance from the backend and the environment.
    pub async fn remove_rss_instance(&self, environment: &str, name: &str) -> AppResult<()> {
        let env = self.registry.resolve(environment)?;
        env.ensure_mutable(name)?;
        let current = env.instance(name)?;
        self.gate
            .authorize(environment, current.engine, ResourceKind::RssInstance, Action::Delete)?;

        let reservation = env.reserve_existing(name)?;
        env.adaptor()
            .remove_instance(environment, name)
            .await
            .backend_context("removing RSS instance", name)?;
        reservation.commit_remove();

        info!(environment, instance = name, "RSS instance removed");
        Ok(())
    }

    /// Replaces the instance `name` with `updated`.
    ///
    /// When `updated` names a different environment the record moves there:
    /// the target adaptor registers it first, then the source adaptor drops
    /// it. Renames are rejected.
    pub async fn update_rss_instance(
        &self,
        environment: &str,
        name: &str,
        mut updated: RssInstance,
    ) -> AppResult<RssInstance> {
        let source = self.registry.resolve(environment)?;
        source.ensure_mutable(name)?;
        if updated.name != name {
            return Err(AppError::Validation(format!(
                "RSS instance '{}' cannot be renamed to '{}'",
                name, updated.name
            )));
        }
        self.gate
            .authorize(environment, updated.engine, ResourceKind::RssInstance, Action::Edit)?;

        if updated.environment_name.trim().is_empty() {
            updated.environment_name = source.name().to_string();
        }
        let target = self.registry.resolve(&updated.environment_name)?;
        updated.config_defined = false;

        let source_reservation = source.reserve_existing(name)?;
        let mut canonical = if Arc::ptr_eq(&source, &target) {
            let canonical = source
                .adaptor()
                .update_instance(&updated)
                .await
                .backend_context("updating RSS instance", name)?;
            source_reservation.commit_replace(canonical.clone());
            canonical
        } else {
            let target_reservation = target.reserve_new(name)?;
            let canonical = move_instance(&source, &target, &updated).await?;
            source_reservation.commit_remove();
            target_reservation.commit_insert(canonical.clone());
            canonical
        };
        canonical.environment_name = target.name().to_string();

        info!(
            environment,
            target_environment = %target.name(),
            instance = %canonical.name,
            "RSS instance updated"
        );
        Ok(canonical)
    }

    pub fn get_rss_instance(&self, environment: &str, name: &str) -> AppResult<RssInstance> {
        self.registry.resolve(environment)?.instance(name)
    }

    pub fn get_rss_instances(&self, environment: &str) -> AppResult<Vec<RssInstance>> {
        Ok(self.registry.resolve(environment)?.all_instances())
    }

    /// Instances across every environment.
    pub fn get_rss_instances_list(&self) -> Vec<RssInstance> {
        self.registry.all_instances()
    }

    // ---------------------------------------------------------------------
    // Databases
    // ---------------------------------------------------------------------

    pub async fn add_database(&self, environment: &str, mut database: Database) -> AppResult<Database> {
        self.gate
            .authorize(environment, database.engine, ResourceKind::Database, Action::Add)?;
        let env = self.registry.resolve(environment)?;
        env.instance(&database.rss_instance_name)?;

        let canonical = env
            .adaptor()
            .add_database(&database)
            .await
            .backend_context("adding database", &database.name)?;
        database.overwrite_with(canonical);

        info!(
            environment,
            instance = %database.rss_instance_name,
            database = %database.name,
            "Database created"
        );
        Ok(database)
    }

    pub async fn remove_database(
        &self,
        environment: &str,
        instance: &str,
        name: &str,
        engine: EngineType,
    ) -> AppResult<()> {
        self.gate
            .authorize(environment, engine, ResourceKind::Database, Action::Delete)?;
        let env = self.registry.resolve(environment)?;
        env.adaptor()
            .remove_database(instance, name, engine)
            .await
            .backend_context("removing database", name)?;

        info!(environment, instance, database = name, "Database dropped");
        Ok(())
    }

    pub async fn get_database(
        &self,
        environment: &str,
        instance: &str,
        name: &str,
        engine: EngineType,
    ) -> AppResult<Database> {
        self.adaptor_of(environment)?
            .get_database(instance, name, engine)
            .await
            .backend_context("reading database", name)
    }

    /// Databases of the environment, one per identity.
    pub async fn get_databases(&self, environment: &str) -> AppResult<Vec<Database>> {
        let databases = self
            .adaptor_of(environment)?
            .get_databases()
            .await
            .backend_context("listing databases", environment)?;

        let mut seen = HashSet::new();
        let mut unique: Vec<_> = databases
            .into_iter()
            .filter(|db| seen.insert(db.identity()))
            .collect();
        unique.sort_by_key(|db| db.identity());
        Ok(unique)
    }

    pub async fn database_exists(
        &self,
        environment: &str,
        instance: &str,
        name: &str,
        engine: EngineType,
    ) -> AppResult<bool> {
        self.adaptor_of(environment)?
            .database_exists(instance, name, engine)
            .await
            .backend_context("checking database", name)
    }

    // ---------------------------------------------------------------------
    // Database users
    // ---------------------------------------------------------------------

    pub async fn database_user_exists(
        &self,
        environment: &str,
        instance: &str,
        username: &str,
        engine: EngineType,
    ) -> AppResult<bool> {
        self.adaptor_of(environment)?
            .user_exists(instance, username, engine)
            .await
            .backend_context("checking database user", username)
    }

    pub async fn add_database_user(&self, environment: &str, mut user: DatabaseUser) -> AppResult<DatabaseUser> {
        self.gate
            .authorize(environment, user.engine, ResourceKind::DatabaseUser, Action::Add)?;
        let env = self.registry.resolve(environment)?;
        env.instance(&user.rss_instance_name)?;

        let canonical = env
            .adaptor()
            .add_user(&user)
            .await
            .backend_context("adding database user", &user.username)?;
        user.overwrite_with(canonical);

        info!(
            environment,
            instance = %user.rss_instance_name,
            username = %user.username,
            "Database user created"
        );
        Ok(user)
    }

    pub async fn remove_database_user(
        &self,
        environment: &str,
        instance: &str,
        username: &str,
        engine: EngineType,
    ) -> AppResult<()> {
        self.gate
            .authorize(environment, engine, ResourceKind::DatabaseUser, Action::Delete)?;
        self.adaptor_of(environment)?
            .remove_user(instance, username, engine)
            .await
            .backend_context("removing database user", username)?;

        info!(environment, instance, username, "Database user dropped");
        Ok(())
    }

    pub async fn edit_database_user(&self, environment: &str, user: DatabaseUser) -> AppResult<DatabaseUser> {
        self.gate
            .authorize(environment, user.engine, ResourceKind::DatabaseUser, Action::Edit)?;
        let edited = self
            .adaptor_of(environment)?
            .edit_user(&user)
            .await
            .backend_context("editing database user", &user.username)?;

        info!(environment, username = %edited.username, "Database user edited");
        Ok(edited)
    }

    pub async fn get_database_user(
        &self,
        environment: &str,
        instance: &str,
        username: &str,
        engine: EngineType,
    ) -> AppResult<DatabaseUser> {
        self.adaptor_of(environment)?
            .get_user(instance, username, engine)
            .await
            .backend_context("reading database user", username)
    }

    /// Users of the environment as a set keyed by identity.
    pub async fn get_database_users(&self, environment: &str) -> AppResult<HashSet<DatabaseUser>> {
        let users = self
            .adaptor_of(environment)?
            .get_users()
            .await
            .backend_context("listing database users", environment)?;
        Ok(users.into_iter().collect())
    }

    // ---------------------------------------------------------------------
    // Privileges
    // ---------------------------------------------------------------------

    /// Replaces the user's privileges on `database`. Authorized as a user edit.
    pub async fn update_database_user_privileges(
        &self,
        environment: &str,
        privileges: &PrivilegeSet,
        user: &DatabaseUser,
        database: &str,
    ) -> AppResult<()> {
        self.gate
            .authorize(environment, user.engine, ResourceKind::DatabaseUser, Action::Edit)?;
        self.adaptor_of(environment)?
            .update_privileges(privileges, user, database)
            .await
            .backend_context("updating privileges", &user.username)?;

        info!(
            environment,
            username = %user.username,
            database,
            privileges = privileges.privileges.len(),
            "Database user privileges updated"
        );
        Ok(())
    }

    pub async fn get_user_database_privileges(
        &self,
        environment: &str,
        instance: &str,
        database: &str,
        username: &str,
        engine: EngineType,
    ) -> AppResult<PrivilegeSet> {
        self.adaptor_of(environment)?
            .get_privileges(instance, database, username, engine)
            .await
            .backend_context("reading privileges", username)
    }

    // ---------------------------------------------------------------------
    // Attachments
    // ---------------------------------------------------------------------

    pub async fn attach_user(
        &self,
        environment: &str,
        engine: EngineType,
        template_name: &str,
        username: &str,
        database: &str,
        instance: &str,
    ) -> AppResult<UserDatabaseEntry> {
        self.attachments
            .attach_user(environment, engine, template_name, username, database, instance)
            .await
    }

    pub async fn detach_user(&self, entry: &UserDatabaseEntry) -> AppResult<()> {
        self.attachments.detach_user(entry).await
    }

    pub async fn get_attached_users(
        &self,
        environment: &str,
        instance: &str,
        database: &str,
        engine: EngineType,
    ) -> AppResult<Vec<DatabaseUser>> {
        self.adaptor_of(environment)?
            .get_attached_users(instance, database, engine)
            .await
            .backend_context("listing attached users", database)
    }

    pub async fn get_available_users(
        &self,
        environment: &str,
        instance: &str,
        database: &str,
        engine: EngineType,
    ) -> AppResult<Vec<DatabaseUser>> {
        self.adaptor_of(environment)?
            .get_available_users(instance, database, engine)
            .await
            .backend_context("listing available users", database)
    }

    // ---------------------------------------------------------------------
    // Privilege templates
    // ---------------------------------------------------------------------

    pub async fn add_privilege_template(&self, environment: &str, template: PrivilegeTemplate) -> AppResult<PrivilegeTemplate> {
        let template = self.scoped_template(environment, template)?;
        self.adaptor_of(environment)?
            .add_template(&template)
            .await
            .backend_context("adding privilege template", &template.name)?;
        info!(environment, template = %template.name, "Privilege template added");
        Ok(template)
    }

    pub async fn remove_privilege_template(&self, environment: &str, name: &str) -> AppResult<()> {
        self.adaptor_of(environment)?
            .remove_template(name)
            .await
            .backend_context("removing privilege template", name)?;
        info!(environment, template = name, "Privilege template removed");
        Ok(())
    }

    pub async fn update_privilege_template(
        &self,
        environment: &str,
        template: PrivilegeTemplate,
    ) -> AppResult<PrivilegeTemplate> {
        let template = self.scoped_template(environment, template)?;
        self.adaptor_of(environment)?
            .edit_template(&template)
            .await
            .backend_context("editing privilege template", &template.name)?;
        info!(environment, template = %template.name, "Privilege template edited");
        Ok(template)
    }

    pub async fn get_privilege_template(&self, environment: &str, name: &str) -> AppResult<PrivilegeTemplate> {
        self.adaptor_of(environment)?
            .get_template(name)
            .await
            .backend_context("reading privilege template", name)?
            .ok_or_else(|| AppError::not_found("privilege template", name))
    }

    pub async fn get_privilege_templates(&self, environment: &str) -> AppResult<Vec<PrivilegeTemplate>> {
        self.adaptor_of(environment)?
            .get_templates()
            .await
            .backend_context("listing privilege templates", environment)
    }

    pub async fn privilege_template_exists(&self, environment: &str, name: &str) -> AppResult<bool> {
        Ok(self
            .adaptor_of(environment)?
            .get_template(name)
            .await
            .backend_context("checking privilege template", name)?
            .is_some())
    }

    // ---------------------------------------------------------------------
    // Datasources and snapshots
    // ---------------------------------------------------------------------

    pub async fn add_datasource(
        &self,
        environment: &str,
        name: &str,
        entry: &UserDatabaseEntry,
    ) -> AppResult<DatasourceDescriptor> {
        self.datasources.register_datasource(environment, name, entry).await
    }

    pub async fn remove_datasource(&self, name: &str) -> AppResult<()> {
        self.datasources.remove_datasource(name).await
    }

    pub async fn create_snapshot(
        &self,
        environment: &str,
        database: &str,
        engine: EngineType,
    ) -> AppResult<Snapshot> {
        debug!(environment, database, "Creating snapshot");
        let snapshot = self
            .adaptor_of(environment)?
            .create_snapshot(database, engine)
            .await
            .backend_context("creating snapshot", database)?;
        info!(environment, database, snapshot = %snapshot.id, "Snapshot created");
        Ok(snapshot)
    }

    fn adaptor_of(&self, environment: &str) -> AppResult<Arc<dyn RssAdaptor>> {
        Ok(self.registry.resolve(environment)?.adaptor())
    }

    fn scoped_template(&self, environment: &str, mut template: PrivilegeTemplate) -> AppResult<PrivilegeTemplate> {
        template.environment_name = self.registry.resolve(environment)?.name().to_string();
        Ok(template)
    }
}

/// Registers `instance` with the target adaptor, then drops it from the
/// source adaptor. A failed drop unregisters it from the target again.
async fn move_instance(
    source: &Environment,
    target: &Environment,
    instance: &RssInstance,
) -> AppResult<RssInstance> {
    let created = target
        .adaptor()
        .add_instance(instance)
        .await
        .backend_context("moving RSS instance", &instance.name)?;

    if let Err(err) = source.adaptor().remove_instance(source.name(), &instance.name).await {
        if let Err(rollback) = target.adaptor().remove_instance(target.name(), &created.name).await {
            warn!(
                instance = %created.name,
                environment = %target.name(),
                error = %rollback,
                "Failed to unregister moved RSS instance"
            );
        }
        return Err::<RssInstance, _>(err).backend_context("moving RSS instance", &instance.name);
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::authorization::{DenyAll, GrantedPermissions};
    use crate::datasource::InMemoryCatalog;
    use crate::testing::{instance, multi_registry, RecordingAdaptor};

    struct Fixture {
        manager: Arc<ResourceManager>,
        adaptors: Vec<(String, Arc<RecordingAdaptor>)>,
    }

    impl Fixture {
        fn adaptor(&self, environment: &str) -> Arc<RecordingAdaptor> {
            self.adaptors
                .iter()
                .find(|(name, _)| name == environment)
                .map(|(_, a)| a.clone())
                .expect("environment fixture")
        }
    }

    async fn fixture(gate: AuthorizationGate) -> Fixture {
        let (registry, adaptors) = multi_registry().await;
        let manager = ResourceManager::new("test", registry, gate, Arc::new(InMemoryCatalog::new()));
        Fixture {
            manager: Arc::new(manager),
            adaptors,
        }
    }

    #[tokio::test]
    async fn test_provider_and_environments() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        assert_eq!(f.manager.get_rss_provider(), "test");
        assert_eq!(
            f.manager.get_environments().into_iter().collect::<Vec<_>>(),
            vec!["dev", "prod", "stage"]
        );
    }

    #[tokio::test]
    async fn test_add_then_remove_restores_registry() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        let before = f.manager.get_rss_instances_list();

        let added = f.manager.add_rss_instance("dev", instance("dev", "tmp")).await.unwrap();
        assert!(!added.config_defined);
        assert_eq!(f.manager.get_rss_instance("dev", "tmp").unwrap().name, "tmp");

        f.manager.remove_rss_instance("dev", "tmp").await.unwrap();
        assert_eq!(f.manager.get_rss_instances_list(), before);
        assert!(f.manager.registry().resolve("dev").unwrap().handle("tmp").is_none());
    }

    #[tokio::test]
    async fn test_config_defined_is_immutable_regardless_of_authorization() {
        for gate in [AuthorizationGate::allow_all(), AuthorizationGate::new(Arc::new(DenyAll))] {
            let f = fixture(gate).await;
            let removal = f.manager.remove_rss_instance("prod", "core-db").await;
            assert!(matches!(removal, Err(AppError::ConfigImmutable { .. })));

            let update = f
                .manager
                .update_rss_instance("prod", "core-db", instance("prod", "core-db"))
                .await;
            assert!(matches!(update, Err(AppError::ConfigImmutable { .. })));
            assert!(f.adaptor("prod").calls().is_empty());
        }
    }

    #[tokio::test]
    async fn test_core_db_update_to_postgres_leaves_record_unchanged() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        let before = f.manager.get_rss_instance("prod", "core-db").unwrap();

        let mut updated = instance("prod", "core-db");
        updated.engine = EngineType::Postgres;
        updated.port = 5432;
        let result = f.manager.update_rss_instance("prod", "core-db", updated).await;

        match result {
            Err(AppError::ConfigImmutable { environment, instance }) => {
                assert_eq!(environment, "prod");
                assert_eq!(instance, "core-db");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(f.manager.get_rss_instance("prod", "core-db").unwrap(), before);
        assert!(!f.adaptor("prod").was_called("update_instance"));
    }

    #[tokio::test]
    async fn test_denied_add_makes_no_backend_call() {
        let f = fixture(AuthorizationGate::new(Arc::new(DenyAll))).await;
        let before = f.manager.get_rss_instances_list();

        let result = f.manager.add_rss_instance("stage", instance("stage", "x")).await;

        match result {
            Err(AppError::AuthorizationDenied { resource }) => {
                assert_eq!(resource, "/permission/admin/rss/stage/mysql/rss-instance/add");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(f.adaptor("stage").calls().is_empty());
        assert_eq!(f.manager.get_rss_instances_list(), before);
    }

    #[tokio::test]
    async fn test_concurrent_adds_of_same_name() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        f.adaptor("stage").set_instance_latency(Duration::from_millis(50));

        let first = {
            let manager = f.manager.clone();
            tokio::spawn(async move { manager.add_rss_instance("stage", instance("stage", "x")).await })
        };
        let second = {
            let manager = f.manager.clone();
            tokio::spawn(async move { manager.add_rss_instance("stage", instance("stage", "x")).await })
        };
        let results = [first.await.unwrap(), second.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(AppError::Conflict { .. })))
                .count(),
            1
        );
        let stage = f.manager.get_rss_instances("stage").unwrap();
        assert_eq!(stage.iter().filter(|i| i.name == "x").count(), 1);
        assert_eq!(f.adaptor("stage").calls_named("add_instance"), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_registry_untouched() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        f.adaptor("dev").set_unreachable(true);

        let result = f.manager.add_rss_instance("dev", instance("dev", "tmp")).await;

        assert!(matches!(
            result,
            Err(AppError::BackendConnection { operation: "adding RSS instance", .. })
        ));
        assert!(f.manager.get_rss_instance("dev", "tmp").is_err());
        // The name is free again once the failed call returns.
        f.adaptor("dev").set_unreachable(false);
        assert!(f.manager.add_rss_instance("dev", instance("dev", "tmp")).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_moves_instance_between_environments() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        f.manager.add_rss_instance("dev", instance("dev", "mover")).await.unwrap();

        let mut updated = instance("stage", "mover");
        updated.host = "10.0.0.9".into();
        let moved = f.manager.update_rss_instance("dev", "mover", updated).await.unwrap();

        assert_eq!(moved.environment_name, "stage");
        assert_eq!(moved.host, "10.0.0.9");
        assert!(f.manager.get_rss_instance("dev", "mover").is_err());
        let handle = f.manager.registry().resolve("stage").unwrap().handle("mover").unwrap();
        assert_eq!(handle.url, "mysql://10.0.0.9:3306");
        assert!(f.adaptor("stage").was_called("add_instance"));
        assert!(f.adaptor("dev").was_called("remove_instance"));
        assert!(!f.adaptor("dev").was_called("update_instance"));

        // The target backend serves the moved instance.
        let created = f
            .manager
            .add_database("stage", Database::new("mover", "billing", EngineType::MySql))
            .await
            .unwrap();
        assert_eq!(created.url.as_deref(), Some("mysql://10.0.0.9:3306/billing"));

        f.manager.remove_rss_instance("stage", "mover").await.unwrap();
        assert!(f.manager.get_rss_instance("stage", "mover").is_err());
        assert!(f.manager.add_rss_instance("dev", instance("dev", "mover")).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_move_unregisters_from_target() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        f.manager.add_rss_instance("dev", instance("dev", "mover")).await.unwrap();
        f.adaptor("dev").set_unreachable(true);

        let result = f
            .manager
            .update_rss_instance("dev", "mover", instance("stage", "mover"))
            .await;

        assert!(matches!(
            result,
            Err(AppError::BackendConnection { operation: "moving RSS instance", .. })
        ));
        assert!(f.manager.get_rss_instance("dev", "mover").is_ok());
        assert!(f.manager.get_rss_instance("stage", "mover").is_err());
        assert_eq!(f.adaptor("stage").calls_named("remove_instance"), 1);
        // The stage backend no longer knows the name.
        assert!(f.manager.add_rss_instance("stage", instance("stage", "mover")).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_rejects_rename() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        f.manager.add_rss_instance("dev", instance("dev", "tmp")).await.unwrap();

        let result = f
            .manager
            .update_rss_instance("dev", "tmp", instance("dev", "renamed"))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(!f.adaptor("dev").was_called("update_instance"));
        assert!(f.manager.get_rss_instance("dev", "tmp").is_ok());
        assert!(f.manager.get_rss_instance("dev", "renamed").is_err());
    }

    #[tokio::test]
    async fn test_update_returns_canonical_record() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        f.manager.add_rss_instance("dev", instance("dev", "tmp")).await.unwrap();
        f.adaptor("dev").set_canonical_name("tmp-1");

        let updated = f
            .manager
            .update_rss_instance("dev", "tmp", instance("dev", "tmp"))
            .await
            .unwrap();

        assert_eq!(updated.name, "tmp-1");
        assert_eq!(updated.environment_name, "dev");
        assert_eq!(f.manager.get_rss_instance("dev", "tmp-1").unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_to_unknown_environment_fails_before_backend() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        f.manager.add_rss_instance("dev", instance("dev", "mover")).await.unwrap();

        let result = f
            .manager
            .update_rss_instance("dev", "mover", instance("qa", "mover"))
            .await;

        assert!(matches!(result, Err(AppError::NotFound { kind: "environment", .. })));
        assert!(!f.adaptor("dev").was_called("update_instance"));
        assert!(f.manager.get_rss_instance("dev", "mover").is_ok());
    }

    #[tokio::test]
    async fn test_add_database_returns_canonical_entity() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        let db = f
            .manager
            .add_database("dev", Database::new("inst1", "billing", EngineType::MySql))
            .await
            .unwrap();
        assert!(db.id.as_deref().unwrap_or_default().starts_with("db-"));
        assert_eq!(db.url.as_deref(), Some("mysql://localhost:3306/billing"));
        assert!(f
            .manager
            .database_exists("dev", "inst1", "billing", EngineType::MySql)
            .await
            .unwrap());

        let names: Vec<_> = f
            .manager
            .get_databases("dev")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["billing", "orders"]);
    }

    #[tokio::test]
    async fn test_add_database_on_unknown_instance() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        let result = f
            .manager
            .add_database("dev", Database::new("ghost", "billing", EngineType::MySql))
            .await;
        assert!(matches!(result, Err(AppError::NotFound { kind: "RSS instance", .. })));
        assert!(!f.adaptor("dev").was_called("add_database"));
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        let user = DatabaseUser::new("inst1", "carol", EngineType::MySql).with_password("pw");
        let created = f.manager.add_database_user("dev", user).await.unwrap();
        assert!(created.id.is_some());

        let users = f.manager.get_database_users("dev").await.unwrap();
        assert_eq!(users.len(), 3);
        assert!(users.contains(&DatabaseUser::new("inst1", "carol", EngineType::MySql)));

        let edited = f
            .manager
            .edit_database_user("dev", DatabaseUser::new("inst1", "carol", EngineType::MySql).with_password("new"))
            .await
            .unwrap();
        assert_eq!(edited.password.as_deref(), Some("new"));

        f.manager
            .remove_database_user("dev", "inst1", "carol", EngineType::MySql)
            .await
            .unwrap();
        assert!(!f
            .manager
            .database_user_exists("dev", "inst1", "carol", EngineType::MySql)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_privilege_update_is_gated_as_user_edit() {
        let gate = AuthorizationGate::new(Arc::new(GrantedPermissions::new([
            "/permission/admin/rss/dev/mysql/database-user/edit",
        ])));
        let f = fixture(gate).await;
        let alice = DatabaseUser::new("inst1", "alice", EngineType::MySql);

        f.manager
            .update_database_user_privileges("dev", &PrivilegeSet::read_only(), &alice, "orders")
            .await
            .unwrap();
        let granted = f
            .manager
            .get_user_database_privileges("dev", "inst1", "orders", "alice", EngineType::MySql)
            .await
            .unwrap();
        assert_eq!(granted, PrivilegeSet::read_only());

        let denied = f
            .manager
            .update_database_user_privileges("stage", &PrivilegeSet::all(), &alice, "orders")
            .await;
        assert!(matches!(denied, Err(AppError::AuthorizationDenied { .. })));
    }

    #[tokio::test]
    async fn test_attach_and_list_users() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        f.manager
            .attach_user("dev", EngineType::MySql, "readwrite", "alice", "orders", "inst1")
            .await
            .unwrap();

        let attached = f
            .manager
            .get_attached_users("dev", "inst1", "orders", EngineType::MySql)
            .await
            .unwrap();
        let available = f
            .manager
            .get_available_users("dev", "inst1", "orders", EngineType::MySql)
            .await
            .unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].username, "alice");
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].username, "bob");
    }

    #[tokio::test]
    async fn test_templates_are_ungated() {
        let f = fixture(AuthorizationGate::new(Arc::new(DenyAll))).await;
        let template = PrivilegeTemplate::new("elsewhere", "ops", PrivilegeSet::all());

        let added = f.manager.add_privilege_template("dev", template).await.unwrap();
        assert_eq!(added.environment_name, "dev");
        assert!(f.manager.privilege_template_exists("dev", "ops").await.unwrap());
        assert!(!f.manager.privilege_template_exists("stage", "ops").await.unwrap());

        f.manager
            .update_privilege_template("dev", PrivilegeTemplate::new("dev", "ops", PrivilegeSet::read_only()))
            .await
            .unwrap();
        let stored = f.manager.get_privilege_template("dev", "ops").await.unwrap();
        assert_eq!(stored.entry.privileges, PrivilegeSet::read_only());

        f.manager.remove_privilege_template("dev", "ops").await.unwrap();
        assert!(matches!(
            f.manager.get_privilege_template("dev", "ops").await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_template_backend_failure_carries_name() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        f.adaptor("dev").set_unreachable(true);
        match f.manager.get_privilege_templates("dev").await {
            Err(AppError::BackendConnection { entity, cause, .. }) => {
                assert_eq!(entity, "dev");
                assert_eq!(cause, "connection refused");
            }
            other => panic!("unexpected: {:?}", other),
        }
        match f.manager.remove_privilege_template("dev", "readwrite").await {
            Err(AppError::BackendConnection { entity, .. }) => assert_eq!(entity, "readwrite"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_datasource_and_snapshot() {
        let f = fixture(AuthorizationGate::allow_all()).await;
        let entry = UserDatabaseEntry::new("dev", "inst1", "orders", "alice", EngineType::MySql);
        f.manager.add_datasource("dev", "orders-ds", &entry).await.unwrap();
        assert_eq!(f.manager.catalog().list_all().await.unwrap().len(), 1);
        f.manager.remove_datasource("orders-ds").await.unwrap();
        f.manager.remove_datasource("orders-ds").await.unwrap();

        let snapshot = f
            .manager
            .create_snapshot("dev", "orders", EngineType::MySql)
            .await
            .unwrap();
        assert_eq!(snapshot.database_name, "orders");
    }
}
