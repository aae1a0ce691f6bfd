//! MySQL backend.
//!
//! Keeps one `sqlx` pool per RSS instance, authenticated with the instance's
//! administrative account. Databases and users are managed with plain DDL;
//! attachments are database-level grants read back from `mysql.db`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;
use tokio::sync::RwLock;

use common::errors::{AppError, AppResult};
use common::models::{
    Database, DatabaseUser, EngineType, Privilege, PrivilegeSet, PrivilegeTemplate,
    PrivilegeTemplateEntry, RssInstance, Snapshot, UserDatabaseEntry,
};
use common::utils::{IdGenerator, IdentifierValidator};

use super::{AdaptorError, AdaptorResult, RssAdaptor};

/// Schemas owned by the server itself.
const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

/// Host part used for every managed account.
const USER_HOST: &str = "%";

/// Pool and snapshot settings shared by all instances of an environment.
#[derive(Debug, Clone)]
pub struct MySqlSettings {
    pub connect_timeout: Duration,
    pub max_connections: u32,
    /// Directory receiving `mysqldump` output.
    pub snapshot_dir: PathBuf,
    /// Dump binary, `mysqldump` unless overridden.
    pub dump_command: String,
}

#[derive(Clone)]
struct InstancePool {
    instance: RssInstance,
    pool: MySqlPool,
}

/// Adaptor for MySQL and MariaDB servers.
pub struct MySqlAdaptor {
    settings: MySqlSettings,
    pools: RwLock<HashMap<String, InstancePool>>,
    templates: RwLock<HashMap<String, PrivilegeTemplate>>,
}

impl MySqlAdaptor {
    /// Creates lazy pools for the statically configured instances; nothing
    /// connects until the first query.
    pub fn new(instances: &[RssInstance], settings: MySqlSettings) -> AppResult<Self> {
        let mut pools = HashMap::new();
        for instance in instances {
            ensure_mysql(instance.engine).map_err(|e| {
                AppError::IllegalConfiguration(format!("RSS instance '{}': {}", instance.name, e))
            })?;
            let pool = pool_options(&settings).connect_lazy_with(connect_options(instance));
            pools.insert(
                instance.name.clone(),
                InstancePool {
                    instance: instance.clone(),
                    pool,
                },
            );
        }
        Ok(Self {
            settings,
            pools: RwLock::new(pools),
            templates: RwLock::new(HashMap::new()),
        })
    }

    async fn pool(&self, instance: &str) -> AdaptorResult<InstancePool> {
        self.pools
            .read()
            .await
            .get(instance)
            .cloned()
            .ok_or_else(|| AdaptorError::not_found("RSS instance", instance))
    }

    /// Snapshot of all pools; the lock is released before any I/O.
    async fn all_pools(&self) -> Vec<InstancePool> {
        self.pools.read().await.values().cloned().collect()
    }

    async fn connect(&self, instance: &RssInstance) -> AdaptorResult<MySqlPool> {
        ensure_mysql(instance.engine)?;
        let pool = pool_options(&self.settings)
            .connect_with(connect_options(instance))
            .await
            .map_err(connection_error)?;
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(connection_error)?;
        Ok(pool)
    }

    async fn schema_exists(pool: &MySqlPool, name: &str) -> AdaptorResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = ?",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(connection_error)?;
        Ok(count > 0)
    }

    async fn account_exists(pool: &MySqlPool, username: &str) -> AdaptorResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mysql.user WHERE User = ? AND Host = ?")
            .bind(username)
            .bind(USER_HOST)
            .fetch_one(pool)
            .await
            .map_err(connection_error)?;
        Ok(count > 0)
    }

    async fn grant_exists(pool: &MySqlPool, database: &str, username: &str) -> AdaptorResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM mysql.db WHERE Db = ? AND User = ? AND Host = ?")
                .bind(database)
                .bind(username)
                .bind(USER_HOST)
                .fetch_one(pool)
                .await
                .map_err(connection_error)?;
        Ok(count > 0)
    }

    async fn list_users(&self, target: &InstancePool) -> AdaptorResult<Vec<DatabaseUser>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT CAST(User AS CHAR) FROM mysql.user WHERE Host = ? AND User <> ? ORDER BY User",
        )
        .bind(USER_HOST)
        .bind(&target.instance.admin_username)
        .fetch_all(&target.pool)
        .await
        .map_err(connection_error)?;
        Ok(names
            .into_iter()
            .map(|name| DatabaseUser::new(&target.instance.name, name, target.instance.engine))
            .collect())
    }

    /// Replaces whatever `username` holds on `database` with `privileges`.
    async fn replace_grants(
        pool: &MySqlPool,
        privileges: &PrivilegeSet,
        database: &str,
        username: &str,
    ) -> AdaptorResult<()> {
        validate_names(database, username)?;
        if Self::grant_exists(pool, database, username).await? {
            execute(pool, &revoke_statement(database, username)).await?;
        }
        for statement in grant_statements(privileges, database, username) {
            execute(pool, &statement).await?;
        }
        Ok(())
    }

    fn database_record(target: &InstancePool, name: &str) -> Database {
        Database {
            id: None,
            name: name.to_string(),
            rss_instance_name: target.instance.name.clone(),
            engine: target.instance.engine,
            url: Some(target.instance.database_url(name)),
        }
    }
}

#[async_trait]
impl RssAdaptor for MySqlAdaptor {
    fn kind(&self) -> &'static str {
        "mysql"
    }

    async fn add_instance(&self, instance: &RssInstance) -> AdaptorResult<RssInstance> {
        if self.pools.read().await.contains_key(&instance.name) {
            return Err(AdaptorError::duplicate("RSS instance", &instance.name));
        }
        let pool = self.connect(instance).await?;
        self.pools.write().await.insert(
            instance.name.clone(),
            InstancePool {
                instance: instance.clone(),
                pool,
            },
        );
        tracing::info!(instance = %instance.name, url = %instance.connection_url(), "MySQL pool created");
        Ok(instance.clone())
    }

    async fn remove_instance(&self, _environment: &str, name: &str) -> AdaptorResult<()> {
        let removed = self
            .pools
            .write()
            .await
            .remove(name)
            .ok_or_else(|| AdaptorError::not_found("RSS instance", name))?;
        removed.pool.close().await;
        Ok(())
    }

    async fn update_instance(&self, instance: &RssInstance) -> AdaptorResult<RssInstance> {
        self.pool(&instance.name).await?;
        let pool = self.connect(instance).await?;
        let previous = self.pools.write().await.insert(
            instance.name.clone(),
            InstancePool {
                instance: instance.clone(),
                pool,
            },
        );
        if let Some(previous) = previous {
            previous.pool.close().await;
        }
        Ok(instance.clone())
    }

    async fn add_database(&self, database: &Database) -> AdaptorResult<Database> {
        ensure_mysql(database.engine)?;
        validate(&database.name)?;
        let target = self.pool(&database.rss_instance_name).await?;
        if Self::schema_exists(&target.pool, &database.name).await? {
            return Err(AdaptorError::duplicate("database", &database.name));
        }
        execute(&target.pool, &format!("CREATE DATABASE `{}`", database.name)).await?;
        Ok(Database {
            id: Some(IdGenerator::database_id()),
            ..Self::database_record(&target, &database.name)
        })
    }

    async fn remove_database(&self, instance: &str, name: &str, engine: EngineType) -> AdaptorResult<()> {
        ensure_mysql(engine)?;
        validate(name)?;
        let target = self.pool(instance).await?;
        if !Self::schema_exists(&target.pool, name).await? {
            return Err(AdaptorError::not_found("database", name));
        }
        execute(&target.pool, &format!("DROP DATABASE `{}`", name)).await
    }

    async fn get_database(&self, instance: &str, name: &str, engine: EngineType) -> AdaptorResult<Database> {
        ensure_mysql(engine)?;
        let target = self.pool(instance).await?;
        if !Self::schema_exists(&target.pool, name).await? {
            return Err(AdaptorError::not_found("database", name));
        }
        Ok(Self::database_record(&target, name))
    }

    async fn get_databases(&self) -> AdaptorResult<Vec<Database>> {
        let mut databases = Vec::new();
        for target in self.all_pools().await {
            let names: Vec<String> = sqlx::query_scalar(
                "SELECT CAST(SCHEMA_NAME AS CHAR) FROM information_schema.SCHEMATA ORDER BY SCHEMA_NAME",
            )
            .fetch_all(&target.pool)
            .await
            .map_err(connection_error)?;
            databases.extend(
                names
                    .iter()
                    .filter(|n| !SYSTEM_SCHEMAS.contains(&n.as_str()))
                    .map(|n| Self::database_record(&target, n)),
            );
        }
        Ok(databases)
    }

    async fn database_exists(&self, instance: &str, name: &str, engine: EngineType) -> AdaptorResult<bool> {
        ensure_mysql(engine)?;
        let target = self.pool(instance).await?;
        Self::schema_exists(&target.pool, name).await
    }

    async fn user_exists(&self, instance: &str, username: &str, engine: EngineType) -> AdaptorResult<bool> {
        ensure_mysql(engine)?;
        let target = self.pool(instance).await?;
        Self::account_exists(&target.pool, username).await
    }

    async fn add_user(&self, user: &DatabaseUser) -> AdaptorResult<DatabaseUser> {
        ensure_mysql(user.engine)?;
        validate(&user.username)?;
        let target = self.pool(&user.rss_instance_name).await?;
        if Self::account_exists(&target.pool, &user.username).await? {
            return Err(AdaptorError::duplicate("database user", &user.username));
        }
        let password = user.password.as_deref().unwrap_or_default();
        execute(
            &target.pool,
            &format!(
                "CREATE USER '{}'@'{}' IDENTIFIED BY {}",
                user.username,
                USER_HOST,
                IdentifierValidator::quote_literal(password)
            ),
        )
        .await?;
        Ok(DatabaseUser {
            id: Some(IdGenerator::user_id()),
            ..user.clone()
        })
    }

    async fn remove_user(&self, instance: &str, username: &str, engine: EngineType) -> AdaptorResult<()> {
        ensure_mysql(engine)?;
        validate(username)?;
        let target = self.pool(instance).await?;
        if !Self::account_exists(&target.pool, username).await? {
            return Err(AdaptorError::not_found("database user", username));
        }
        execute(&target.pool, &format!("DROP USER '{}'@'{}'", username, USER_HOST)).await
    }

    async fn edit_user(&self, user: &DatabaseUser) -> AdaptorResult<DatabaseUser> {
        ensure_mysql(user.engine)?;
        validate(&user.username)?;
        let target = self.pool(&user.rss_instance_name).await?;
        if !Self::account_exists(&target.pool, &user.username).await? {
            return Err(AdaptorError::not_found("database user", &user.username));
        }
        if let Some(password) = &user.password {
            execute(
                &target.pool,
                &format!(
                    "ALTER USER '{}'@'{}' IDENTIFIED BY {}",
                    user.username,
                    USER_HOST,
                    IdentifierValidator::quote_literal(password)
                ),
            )
            .await?;
        }
        Ok(user.clone())
    }

    async fn get_user(&self, instance: &str, username: &str, engine: EngineType) -> AdaptorResult<DatabaseUser> {
        ensure_mysql(engine)?;
        let target = self.pool(instance).await?;
        if !Self::account_exists(&target.pool, username).await? {
            return Err(AdaptorError::not_found("database user", username));
        }
        Ok(DatabaseUser::new(instance, username, engine))
    }

    async fn get_users(&self) -> AdaptorResult<Vec<DatabaseUser>> {
        let mut users = Vec::new();
        for target in self.all_pools().await {
            users.extend(self.list_users(&target).await?);
        }
        Ok(users)
    }

    async fn update_privileges(
        &self,
        privileges: &PrivilegeSet,
        user: &DatabaseUser,
        database: &str,
    ) -> AdaptorResult<()> {
        ensure_mysql(user.engine)?;
        let target = self.pool(&user.rss_instance_name).await?;
        Self::replace_grants(&target.pool, privileges, database, &user.username).await
    }

    async fn get_privileges(
        &self,
        instance: &str,
        database: &str,
        username: &str,
        engine: EngineType,
    ) -> AdaptorResult<PrivilegeSet> {
        ensure_mysql(engine)?;
        let target = self.pool(instance).await?;
        let flags: Option<String> = sqlx::query_scalar(&format!(
            "SELECT {} FROM mysql.db WHERE Db = ? AND User = ? AND Host = ?",
            privilege_flags_expr()
        ))
        .bind(database)
        .bind(username)
        .bind(USER_HOST)
        .fetch_optional(&target.pool)
        .await
        .map_err(connection_error)?;
        flags
            .map(|f| parse_grant_flags(&f))
            .ok_or_else(|| AdaptorError::not_found("user privileges", format!("{}@{}", username, database)))
    }

    async fn get_attached_users(
        &self,
        instance: &str,
        database: &str,
        engine: EngineType,
    ) -> AdaptorResult<Vec<DatabaseUser>> {
        ensure_mysql(engine)?;
        let target = self.pool(instance).await?;
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT CAST(User AS CHAR) FROM mysql.db WHERE Db = ? AND Host = ? ORDER BY User",
        )
        .bind(database)
        .bind(USER_HOST)
        .fetch_all(&target.pool)
        .await
        .map_err(connection_error)?;
        Ok(names
            .into_iter()
            .map(|name| DatabaseUser::new(instance, name, engine))
            .collect())
    }

    async fn get_available_users(
        &self,
        instance: &str,
        database: &str,
        engine: EngineType,
    ) -> AdaptorResult<Vec<DatabaseUser>> {
        let attached = self.get_attached_users(instance, database, engine).await?;
        let target = self.pool(instance).await?;
        Ok(self
            .list_users(&target)
            .await?
            .into_iter()
            .filter(|u| !attached.contains(u))
            .collect())
    }

    async fn apply_attachment(
        &self,
        entry: &UserDatabaseEntry,
        template: &PrivilegeTemplateEntry,
    ) -> AdaptorResult<()> {
        ensure_mysql(entry.engine)?;
        let target = self.pool(&entry.rss_instance_name).await?;
        if !Self::schema_exists(&target.pool, &entry.database_name).await? {
            return Err(AdaptorError::not_found("database", &entry.database_name));
        }
        if !Self::account_exists(&target.pool, &entry.username).await? {
            return Err(AdaptorError::not_found("database user", &entry.username));
        }
        Self::replace_grants(&target.pool, &template.privileges, &entry.database_name, &entry.username).await
    }

    async fn remove_attachment(&self, entry: &UserDatabaseEntry) -> AdaptorResult<()> {
        ensure_mysql(entry.engine)?;
        validate_names(&entry.database_name, &entry.username)?;
        let target = self.pool(&entry.rss_instance_name).await?;
        if Self::grant_exists(&target.pool, &entry.database_name, &entry.username).await? {
            execute(&target.pool, &revoke_statement(&entry.database_name, &entry.username)).await?;
        }
        Ok(())
    }

    async fn create_snapshot(&self, database: &str, engine: EngineType) -> AdaptorResult<Snapshot> {
        ensure_mysql(engine)?;
        validate(database)?;
        let mut host = None;
        for target in self.all_pools().await {
            if Self::schema_exists(&target.pool, database).await? {
                host = Some(target.instance);
                break;
            }
        }
        let instance = host.ok_or_else(|| AdaptorError::not_found("database", database))?;

        let id = IdGenerator::snapshot_id();
        tokio::fs::create_dir_all(&self.settings.snapshot_dir)
            .await
            .map_err(|e| AdaptorError::Connection(format!("cannot create snapshot dir: {}", e)))?;
        let path = self.settings.snapshot_dir.join(format!("{}-{}.sql", database, id));

        let output = tokio::process::Command::new(&self.settings.dump_command)
            .arg("--host")
            .arg(&instance.host)
            .arg("--port")
            .arg(instance.port.to_string())
            .arg("--user")
            .arg(&instance.admin_username)
            .arg("--single-transaction")
            .arg("--result-file")
            .arg(&path)
            .arg(database)
            .env("MYSQL_PWD", &instance.admin_password)
            .output()
            .await
            .map_err(|e| AdaptorError::Connection(format!("failed to run {}: {}", self.settings.dump_command, e)))?;
        if !output.status.success() {
            return Err(AdaptorError::Connection(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        tracing::info!(database, path = %path.display(), "Snapshot written");
        Ok(Snapshot {
            id,
            database_name: database.to_string(),
            engine,
            location: Some(path.display().to_string()),
            created_at: Utc::now(),
        })
    }

    async fn add_template(&self, template: &PrivilegeTemplate) -> AdaptorResult<()> {
        let mut templates = self.templates.write().await;
        if templates.contains_key(&template.name) {
            return Err(AdaptorError::duplicate("privilege template", &template.name));
        }
        templates.insert(template.name.clone(), template.clone());
        Ok(())
    }

    async fn remove_template(&self, name: &str) -> AdaptorResult<()> {
        self.templates
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AdaptorError::not_found("privilege template", name))
    }

    async fn edit_template(&self, template: &PrivilegeTemplate) -> AdaptorResult<()> {
        let mut templates = self.templates.write().await;
        match templates.get_mut(&template.name) {
            Some(current) => {
                *current = template.clone();
                Ok(())
            }
            None => Err(AdaptorError::not_found("privilege template", &template.name)),
        }
    }

    async fn get_template(&self, name: &str) -> AdaptorResult<Option<PrivilegeTemplate>> {
        Ok(self.templates.read().await.get(name).cloned())
    }

    async fn get_templates(&self) -> AdaptorResult<Vec<PrivilegeTemplate>> {
        let mut templates: Vec<_> = self.templates.read().await.values().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }
}

// ============== Helpers ==============

fn pool_options(settings: &MySqlSettings) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.connect_timeout)
}

fn connect_options(instance: &RssInstance) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&instance.host)
        .port(instance.port)
        .username(&instance.admin_username)
        .password(&instance.admin_password)
}

fn connection_error(err: sqlx::Error) -> AdaptorError {
    AdaptorError::Connection(err.to_string())
}

async fn execute(pool: &MySqlPool, statement: &str) -> AdaptorResult<()> {
    sqlx::raw_sql(statement)
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(connection_error)
}

fn ensure_mysql(engine: EngineType) -> AdaptorResult<()> {
    match engine {
        EngineType::MySql | EngineType::MariaDb => Ok(()),
        other => Err(AdaptorError::Unsupported(format!(
            "the mysql adaptor cannot manage {} resources",
            other
        ))),
    }
}

fn validate(name: &str) -> AdaptorResult<()> {
    IdentifierValidator::validate("resource", name).map_err(|e| AdaptorError::Unsupported(e.to_string()))
}

fn validate_names(database: &str, username: &str) -> AdaptorResult<()> {
    validate(database)?;
    validate(username)
}

fn revoke_statement(database: &str, username: &str) -> String {
    format!(
        "REVOKE ALL PRIVILEGES, GRANT OPTION ON `{}`.* FROM '{}'@'{}'",
        database, username, USER_HOST
    )
}

/// `GRANT` statements giving `username` exactly `privileges` on `database`.
fn grant_statements(privileges: &PrivilegeSet, database: &str, username: &str) -> Vec<String> {
    let keywords: Vec<&str> = privileges
        .privileges
        .iter()
        .filter(|p| **p != Privilege::Grant)
        .map(|p| p.sql_keyword())
        .collect();
    let with_grant = if privileges.contains(Privilege::Grant) {
        " WITH GRANT OPTION"
    } else {
        ""
    };
    let target = format!("`{}`.* TO '{}'@'{}'", database, username, USER_HOST);
    if !keywords.is_empty() {
        vec![format!("GRANT {} ON {}{}", keywords.join(", "), target, with_grant)]
    } else if !with_grant.is_empty() {
        vec![format!("GRANT USAGE ON {}{}", target, with_grant)]
    } else {
        Vec::new()
    }
}

/// Expression reading all privilege columns of `mysql.db` as one `Y`/`N` string,
/// ordered like `Privilege::ALL`.
fn privilege_flags_expr() -> String {
    let columns: Vec<&str> = Privilege::ALL.iter().map(|p| p.grant_column()).collect();
    format!("CAST(CONCAT({}) AS CHAR)", columns.join(", "))
}

fn parse_grant_flags(flags: &str) -> PrivilegeSet {
    PrivilegeSet::new(
        flags
            .chars()
            .zip(Privilege::ALL)
            .filter(|(flag, _)| flag.eq_ignore_ascii_case(&'y'))
            .map(|(_, privilege)| privilege),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_statement_with_grant_option() {
        let set = PrivilegeSet::new([Privilege::Select, Privilege::Insert, Privilege::Grant]);
        let statements = grant_statements(&set, "orders", "alice");
        assert_eq!(
            statements,
            vec!["GRANT SELECT, INSERT ON `orders`.* TO 'alice'@'%' WITH GRANT OPTION".to_string()]
        );
    }

    #[test]
    fn test_empty_set_grants_nothing() {
        assert!(grant_statements(&PrivilegeSet::default(), "orders", "alice").is_empty());
    }

    #[test]
    fn test_parse_grant_flags_follows_column_order() {
        // Select, Insert granted; Update..Trigger denied.
        let mut flags = String::from("YY");
        flags.push_str(&"N".repeat(Privilege::ALL.len() - 2));
        let set = parse_grant_flags(&flags);
        assert_eq!(set, PrivilegeSet::new([Privilege::Select, Privilege::Insert]));
    }

    #[test]
    fn test_flags_expression_lists_every_column() {
        let expr = privilege_flags_expr();
        assert!(expr.starts_with("CAST(CONCAT(Select_priv, Insert_priv"));
        assert!(expr.contains("Trigger_priv"));
    }

    #[test]
    fn test_non_mysql_engines_are_unsupported() {
        assert!(ensure_mysql(EngineType::MariaDb).is_ok());
        assert!(matches!(ensure_mysql(EngineType::Postgres), Err(AdaptorError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_templates_are_stored_per_adaptor() {
        let adaptor = MySqlAdaptor::new(
            &[],
            MySqlSettings {
                connect_timeout: Duration::from_secs(1),
                max_connections: 1,
                snapshot_dir: PathBuf::from("snapshots"),
                dump_command: "mysqldump".into(),
            },
        )
        .unwrap();
        let template = PrivilegeTemplate::new("dev", "readonly", PrivilegeSet::read_only());
        adaptor.add_template(&template).await.unwrap();
        assert!(adaptor.add_template(&template).await.is_err());
        assert_eq!(adaptor.get_template("readonly").await.unwrap(), Some(template));
    }
}
