//! Environment configuration file.
//!
//! Read once at startup from `RSS_CONFIG_PATH`:
//!
//! ```json
//! {
//!   "provider": "mysql-rss",
//!   "environments": [
//!     {
//!       "name": "prod",
//!       "adaptor": "mysql",
//!       "instances": [
//!         { "name": "core-db", "engine": "mysql", "host": "10.0.0.5",
//!           "admin_username": "root", "admin_password": "secret" }
//!       ],
//!       "templates": [
//!         { "name": "readonly", "privileges": ["select", "show_view"] }
//!       ]
//!     }
//!   ],
//!   "authorization": { "mode": "granted", "permissions": ["/permission/admin/rss/dev"] },
//!   "snapshot_dir": "/var/backups/rss"
//! }
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{EngineType, Privilege, PrivilegeSet, PrivilegeTemplate, RssInstance};
use common::utils::IdentifierValidator;

use crate::adaptor::mysql::MySqlSettings;
use crate::adaptor::{BackendContext, InMemoryAdaptor, MySqlAdaptor, RssAdaptor};
use crate::authorization::{AllowAll, AuthorizationGate, Authorizer, DenyAll, GrantedPermissions};
use crate::environment::{Environment, EnvironmentRegistry};

const DEFAULT_PROVIDER: &str = "rss-manager";
const DEFAULT_SNAPSHOT_DIR: &str = "snapshots";
const DEFAULT_DUMP_COMMAND: &str = "mysqldump";

#[derive(Debug, Clone, Deserialize)]
pub struct RssConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    pub environments: Vec<EnvironmentConfig>,
    #[serde(default)]
    pub authorization: AuthorizationConfig,
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
    #[serde(default)]
    pub dump_command: Option<String>,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,
    #[serde(default)]
    pub adaptor: AdaptorKind,
    #[serde(default)]
    pub instances: Vec<StaticInstance>,
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptorKind {
    #[default]
    Memory,
    Mysql,
}

/// An instance defined in the file. It cannot be edited or removed at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticInstance {
    pub name: String,
    pub engine: String,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub admin_username: String,
    #[serde(default)]
    pub admin_password: String,
}

impl StaticInstance {
    fn to_instance(&self, environment: &str) -> AppResult<RssInstance> {
        IdentifierValidator::validate("RSS instance", &self.name)
            .map_err(|e| AppError::IllegalConfiguration(e.to_string()))?;
        let engine = EngineType::clean(&self.engine).map_err(|e| {
            AppError::IllegalConfiguration(format!("RSS instance '{}': {}", self.name, e))
        })?;
        Ok(RssInstance {
            name: self.name.clone(),
            environment_name: environment.to_string(),
            engine,
            host: self.host.clone(),
            port: self.port.unwrap_or_else(|| engine.default_port()),
            admin_username: self.admin_username.clone(),
            admin_password: self.admin_password.clone(),
            config_defined: true,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    pub name: String,
    pub privileges: BTreeSet<Privilege>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationConfig {
    #[serde(default)]
    pub mode: AuthorizationMode,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationMode {
    #[default]
    AllowAll,
    DenyAll,
    Granted,
}

impl RssConfig {
    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::IllegalConfiguration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            environments = config.environments.len(),
            "RSS configuration loaded"
        );
        Ok(config)
    }

    pub fn from_json(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::IllegalConfiguration(format!("invalid RSS configuration: {}", e)))
    }

    /// Builds the authorization gate described by the `authorization` block.
    pub fn gate(&self) -> AuthorizationGate {
        let authorizer: Arc<dyn Authorizer> = match self.authorization.mode {
            AuthorizationMode::AllowAll => Arc::new(AllowAll),
            AuthorizationMode::DenyAll => Arc::new(DenyAll),
            AuthorizationMode::Granted => {
                Arc::new(GrantedPermissions::new(&self.authorization.permissions))
            }
        };
        AuthorizationGate::new(authorizer)
    }

    /// Creates every environment with its adaptor, static instances and
    /// seeded templates.
    pub async fn build_registry(&self, app: &AppConfig) -> AppResult<EnvironmentRegistry> {
        let mut environments = Vec::with_capacity(self.environments.len());
        for env in &self.environments {
            IdentifierValidator::validate("environment", &env.name)
                .map_err(|e| AppError::IllegalConfiguration(e.to_string()))?;
            let statics = env
                .instances
                .iter()
                .map(|i| i.to_instance(&env.name))
                .collect::<AppResult<Vec<_>>>()?;

            let adaptor: Arc<dyn RssAdaptor> = match env.adaptor {
                AdaptorKind::Memory => Arc::new(InMemoryAdaptor::with_instances(statics.clone())),
                AdaptorKind::Mysql => Arc::new(MySqlAdaptor::new(&statics, self.mysql_settings(app))?),
            };
            for template in &env.templates {
                let template = PrivilegeTemplate::new(
                    &env.name,
                    &template.name,
                    PrivilegeSet::new(template.privileges.iter().copied()),
                );
                adaptor
                    .add_template(&template)
                    .await
                    .backend_context("seeding privilege template", &template.name)
                    .map_err(|e| AppError::IllegalConfiguration(e.to_string()))?;
            }

            info!(
                environment = %env.name,
                adaptor = adaptor.kind(),
                instances = statics.len(),
                templates = env.templates.len(),
                "Environment configured"
            );
            environments.push(Environment::new(&env.name, adaptor, statics)?);
        }
        EnvironmentRegistry::new(environments)
    }

    fn mysql_settings(&self, app: &AppConfig) -> MySqlSettings {
        MySqlSettings {
            connect_timeout: Duration::from_secs(app.connect_timeout_secs),
            max_connections: app.max_connections,
            snapshot_dir: self
                .snapshot_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR)),
            dump_command: self
                .dump_command
                .clone()
                .unwrap_or_else(|| DEFAULT_DUMP_COMMAND.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::{Action, ResourceKind};

    const SAMPLE: &str = r#"{
        "provider": "acme-rss",
        "environments": [
            {
                "name": "prod",
                "instances": [
                    { "name": "core-db", "engine": "MySQL", "host": "10.0.0.5", "admin_username": "root" }
                ],
                "templates": [
                    { "name": "readonly", "privileges": ["select", "show_view"] }
                ]
            },
            { "name": "dev", "adaptor": "memory" }
        ],
        "authorization": { "mode": "granted", "permissions": ["/permission/admin/rss/dev"] }
    }"#;

    fn app() -> AppConfig {
        AppConfig::from_lookup("rss-manager", |_| None)
    }

    #[tokio::test]
    async fn test_builds_registry_with_static_instances() {
        let config = RssConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.provider, "acme-rss");

        let registry = config.build_registry(&app()).await.unwrap();
        let prod = registry.resolve("prod").unwrap();
        let core = prod.instance("core-db").unwrap();
        assert!(core.config_defined);
        assert_eq!(core.port, 3306);
        assert_eq!(core.engine, EngineType::MySql);

        let template = prod.adaptor().get_template("readonly").await.unwrap().unwrap();
        assert_eq!(template.entry.privileges, PrivilegeSet::read_only());
        assert!(registry.resolve("dev").unwrap().all_instances().is_empty());
    }

    #[test]
    fn test_gate_follows_granted_permissions() {
        let gate = RssConfig::from_json(SAMPLE).unwrap().gate();
        assert!(gate
            .authorize("dev", EngineType::MySql, ResourceKind::Database, Action::Add)
            .is_ok());
        assert!(gate
            .authorize("prod", EngineType::MySql, ResourceKind::Database, Action::Add)
            .is_err());
    }

    #[test]
    fn test_defaults() {
        let config = RssConfig::from_json(r#"{ "environments": [ { "name": "dev" } ] }"#).unwrap();
        assert_eq!(config.provider, DEFAULT_PROVIDER);
        assert_eq!(config.environments[0].adaptor, AdaptorKind::Memory);
        assert_eq!(config.authorization.mode, AuthorizationMode::AllowAll);
        assert_eq!(config.mysql_settings(&app()).dump_command, "mysqldump");
    }

    #[tokio::test]
    async fn test_duplicate_environment_rejected() {
        let config = RssConfig::from_json(
            r#"{ "environments": [ { "name": "dev" }, { "name": "dev" } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            config.build_registry(&app()).await,
            Err(AppError::IllegalConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_static_instance_rejected() {
        let config = RssConfig::from_json(
            r#"{ "environments": [ { "name": "dev", "instances": [
                { "name": "a", "engine": "mysql", "host": "h", "admin_username": "root" },
                { "name": "a", "engine": "mysql", "host": "h", "admin_username": "root" }
            ] } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            config.build_registry(&app()).await,
            Err(AppError::IllegalConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_mysql_environment_rejects_other_engines() {
        let config = RssConfig::from_json(
            r#"{ "environments": [ { "name": "dev", "adaptor": "mysql", "instances": [
                { "name": "pg", "engine": "postgres", "host": "h", "admin_username": "postgres" }
            ] } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            config.build_registry(&app()).await,
            Err(AppError::IllegalConfiguration(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            RssConfig::from_json("{ not json"),
            Err(AppError::IllegalConfiguration(_))
        ));
    }
}
