//! RSS instance models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::engine::EngineType;
use crate::errors::AppResult;
use crate::utils::IdentifierValidator;

/// A database server registered in an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RssInstance {
    /// Instance name, unique within its environment.
    pub name: String,
    /// Owning environment.
    pub environment_name: String,
    pub engine: EngineType,
    pub host: String,
    pub port: u16,
    /// Administrative account used by adaptors.
    pub admin_username: String,
    /// Never rendered in responses.
    #[serde(skip_serializing, default)]
    pub admin_password: String,
    /// Declared in the static configuration; such instances are immutable at runtime.
    #[serde(default)]
    pub config_defined: bool,
}

impl RssInstance {
    /// Server URL without a database component.
    pub fn connection_url(&self) -> String {
        self.engine.connection_url(&self.host, self.port, None)
    }

    /// URL for one database hosted on this instance.
    pub fn database_url(&self, database: &str) -> String {
        self.engine.connection_url(&self.host, self.port, Some(database))
    }
}

/// Payload for adding or updating an instance at runtime.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RssInstanceRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    /// Target environment. Defaults to the environment in the request path;
    /// on update a different value moves the instance.
    #[serde(default)]
    pub environment_name: Option<String>,
    /// Engine name, e.g. `mysql`.
    pub engine: String,
    #[validate(length(min = 1, max = 255))]
    pub host: String,
    pub port: Option<u16>,
    #[validate(length(min = 1, max = 128))]
    pub admin_username: String,
    #[serde(default)]
    pub admin_password: String,
}

impl RssInstanceRequest {
    /// Builds a runtime (never configuration-defined) instance record.
    pub fn into_instance(self, default_environment: &str) -> AppResult<RssInstance> {
        self.validate()?;
        IdentifierValidator::validate("RSS instance", &self.name)?;
        let engine = EngineType::clean(&self.engine)?;
        Ok(RssInstance {
            name: self.name,
            environment_name: self
                .environment_name
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| default_environment.to_string()),
            engine,
            host: self.host,
            port: self.port.unwrap_or_else(|| engine.default_port()),
            admin_username: self.admin_username,
            admin_password: self.admin_password,
            config_defined: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RssInstanceRequest {
        RssInstanceRequest {
            name: "inst1".into(),
            environment_name: None,
            engine: "MySQL".into(),
            host: "10.0.0.5".into(),
            port: None,
            admin_username: "root".into(),
            admin_password: "secret".into(),
        }
    }

    #[test]
    fn test_into_instance_fills_defaults() {
        let instance = request().into_instance("dev").unwrap();
        assert_eq!(instance.environment_name, "dev");
        assert_eq!(instance.engine, EngineType::MySql);
        assert_eq!(instance.port, 3306);
        assert!(!instance.config_defined);
        assert_eq!(instance.connection_url(), "mysql://10.0.0.5:3306");
    }

    #[test]
    fn test_explicit_environment_is_kept() {
        let mut req = request();
        req.environment_name = Some("staging".into());
        assert_eq!(req.into_instance("dev").unwrap().environment_name, "staging");
    }

    #[test]
    fn test_password_is_not_serialized() {
        let instance = request().into_instance("dev").unwrap();
        let json = serde_json::to_value(&instance).unwrap();
        assert!(json.get("admin_password").is_none());
    }
}
