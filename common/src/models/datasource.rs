//! Datasource descriptors published to the external catalog.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::attachment::UserDatabaseEntry;
use super::database::Database;
use super::user::DatabaseUser;

/// Connection handle derived from a database and one of its users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DatasourceDescriptor {
    /// Catalog-wide unique name.
    pub name: String,
    pub url: String,
    pub driver: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
}

impl DatasourceDescriptor {
    /// Derives a descriptor. `fallback_url` is used when the backend did not
    /// report a URL for the database.
    pub fn derive(name: impl Into<String>, database: &Database, user: &DatabaseUser, fallback_url: String) -> Self {
        Self {
            name: name.into(),
            url: database.url.clone().unwrap_or(fallback_url),
            driver: database.engine.driver().to_string(),
            username: user.username.clone(),
            password: user.password.clone(),
        }
    }
}

/// Payload for registering a datasource.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterDatasourceRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub entry: UserDatabaseEntry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EngineType;

    #[test]
    fn test_derive_prefers_backend_url() {
        let mut db = Database::new("inst1", "orders", EngineType::MySql);
        db.url = Some("mysql://db1:3306/orders".into());
        let user = DatabaseUser::new("inst1", "alice", EngineType::MySql).with_password("pw");

        let ds = DatasourceDescriptor::derive("orders-ds", &db, &user, "unused".into());
        assert_eq!(ds.url, "mysql://db1:3306/orders");
        assert_eq!(ds.driver, "mysql");
        assert_eq!(ds.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_derive_falls_back() {
        let db = Database::new("inst1", "orders", EngineType::Postgres);
        let user = DatabaseUser::new("inst1", "alice", EngineType::Postgres);
        let ds = DatasourceDescriptor::derive("ds", &db, &user, "postgresql://h:5432/orders".into());
        assert_eq!(ds.url, "postgresql://h:5432/orders");
    }
}
