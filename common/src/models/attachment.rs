//! User-to-database attachment models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::engine::EngineType;
use crate::errors::AppResult;

/// Identifies "this user holds template-derived privileges on this database".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct UserDatabaseEntry {
    pub environment_name: String,
    pub rss_instance_name: String,
    pub database_name: String,
    pub username: String,
    pub engine: EngineType,
}

impl UserDatabaseEntry {
    pub fn new(
        environment_name: impl Into<String>,
        rss_instance_name: impl Into<String>,
        database_name: impl Into<String>,
        username: impl Into<String>,
        engine: EngineType,
    ) -> Self {
        Self {
            environment_name: environment_name.into(),
            rss_instance_name: rss_instance_name.into(),
            database_name: database_name.into(),
            username: username.into(),
            engine,
        }
    }

    /// Flat key used to serialize operations on the same attachment.
    pub fn key(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.environment_name, self.rss_instance_name, self.database_name, self.username, self.engine
        )
    }
}

/// Payload for attaching a user to a database through a template.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AttachUserRequest {
    #[validate(length(min = 1, max = 64))]
    pub template_name: String,
    #[validate(length(min = 1, max = 32))]
    pub username: String,
    #[validate(length(min = 1, max = 64))]
    pub database_name: String,
    #[validate(length(min = 1, max = 64))]
    pub rss_instance_name: String,
    pub engine: String,
}

/// Payload for detaching a user from a database.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DetachUserRequest {
    #[validate(length(min = 1, max = 32))]
    pub username: String,
    #[validate(length(min = 1, max = 64))]
    pub database_name: String,
    #[validate(length(min = 1, max = 64))]
    pub rss_instance_name: String,
    pub engine: String,
}

impl DetachUserRequest {
    pub fn into_entry(self, environment_name: &str) -> AppResult<UserDatabaseEntry> {
        self.validate()?;
        Ok(UserDatabaseEntry::new(
            environment_name,
            self.rss_instance_name,
            self.database_name,
            self.username,
            EngineType::clean(&self.engine)?,
        ))
    }
}
