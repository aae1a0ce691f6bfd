//! Database and snapshot models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::engine::EngineType;
use crate::errors::AppResult;
use crate::utils::IdentifierValidator;

/// A database hosted on an RSS instance.
///
/// Identity is `(rss_instance_name, name, engine)`; the backend owns
/// the authoritative copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Database {
    /// Backend-assigned id.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub rss_instance_name: String,
    pub engine: EngineType,
    /// Connection URL reported by the backend.
    #[serde(default)]
    pub url: Option<String>,
}

impl Database {
    pub fn new(rss_instance_name: impl Into<String>, name: impl Into<String>, engine: EngineType) -> Self {
        Self {
            id: None,
            name: name.into(),
            rss_instance_name: rss_instance_name.into(),
            engine,
            url: None,
        }
    }

    /// Logical identity used for deduplication.
    pub fn identity(&self) -> (String, String, EngineType) {
        (self.rss_instance_name.clone(), self.name.clone(), self.engine)
    }

    /// Overwrites this request with the backend's canonical record; fields
    /// the backend left empty keep their requested value.
    pub fn overwrite_with(&mut self, canonical: Database) {
        self.name = canonical.name;
        self.rss_instance_name = canonical.rss_instance_name;
        self.engine = canonical.engine;
        if canonical.id.is_some() {
            self.id = canonical.id;
        }
        if canonical.url.is_some() {
            self.url = canonical.url;
        }
    }
}

/// Payload for creating a database.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDatabaseRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub rss_instance_name: String,
    pub engine: String,
}

impl CreateDatabaseRequest {
    pub fn into_database(self) -> AppResult<Database> {
        self.validate()?;
        IdentifierValidator::validate("database", &self.name)?;
        Ok(Database::new(
            self.rss_instance_name,
            self.name,
            EngineType::clean(&self.engine)?,
        ))
    }
}

/// Result of a snapshot taken by an adaptor.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Snapshot {
    pub id: String,
    pub database_name: String,
    pub engine: EngineType,
    /// Where the backend stored the snapshot, if anywhere addressable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for requesting a snapshot.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SnapshotRequest {
    #[validate(length(min = 1, max = 64))]
    pub database_name: String,
    pub engine: String,
}
