//! Backend adaptor contract.
//!
//! Each environment drives exactly one `RssAdaptor`. The core never talks
//! to a database server itself; it calls these operations and translates
//! their typed failures into `AppError`s with operation context.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use thiserror::Error;

use common::errors::AppError;
use common::models::{
    Database, DatabaseUser, EngineType, PrivilegeSet, PrivilegeTemplate, PrivilegeTemplateEntry,
    RssInstance, Snapshot, UserDatabaseEntry,
};

pub use memory::InMemoryAdaptor;
pub use mysql::MySqlAdaptor;

/// Failures reported by an adaptor.
#[derive(Debug, Error)]
pub enum AdaptorError {
    /// Backend I/O failed; the request may succeed later.
    #[error("{0}")]
    Connection(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} '{id}' already exists")]
    Duplicate { kind: &'static str, id: String },

    #[error("{0}")]
    Unsupported(String),
}

impl AdaptorError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn duplicate(kind: &'static str, id: impl Into<String>) -> Self {
        Self::Duplicate { kind, id: id.into() }
    }
}

pub type AdaptorResult<T> = Result<T, AdaptorError>;

/// Operations an engine-specific backend provides to the core.
///
/// Detaching an absent attachment must succeed, and re-applying an
/// attachment replaces the previous privileges.
#[async_trait]
pub trait RssAdaptor: Send + Sync {
    /// Short backend name for logs, e.g. `mysql`.
    fn kind(&self) -> &'static str;

    async fn add_instance(&self, instance: &RssInstance) -> AdaptorResult<RssInstance>;
    async fn remove_instance(&self, environment: &str, name: &str) -> AdaptorResult<()>;
    async fn update_instance(&self, instance: &RssInstance) -> AdaptorResult<RssInstance>;

    async fn add_database(&self, database: &Database) -> AdaptorResult<Database>;
    async fn remove_database(&self, instance: &str, name: &str, engine: EngineType) -> AdaptorResult<()>;
    async fn get_database(&self, instance: &str, name: &str, engine: EngineType) -> AdaptorResult<Database>;
    async fn get_databases(&self) -> AdaptorResult<Vec<Database>>;
    async fn database_exists(&self, instance: &str, name: &str, engine: EngineType) -> AdaptorResult<bool>;

    async fn user_exists(&self, instance: &str, username: &str, engine: EngineType) -> AdaptorResult<bool>;
    async fn add_user(&self, user: &DatabaseUser) -> AdaptorResult<DatabaseUser>;
    async fn remove_user(&self, instance: &str, username: &str, engine: EngineType) -> AdaptorResult<()>;
    async fn edit_user(&self, user: &DatabaseUser) -> AdaptorResult<DatabaseUser>;
    async fn get_user(&self, instance: &str, username: &str, engine: EngineType) -> AdaptorResult<DatabaseUser>;
    async fn get_users(&self) -> AdaptorResult<Vec<DatabaseUser>>;

    async fn update_privileges(
        &self,
        privileges: &PrivilegeSet,
        user: &DatabaseUser,
        database: &str,
    ) -> AdaptorResult<()>;
    async fn get_privileges(
        &self,
        instance: &str,
        database: &str,
        username: &str,
        engine: EngineType,
    ) -> AdaptorResult<PrivilegeSet>;

    async fn get_attached_users(
        &self,
        instance: &str,
        database: &str,
        engine: EngineType,
    ) -> AdaptorResult<Vec<DatabaseUser>>;
    /// Users on the instance that are not attached to `database`.
    async fn get_available_users(
        &self,
        instance: &str,
        database: &str,
        engine: EngineType,
    ) -> AdaptorResult<Vec<DatabaseUser>>;
    async fn apply_attachment(
        &self,
        entry: &UserDatabaseEntry,
        template: &PrivilegeTemplateEntry,
    ) -> AdaptorResult<()>;
    async fn remove_attachment(&self, entry: &UserDatabaseEntry) -> AdaptorResult<()>;

    /// May run for a long time.
    async fn create_snapshot(&self, database: &str, engine: EngineType) -> AdaptorResult<Snapshot>;

    // Environment-scoped template storage.
    async fn add_template(&self, template: &PrivilegeTemplate) -> AdaptorResult<()>;
    async fn remove_template(&self, name: &str) -> AdaptorResult<()>;
    async fn edit_template(&self, template: &PrivilegeTemplate) -> AdaptorResult<()>;
    async fn get_template(&self, name: &str) -> AdaptorResult<Option<PrivilegeTemplate>>;
    async fn get_templates(&self) -> AdaptorResult<Vec<PrivilegeTemplate>>;
}

/// Translates adaptor failures into domain errors.
pub trait BackendContext<T> {
    /// Wraps a failure with the operation and entity it concerned. Connection
    /// failures are logged here, once.
    fn backend_context(self, operation: &'static str, entity: &str) -> Result<T, AppError>;
}

impl<T> BackendContext<T> for AdaptorResult<T> {
    fn backend_context(self, operation: &'static str, entity: &str) -> Result<T, AppError> {
        self.map_err(|err| match err {
            AdaptorError::Connection(cause) => {
                tracing::error!(operation, entity, cause = %cause, "Database server error");
                AppError::BackendConnection {
                    operation,
                    entity: entity.to_string(),
                    cause,
                }
            }
            AdaptorError::NotFound { kind, id } => AppError::NotFound { kind, id },
            AdaptorError::Duplicate { kind, id } => AppError::DuplicateResource { kind, id },
            AdaptorError::Unsupported(message) => AppError::Unsupported(message),
        })
    }
}
