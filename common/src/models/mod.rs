//! Entity models for RSS resources.
//!
//! These are plain value records; conversion from request payloads happens
//! through the `*Request` types next to each entity.

pub mod attachment;
pub mod database;
pub mod datasource;
pub mod engine;
pub mod instance;
pub mod privilege;
pub mod user;

pub use attachment::{AttachUserRequest, DetachUserRequest, UserDatabaseEntry};
pub use database::{CreateDatabaseRequest, Database, Snapshot, SnapshotRequest};
pub use datasource::{DatasourceDescriptor, RegisterDatasourceRequest};
pub use engine::EngineType;
pub use instance::{RssInstance, RssInstanceRequest};
pub use privilege::{
    Privilege, PrivilegeSet, PrivilegeTemplate, PrivilegeTemplateEntry, PrivilegeTemplateRequest,
};
pub use user::{DatabaseUser, DatabaseUserRequest, UpdatePrivilegesRequest};
