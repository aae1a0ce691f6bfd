//! Unique ID generator.

use uuid::Uuid;

/// Generates identifiers assigned by backends and the HTTP layer.
pub struct IdGenerator;

impl IdGenerator {
    /// Id for a newly created database.
    pub fn database_id() -> String {
        format!("db-{}", Self::short_id())
    }

    /// Id for a newly created database user.
    pub fn user_id() -> String {
        format!("usr-{}", Self::short_id())
    }

    /// Id for a database snapshot.
    pub fn snapshot_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn request_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// First 8 characters of a v4 UUID.
    pub fn short_id() -> String {
        Uuid::new_v4().simple().to_string()[..8].to_string()
    }
}
