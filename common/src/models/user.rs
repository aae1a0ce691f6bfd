//! Database user models.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::engine::EngineType;
use super::privilege::{Privilege, PrivilegeSet};
use crate::errors::AppResult;
use crate::utils::IdentifierValidator;

/// A user account on an RSS instance.
///
/// Equality and hashing consider only the logical identity
/// `(rss_instance_name, username, engine)`, so a `HashSet<DatabaseUser>`
/// holds at most one record per account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatabaseUser {
    #[serde(default)]
    pub id: Option<String>,
    pub username: String,
    /// Passed through to the backend and datasource descriptors, never rendered.
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    pub rss_instance_name: String,
    pub engine: EngineType,
}

impl DatabaseUser {
    pub fn new(rss_instance_name: impl Into<String>, username: impl Into<String>, engine: EngineType) -> Self {
        Self {
            id: None,
            username: username.into(),
            password: None,
            rss_instance_name: rss_instance_name.into(),
            engine,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Overwrites this request with the backend's canonical record.
    pub fn overwrite_with(&mut self, canonical: DatabaseUser) {
        self.username = canonical.username;
        self.rss_instance_name = canonical.rss_instance_name;
        self.engine = canonical.engine;
        if canonical.id.is_some() {
            self.id = canonical.id;
        }
        if canonical.password.is_some() {
            self.password = canonical.password;
        }
    }
}

impl PartialEq for DatabaseUser {
    fn eq(&self, other: &Self) -> bool {
        self.rss_instance_name == other.rss_instance_name
            && self.username == other.username
            && self.engine == other.engine
    }
}

impl Eq for DatabaseUser {}

impl Hash for DatabaseUser {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rss_instance_name.hash(state);
        self.username.hash(state);
        self.engine.hash(state);
    }
}

/// Payload for creating or editing a user.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DatabaseUserRequest {
    #[validate(length(min = 1, max = 32))]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub rss_instance_name: String,
    pub engine: String,
}

impl DatabaseUserRequest {
    pub fn into_user(self) -> AppResult<DatabaseUser> {
        self.validate()?;
        IdentifierValidator::validate("database user", &self.username)?;
        Ok(DatabaseUser {
            id: None,
            username: self.username,
            password: self.password,
            rss_instance_name: self.rss_instance_name,
            engine: EngineType::clean(&self.engine)?,
        })
    }
}

/// Replaces a user's privileges on one database.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdatePrivilegesRequest {
    #[validate(length(min = 1, max = 32))]
    pub username: String,
    #[validate(length(min = 1, max = 64))]
    pub rss_instance_name: String,
    #[validate(length(min = 1, max = 64))]
    pub database_name: String,
    pub engine: String,
    pub privileges: BTreeSet<Privilege>,
}

impl UpdatePrivilegesRequest {
    /// Splits the request into the user, the database name and the set.
    pub fn into_parts(self) -> AppResult<(DatabaseUser, String, PrivilegeSet)> {
        self.validate()?;
        let user = DatabaseUser::new(
            self.rss_instance_name,
            self.username,
            EngineType::clean(&self.engine)?,
        );
        Ok((user, self.database_name, PrivilegeSet::new(self.privileges)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_set_deduplicates_by_identity() {
        let mut a = DatabaseUser::new("inst1", "alice", EngineType::MySql);
        a.id = Some("usr-1".into());
        let mut b = DatabaseUser::new("inst1", "alice", EngineType::MySql);
        b.id = Some("usr-2".into());
        let c = DatabaseUser::new("inst2", "alice", EngineType::MySql);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_password_not_rendered() {
        let user = DatabaseUser::new("inst1", "alice", EngineType::MySql).with_password("pw");
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
    }
}
