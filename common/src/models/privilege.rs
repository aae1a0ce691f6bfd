//! Privilege sets and privilege templates.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::AppResult;
use crate::utils::IdentifierValidator;

/// A grantable database-level privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Grant,
    References,
    Index,
    Alter,
    CreateTmpTable,
    LockTables,
    CreateView,
    ShowView,
    CreateRoutine,
    AlterRoutine,
    Execute,
    Event,
    Trigger,
}

impl Privilege {
    pub const ALL: [Privilege; 19] = [
        Privilege::Select,
        Privilege::Insert,
        Privilege::Update,
        Privilege::Delete,
        Privilege::Create,
        Privilege::Drop,
        Privilege::Grant,
        Privilege::References,
        Privilege::Index,
        Privilege::Alter,
        Privilege::CreateTmpTable,
        Privilege::LockTables,
        Privilege::CreateView,
        Privilege::ShowView,
        Privilege::CreateRoutine,
        Privilege::AlterRoutine,
        Privilege::Execute,
        Privilege::Event,
        Privilege::Trigger,
    ];

    /// Keyword used in `GRANT` statements.
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            Privilege::Select => "SELECT",
            Privilege::Insert => "INSERT",
            Privilege::Update => "UPDATE",
            Privilege::Delete => "DELETE",
            Privilege::Create => "CREATE",
            Privilege::Drop => "DROP",
            Privilege::Grant => "GRANT OPTION",
            Privilege::References => "REFERENCES",
            Privilege::Index => "INDEX",
            Privilege::Alter => "ALTER",
            Privilege::CreateTmpTable => "CREATE TEMPORARY TABLES",
            Privilege::LockTables => "LOCK TABLES",
            Privilege::CreateView => "CREATE VIEW",
            Privilege::ShowView => "SHOW VIEW",
            Privilege::CreateRoutine => "CREATE ROUTINE",
            Privilege::AlterRoutine => "ALTER ROUTINE",
            Privilege::Execute => "EXECUTE",
            Privilege::Event => "EVENT",
            Privilege::Trigger => "TRIGGER",
        }
    }

    /// Column of the MySQL `mysql.db` grant table holding this flag.
    pub fn grant_column(&self) -> &'static str {
        match self {
            Privilege::Select => "Select_priv",
            Privilege::Insert => "Insert_priv",
            Privilege::Update => "Update_priv",
            Privilege::Delete => "Delete_priv",
            Privilege::Create => "Create_priv",
            Privilege::Drop => "Drop_priv",
            Privilege::Grant => "Grant_priv",
            Privilege::References => "References_priv",
            Privilege::Index => "Index_priv",
            Privilege::Alter => "Alter_priv",
            Privilege::CreateTmpTable => "Create_tmp_table_priv",
            Privilege::LockTables => "Lock_tables_priv",
            Privilege::CreateView => "Create_view_priv",
            Privilege::ShowView => "Show_view_priv",
            Privilege::CreateRoutine => "Create_routine_priv",
            Privilege::AlterRoutine => "Alter_routine_priv",
            Privilege::Execute => "Execute_priv",
            Privilege::Event => "Event_priv",
            Privilege::Trigger => "Trigger_priv",
        }
    }
}

/// A bundle of privileges granted to a user on one database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrivilegeSet {
    pub privileges: BTreeSet<Privilege>,
}

impl PrivilegeSet {
    pub fn new(privileges: impl IntoIterator<Item = Privilege>) -> Self {
        Self {
            privileges: privileges.into_iter().collect(),
        }
    }

    pub fn all() -> Self {
        Self::new(Privilege::ALL)
    }

    pub fn read_only() -> Self {
        Self::new([Privilege::Select, Privilege::ShowView])
    }

    pub fn contains(&self, privilege: Privilege) -> bool {
        self.privileges.contains(&privilege)
    }

    pub fn is_empty(&self) -> bool {
        self.privileges.is_empty()
    }
}

/// The single entry a template applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrivilegeTemplateEntry {
    pub privileges: PrivilegeSet,
}

/// A named, environment-scoped privilege bundle applied when attaching users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrivilegeTemplate {
    pub name: String,
    pub environment_name: String,
    pub entry: PrivilegeTemplateEntry,
}

impl PrivilegeTemplate {
    pub fn new(environment_name: impl Into<String>, name: impl Into<String>, privileges: PrivilegeSet) -> Self {
        Self {
            name: name.into(),
            environment_name: environment_name.into(),
            entry: PrivilegeTemplateEntry { privileges },
        }
    }
}

/// Payload for creating or editing a template.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PrivilegeTemplateRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub privileges: BTreeSet<Privilege>,
}

impl PrivilegeTemplateRequest {
    pub fn into_template(self, environment_name: &str) -> AppResult<PrivilegeTemplate> {
        self.validate()?;
        IdentifierValidator::validate("privilege template", &self.name)?;
        Ok(PrivilegeTemplate::new(
            environment_name,
            self.name,
            PrivilegeSet::new(self.privileges),
        ))
    }
}
