//! Authorization gate.
//!
//! Every mutating call names a permission resource
//! `/permission/admin/rss/{environment}/{engine}/{kind}/{action}` and asks
//! the configured `Authorizer` whether it may proceed. A denial aborts the
//! call before any backend or registry mutation.

use std::fmt;
use std::sync::Arc;

use common::errors::{AppError, AppResult};
use common::models::EngineType;

/// Root of the permission tree.
pub const PERMISSION_ROOT: &str = "/permission/admin/rss";

/// Resource kinds subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    RssInstance,
    Database,
    DatabaseUser,
    UserAttachment,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::RssInstance => "rss-instance",
            ResourceKind::Database => "database",
            ResourceKind::DatabaseUser => "database-user",
            ResourceKind::UserAttachment => "user-attachment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Edit,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

/// The resource a call asks permission for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionResource {
    pub environment: String,
    pub engine: EngineType,
    pub kind: ResourceKind,
    pub action: Action,
}

impl PermissionResource {
    pub fn path(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            PERMISSION_ROOT,
            self.environment,
            self.engine,
            self.kind.as_str(),
            self.action.as_str()
        )
    }
}

impl fmt::Display for PermissionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Decides whether a permission resource is granted.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, resource: &PermissionResource) -> bool;
}

/// Grants everything.
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn is_authorized(&self, _resource: &PermissionResource) -> bool {
        true
    }
}

/// Grants nothing.
pub struct DenyAll;

impl Authorizer for DenyAll {
    fn is_authorized(&self, _resource: &PermissionResource) -> bool {
        false
    }
}

/// Grants resources matched by a list of permission paths.
///
/// A granted path covers everything below it, and a `*` segment matches any
/// single segment: `/permission/admin/rss/dev` grants all of `dev`,
/// `/permission/admin/rss/*/mysql/database` grants MySQL database
/// operations in every environment.
pub struct GrantedPermissions {
    grants: Vec<Vec<String>>,
}

impl GrantedPermissions {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            grants: paths.into_iter().map(|p| segments(p.as_ref())).collect(),
        }
    }
}

impl Authorizer for GrantedPermissions {
    fn is_authorized(&self, resource: &PermissionResource) -> bool {
        let requested = segments(&resource.path());
        self.grants.iter().any(|grant| {
            grant.len() <= requested.len()
                && grant
                    .iter()
                    .zip(&requested)
                    .all(|(g, r)| g == "*" || g == r)
        })
    }
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Hard precondition in front of every mutating facade operation.
#[derive(Clone)]
pub struct AuthorizationGate {
    authorizer: Arc<dyn Authorizer>,
}

impl AuthorizationGate {
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }

    pub fn allow_all() -> Self {
        Self::new(Arc::new(AllowAll))
    }

    /// Fails with `AuthorizationDenied` unless the resource is granted.
    pub fn authorize(
        &self,
        environment: &str,
        engine: EngineType,
        kind: ResourceKind,
        action: Action,
    ) -> AppResult<()> {
        let resource = PermissionResource {
            environment: environment.to_string(),
            engine,
            kind,
            action,
        };
        if self.authorizer.is_authorized(&resource) {
            Ok(())
        } else {
            tracing::warn!(resource = %resource, "Authorization denied");
            Err(AppError::AuthorizationDenied {
                resource: resource.path(),
            })
        }
    }
}
