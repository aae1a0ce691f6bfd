//! User-to-database attachments through privilege templates.

use std::sync::Arc;

use tracing::info;

use common::errors::{AppError, AppResult};
use common::models::{EngineType, UserDatabaseEntry};

use crate::adaptor::BackendContext;
use crate::authorization::{Action, AuthorizationGate, ResourceKind};
use crate::environment::EnvironmentRegistry;
use crate::keyed_lock::KeyedLocks;

/// Attaches users to databases using named templates, and detaches them.
///
/// Work on the same attachment key is serialized; different keys proceed
/// in parallel.
pub struct AttachmentManager {
    registry: Arc<EnvironmentRegistry>,
    gate: AuthorizationGate,
    locks: KeyedLocks,
}

impl AttachmentManager {
    pub fn new(registry: Arc<EnvironmentRegistry>, gate: AuthorizationGate) -> Self {
        Self {
            registry,
            gate,
            locks: KeyedLocks::new(),
        }
    }

    /// Grants the template's privileges to `username` on `database`.
    ///
    /// Re-attaching replaces the previous grant.
    pub async fn attach_user(
        &self,
        environment: &str,
        engine: EngineType,
        template_name: &str,
        username: &str,
        database: &str,
        instance: &str,
    ) -> AppResult<UserDatabaseEntry> {
        self.gate
            .authorize(environment, engine, ResourceKind::UserAttachment, Action::Add)?;
        let env = self.registry.resolve(environment)?;
        let adaptor = env.adaptor();

        let template = adaptor
            .get_template(template_name)
            .await
            .backend_context("reading privilege template", template_name)?
            .ok_or_else(|| AppError::not_found("privilege template", template_name))?;

        let entry = UserDatabaseEntry::new(environment, instance, database, username, engine);
        let _guard = self.locks.lock(&entry.key()).await;
        adaptor
            .apply_attachment(&entry, &template.entry)
            .await
            .backend_context("attaching user", &entry.key())?;

        info!(
            environment,
            attachment = %entry.key(),
            template = template_name,
            "User attached to database"
        );
        Ok(entry)
    }

    /// Revokes the attachment. Absent attachments are not an error.
    pub async fn detach_user(&self, entry: &UserDatabaseEntry) -> AppResult<()> {
        self.gate.authorize(
            &entry.environment_name,
            entry.engine,
            ResourceKind::UserAttachment,
            Action::Delete,
        )?;
        let env = self.registry.resolve(&entry.environment_name)?;

        let _guard = self.locks.lock(&entry.key()).await;
        env.adaptor()
            .remove_attachment(entry)
            .await
            .backend_context("detaching user", &entry.key())?;

        info!(attachment = %entry.key(), "User detached from database");
        Ok(())
    }
}
