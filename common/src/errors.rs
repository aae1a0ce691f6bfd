//! Error types shared by every RSS manager component.
//!
//! `AppError` is a closed enumeration: each variant carries the
//! structured context (entity id, operation, cause) needed to render it
//! for a caller or to match on it in tests.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used throughout the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Domain errors raised by the resource manager.
#[derive(Debug, Error)]
pub enum AppError {
    /// The authorization gate rejected the call before any mutation.
    #[error("not authorized to access resource '{resource}'")]
    AuthorizationDenied { resource: String },

    /// Attempt to edit or remove an instance declared in the static configuration.
    #[error("RSS instance '{instance}' in environment '{environment}' is defined in the configuration and cannot be modified")]
    ConfigImmutable { environment: String, instance: String },

    /// Environment, instance, template or backend entity is absent.
    #[error("{kind} '{id}' does not exist")]
    NotFound { kind: &'static str, id: String },

    /// Backend I/O failed while performing `operation` on `entity`.
    #[error("database server error while {operation} '{entity}': {cause}")]
    BackendConnection {
        operation: &'static str,
        entity: String,
        cause: String,
    },

    /// A resource with the same identity already exists.
    #[error("{kind} '{id}' already exists")]
    DuplicateResource { kind: &'static str, id: String },

    /// Another in-flight call is mutating the same resource.
    #[error("{kind} '{id}' is being modified by a concurrent request")]
    Conflict { kind: &'static str, id: String },

    /// An environment or its adaptor could not be initialized.
    #[error("illegal configuration: {0}")]
    IllegalConfiguration(String),

    /// Request payload failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The backend does not support the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn duplicate(kind: &'static str, id: impl Into<String>) -> Self {
        Self::DuplicateResource {
            kind,
            id: id.into(),
        }
    }

    /// Stable error code rendered in API responses.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::AuthorizationDenied { .. } => "AUTHORIZATION_DENIED",
            AppError::ConfigImmutable { .. } => "CONFIG_IMMUTABLE",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::BackendConnection { .. } => "BACKEND_CONNECTION_ERROR",
            AppError::DuplicateResource { .. } => "DUPLICATE_RESOURCE",
            AppError::Conflict { .. } => "CONFLICT",
            AppError::IllegalConfiguration(_) => "ILLEGAL_CONFIGURATION",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unsupported(_) => "UNSUPPORTED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
            AppError::ConfigImmutable { .. }
            | AppError::DuplicateResource { .. }
            | AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BackendConnection { .. } => StatusCode::BAD_GATEWAY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::IllegalConfiguration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether retrying the same call could succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::BackendConnection { .. } | AppError::Conflict { .. }
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ApiResponse::err(self.code(), self.to_string()).retryable(self.is_retryable());
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_immutable_maps_to_conflict() {
        let err = AppError::ConfigImmutable {
            environment: "prod".into(),
            instance: "core-db".into(),
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "CONFIG_IMMUTABLE");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_backend_error_message_carries_context() {
        let err = AppError::BackendConnection {
            operation: "adding database",
            entity: "orders".into(),
            cause: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("adding database"));
        assert!(msg.contains("orders"));
        assert!(msg.contains("connection refused"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_authorization_denied_is_forbidden() {
        let err = AppError::AuthorizationDenied {
            resource: "/permission/admin/rss/dev/mysql/database/add".into(),
        };
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
