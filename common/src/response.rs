//! API response envelope.
//!
//! Every endpoint answers with an `ApiResponse`, successful or not, so that
//! clients can branch on `success` and read a stable `error.code`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Response envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the call succeeded.
    pub success: bool,

    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Error details on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    pub meta: ResponseMeta,
}

/// Error details.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Machine readable code, e.g. `CONFIG_IMMUTABLE`.
    pub code: String,

    /// Human readable message.
    pub message: String,

    /// Whether the same call may succeed later.
    pub retryable: bool,
}

/// Response metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResponseMeta {
    pub timestamp: DateTime<Utc>,

    /// Service that handled the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            service: None,
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: ResponseMeta::default(),
        }
    }

    /// Successful response tagged with the handling service.
    pub fn ok_with_service(data: T, service: impl Into<String>) -> Self {
        Self::ok(data).with_service(service)
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.meta.service = Some(service.into());
        self
    }
}

impl ApiResponse<()> {
    /// Failed response with an error code and message.
    pub fn err(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
                retryable: false,
            }),
            meta: ResponseMeta::default(),
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.retryable = retryable;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_omits_error() {
        let json = serde_json::to_value(ApiResponse::ok_with_service(3, "rss-manager")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 3);
        assert!(json.get("error").is_none());
        assert_eq!(json["meta"]["service"], "rss-manager");
    }

    #[test]
    fn test_err_omits_data() {
        let json = serde_json::to_value(ApiResponse::err("NOT_FOUND", "missing")).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }
}
