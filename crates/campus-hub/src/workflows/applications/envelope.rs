use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use super::service::{ApplicationServiceError, ErrorKind};

const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
const INTERNAL_MESSAGE: &str = "internal error";

/// Uniform response body: `{success, data?, message?, code?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T: Serialize> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            code: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Successful response carrying an explicit status code.
#[derive(Debug)]
pub struct ApiSuccess<T> {
    status: StatusCode,
    envelope: ApiEnvelope<T>,
}

impl<T: Serialize> ApiSuccess<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: ApiEnvelope::ok(data),
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            envelope: ApiEnvelope::ok(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.envelope = self.envelope.with_message(message);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

/// Failure rendered into the envelope with `success: false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: kind.status(),
            code: kind.code(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: UNAUTHENTICATED,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ApplicationServiceError> for ApiError {
    fn from(err: ApplicationServiceError) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::Internal {
            error!(error = %err, "application request failed");
            return Self::new(kind, INTERNAL_MESSAGE);
        }
        Self::new(kind, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiEnvelope::<()> {
            success: false,
            data: None,
            message: Some(self.message),
            code: Some(self.code),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::applications::repository::RepositoryError;
    use crate::workflows::applications::state::ApplicationStatus;

    #[test]
    fn envelope_omits_absent_fields() {
        let json = serde_json::to_value(ApiEnvelope::ok(serde_json::json!({ "id": "app-1" })))
            .expect("envelope serializes");
        assert_eq!(
            json,
            serde_json::json!({ "success": true, "data": { "id": "app-1" } })
        );
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let err = ApiError::from(ApplicationServiceError::Repository(
            RepositoryError::Unavailable("disk on fire".to_string()),
        ));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert!(!err.message().contains("disk"));
    }

    #[test]
    fn state_conflicts_map_to_conflict() {
        let err = ApiError::from(ApplicationServiceError::ConcurrentUpdate {
            current: ApplicationStatus::Rejected,
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "INVALID_STATE");
        assert!(err.message().contains("REJECTED"));
    }
}
